//! [`GlBackend`] over a live `glow` context.

use std::num::NonZeroU32;

use glow::HasContext;

use super::{GlBackend, NativeHandle, gl};

/// Forwards every call to a [`glow::Context`].
pub struct GlowBackend {
    gl: glow::Context,
}

impl GlowBackend {
    /// Wraps a loaded `glow` context.
    ///
    /// # Safety
    ///
    /// The GL context behind `gl` must be current on the calling thread for
    /// as long as the backend, or any [`Context`](crate::Context) built on
    /// it, is used.
    #[must_use]
    pub unsafe fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    #[must_use]
    pub fn into_inner(self) -> glow::Context {
        self.gl
    }
}

#[inline]
fn name(handle: NativeHandle) -> Option<NonZeroU32> {
    NonZeroU32::new(handle)
}

#[inline]
fn pixels(data: Option<&[u8]>) -> glow::PixelUnpackData<'_> {
    glow::PixelUnpackData::Slice(data)
}

// All calls below rely on the contract documented on `GlowBackend::new`.
impl GlBackend for GlowBackend {
    fn get_parameter_i32(&mut self, parameter: u32) -> i32 {
        unsafe { self.gl.get_parameter_i32(parameter) }
    }

    fn get_string(&mut self, parameter: u32) -> String {
        unsafe { self.gl.get_parameter_string(parameter) }
    }

    fn enable(&mut self, capability: u32) {
        unsafe { self.gl.enable(capability) }
    }

    fn disable(&mut self, capability: u32) {
        unsafe { self.gl.disable(capability) }
    }

    fn enable_indexed(&mut self, capability: u32, index: u32) {
        unsafe { self.gl.enable_draw_buffer(capability, index) }
    }

    fn disable_indexed(&mut self, capability: u32, index: u32) {
        unsafe { self.gl.disable_draw_buffer(capability, index) }
    }

    // ─── Buffers ─────────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Result<NativeHandle, String> {
        unsafe { self.gl.create_buffer() }.map(|buffer| buffer.0.get())
    }

    fn bind_buffer(&mut self, target: u32, buffer: NativeHandle) {
        unsafe { self.gl.bind_buffer(target, name(buffer).map(glow::NativeBuffer)) }
    }

    fn buffer_data(&mut self, target: u32, size: i32, data: Option<&[u8]>, usage: u32) {
        unsafe {
            match data {
                Some(bytes) => self.gl.buffer_data_u8_slice(target, bytes, usage),
                None => self.gl.buffer_data_size(target, size, usage),
            }
        }
    }

    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]) {
        unsafe { self.gl.buffer_sub_data_u8_slice(target, offset, data) }
    }

    fn bind_buffer_range(&mut self, target: u32, index: u32, buffer: NativeHandle, offset: i32, size: i32) {
        unsafe {
            self.gl
                .bind_buffer_range(target, index, name(buffer).map(glow::NativeBuffer), offset, size);
        }
    }

    fn delete_buffer(&mut self, buffer: NativeHandle) {
        if let Some(buffer) = name(buffer) {
            unsafe { self.gl.delete_buffer(glow::NativeBuffer(buffer)) }
        }
    }

    // ─── Textures & Renderbuffers ────────────────────────────────────────────

    fn create_texture(&mut self) -> Result<NativeHandle, String> {
        unsafe { self.gl.create_texture() }.map(|texture| texture.0.get())
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(unit) }
    }

    fn bind_texture(&mut self, target: u32, texture: NativeHandle) {
        unsafe { self.gl.bind_texture(target, name(texture).map(glow::NativeTexture)) }
    }

    fn tex_image_2d(
        &mut self,
        target: u32,
        internal_format: u32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        data: Option<&[u8]>,
    ) {
        unsafe {
            self.gl
                .tex_image_2d(target, 0, internal_format as i32, width, height, 0, format, ty, pixels(data));
        }
    }

    fn tex_image_3d(
        &mut self,
        target: u32,
        internal_format: u32,
        width: i32,
        height: i32,
        depth: i32,
        format: u32,
        ty: u32,
        data: Option<&[u8]>,
    ) {
        unsafe {
            self.gl.tex_image_3d(
                target,
                0,
                internal_format as i32,
                width,
                height,
                depth,
                0,
                format,
                ty,
                pixels(data),
            );
        }
    }

    fn delete_texture(&mut self, texture: NativeHandle) {
        if let Some(texture) = name(texture) {
            unsafe { self.gl.delete_texture(glow::NativeTexture(texture)) }
        }
    }

    fn create_renderbuffer(&mut self) -> Result<NativeHandle, String> {
        unsafe { self.gl.create_renderbuffer() }.map(|renderbuffer| renderbuffer.0.get())
    }

    fn renderbuffer_storage_multisample(
        &mut self,
        renderbuffer: NativeHandle,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        unsafe {
            self.gl
                .bind_renderbuffer(gl::RENDERBUFFER, name(renderbuffer).map(glow::NativeRenderbuffer));
            self.gl
                .renderbuffer_storage_multisample(gl::RENDERBUFFER, samples, internal_format, width, height);
        }
    }

    fn delete_renderbuffer(&mut self, renderbuffer: NativeHandle) {
        if let Some(renderbuffer) = name(renderbuffer) {
            unsafe { self.gl.delete_renderbuffer(glow::NativeRenderbuffer(renderbuffer)) }
        }
    }

    // ─── Framebuffers ────────────────────────────────────────────────────────

    fn create_framebuffer(&mut self) -> Result<NativeHandle, String> {
        unsafe { self.gl.create_framebuffer() }.map(|framebuffer| framebuffer.0.get())
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: NativeHandle) {
        unsafe { self.gl.bind_framebuffer(target, name(framebuffer).map(glow::NativeFramebuffer)) }
    }

    fn framebuffer_texture_2d(&mut self, attachment: u32, texture_target: u32, texture: NativeHandle) {
        unsafe {
            self.gl.framebuffer_texture_2d(
                gl::FRAMEBUFFER,
                attachment,
                texture_target,
                name(texture).map(glow::NativeTexture),
                0,
            );
        }
    }

    fn framebuffer_renderbuffer(&mut self, attachment: u32, renderbuffer: NativeHandle) {
        unsafe {
            self.gl.framebuffer_renderbuffer(
                gl::FRAMEBUFFER,
                attachment,
                gl::RENDERBUFFER,
                name(renderbuffer).map(glow::NativeRenderbuffer),
            );
        }
    }

    fn draw_buffers(&mut self, buffers: &[u32]) {
        unsafe { self.gl.draw_buffers(buffers) }
    }

    fn read_buffer(&mut self, buffer: u32) {
        unsafe { self.gl.read_buffer(buffer) }
    }

    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32) {
        unsafe {
            self.gl.blit_framebuffer(
                src[0], src[1], src[2], src[3], dst[0], dst[1], dst[2], dst[3], mask, filter,
            );
        }
    }

    fn clear_buffer_f32(&mut self, buffer: u32, draw_buffer: u32, values: [f32; 4]) {
        unsafe { self.gl.clear_buffer_f32_slice(buffer, draw_buffer, &values) }
    }

    fn clear_buffer_i32(&mut self, buffer: u32, draw_buffer: u32, values: [i32; 4]) {
        unsafe { self.gl.clear_buffer_i32_slice(buffer, draw_buffer, &values) }
    }

    fn clear_buffer_u32(&mut self, buffer: u32, draw_buffer: u32, values: [u32; 4]) {
        unsafe { self.gl.clear_buffer_u32_slice(buffer, draw_buffer, &values) }
    }

    fn clear_buffer_depth_stencil(&mut self, depth: f32, stencil: i32) {
        unsafe { self.gl.clear_buffer_depth_stencil(gl::DEPTH_STENCIL, 0, depth, stencil) }
    }

    fn delete_framebuffer(&mut self, framebuffer: NativeHandle) {
        if let Some(framebuffer) = name(framebuffer) {
            unsafe { self.gl.delete_framebuffer(glow::NativeFramebuffer(framebuffer)) }
        }
    }

    // ─── Vertex Arrays ───────────────────────────────────────────────────────

    fn create_vertex_array(&mut self) -> Result<NativeHandle, String> {
        unsafe { self.gl.create_vertex_array() }.map(|vertex_array| vertex_array.0.get())
    }

    fn bind_vertex_array(&mut self, vertex_array: NativeHandle) {
        unsafe { self.gl.bind_vertex_array(name(vertex_array).map(glow::NativeVertexArray)) }
    }

    fn vertex_attrib_pointer(&mut self, location: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32) {
        unsafe { self.gl.vertex_attrib_pointer_f32(location, size, ty, normalized, stride, offset) }
    }

    fn vertex_attrib_i_pointer(&mut self, location: u32, size: i32, ty: u32, stride: i32, offset: i32) {
        unsafe { self.gl.vertex_attrib_pointer_i32(location, size, ty, stride, offset) }
    }

    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32) {
        unsafe { self.gl.vertex_attrib_divisor(location, divisor) }
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(location) }
    }

    fn delete_vertex_array(&mut self, vertex_array: NativeHandle) {
        if let Some(vertex_array) = name(vertex_array) {
            unsafe { self.gl.delete_vertex_array(glow::NativeVertexArray(vertex_array)) }
        }
    }

    // ─── Samplers ────────────────────────────────────────────────────────────

    fn create_sampler(&mut self) -> Result<NativeHandle, String> {
        unsafe { self.gl.create_sampler() }.map(|sampler| sampler.0.get())
    }

    fn sampler_parameter_i32(&mut self, sampler: NativeHandle, parameter: u32, value: i32) {
        if let Some(sampler) = name(sampler) {
            unsafe { self.gl.sampler_parameter_i32(glow::NativeSampler(sampler), parameter, value) }
        }
    }

    fn sampler_parameter_f32(&mut self, sampler: NativeHandle, parameter: u32, value: f32) {
        if let Some(sampler) = name(sampler) {
            unsafe { self.gl.sampler_parameter_f32(glow::NativeSampler(sampler), parameter, value) }
        }
    }

    fn sampler_parameter_f32_slice(&mut self, sampler: NativeHandle, parameter: u32, values: &[f32]) {
        if let Some(sampler) = name(sampler) {
            unsafe {
                self.gl
                    .sampler_parameter_f32_slice(glow::NativeSampler(sampler), parameter, values);
            }
        }
    }

    fn bind_sampler(&mut self, unit: u32, sampler: NativeHandle) {
        unsafe { self.gl.bind_sampler(unit, name(sampler).map(glow::NativeSampler)) }
    }

    fn delete_sampler(&mut self, sampler: NativeHandle) {
        if let Some(sampler) = name(sampler) {
            unsafe { self.gl.delete_sampler(glow::NativeSampler(sampler)) }
        }
    }

    // ─── Shaders & Programs ──────────────────────────────────────────────────

    fn create_shader(&mut self, stage: u32) -> Result<NativeHandle, String> {
        unsafe { self.gl.create_shader(stage) }.map(|shader| shader.0.get())
    }

    fn shader_source(&mut self, shader: NativeHandle, source: &str) {
        if let Some(shader) = name(shader) {
            unsafe { self.gl.shader_source(glow::NativeShader(shader), source) }
        }
    }

    fn compile_shader(&mut self, shader: NativeHandle) {
        if let Some(shader) = name(shader) {
            unsafe { self.gl.compile_shader(glow::NativeShader(shader)) }
        }
    }

    fn shader_compile_status(&mut self, shader: NativeHandle) -> bool {
        name(shader).is_some_and(|shader| unsafe { self.gl.get_shader_compile_status(glow::NativeShader(shader)) })
    }

    fn shader_info_log(&mut self, shader: NativeHandle) -> String {
        name(shader)
            .map(|shader| unsafe { self.gl.get_shader_info_log(glow::NativeShader(shader)) })
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: NativeHandle) {
        if let Some(shader) = name(shader) {
            unsafe { self.gl.delete_shader(glow::NativeShader(shader)) }
        }
    }

    fn create_program(&mut self) -> Result<NativeHandle, String> {
        unsafe { self.gl.create_program() }.map(|program| program.0.get())
    }

    fn attach_shader(&mut self, program: NativeHandle, shader: NativeHandle) {
        if let (Some(program), Some(shader)) = (name(program), name(shader)) {
            unsafe {
                self.gl
                    .attach_shader(glow::NativeProgram(program), glow::NativeShader(shader));
            }
        }
    }

    fn link_program(&mut self, program: NativeHandle) {
        if let Some(program) = name(program) {
            unsafe { self.gl.link_program(glow::NativeProgram(program)) }
        }
    }

    fn program_link_status(&mut self, program: NativeHandle) -> bool {
        name(program).is_some_and(|program| unsafe { self.gl.get_program_link_status(glow::NativeProgram(program)) })
    }

    fn program_info_log(&mut self, program: NativeHandle) -> String {
        name(program)
            .map(|program| unsafe { self.gl.get_program_info_log(glow::NativeProgram(program)) })
            .unwrap_or_default()
    }

    fn use_program(&mut self, program: NativeHandle) {
        unsafe { self.gl.use_program(name(program).map(glow::NativeProgram)) }
    }

    fn delete_program(&mut self, program: NativeHandle) {
        if let Some(program) = name(program) {
            unsafe { self.gl.delete_program(glow::NativeProgram(program)) }
        }
    }

    // ── Reflection ──

    fn get_program_parameter_i32(&mut self, program: NativeHandle, parameter: u32) -> i32 {
        name(program).map_or(0, |program| unsafe {
            self.gl
                .get_program_parameter_i32(glow::NativeProgram(program), parameter)
        })
    }

    fn get_active_attribute_name(&mut self, program: NativeHandle, index: u32) -> Option<String> {
        let program = glow::NativeProgram(name(program)?);
        unsafe { self.gl.get_active_attribute(program, index) }.map(|attribute| attribute.name)
    }

    fn get_attrib_location(&mut self, program: NativeHandle, attribute: &str) -> i32 {
        name(program)
            .and_then(|program| unsafe { self.gl.get_attrib_location(glow::NativeProgram(program), attribute) })
            .map_or(-1, |location| location as i32)
    }

    fn get_active_uniform_name(&mut self, program: NativeHandle, index: u32) -> Option<String> {
        let program = glow::NativeProgram(name(program)?);
        unsafe { self.gl.get_active_uniform(program, index) }.map(|uniform| uniform.name)
    }

    fn get_uniform_location(&mut self, program: NativeHandle, uniform: &str) -> i32 {
        name(program)
            .and_then(|program| unsafe { self.gl.get_uniform_location(glow::NativeProgram(program), uniform) })
            .map_or(-1, |location| location.0 as i32)
    }

    fn get_active_uniform_block_name(&mut self, program: NativeHandle, index: u32) -> String {
        name(program)
            .map(|program| unsafe {
                self.gl
                    .get_active_uniform_block_name(glow::NativeProgram(program), index)
            })
            .unwrap_or_default()
    }

    fn get_active_uniform_block_size(&mut self, program: NativeHandle, index: u32) -> i32 {
        name(program).map_or(0, |program| unsafe {
            self.gl.get_active_uniform_block_parameter_i32(
                glow::NativeProgram(program),
                index,
                gl::UNIFORM_BLOCK_DATA_SIZE,
            )
        })
    }

    fn uniform_block_binding(&mut self, program: NativeHandle, index: u32, binding: u32) {
        if let Some(program) = name(program) {
            unsafe {
                self.gl
                    .uniform_block_binding(glow::NativeProgram(program), index, binding);
            }
        }
    }

    fn uniform_1_i32(&mut self, location: i32, value: i32) {
        if location >= 0 {
            let location = glow::NativeUniformLocation(location as u32);
            unsafe { self.gl.uniform_1_i32(Some(&location), value) }
        }
    }

    // ─── Fixed-Function State ────────────────────────────────────────────────

    fn cull_face(&mut self, face: u32) {
        unsafe { self.gl.cull_face(face) }
    }

    fn front_face(&mut self, winding: u32) {
        unsafe { self.gl.front_face(winding) }
    }

    fn line_width(&mut self, width: f32) {
        unsafe { self.gl.line_width(width) }
    }

    fn depth_mask(&mut self, write: bool) {
        unsafe { self.gl.depth_mask(write) }
    }

    fn depth_func(&mut self, func: u32) {
        unsafe { self.gl.depth_func(func) }
    }

    fn stencil_mask_separate(&mut self, face: u32, mask: u32) {
        unsafe { self.gl.stencil_mask_separate(face, mask) }
    }

    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32) {
        unsafe { self.gl.stencil_func_separate(face, func, reference, mask) }
    }

    fn stencil_op_separate(&mut self, face: u32, fail: u32, depth_fail: u32, pass: u32) {
        unsafe { self.gl.stencil_op_separate(face, fail, depth_fail, pass) }
    }

    fn blend_func_separate(&mut self, src_color: u32, dst_color: u32, src_alpha: u32, dst_alpha: u32) {
        unsafe { self.gl.blend_func_separate(src_color, dst_color, src_alpha, dst_alpha) }
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        unsafe { self.gl.polygon_offset(factor, units) }
    }

    fn color_mask_indexed(&mut self, index: u32, mask: [bool; 4]) {
        unsafe { self.gl.color_mask_draw_buffer(index, mask[0], mask[1], mask[2], mask[3]) }
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    // ─── Draw ────────────────────────────────────────────────────────────────

    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        unsafe { self.gl.draw_arrays_instanced(mode, first, count, instances) }
    }

    fn draw_elements_instanced(&mut self, mode: u32, count: i32, index_type: u32, offset: i32, instances: i32) {
        unsafe { self.gl.draw_elements_instanced(mode, count, index_type, offset, instances) }
    }
}
