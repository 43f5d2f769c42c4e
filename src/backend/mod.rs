//! Native Driver Boundary
//!
//! Everything the cache, the builders and the binder do to the driver goes
//! through [`GlBackend`]. The trait mirrors the GL entry points one to one so
//! an implementation is a thin forwarding layer.
//!
//! Two implementations ship with the crate:
//!
//! - [`RecordingBackend`]: in-memory driver that records every call. It is the
//!   instrumentation the test-suite uses to count native work.
//! - `GlowBackend` (feature `glow`): forwards to a live [`glow`] context.
//!
//! Native objects are addressed by their raw GL name ([`NativeHandle`]).
//! Name `0` is the "no object" name and, for framebuffers, the default
//! framebuffer.
//!
//! [`glow`]: https://docs.rs/glow

pub mod gl;
mod recording;

#[cfg(all(feature = "glow", not(target_arch = "wasm32")))]
mod glow_backend;

pub use recording::{GlCall, NativeObjectKind, RecordingBackend};

#[cfg(all(feature = "glow", not(target_arch = "wasm32")))]
pub use glow_backend::GlowBackend;

/// Raw GL object name.
pub type NativeHandle = u32;

/// Native driver calls issued by the crate.
///
/// Creation methods return the backend's message on failure. Every other call
/// is fire-and-forget, matching the driver's own error model.
pub trait GlBackend {
    // ─── Context ─────────────────────────────────────────────────────────────

    fn get_parameter_i32(&mut self, parameter: u32) -> i32;
    fn get_string(&mut self, parameter: u32) -> String;
    fn enable(&mut self, capability: u32);
    fn disable(&mut self, capability: u32);
    fn enable_indexed(&mut self, capability: u32, index: u32);
    fn disable_indexed(&mut self, capability: u32, index: u32);

    // ─── Buffers ─────────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Result<NativeHandle, String>;
    fn bind_buffer(&mut self, target: u32, buffer: NativeHandle);
    /// Allocates `size` bytes, initialized from `data` when present.
    fn buffer_data(&mut self, target: u32, size: i32, data: Option<&[u8]>, usage: u32);
    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]);
    fn bind_buffer_range(&mut self, target: u32, index: u32, buffer: NativeHandle, offset: i32, size: i32);
    fn delete_buffer(&mut self, buffer: NativeHandle);

    // ─── Textures & Renderbuffers ────────────────────────────────────────────

    fn create_texture(&mut self) -> Result<NativeHandle, String>;
    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, target: u32, texture: NativeHandle);
    fn tex_image_2d(
        &mut self,
        target: u32,
        internal_format: u32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        data: Option<&[u8]>,
    );
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
    );
    fn delete_texture(&mut self, texture: NativeHandle);

    fn create_renderbuffer(&mut self) -> Result<NativeHandle, String>;
    /// Binds `renderbuffer` and allocates its storage.
    fn renderbuffer_storage_multisample(
        &mut self,
        renderbuffer: NativeHandle,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    );
    fn delete_renderbuffer(&mut self, renderbuffer: NativeHandle);

    // ─── Framebuffers ────────────────────────────────────────────────────────

    fn create_framebuffer(&mut self) -> Result<NativeHandle, String>;
    fn bind_framebuffer(&mut self, target: u32, framebuffer: NativeHandle);
    /// Attaches to the framebuffer bound at `FRAMEBUFFER`.
    fn framebuffer_texture_2d(&mut self, attachment: u32, texture_target: u32, texture: NativeHandle);
    /// Attaches to the framebuffer bound at `FRAMEBUFFER`.
    fn framebuffer_renderbuffer(&mut self, attachment: u32, renderbuffer: NativeHandle);
    fn draw_buffers(&mut self, buffers: &[u32]);
    fn read_buffer(&mut self, buffer: u32);
    /// `src` and `dst` are `[x0, y0, x1, y1]` rectangles.
    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32);
    fn clear_buffer_f32(&mut self, buffer: u32, draw_buffer: u32, values: [f32; 4]);
    fn clear_buffer_i32(&mut self, buffer: u32, draw_buffer: u32, values: [i32; 4]);
    fn clear_buffer_u32(&mut self, buffer: u32, draw_buffer: u32, values: [u32; 4]);
    fn clear_buffer_depth_stencil(&mut self, depth: f32, stencil: i32);
    fn delete_framebuffer(&mut self, framebuffer: NativeHandle);

    // ─── Vertex Arrays ───────────────────────────────────────────────────────

    fn create_vertex_array(&mut self) -> Result<NativeHandle, String>;
    fn bind_vertex_array(&mut self, vertex_array: NativeHandle);
    fn vertex_attrib_pointer(&mut self, location: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32);
    fn vertex_attrib_i_pointer(&mut self, location: u32, size: i32, ty: u32, stride: i32, offset: i32);
    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32);
    fn enable_vertex_attrib_array(&mut self, location: u32);
    fn delete_vertex_array(&mut self, vertex_array: NativeHandle);

    // ─── Samplers ────────────────────────────────────────────────────────────

    fn create_sampler(&mut self) -> Result<NativeHandle, String>;
    fn sampler_parameter_i32(&mut self, sampler: NativeHandle, parameter: u32, value: i32);
    fn sampler_parameter_f32(&mut self, sampler: NativeHandle, parameter: u32, value: f32);
    fn sampler_parameter_f32_slice(&mut self, sampler: NativeHandle, parameter: u32, values: &[f32]);
    fn bind_sampler(&mut self, unit: u32, sampler: NativeHandle);
    fn delete_sampler(&mut self, sampler: NativeHandle);

    // ─── Shaders & Programs ──────────────────────────────────────────────────

    fn create_shader(&mut self, stage: u32) -> Result<NativeHandle, String>;
    fn shader_source(&mut self, shader: NativeHandle, source: &str);
    fn compile_shader(&mut self, shader: NativeHandle);
    fn shader_compile_status(&mut self, shader: NativeHandle) -> bool;
    fn shader_info_log(&mut self, shader: NativeHandle) -> String;
    fn delete_shader(&mut self, shader: NativeHandle);

    fn create_program(&mut self) -> Result<NativeHandle, String>;
    fn attach_shader(&mut self, program: NativeHandle, shader: NativeHandle);
    fn link_program(&mut self, program: NativeHandle);
    fn program_link_status(&mut self, program: NativeHandle) -> bool;
    fn program_info_log(&mut self, program: NativeHandle) -> String;
    fn use_program(&mut self, program: NativeHandle);
    fn delete_program(&mut self, program: NativeHandle);

    // ── Reflection ──

    fn get_program_parameter_i32(&mut self, program: NativeHandle, parameter: u32) -> i32;
    fn get_active_attribute_name(&mut self, program: NativeHandle, index: u32) -> Option<String>;
    /// `-1` when `name` is not an active attribute.
    fn get_attrib_location(&mut self, program: NativeHandle, name: &str) -> i32;
    fn get_active_uniform_name(&mut self, program: NativeHandle, index: u32) -> Option<String>;
    /// `-1` when `name` is not an active uniform.
    fn get_uniform_location(&mut self, program: NativeHandle, name: &str) -> i32;
    fn get_active_uniform_block_name(&mut self, program: NativeHandle, index: u32) -> String;
    fn get_active_uniform_block_size(&mut self, program: NativeHandle, index: u32) -> i32;
    fn uniform_block_binding(&mut self, program: NativeHandle, index: u32, binding: u32);
    /// Sets an `int`/sampler uniform of the program in use.
    fn uniform_1_i32(&mut self, location: i32, value: i32);

    // ─── Fixed-Function State ────────────────────────────────────────────────

    fn cull_face(&mut self, face: u32);
    fn front_face(&mut self, winding: u32);
    fn line_width(&mut self, width: f32);
    fn depth_mask(&mut self, write: bool);
    fn depth_func(&mut self, func: u32);
    fn stencil_mask_separate(&mut self, face: u32, mask: u32);
    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32);
    fn stencil_op_separate(&mut self, face: u32, fail: u32, depth_fail: u32, pass: u32);
    fn blend_func_separate(&mut self, src_color: u32, dst_color: u32, src_alpha: u32, dst_alpha: u32);
    fn polygon_offset(&mut self, factor: f32, units: f32);
    fn color_mask_indexed(&mut self, index: u32, mask: [bool; 4]);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);

    // ─── Draw ────────────────────────────────────────────────────────────────

    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32);
    /// `offset` is in bytes into the bound index buffer.
    fn draw_elements_instanced(&mut self, mode: u32, count: i32, index_type: u32, offset: i32, instances: i32);
}
