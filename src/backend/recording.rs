//! Recording Backend
//!
//! A [`GlBackend`] that never touches a driver. Every state-changing call is
//! appended to a log of [`GlCall`] values, object names are handed out from a
//! counter, and live objects are tracked by kind so leaks and double deletes
//! are observable.
//!
//! # Shader Emulation
//!
//! - Compilation fails for any source containing an `#error` directive. The
//!   info log names the offending line.
//! - Linking fails when an attached shader did not compile, or when a link
//!   error was injected with [`RecordingBackend::set_link_error`].
//! - Reflection is answered by scanning the attached GLSL for
//!   `layout(location = N) in` attributes, plain `uniform` declarations and
//!   `uniform Block { ... }` interface blocks (16 bytes per member line).

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::{GlBackend, NativeHandle, gl};

/// Kind of native object, as tracked by [`RecordingBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeObjectKind {
    Buffer,
    Texture,
    Renderbuffer,
    Framebuffer,
    VertexArray,
    Sampler,
    Shader,
    Program,
}

/// One recorded driver call.
///
/// Pure queries (parameters, statuses, logs, reflection) are not recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    Create { kind: NativeObjectKind, name: NativeHandle },
    Delete { kind: NativeObjectKind, name: NativeHandle },

    Enable(u32),
    Disable(u32),
    EnableIndexed { capability: u32, index: u32 },
    DisableIndexed { capability: u32, index: u32 },

    BindBuffer { target: u32, buffer: NativeHandle },
    BufferData { target: u32, size: i32, initialized: bool, usage: u32 },
    BufferSubData { target: u32, offset: i32, len: usize },
    BindBufferRange { target: u32, index: u32, buffer: NativeHandle, offset: i32, size: i32 },

    ActiveTexture(u32),
    BindTexture { target: u32, texture: NativeHandle },
    TexImage2d { target: u32, internal_format: u32, width: i32, height: i32 },
    TexImage3d { target: u32, internal_format: u32, width: i32, height: i32, depth: i32 },
    RenderbufferStorage { renderbuffer: NativeHandle, samples: i32, internal_format: u32, width: i32, height: i32 },

    BindFramebuffer { target: u32, framebuffer: NativeHandle },
    FramebufferTexture2d { attachment: u32, texture_target: u32, texture: NativeHandle },
    FramebufferRenderbuffer { attachment: u32, renderbuffer: NativeHandle },
    DrawBuffers(Vec<u32>),
    ReadBuffer(u32),
    BlitFramebuffer { src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32 },
    ClearBufferF32 { buffer: u32, draw_buffer: u32, values: [f32; 4] },
    ClearBufferI32 { buffer: u32, draw_buffer: u32, values: [i32; 4] },
    ClearBufferU32 { buffer: u32, draw_buffer: u32, values: [u32; 4] },
    ClearBufferDepthStencil { depth: f32, stencil: i32 },

    BindVertexArray(NativeHandle),
    VertexAttribPointer { location: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32 },
    VertexAttribIPointer { location: u32, size: i32, ty: u32, stride: i32, offset: i32 },
    VertexAttribDivisor { location: u32, divisor: u32 },
    EnableVertexAttribArray(u32),

    SamplerParameterI32 { sampler: NativeHandle, parameter: u32, value: i32 },
    SamplerParameterF32 { sampler: NativeHandle, parameter: u32, value: f32 },
    SamplerParameterF32Slice { sampler: NativeHandle, parameter: u32, values: Vec<f32> },
    BindSampler { unit: u32, sampler: NativeHandle },

    ShaderSource(NativeHandle),
    CompileShader(NativeHandle),
    AttachShader { program: NativeHandle, shader: NativeHandle },
    LinkProgram(NativeHandle),
    UseProgram(NativeHandle),
    UniformBlockBinding { program: NativeHandle, index: u32, binding: u32 },
    Uniform1i { location: i32, value: i32 },

    CullFace(u32),
    FrontFace(u32),
    LineWidth(f32),
    DepthMask(bool),
    DepthFunc(u32),
    StencilMaskSeparate { face: u32, mask: u32 },
    StencilFuncSeparate { face: u32, func: u32, reference: i32, mask: u32 },
    StencilOpSeparate { face: u32, fail: u32, depth_fail: u32, pass: u32 },
    BlendFuncSeparate { src_color: u32, dst_color: u32, src_alpha: u32, dst_alpha: u32 },
    PolygonOffset { factor: f32, units: f32 },
    ColorMaskIndexed { index: u32, mask: [bool; 4] },
    Viewport { x: i32, y: i32, width: i32, height: i32 },

    DrawArraysInstanced { mode: u32, first: i32, count: i32, instances: i32 },
    DrawElementsInstanced { mode: u32, count: i32, index_type: u32, offset: i32, instances: i32 },
}

#[derive(Debug)]
struct ShaderRecord {
    stage: u32,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Default)]
struct ProgramRecord {
    shaders: SmallVec<[NativeHandle; 2]>,
    linked: bool,
    log: String,
    reflection: Reflection,
}

#[derive(Debug, Default)]
struct Reflection {
    attributes: Vec<(String, i32)>,
    uniforms: Vec<String>,
    uniform_blocks: Vec<(String, i32)>,
}

/// In-memory driver that records calls. See the module docs.
#[derive(Debug)]
pub struct RecordingBackend {
    calls: Vec<GlCall>,
    next_name: NativeHandle,
    live: FxHashMap<NativeHandle, NativeObjectKind>,
    shaders: FxHashMap<NativeHandle, ShaderRecord>,
    programs: FxHashMap<NativeHandle, ProgramRecord>,
    max_texture_units: i32,
    link_error: Option<String>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            next_name: 1,
            live: FxHashMap::default(),
            shaders: FxHashMap::default(),
            programs: FxHashMap::default(),
            max_texture_units: 32,
            link_error: None,
        }
    }

    /// Overrides the reported `MAX_TEXTURE_IMAGE_UNITS`.
    #[must_use]
    pub fn with_texture_units(mut self, units: i32) -> Self {
        self.max_texture_units = units;
        self
    }

    /// Makes every following link fail with `log` until reset with `None`.
    pub fn set_link_error(&mut self, log: Option<String>) {
        self.link_error = log;
    }

    // ─── Inspection ──────────────────────────────────────────────────────────

    /// Every call recorded since creation or the last [`clear_calls`](Self::clear_calls).
    #[inline]
    #[must_use]
    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Number of `kind` objects created since the call log was last cleared.
    #[must_use]
    pub fn created(&self, kind: NativeObjectKind) -> usize {
        self.count(|call| matches!(call, GlCall::Create { kind: k, .. } if *k == kind))
    }

    /// Number of `kind` objects deleted since the call log was last cleared.
    #[must_use]
    pub fn deleted(&self, kind: NativeObjectKind) -> usize {
        self.count(|call| matches!(call, GlCall::Delete { kind: k, .. } if *k == kind))
    }

    /// Number of `kind` objects currently alive.
    #[must_use]
    pub fn live_count(&self, kind: NativeObjectKind) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }

    #[must_use]
    pub fn is_live(&self, name: NativeHandle) -> bool {
        self.live.contains_key(&name)
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    fn allocate(&mut self, kind: NativeObjectKind) -> NativeHandle {
        let name = self.next_name;
        self.next_name += 1;
        self.live.insert(name, kind);
        self.calls.push(GlCall::Create { kind, name });
        name
    }

    fn release(&mut self, kind: NativeObjectKind, name: NativeHandle) {
        if name == 0 {
            return;
        }
        match self.live.get(&name) {
            Some(live_kind) if *live_kind == kind => {
                self.live.remove(&name);
            }
            _ => log::warn!("RecordingBackend: deleting {kind:?} {name} which is not live"),
        }
        self.calls.push(GlCall::Delete { kind, name });
    }

    fn reflection(&self, program: NativeHandle) -> Option<&Reflection> {
        self.programs.get(&program).filter(|p| p.linked).map(|p| &p.reflection)
    }
}

// ─── GLSL Scanning ───────────────────────────────────────────────────────────

/// Line (1-based) of the first `#error` directive, if any.
fn error_directive_line(source: &str) -> Option<usize> {
    source
        .lines()
        .position(|line| line.trim_start().starts_with("#error"))
        .map(|index| index + 1)
}

/// Splits `layout(...) rest` into the explicit location and `rest`.
fn strip_layout(line: &str) -> (Option<i32>, &str) {
    let Some(qualified) = line.strip_prefix("layout") else {
        return (None, line);
    };
    let Some(close) = qualified.find(')') else {
        return (None, line);
    };
    let qualifiers = &qualified[..close];
    let location = qualifiers.find("location").and_then(|start| {
        let tail = &qualifiers[start + "location".len()..];
        let digits: String = tail
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    });
    (location, qualified[close + 1..].trim_start())
}

/// Last identifier of a declaration, without `;`. Arrays are named by their
/// first element, as drivers report them.
fn declared_name(declaration: &str) -> Option<String> {
    let last = declaration.trim_end_matches(';').split_whitespace().last()?;
    match last.split_once('[') {
        Some(("", _)) => None,
        Some((name, _)) => Some(format!("{name}[0]")),
        None => (!last.is_empty()).then(|| last.to_string()),
    }
}

/// Location lookups accept an array's bare name too.
fn names_match(active: &str, queried: &str) -> bool {
    active == queried || active.strip_suffix("[0]") == Some(queried)
}

fn scan_sources(sources: &[(u32, &str)]) -> Reflection {
    let mut reflection = Reflection::default();

    for (stage, source) in sources {
        let mut lines = source.lines().map(str::trim);
        while let Some(line) = lines.next() {
            let (location, rest) = strip_layout(line);

            if *stage == gl::VERTEX_SHADER
                && let Some(declaration) = rest.strip_prefix("in ")
                && let Some(name) = declared_name(declaration)
            {
                let location = location.unwrap_or(reflection.attributes.len() as i32);
                reflection.attributes.push((name, location));
                continue;
            }

            let Some(declaration) = rest.strip_prefix("uniform ") else {
                continue;
            };
            if declaration.ends_with(';') {
                if let Some(name) = declared_name(declaration)
                    && !reflection.uniforms.contains(&name)
                {
                    reflection.uniforms.push(name);
                }
                continue;
            }

            let Some(block) = declaration.split_whitespace().next() else {
                continue;
            };
            let block = block.trim_end_matches('{').to_string();
            let mut members = 0;
            for member in lines.by_ref() {
                if member.starts_with('}') {
                    break;
                }
                if member.ends_with(';') {
                    members += 1;
                }
            }
            if !reflection.uniform_blocks.iter().any(|(name, _)| *name == block) {
                reflection.uniform_blocks.push((block, members * 16));
            }
        }
    }

    reflection
}

// ─── GlBackend ───────────────────────────────────────────────────────────────

impl GlBackend for RecordingBackend {
    fn get_parameter_i32(&mut self, parameter: u32) -> i32 {
        match parameter {
            gl::MAX_TEXTURE_IMAGE_UNITS => self.max_texture_units,
            _ => 0,
        }
    }

    fn get_string(&mut self, parameter: u32) -> String {
        match parameter {
            gl::VENDOR => "myth-gl".to_string(),
            gl::RENDERER => "RecordingBackend".to_string(),
            gl::VERSION => "3.3 (recorded)".to_string(),
            _ => String::new(),
        }
    }

    fn enable(&mut self, capability: u32) {
        self.calls.push(GlCall::Enable(capability));
    }

    fn disable(&mut self, capability: u32) {
        self.calls.push(GlCall::Disable(capability));
    }

    fn enable_indexed(&mut self, capability: u32, index: u32) {
        self.calls.push(GlCall::EnableIndexed { capability, index });
    }

    fn disable_indexed(&mut self, capability: u32, index: u32) {
        self.calls.push(GlCall::DisableIndexed { capability, index });
    }

    // ─── Buffers ─────────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Result<NativeHandle, String> {
        Ok(self.allocate(NativeObjectKind::Buffer))
    }

    fn bind_buffer(&mut self, target: u32, buffer: NativeHandle) {
        self.calls.push(GlCall::BindBuffer { target, buffer });
    }

    fn buffer_data(&mut self, target: u32, size: i32, data: Option<&[u8]>, usage: u32) {
        self.calls.push(GlCall::BufferData { target, size, initialized: data.is_some(), usage });
    }

    fn buffer_sub_data(&mut self, target: u32, offset: i32, data: &[u8]) {
        self.calls.push(GlCall::BufferSubData { target, offset, len: data.len() });
    }

    fn bind_buffer_range(&mut self, target: u32, index: u32, buffer: NativeHandle, offset: i32, size: i32) {
        self.calls.push(GlCall::BindBufferRange { target, index, buffer, offset, size });
    }

    fn delete_buffer(&mut self, buffer: NativeHandle) {
        self.release(NativeObjectKind::Buffer, buffer);
    }

    // ─── Textures & Renderbuffers ────────────────────────────────────────────

    fn create_texture(&mut self) -> Result<NativeHandle, String> {
        Ok(self.allocate(NativeObjectKind::Texture))
    }

    fn active_texture(&mut self, unit: u32) {
        self.calls.push(GlCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, target: u32, texture: NativeHandle) {
        self.calls.push(GlCall::BindTexture { target, texture });
    }

    fn tex_image_2d(
        &mut self,
        target: u32,
        internal_format: u32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
        _data: Option<&[u8]>,
    ) {
        self.calls.push(GlCall::TexImage2d { target, internal_format, width, height });
    }

    fn tex_image_3d(
        &mut self,
        target: u32,
        internal_format: u32,
        width: i32,
        height: i32,
        depth: i32,
        _format: u32,
        _ty: u32,
        _data: Option<&[u8]>,
    ) {
        self.calls.push(GlCall::TexImage3d { target, internal_format, width, height, depth });
    }

    fn delete_texture(&mut self, texture: NativeHandle) {
        self.release(NativeObjectKind::Texture, texture);
    }

    fn create_renderbuffer(&mut self) -> Result<NativeHandle, String> {
        Ok(self.allocate(NativeObjectKind::Renderbuffer))
    }

    fn renderbuffer_storage_multisample(
        &mut self,
        renderbuffer: NativeHandle,
        samples: i32,
        internal_format: u32,
        width: i32,
        height: i32,
    ) {
        self.calls.push(GlCall::RenderbufferStorage { renderbuffer, samples, internal_format, width, height });
    }

    fn delete_renderbuffer(&mut self, renderbuffer: NativeHandle) {
        self.release(NativeObjectKind::Renderbuffer, renderbuffer);
    }

    // ─── Framebuffers ────────────────────────────────────────────────────────

    fn create_framebuffer(&mut self) -> Result<NativeHandle, String> {
        Ok(self.allocate(NativeObjectKind::Framebuffer))
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: NativeHandle) {
        self.calls.push(GlCall::BindFramebuffer { target, framebuffer });
    }

    fn framebuffer_texture_2d(&mut self, attachment: u32, texture_target: u32, texture: NativeHandle) {
        self.calls.push(GlCall::FramebufferTexture2d { attachment, texture_target, texture });
    }

    fn framebuffer_renderbuffer(&mut self, attachment: u32, renderbuffer: NativeHandle) {
        self.calls.push(GlCall::FramebufferRenderbuffer { attachment, renderbuffer });
    }

    fn draw_buffers(&mut self, buffers: &[u32]) {
        self.calls.push(GlCall::DrawBuffers(buffers.to_vec()));
    }

    fn read_buffer(&mut self, buffer: u32) {
        self.calls.push(GlCall::ReadBuffer(buffer));
    }

    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32) {
        self.calls.push(GlCall::BlitFramebuffer { src, dst, mask, filter });
    }

    fn clear_buffer_f32(&mut self, buffer: u32, draw_buffer: u32, values: [f32; 4]) {
        self.calls.push(GlCall::ClearBufferF32 { buffer, draw_buffer, values });
    }

    fn clear_buffer_i32(&mut self, buffer: u32, draw_buffer: u32, values: [i32; 4]) {
        self.calls.push(GlCall::ClearBufferI32 { buffer, draw_buffer, values });
    }

    fn clear_buffer_u32(&mut self, buffer: u32, draw_buffer: u32, values: [u32; 4]) {
        self.calls.push(GlCall::ClearBufferU32 { buffer, draw_buffer, values });
    }

    fn clear_buffer_depth_stencil(&mut self, depth: f32, stencil: i32) {
        self.calls.push(GlCall::ClearBufferDepthStencil { depth, stencil });
    }

    fn delete_framebuffer(&mut self, framebuffer: NativeHandle) {
        self.release(NativeObjectKind::Framebuffer, framebuffer);
    }

    // ─── Vertex Arrays ───────────────────────────────────────────────────────

    fn create_vertex_array(&mut self) -> Result<NativeHandle, String> {
        Ok(self.allocate(NativeObjectKind::VertexArray))
    }

    fn bind_vertex_array(&mut self, vertex_array: NativeHandle) {
        self.calls.push(GlCall::BindVertexArray(vertex_array));
    }

    fn vertex_attrib_pointer(&mut self, location: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32) {
        self.calls.push(GlCall::VertexAttribPointer { location, size, ty, normalized, stride, offset });
    }

    fn vertex_attrib_i_pointer(&mut self, location: u32, size: i32, ty: u32, stride: i32, offset: i32) {
        self.calls.push(GlCall::VertexAttribIPointer { location, size, ty, stride, offset });
    }

    fn vertex_attrib_divisor(&mut self, location: u32, divisor: u32) {
        self.calls.push(GlCall::VertexAttribDivisor { location, divisor });
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        self.calls.push(GlCall::EnableVertexAttribArray(location));
    }

    fn delete_vertex_array(&mut self, vertex_array: NativeHandle) {
        self.release(NativeObjectKind::VertexArray, vertex_array);
    }

    // ─── Samplers ────────────────────────────────────────────────────────────

    fn create_sampler(&mut self) -> Result<NativeHandle, String> {
        Ok(self.allocate(NativeObjectKind::Sampler))
    }

    fn sampler_parameter_i32(&mut self, sampler: NativeHandle, parameter: u32, value: i32) {
        self.calls.push(GlCall::SamplerParameterI32 { sampler, parameter, value });
    }

    fn sampler_parameter_f32(&mut self, sampler: NativeHandle, parameter: u32, value: f32) {
        self.calls.push(GlCall::SamplerParameterF32 { sampler, parameter, value });
    }

    fn sampler_parameter_f32_slice(&mut self, sampler: NativeHandle, parameter: u32, values: &[f32]) {
        self.calls.push(GlCall::SamplerParameterF32Slice { sampler, parameter, values: values.to_vec() });
    }

    fn bind_sampler(&mut self, unit: u32, sampler: NativeHandle) {
        self.calls.push(GlCall::BindSampler { unit, sampler });
    }

    fn delete_sampler(&mut self, sampler: NativeHandle) {
        self.release(NativeObjectKind::Sampler, sampler);
    }

    // ─── Shaders & Programs ──────────────────────────────────────────────────

    fn create_shader(&mut self, stage: u32) -> Result<NativeHandle, String> {
        let name = self.allocate(NativeObjectKind::Shader);
        self.shaders.insert(
            name,
            ShaderRecord { stage, source: String::new(), compiled: false, log: String::new() },
        );
        Ok(name)
    }

    fn shader_source(&mut self, shader: NativeHandle, source: &str) {
        if let Some(record) = self.shaders.get_mut(&shader) {
            record.source = source.to_string();
        }
        self.calls.push(GlCall::ShaderSource(shader));
    }

    fn compile_shader(&mut self, shader: NativeHandle) {
        if let Some(record) = self.shaders.get_mut(&shader) {
            match error_directive_line(&record.source) {
                Some(line) => {
                    record.compiled = false;
                    record.log = format!("0:{line}(1): error: #error directive encountered");
                }
                None => {
                    record.compiled = true;
                    record.log.clear();
                }
            }
        }
        self.calls.push(GlCall::CompileShader(shader));
    }

    fn shader_compile_status(&mut self, shader: NativeHandle) -> bool {
        self.shaders.get(&shader).is_some_and(|record| record.compiled)
    }

    fn shader_info_log(&mut self, shader: NativeHandle) -> String {
        self.shaders.get(&shader).map(|record| record.log.clone()).unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: NativeHandle) {
        self.shaders.remove(&shader);
        self.release(NativeObjectKind::Shader, shader);
    }

    fn create_program(&mut self) -> Result<NativeHandle, String> {
        let name = self.allocate(NativeObjectKind::Program);
        self.programs.insert(name, ProgramRecord::default());
        Ok(name)
    }

    fn attach_shader(&mut self, program: NativeHandle, shader: NativeHandle) {
        if let Some(record) = self.programs.get_mut(&program) {
            record.shaders.push(shader);
        }
        self.calls.push(GlCall::AttachShader { program, shader });
    }

    fn link_program(&mut self, program: NativeHandle) {
        self.calls.push(GlCall::LinkProgram(program));

        let Some(record) = self.programs.get(&program) else {
            return;
        };
        let attached: Vec<(u32, &str, bool)> = record
            .shaders
            .iter()
            .filter_map(|name| self.shaders.get(name))
            .map(|shader| (shader.stage, shader.source.as_str(), shader.compiled))
            .collect();

        let outcome = if let Some(log) = &self.link_error {
            Err(log.clone())
        } else if attached.iter().any(|(_, _, compiled)| !compiled) {
            Err("error: attached shader is not compiled".to_string())
        } else {
            let sources: Vec<(u32, &str)> = attached.iter().map(|(stage, source, _)| (*stage, *source)).collect();
            Ok(scan_sources(&sources))
        };

        if let Some(record) = self.programs.get_mut(&program) {
            match outcome {
                Ok(reflection) => {
                    record.linked = true;
                    record.log.clear();
                    record.reflection = reflection;
                }
                Err(log) => {
                    record.linked = false;
                    record.log = log;
                }
            }
        }
    }

    fn program_link_status(&mut self, program: NativeHandle) -> bool {
        self.programs.get(&program).is_some_and(|record| record.linked)
    }

    fn program_info_log(&mut self, program: NativeHandle) -> String {
        self.programs.get(&program).map(|record| record.log.clone()).unwrap_or_default()
    }

    fn use_program(&mut self, program: NativeHandle) {
        self.calls.push(GlCall::UseProgram(program));
    }

    fn delete_program(&mut self, program: NativeHandle) {
        self.programs.remove(&program);
        self.release(NativeObjectKind::Program, program);
    }

    // ── Reflection ──

    fn get_program_parameter_i32(&mut self, program: NativeHandle, parameter: u32) -> i32 {
        let Some(reflection) = self.reflection(program) else {
            return 0;
        };
        match parameter {
            gl::ACTIVE_ATTRIBUTES => reflection.attributes.len() as i32,
            gl::ACTIVE_UNIFORMS => reflection.uniforms.len() as i32,
            gl::ACTIVE_UNIFORM_BLOCKS => reflection.uniform_blocks.len() as i32,
            _ => 0,
        }
    }

    fn get_active_attribute_name(&mut self, program: NativeHandle, index: u32) -> Option<String> {
        let reflection = self.reflection(program)?;
        reflection.attributes.get(index as usize).map(|(name, _)| name.clone())
    }

    fn get_attrib_location(&mut self, program: NativeHandle, name: &str) -> i32 {
        self.reflection(program)
            .and_then(|r| r.attributes.iter().find(|(n, _)| names_match(n, name)))
            .map_or(-1, |(_, location)| *location)
    }

    fn get_active_uniform_name(&mut self, program: NativeHandle, index: u32) -> Option<String> {
        let reflection = self.reflection(program)?;
        reflection.uniforms.get(index as usize).cloned()
    }

    fn get_uniform_location(&mut self, program: NativeHandle, name: &str) -> i32 {
        self.reflection(program)
            .and_then(|r| r.uniforms.iter().position(|n| names_match(n, name)))
            .map_or(-1, |index| index as i32)
    }

    fn get_active_uniform_block_name(&mut self, program: NativeHandle, index: u32) -> String {
        self.reflection(program)
            .and_then(|r| r.uniform_blocks.get(index as usize))
            .map(|(name, _)| name.clone())
            .unwrap_or_default()
    }

    fn get_active_uniform_block_size(&mut self, program: NativeHandle, index: u32) -> i32 {
        self.reflection(program)
            .and_then(|r| r.uniform_blocks.get(index as usize))
            .map_or(0, |(_, size)| *size)
    }

    fn uniform_block_binding(&mut self, program: NativeHandle, index: u32, binding: u32) {
        self.calls.push(GlCall::UniformBlockBinding { program, index, binding });
    }

    fn uniform_1_i32(&mut self, location: i32, value: i32) {
        self.calls.push(GlCall::Uniform1i { location, value });
    }

    // ─── Fixed-Function State ────────────────────────────────────────────────

    fn cull_face(&mut self, face: u32) {
        self.calls.push(GlCall::CullFace(face));
    }

    fn front_face(&mut self, winding: u32) {
        self.calls.push(GlCall::FrontFace(winding));
    }

    fn line_width(&mut self, width: f32) {
        self.calls.push(GlCall::LineWidth(width));
    }

    fn depth_mask(&mut self, write: bool) {
        self.calls.push(GlCall::DepthMask(write));
    }

    fn depth_func(&mut self, func: u32) {
        self.calls.push(GlCall::DepthFunc(func));
    }

    fn stencil_mask_separate(&mut self, face: u32, mask: u32) {
        self.calls.push(GlCall::StencilMaskSeparate { face, mask });
    }

    fn stencil_func_separate(&mut self, face: u32, func: u32, reference: i32, mask: u32) {
        self.calls.push(GlCall::StencilFuncSeparate { face, func, reference, mask });
    }

    fn stencil_op_separate(&mut self, face: u32, fail: u32, depth_fail: u32, pass: u32) {
        self.calls.push(GlCall::StencilOpSeparate { face, fail, depth_fail, pass });
    }

    fn blend_func_separate(&mut self, src_color: u32, dst_color: u32, src_alpha: u32, dst_alpha: u32) {
        self.calls.push(GlCall::BlendFuncSeparate { src_color, dst_color, src_alpha, dst_alpha });
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.calls.push(GlCall::PolygonOffset { factor, units });
    }

    fn color_mask_indexed(&mut self, index: u32, mask: [bool; 4]) {
        self.calls.push(GlCall::ColorMaskIndexed { index, mask });
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.calls.push(GlCall::Viewport { x, y, width, height });
    }

    // ─── Draw ────────────────────────────────────────────────────────────────

    fn draw_arrays_instanced(&mut self, mode: u32, first: i32, count: i32, instances: i32) {
        self.calls.push(GlCall::DrawArraysInstanced { mode, first, count, instances });
    }

    fn draw_elements_instanced(&mut self, mode: u32, count: i32, index_type: u32, offset: i32, instances: i32) {
        self.calls.push(GlCall::DrawElementsInstanced { mode, count, index_type, offset, instances });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "#version 330 core
layout (location = 0) in vec3 in_vertex;
layout (location = 2) in vec2 in_uv;
layout (std140) uniform Common {
    mat4 mvp;
    vec4 color;
};
void main() { gl_Position = mvp * vec4(in_vertex, 1.0); }
";

    const FRAGMENT: &str = "#version 330 core
uniform sampler2D Texture;
out vec4 out_color;
void main() { out_color = texture(Texture, vec2(0.0)); }
";

    fn linked_program(backend: &mut RecordingBackend) -> NativeHandle {
        let vs = backend.create_shader(gl::VERTEX_SHADER).unwrap();
        backend.shader_source(vs, VERTEX);
        backend.compile_shader(vs);
        let fs = backend.create_shader(gl::FRAGMENT_SHADER).unwrap();
        backend.shader_source(fs, FRAGMENT);
        backend.compile_shader(fs);
        let program = backend.create_program().unwrap();
        backend.attach_shader(program, vs);
        backend.attach_shader(program, fs);
        backend.link_program(program);
        program
    }

    #[test]
    fn test_names_are_unique_and_tracked() {
        let mut backend = RecordingBackend::new();
        let a = backend.create_buffer().unwrap();
        let b = backend.create_sampler().unwrap();
        assert_ne!(a, b);
        assert_eq!(backend.live_count(NativeObjectKind::Buffer), 1);

        backend.delete_buffer(a);
        assert!(!backend.is_live(a));
        assert!(backend.is_live(b));
        assert_eq!(backend.deleted(NativeObjectKind::Buffer), 1);
    }

    #[test]
    fn test_error_directive_fails_compilation() {
        let mut backend = RecordingBackend::new();
        let shader = backend.create_shader(gl::FRAGMENT_SHADER).unwrap();
        backend.shader_source(shader, "#version 330 core\n#error broken\n");
        backend.compile_shader(shader);
        assert!(!backend.shader_compile_status(shader));
        assert!(backend.shader_info_log(shader).starts_with("0:2(1)"));
    }

    #[test]
    fn test_reflection_scans_attached_sources() {
        let mut backend = RecordingBackend::new();
        let program = linked_program(&mut backend);
        assert!(backend.program_link_status(program));

        assert_eq!(backend.get_program_parameter_i32(program, gl::ACTIVE_ATTRIBUTES), 2);
        assert_eq!(backend.get_attrib_location(program, "in_uv"), 2);
        assert_eq!(backend.get_uniform_location(program, "Texture"), 0);
        assert_eq!(backend.get_uniform_location(program, "missing"), -1);
        assert_eq!(backend.get_active_uniform_block_name(program, 0), "Common");
        assert_eq!(backend.get_active_uniform_block_size(program, 0), 32);
    }

    #[test]
    fn test_injected_link_error() {
        let mut backend = RecordingBackend::new();
        backend.set_link_error(Some("too many varyings".to_string()));
        let program = linked_program(&mut backend);
        assert!(!backend.program_link_status(program));
        assert_eq!(backend.program_info_log(program), "too many varyings");
    }
}
