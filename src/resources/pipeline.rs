//! Pipelines
//!
//! A [`Pipeline`] is a drawable unit: one use of each of six cached objects
//! plus its own draw parameters.
//!
//! ```text
//! PipelineDescriptor
//!   │ validate + canonicalize (no native calls)
//!   ▼
//! program ─▶ reflection check ─▶ layout ─▶ render targets ─▶ vertex input
//!        ─▶ buffer bindings ─▶ image bindings ─▶ global state
//! ```
//!
//! Every descriptor error is reported before the first native call. A
//! failure after that point (compile, link, reflection mismatch, native
//! creation) releases whatever was already acquired, so caches end up as
//! they were before the call.

use rustc_hash::FxHashSet;

use crate::backend::{GlBackend, gl};
use crate::builders::GlobalSettings;
use crate::builders::bindings::{binding_keys, build_buffer_bindings, build_image_bindings};
use crate::builders::framebuffer::{build_framebuffer, framebuffer_key};
use crate::builders::includes::resolve_includes;
use crate::builders::program::acquire_program;
use crate::builders::vertex_array::{build_vertex_array, vertex_array_key};
use crate::cache::keys::{
    BufferBindingsKey, FramebufferKey, ImageBindingsKey, ProgramKey, ShaderSource, VertexArrayKey,
};
use crate::context::Context;
use crate::errors::{GlError, Result};
use crate::formats::VertexFormat;
use crate::ids::{
    BufferBindingsId, BufferId, FramebufferId, GlobalSettingsId, ImageBindingsId, ImageId, PipelineId, ProgramId,
    VertexArrayId,
};
use crate::lifecycle::PipelineParts;
use crate::resources::state::{
    BlendState, CullFace, DepthState, FrontFace, IndexFormat, PolygonOffset, SamplerParams, StencilState, StepMode,
    Topology, Viewport,
};

// ─── Descriptor ──────────────────────────────────────────────────────────────

/// Binds a uniform or uniform block, by name, to a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutBinding {
    pub name: String,
    pub binding: u32,
}

impl LayoutBinding {
    #[must_use]
    pub fn new(name: impl Into<String>, binding: u32) -> Self {
        Self { name: name.into(), binding }
    }
}

/// One entry of a pipeline's resource list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResourceBinding {
    /// A uniform-buffer range. `size: None` extends to the end of the buffer.
    UniformBuffer { binding: u32, buffer: BufferId, offset: u32, size: Option<u32> },
    /// A sampled image with its sampler parameters.
    SampledImage { binding: u32, image: ImageId, sampler: SamplerParams },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub offset: u32,
    pub format: VertexFormat,
}

/// Attributes sourced from one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub buffer: BufferId,
    pub stride: u32,
    pub step_mode: StepMode,
    pub attributes: Vec<VertexAttribute>,
}

/// Everything [`Context::pipeline`] builds a pipeline from.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDescriptor {
    pub vertex_shader: String,
    pub fragment_shader: String,
    pub layout: Vec<LayoutBinding>,
    pub resources: Vec<ResourceBinding>,
    /// Color images in attachment order, plus at most one depth/stencil image.
    pub framebuffer: Vec<ImageId>,
    pub vertex_buffers: Vec<VertexBufferLayout>,
    pub index_buffer: Option<BufferId>,
    pub index_format: IndexFormat,
    pub primitive_restart: bool,
    pub depth: Option<DepthState>,
    pub stencil: Option<StencilState>,
    pub blend: Option<BlendState>,
    pub polygon_offset: Option<PolygonOffset>,
    /// 4 bits per color attachment, RGBA from the low bit.
    pub color_mask: u64,
    pub front_face: FrontFace,
    pub cull_face: CullFace,
    pub topology: Topology,
    pub line_width: f32,
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    /// Defaults to the size of the first attachment.
    pub viewport: Option<Viewport>,
}

impl Default for PipelineDescriptor {
    fn default() -> Self {
        Self {
            vertex_shader: String::new(),
            fragment_shader: String::new(),
            layout: Vec::new(),
            resources: Vec::new(),
            framebuffer: Vec::new(),
            vertex_buffers: Vec::new(),
            index_buffer: None,
            index_format: IndexFormat::Uint32,
            primitive_restart: true,
            depth: Some(DepthState::default()),
            stencil: None,
            blend: None,
            polygon_offset: None,
            color_mask: u64::MAX,
            front_face: FrontFace::Ccw,
            cull_face: CullFace::None,
            topology: Topology::Triangles,
            line_width: 1.0,
            vertex_count: 0,
            instance_count: 1,
            first_vertex: 0,
            viewport: None,
        }
    }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// A drawable unit. Draw parameters may be changed between renders through
/// the setters, which apply the same checks as pipeline creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pipeline {
    program: ProgramId,
    framebuffer: FramebufferId,
    vertex_array: VertexArrayId,
    buffer_bindings: BufferBindingsId,
    image_bindings: ImageBindingsId,
    global_settings: GlobalSettingsId,
    topology: Topology,
    vertex_count: u32,
    instance_count: u32,
    first_vertex: u32,
    viewport: Viewport,
    index_format: Option<IndexFormat>,
}

impl Pipeline {
    #[inline]
    #[must_use]
    pub fn program(&self) -> ProgramId {
        self.program
    }

    #[inline]
    #[must_use]
    pub fn framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }

    #[inline]
    #[must_use]
    pub fn vertex_array(&self) -> VertexArrayId {
        self.vertex_array
    }

    #[inline]
    #[must_use]
    pub fn buffer_bindings(&self) -> BufferBindingsId {
        self.buffer_bindings
    }

    #[inline]
    #[must_use]
    pub fn image_bindings(&self) -> ImageBindingsId {
        self.image_bindings
    }

    #[inline]
    #[must_use]
    pub fn global_settings(&self) -> GlobalSettingsId {
        self.global_settings
    }

    #[inline]
    #[must_use]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    #[must_use]
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    #[inline]
    #[must_use]
    pub fn first_vertex(&self) -> u32 {
        self.first_vertex
    }

    #[inline]
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Set when the pipeline draws indexed.
    #[inline]
    #[must_use]
    pub fn index_format(&self) -> Option<IndexFormat> {
        self.index_format
    }

    pub fn set_vertex_count(&mut self, vertex_count: u32) -> Result<()> {
        check_draw_range(vertex_count, self.instance_count, self.first_vertex, self.index_format)?;
        self.vertex_count = vertex_count;
        Ok(())
    }

    pub fn set_instance_count(&mut self, instance_count: u32) -> Result<()> {
        check_draw_range(self.vertex_count, instance_count, self.first_vertex, self.index_format)?;
        self.instance_count = instance_count;
        Ok(())
    }

    /// For indexed pipelines the index-buffer byte offset must also fit.
    pub fn set_first_vertex(&mut self, first_vertex: u32) -> Result<()> {
        check_draw_range(self.vertex_count, self.instance_count, first_vertex, self.index_format)?;
        self.first_vertex = first_vertex;
        Ok(())
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        check_viewport(viewport)?;
        self.viewport = viewport;
        Ok(())
    }

    pub(crate) fn parts(&self) -> PipelineParts {
        PipelineParts {
            program: Some(self.program),
            framebuffer: Some(self.framebuffer),
            vertex_array: Some(self.vertex_array),
            buffer_bindings: Some(self.buffer_bindings),
            image_bindings: Some(self.image_bindings),
            global_settings: Some(self.global_settings),
        }
    }
}

/// Canonical keys of a validated descriptor.
struct PipelineKeys {
    program: ProgramKey,
    framebuffer: FramebufferKey,
    vertex_array: VertexArrayKey,
    buffer_bindings: BufferBindingsKey,
    image_bindings: ImageBindingsKey,
    settings: GlobalSettings,
    viewport: Viewport,
}

/// Byte offset of `first_vertex` into an index buffer, if it fits the native range.
fn index_offset(first_vertex: u32, format: IndexFormat) -> Option<i32> {
    i32::try_from(i64::from(first_vertex) * i64::from(format.size())).ok()
}

fn check_draw_range(
    vertex_count: u32,
    instance_count: u32,
    first_vertex: u32,
    index_format: Option<IndexFormat>,
) -> Result<()> {
    let limit = i32::MAX as u32;
    if vertex_count > limit || instance_count > limit || first_vertex > limit {
        return Err(GlError::invalid("draw parameters exceed the native range"));
    }
    if let Some(format) = index_format
        && index_offset(first_vertex, format).is_none()
    {
        return Err(GlError::invalid(format!(
            "first vertex {first_vertex} overflows the {format:?} index buffer offset"
        )));
    }
    Ok(())
}

fn check_viewport(viewport: Viewport) -> Result<()> {
    if viewport.width <= 0 || viewport.height <= 0 {
        return Err(GlError::invalid(format!("invalid viewport {viewport:?}")));
    }
    Ok(())
}

fn check_draw_parameters(desc: &PipelineDescriptor) -> Result<()> {
    let index_format = desc.index_buffer.map(|_| desc.index_format);
    check_draw_range(desc.vertex_count, desc.instance_count, desc.first_vertex, index_format)?;
    if let Some(viewport) = desc.viewport {
        check_viewport(viewport)?;
    }
    Ok(())
}

impl<B: GlBackend> Context<B> {
    /// Validates `desc` and canonicalizes it. Issues no native calls.
    fn pipeline_keys(&self, desc: &PipelineDescriptor) -> Result<PipelineKeys> {
        check_draw_parameters(desc)?;

        let framebuffer = framebuffer_key(&self.images, &desc.framebuffer, self.settings.max_color_attachments)?;
        let vertex_array = vertex_array_key(&self.buffers, &desc.vertex_buffers, desc.index_buffer)?;
        let (buffer_bindings, image_bindings) =
            binding_keys(&self.buffers, &self.images, &desc.resources, &self.settings)?;

        let has_depth = framebuffer
            .depth_stencil_attachment
            .and_then(|id| self.images.get(id))
            .is_some_and(|image| matches!(image.format.info().buffer, gl::DEPTH | gl::DEPTH_STENCIL));
        let settings =
            GlobalSettings::from_descriptor(desc, framebuffer.color_attachments.len() as u32, has_depth)?;

        let viewport = match desc.viewport {
            Some(viewport) => viewport,
            None => desc
                .framebuffer
                .first()
                .and_then(|&id| self.images.get(id))
                .map(|image| image.viewport())
                .ok_or(GlError::InvalidHandle { kind: "image" })?,
        };

        let max_depth = self.settings.max_include_depth;
        let program = ProgramKey {
            vertex: ShaderSource::new(resolve_includes(&desc.vertex_shader, &self.includes, max_depth)?),
            fragment: ShaderSource::new(resolve_includes(&desc.fragment_shader, &self.includes, max_depth)?),
        };

        Ok(PipelineKeys { program, framebuffer, vertex_array, buffer_bindings, image_bindings, settings, viewport })
    }

    /// Creates a pipeline, sharing every cached object an earlier pipeline
    /// already materialized for the same configuration.
    pub fn pipeline(&mut self, desc: &PipelineDescriptor) -> Result<PipelineId> {
        let keys = self.pipeline_keys(desc)?;

        let mut parts = PipelineParts::default();
        match self.acquire_parts(desc, keys, &mut parts) {
            Ok(pipeline) => {
                let id = self.pipelines.insert(pipeline);
                log::debug!("Created pipeline ({} live)", self.pipelines.len());
                Ok(id)
            }
            Err(err) => {
                self.release_parts(parts);
                Err(err)
            }
        }
    }

    /// Acquires every part in order, recording each in `parts` as it lands.
    fn acquire_parts(
        &mut self,
        desc: &PipelineDescriptor,
        keys: PipelineKeys,
        parts: &mut PipelineParts,
    ) -> Result<Pipeline> {
        let program = acquire_program(
            &mut self.gl,
            &mut self.binder,
            &mut self.caches.shaders,
            &mut self.caches.programs,
            keys.program.clone(),
        )?;
        parts.program = Some(program);

        self.check_interface(program, desc, &keys)?;
        self.apply_layout(program, &desc.layout);

        let (gl, binder) = (&mut self.gl, &mut self.binder);
        let (images, buffers) = (&self.images, &self.buffers);
        let caches = &mut self.caches;

        let framebuffer =
            caches.framebuffers.get_or_create(keys.framebuffer, |key| build_framebuffer(gl, binder, images, key))?;
        parts.framebuffer = Some(framebuffer);

        let vertex_array =
            caches.vertex_arrays.get_or_create(keys.vertex_array, |key| build_vertex_array(gl, binder, buffers, key))?;
        parts.vertex_array = Some(vertex_array);

        let buffer_bindings =
            caches.buffer_bindings.get_or_create(keys.buffer_bindings, |key| build_buffer_bindings(buffers, key))?;
        parts.buffer_bindings = Some(buffer_bindings);

        let samplers = &mut caches.samplers;
        let image_bindings = caches
            .image_bindings
            .get_or_create(keys.image_bindings, |key| build_image_bindings(gl, binder, samplers, images, key))?;
        parts.image_bindings = Some(image_bindings);

        let global_settings =
            caches.global_settings.get_or_create(keys.settings, |settings| Ok::<_, GlError>(*settings))?;
        parts.global_settings = Some(global_settings);

        Ok(Pipeline {
            program,
            framebuffer,
            vertex_array,
            buffer_bindings,
            image_bindings,
            global_settings,
            topology: desc.topology,
            vertex_count: desc.vertex_count,
            instance_count: desc.instance_count,
            first_vertex: desc.first_vertex,
            viewport: keys.viewport,
            index_format: desc.index_buffer.map(|_| desc.index_format),
        })
    }

    /// Checks the descriptor against the linked program's interface.
    fn check_interface(&self, program: ProgramId, desc: &PipelineDescriptor, keys: &PipelineKeys) -> Result<()> {
        let reflection = &self.caches.programs.get(program).reflection;
        let fed: FxHashSet<u32> = keys.vertex_array.attributes.iter().map(|a| a.location).collect();

        for attribute in &reflection.attributes {
            if !fed.contains(&(attribute.location as u32)) {
                log::warn!("Pipeline rejected: attribute \"{}\" is not fed", attribute.name);
                return Err(GlError::invalid(format!(
                    "vertex attribute \"{}\" at location {} has no vertex buffer",
                    attribute.name, attribute.location
                )));
            }
        }

        for entry in &desc.layout {
            if reflection.uniform(&entry.name).is_some() {
                continue;
            }
            let Some(block) = reflection.uniform_block(&entry.name) else {
                log::warn!("Pipeline rejected: layout entry \"{}\" is not active", entry.name);
                return Err(GlError::invalid(format!(
                    "layout entry \"{}\" is neither an active uniform nor a uniform block",
                    entry.name
                )));
            };
            let bound = keys.buffer_bindings.bindings.iter().find(|b| b.binding == entry.binding);
            if let Some(bound) = bound
                && i64::from(bound.size) < i64::from(block.size)
            {
                log::warn!("Pipeline rejected: uniform block \"{}\" is larger than its buffer range", block.name);
                return Err(GlError::invalid(format!(
                    "uniform block \"{}\" needs {} bytes, binding {} provides {}",
                    block.name, block.size, entry.binding, bound.size
                )));
            }
        }
        Ok(())
    }

    /// Points samplers and uniform blocks at their binding slots.
    fn apply_layout(&mut self, program: ProgramId, layout: &[LayoutBinding]) {
        let program = self.caches.programs.get(program);
        self.binder.bind_program(&mut self.gl, program.handle);
        for entry in layout {
            if let Some(uniform) = program.reflection.uniform(&entry.name) {
                self.gl.uniform_1_i32(uniform.location, entry.binding as i32);
            } else if let Some(block) = program.reflection.uniform_block(&entry.name) {
                self.gl.uniform_block_binding(program.handle, block.index, entry.binding);
            }
        }
    }

    #[must_use]
    pub fn get_pipeline(&self, id: PipelineId) -> Option<&Pipeline> {
        self.pipelines.get(id)
    }

    /// Mutable access to a pipeline's draw parameters. The setters on
    /// [`Pipeline`] reject values that [`Context::pipeline`] would reject.
    #[must_use]
    pub fn get_pipeline_mut(&mut self, id: PipelineId) -> Option<&mut Pipeline> {
        self.pipelines.get_mut(id)
    }

    /// Makes the pipeline's state current and issues its draw.
    ///
    /// Every transition goes through the binder, so rendering the same
    /// pipeline twice in a row issues only the draw call the second time.
    pub fn render(&mut self, id: PipelineId) -> Result<()> {
        let pipeline = *self.pipelines.get(id).ok_or(GlError::InvalidHandle { kind: "pipeline" })?;
        let (gl, binder, caches) = (&mut self.gl, &mut self.binder, &self.caches);

        binder.set_viewport(gl, pipeline.viewport);
        binder.bind_global_settings(gl, pipeline.global_settings, caches.global_settings.get(pipeline.global_settings));
        binder.bind_framebuffer(gl, caches.framebuffers.get(pipeline.framebuffer).handle);
        binder.bind_program(gl, caches.programs.get(pipeline.program).handle);
        binder.bind_vertex_array(gl, caches.vertex_arrays.get(pipeline.vertex_array).handle);
        binder.bind_buffer_bindings(gl, pipeline.buffer_bindings, caches.buffer_bindings.get(pipeline.buffer_bindings));
        binder.bind_image_bindings(gl, pipeline.image_bindings, caches.image_bindings.get(pipeline.image_bindings));

        let out_of_range = || GlError::invalid("draw parameters exceed the native range");
        let mode = pipeline.topology.to_gl();
        let count = i32::try_from(pipeline.vertex_count).map_err(|_| out_of_range())?;
        let instances = i32::try_from(pipeline.instance_count).map_err(|_| out_of_range())?;
        match pipeline.index_format {
            Some(format) => {
                let offset = index_offset(pipeline.first_vertex, format).ok_or_else(out_of_range)?;
                gl.draw_elements_instanced(mode, count, format.to_gl(), offset, instances);
            }
            None => {
                let first = i32::try_from(pipeline.first_vertex).map_err(|_| out_of_range())?;
                gl.draw_arrays_instanced(mode, first, count, instances);
            }
        }
        Ok(())
    }
}
