//! Composite Lifecycle Manager
//!
//! Caller-owned objects (buffers, images, pipelines) hold counted references
//! into the Resource Caches. Releasing one cascades:
//!
//! ```text
//! Pipeline ──┬─ buffer-binding set
//!            ├─ image-binding set ── sampler (one per slot)
//!            ├─ global-state block
//!            ├─ render-target set
//!            ├─ vertex-input set
//!            └─ program ──────────── vertex shader, fragment shader
//!
//! Image ────── own render-target set (non-layered images only)
//! Buffer ───── nothing
//! ```
//!
//! Every cached value implements [`NativeObject`], which destroys its native
//! object and reports the cache entries it referenced. Those are released in
//! turn, so a shared sampler or shader only dies with its last user.

use std::hash::Hash;

use slotmap::Key;
use smallvec::SmallVec;

use crate::backend::GlBackend;
use crate::binder::StateBinder;
use crate::builders::{
    BufferBindingTable, Framebuffer, GlobalSettings, ImageBindingTable, Program, Sampler, Shader, VertexArray,
};
use crate::cache::ResourceCache;
use crate::context::Context;
use crate::ids::{
    BufferBindingsId, BufferId, FramebufferId, GlobalSettingsId, ImageBindingsId, ImageId, PipelineId, ProgramId,
    SamplerId, ShaderId, VertexArrayId,
};

/// Cache entries a destroyed object held a use of.
#[derive(Debug)]
pub enum Dependents {
    None,
    Samplers(SmallVec<[SamplerId; 8]>),
    Shaders([ShaderId; 2]),
}

/// Native teardown of one cached value.
pub trait NativeObject<Id> {
    /// Destroys the native object behind `self`, cached under `id`.
    fn destroy<B: GlBackend>(self, id: Id, gl: &mut B, binder: &mut StateBinder) -> Dependents;
}

impl NativeObject<FramebufferId> for Framebuffer {
    fn destroy<B: GlBackend>(self, _id: FramebufferId, gl: &mut B, binder: &mut StateBinder) -> Dependents {
        binder.forget_framebuffer(self.handle);
        gl.delete_framebuffer(self.handle);
        Dependents::None
    }
}

impl NativeObject<VertexArrayId> for VertexArray {
    fn destroy<B: GlBackend>(self, _id: VertexArrayId, gl: &mut B, binder: &mut StateBinder) -> Dependents {
        binder.forget_vertex_array(self.handle);
        gl.delete_vertex_array(self.handle);
        Dependents::None
    }
}

impl NativeObject<SamplerId> for Sampler {
    fn destroy<B: GlBackend>(self, _id: SamplerId, gl: &mut B, _binder: &mut StateBinder) -> Dependents {
        gl.delete_sampler(self.handle);
        Dependents::None
    }
}

impl NativeObject<BufferBindingsId> for BufferBindingTable {
    fn destroy<B: GlBackend>(self, id: BufferBindingsId, _gl: &mut B, binder: &mut StateBinder) -> Dependents {
        binder.forget_buffer_bindings(id);
        Dependents::None
    }
}

impl NativeObject<ImageBindingsId> for ImageBindingTable {
    fn destroy<B: GlBackend>(self, id: ImageBindingsId, _gl: &mut B, binder: &mut StateBinder) -> Dependents {
        binder.forget_image_bindings(id);
        Dependents::Samplers(self.samplers)
    }
}

impl NativeObject<GlobalSettingsId> for GlobalSettings {
    fn destroy<B: GlBackend>(self, id: GlobalSettingsId, _gl: &mut B, binder: &mut StateBinder) -> Dependents {
        binder.forget_global_settings(id);
        Dependents::None
    }
}

impl NativeObject<ShaderId> for Shader {
    fn destroy<B: GlBackend>(self, _id: ShaderId, gl: &mut B, _binder: &mut StateBinder) -> Dependents {
        gl.delete_shader(self.handle);
        Dependents::None
    }
}

impl NativeObject<ProgramId> for Program {
    fn destroy<B: GlBackend>(self, _id: ProgramId, gl: &mut B, binder: &mut StateBinder) -> Dependents {
        binder.forget_program(self.handle);
        gl.delete_program(self.handle);
        Dependents::Shaders(self.shaders)
    }
}

/// Drops one use of `id`, destroying the native object at zero.
pub(crate) fn release_entry<Id, K, V, B>(
    cache: &mut ResourceCache<Id, K, V>,
    id: Id,
    gl: &mut B,
    binder: &mut StateBinder,
) -> Dependents
where
    Id: Key,
    K: Hash + Eq + Clone,
    V: NativeObject<Id>,
    B: GlBackend,
{
    match cache.release(id) {
        Some(value) => {
            log::debug!("Destroying {} entry", cache.label());
            value.destroy(id, gl, binder)
        }
        None => Dependents::None,
    }
}

// ─── Release Targets ─────────────────────────────────────────────────────────

/// Anything [`Context::release`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseTarget {
    Buffer(BufferId),
    Image(ImageId),
    Pipeline(PipelineId),
}

impl From<BufferId> for ReleaseTarget {
    fn from(id: BufferId) -> Self {
        Self::Buffer(id)
    }
}

impl From<ImageId> for ReleaseTarget {
    fn from(id: ImageId) -> Self {
        Self::Image(id)
    }
}

impl From<PipelineId> for ReleaseTarget {
    fn from(id: PipelineId) -> Self {
        Self::Pipeline(id)
    }
}

/// Cache references of a pipeline, complete or partially acquired.
#[derive(Debug, Default)]
pub(crate) struct PipelineParts {
    pub program: Option<ProgramId>,
    pub framebuffer: Option<FramebufferId>,
    pub vertex_array: Option<VertexArrayId>,
    pub buffer_bindings: Option<BufferBindingsId>,
    pub image_bindings: Option<ImageBindingsId>,
    pub global_settings: Option<GlobalSettingsId>,
}

impl<B: GlBackend> Context<B> {
    /// Releases a buffer, image or pipeline and everything only it kept alive.
    ///
    /// # Panics
    ///
    /// Panics if the object was already released.
    pub fn release(&mut self, target: impl Into<ReleaseTarget>) {
        match target.into() {
            ReleaseTarget::Buffer(id) => self.release_buffer(id),
            ReleaseTarget::Image(id) => self.release_image(id),
            ReleaseTarget::Pipeline(id) => self.release_pipeline(id),
        }
    }

    fn release_buffer(&mut self, id: BufferId) {
        let Some(buffer) = self.buffers.remove(id) else {
            panic!("released a buffer that is not live");
        };
        self.gl.delete_buffer(buffer.handle);
        log::debug!("Released buffer {}", buffer.handle);
    }

    fn release_image(&mut self, id: ImageId) {
        let Some(image) = self.images.remove(id) else {
            panic!("released an image that is not live");
        };
        if let Some(framebuffer) = image.framebuffer {
            release_entry(&mut self.caches.framebuffers, framebuffer, &mut self.gl, &mut self.binder);
        }
        if image.renderbuffer {
            self.gl.delete_renderbuffer(image.handle);
        } else {
            self.gl.delete_texture(image.handle);
        }
        log::debug!("Released image {}", image.handle);
    }

    fn release_pipeline(&mut self, id: PipelineId) {
        let Some(pipeline) = self.pipelines.remove(id) else {
            panic!("released a pipeline that is not live");
        };
        self.release_parts(pipeline.parts());
        log::debug!("Released pipeline");
    }

    /// Releases whatever `parts` holds, cascading into samplers and shaders.
    pub(crate) fn release_parts(&mut self, parts: PipelineParts) {
        let (gl, binder, caches) = (&mut self.gl, &mut self.binder, &mut self.caches);
        let mut dependents: SmallVec<[Dependents; 2]> = SmallVec::new();

        if let Some(id) = parts.buffer_bindings {
            release_entry(&mut caches.buffer_bindings, id, gl, binder);
        }
        if let Some(id) = parts.image_bindings {
            dependents.push(release_entry(&mut caches.image_bindings, id, gl, binder));
        }
        if let Some(id) = parts.global_settings {
            release_entry(&mut caches.global_settings, id, gl, binder);
        }
        if let Some(id) = parts.framebuffer {
            release_entry(&mut caches.framebuffers, id, gl, binder);
        }
        if let Some(id) = parts.vertex_array {
            release_entry(&mut caches.vertex_arrays, id, gl, binder);
        }
        if let Some(id) = parts.program {
            dependents.push(release_entry(&mut caches.programs, id, gl, binder));
        }

        for dependent in dependents {
            match dependent {
                Dependents::None => {}
                Dependents::Samplers(samplers) => {
                    for id in samplers {
                        release_entry(&mut caches.samplers, id, gl, binder);
                    }
                }
                Dependents::Shaders(shaders) => {
                    for id in shaders {
                        release_entry(&mut caches.shaders, id, gl, binder);
                    }
                }
            }
        }
    }
}
