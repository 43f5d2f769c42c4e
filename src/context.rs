//! Rendering Context
//!
//! [`Context`] owns one native backend together with everything scoped to
//! it: the caller-owned buffers, images and pipelines, one Resource Cache
//! per derived-object category, and the Active-State Binder.
//!
//! # Lifecycle
//!
//! ```text
//! Context::new(backend, settings)
//!  ├─ buffer / image / pipeline     → handles (slotmap keys)
//!  ├─ render / clear_image / blit   → native work through the binder
//!  └─ release(handle)               → cascading teardown
//! ```
//!
//! A context is single-threaded: the native driver context it wraps is bound
//! to one thread, and nothing here is `Sync`.

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::backend::{GlBackend, gl};
use crate::binder::StateBinder;
use crate::builders::{
    BufferBindingsCache, FramebufferCache, GlobalSettingsCache, ImageBindingsCache, ProgramCache, SamplerCache,
    ShaderCache, VertexArrayCache,
};
use crate::cache::ResourceCache;
use crate::errors::{GlError, Result};
use crate::ids::{BufferId, ImageId, PipelineId};
use crate::resources::buffer::Buffer;
use crate::resources::image::Image;
use crate::resources::pipeline::Pipeline;
use crate::settings::ContextSettings;

/// Every Resource Cache of a context.
pub struct ResourceCaches {
    pub framebuffers: FramebufferCache,
    pub vertex_arrays: VertexArrayCache,
    pub samplers: SamplerCache,
    pub buffer_bindings: BufferBindingsCache,
    pub image_bindings: ImageBindingsCache,
    pub global_settings: GlobalSettingsCache,
    pub shaders: ShaderCache,
    pub programs: ProgramCache,
}

impl ResourceCaches {
    fn new() -> Self {
        Self {
            framebuffers: ResourceCache::new("framebuffer"),
            vertex_arrays: ResourceCache::new("vertex array"),
            samplers: ResourceCache::new("sampler"),
            buffer_bindings: ResourceCache::new("buffer bindings"),
            image_bindings: ResourceCache::new("image bindings"),
            global_settings: ResourceCache::new("global settings"),
            shaders: ResourceCache::new("shader"),
            programs: ResourceCache::new("program"),
        }
    }

    /// Live entries across all categories.
    #[must_use]
    pub fn total_entries(&self) -> usize {
        self.framebuffers.len()
            + self.vertex_arrays.len()
            + self.samplers.len()
            + self.buffer_bindings.len()
            + self.image_bindings.len()
            + self.global_settings.len()
            + self.shaders.len()
            + self.programs.len()
    }
}

/// Driver identification, queried once at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
    pub max_texture_units: u32,
}

/// A rendering context over one native backend.
pub struct Context<B: GlBackend> {
    pub(crate) gl: B,
    pub(crate) settings: ContextSettings,
    pub(crate) info: ContextInfo,
    /// Texture unit used for uploads, never handed to an image-binding set.
    pub(crate) default_texture_unit: u32,
    pub(crate) includes: FxHashMap<String, String>,
    pub(crate) buffers: SlotMap<BufferId, Buffer>,
    pub(crate) images: SlotMap<ImageId, Image>,
    pub(crate) pipelines: SlotMap<PipelineId, Pipeline>,
    pub(crate) caches: ResourceCaches,
    pub(crate) binder: StateBinder,
}

impl<B: GlBackend> Context<B> {
    /// Wraps `gl`, which must be current on the calling thread.
    pub fn new(mut gl: B, settings: ContextSettings) -> Result<Self> {
        let units = gl.get_parameter_i32(gl::MAX_TEXTURE_IMAGE_UNITS);
        let max_texture_units = u32::try_from(units)
            .ok()
            .filter(|&units| units > 0)
            .ok_or_else(|| GlError::invalid(format!("driver reports {units} texture units")))?;
        settings.validate(max_texture_units)?;

        let info = ContextInfo {
            vendor: gl.get_string(gl::VENDOR),
            renderer: gl.get_string(gl::RENDERER),
            version: gl.get_string(gl::VERSION),
            max_texture_units,
        };

        for (enabled, capability) in [
            (settings.seamless_cubemaps, gl::TEXTURE_CUBE_MAP_SEAMLESS),
            (settings.program_point_size, gl::PROGRAM_POINT_SIZE),
            (settings.framebuffer_srgb, gl::FRAMEBUFFER_SRGB),
        ] {
            if enabled {
                gl.enable(capability);
            }
        }

        log::info!("GL context: {} ({}), {}", info.renderer, info.vendor, info.version);
        log::info!("Texture units: {max_texture_units}, upload unit: {}", max_texture_units - 1);

        Ok(Self {
            gl,
            default_texture_unit: max_texture_units - 1,
            settings,
            info,
            includes: FxHashMap::default(),
            buffers: SlotMap::with_key(),
            images: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            caches: ResourceCaches::new(),
            binder: StateBinder::new(),
        })
    }

    /// Registers `source` under `name` for `#include "name"` directives.
    ///
    /// Only affects pipelines created afterwards.
    pub fn set_include(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.includes.insert(name.into(), source.into());
    }

    #[inline]
    #[must_use]
    pub fn info(&self) -> &ContextInfo {
        &self.info
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    /// Read-only view of every Resource Cache.
    #[inline]
    #[must_use]
    pub fn caches(&self) -> &ResourceCaches {
        &self.caches
    }

    #[inline]
    #[must_use]
    pub fn binder(&self) -> &StateBinder {
        &self.binder
    }

    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.gl
    }

    /// Direct backend access. Native state changed through it is not seen by
    /// the binder.
    #[inline]
    #[must_use]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.gl
    }

    /// Live buffers, images and pipelines.
    #[must_use]
    pub fn live_objects(&self) -> (usize, usize, usize) {
        (self.buffers.len(), self.images.len(), self.pipelines.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GlCall, RecordingBackend};

    #[test]
    fn test_new_reserves_last_unit_and_enables_capabilities() {
        let ctx = Context::new(RecordingBackend::new(), ContextSettings::default()).unwrap();
        assert_eq!(ctx.info().max_texture_units, 32);
        assert_eq!(ctx.default_texture_unit, 31);

        let calls = ctx.backend().calls();
        assert!(calls.contains(&GlCall::Enable(gl::FRAMEBUFFER_SRGB)));
        assert!(calls.contains(&GlCall::Enable(gl::TEXTURE_CUBE_MAP_SEAMLESS)));
        assert_eq!(ctx.caches().total_entries(), 0);
    }

    #[test]
    fn test_new_rejects_sampler_limit_above_units() {
        let backend = RecordingBackend::new().with_texture_units(8);
        assert!(matches!(
            Context::new(backend, ContextSettings::default()),
            Err(GlError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_disabled_toggles_are_not_enabled() {
        let settings = ContextSettings { framebuffer_srgb: false, ..ContextSettings::default() };
        let ctx = Context::new(RecordingBackend::new(), settings).unwrap();
        assert!(!ctx.backend().calls().contains(&GlCall::Enable(gl::FRAMEBUFFER_SRGB)));
    }
}
