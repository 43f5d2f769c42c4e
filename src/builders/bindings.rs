//! Buffer-binding sets and image-binding sets.
//!
//! Both are fixed-size tables indexed by binding slot. The table length is
//! one past the highest slot used; unused slots are `None` and are skipped
//! when the set is bound.
//!
//! An image-binding set owns one counted reference to a cached sampler per
//! populated slot. Those references are dropped when the set itself is
//! destroyed.

use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::backend::{GlBackend, NativeHandle};
use crate::binder::StateBinder;
use crate::builders::SamplerCache;
use crate::builders::sampler::build_sampler;
use crate::cache::keys::{BufferBindingKey, BufferBindingsKey, ImageBindingKey, ImageBindingsKey, SamplerKey};
use crate::errors::{GlError, Result};
use crate::ids::{BufferId, ImageId, SamplerId};
use crate::lifecycle::release_entry;
use crate::resources::buffer::Buffer;
use crate::resources::image::Image;
use crate::resources::pipeline::ResourceBinding;
use crate::settings::ContextSettings;

// ─── Tables ──────────────────────────────────────────────────────────────────

/// A uniform-buffer range in one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRange {
    pub buffer: NativeHandle,
    pub offset: i32,
    pub size: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferBindingTable {
    pub slots: SmallVec<[Option<BufferRange>; 8]>,
}

/// A sampled image in one texture unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    pub sampler: NativeHandle,
    pub target: u32,
    pub image: NativeHandle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageBindingTable {
    pub slots: SmallVec<[Option<TextureBinding>; 8]>,
    pub(crate) samplers: SmallVec<[SamplerId; 8]>,
}

impl ImageBindingTable {
    /// Sampler cache entries this set holds a use of, one per populated slot.
    #[must_use]
    pub fn samplers(&self) -> &[SamplerId] {
        &self.samplers
    }
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Splits a pipeline's resource list into the two binding-set keys.
pub(crate) fn binding_keys(
    buffers: &SlotMap<BufferId, Buffer>,
    images: &SlotMap<ImageId, Image>,
    resources: &[ResourceBinding],
    settings: &ContextSettings,
) -> Result<(BufferBindingsKey, ImageBindingsKey)> {
    let mut buffer_key = BufferBindingsKey::default();
    let mut image_key = ImageBindingsKey::default();
    let mut buffer_slots = FxHashSet::default();
    let mut image_slots = FxHashSet::default();

    for resource in resources {
        match *resource {
            ResourceBinding::UniformBuffer { binding, buffer, offset, size } => {
                if binding >= settings.max_uniform_buffer_bindings {
                    return Err(GlError::invalid(format!(
                        "uniform buffer binding {binding} exceeds the limit of {}",
                        settings.max_uniform_buffer_bindings
                    )));
                }
                if !buffer_slots.insert(binding) {
                    return Err(GlError::invalid(format!("uniform buffer binding {binding} is used twice")));
                }
                let target = buffers.get(buffer).ok_or(GlError::InvalidHandle { kind: "buffer" })?;
                if offset > target.size {
                    return Err(GlError::invalid(format!("uniform buffer offset {offset} is past the end of the buffer")));
                }
                let size = size.unwrap_or(target.size - offset);
                if size == 0 || u64::from(offset) + u64::from(size) > u64::from(target.size) {
                    return Err(GlError::invalid(format!("uniform buffer range at binding {binding} is out of bounds")));
                }
                buffer_key.bindings.push(BufferBindingKey { binding, buffer, offset, size });
            }
            ResourceBinding::SampledImage { binding, image, sampler } => {
                if binding >= settings.max_sampler_bindings {
                    return Err(GlError::invalid(format!(
                        "sampler binding {binding} exceeds the limit of {}",
                        settings.max_sampler_bindings
                    )));
                }
                if !image_slots.insert(binding) {
                    return Err(GlError::invalid(format!("sampler binding {binding} is used twice")));
                }
                let target = images.get(image).ok_or(GlError::InvalidHandle { kind: "image" })?;
                if target.renderbuffer {
                    return Err(GlError::invalid("renderbuffer images cannot be sampled"));
                }
                image_key.bindings.push(ImageBindingKey { binding, image, sampler: SamplerKey::from(&sampler) });
            }
        }
    }

    Ok((buffer_key, image_key))
}

// ─── Builders ────────────────────────────────────────────────────────────────

/// Resolves a buffer-binding key into native ranges. No native calls.
pub(crate) fn build_buffer_bindings(
    buffers: &SlotMap<BufferId, Buffer>,
    key: &BufferBindingsKey,
) -> Result<BufferBindingTable> {
    let count = key.bindings.iter().map(|b| b.binding as usize + 1).max().unwrap_or(0);
    let mut table = BufferBindingTable { slots: SmallVec::from_elem(None, count) };

    for binding in &key.bindings {
        let buffer = buffers.get(binding.buffer).ok_or(GlError::InvalidHandle { kind: "buffer" })?;
        table.slots[binding.binding as usize] = Some(BufferRange {
            buffer: buffer.handle,
            offset: binding.offset as i32,
            size: binding.size as i32,
        });
    }

    Ok(table)
}

/// Resolves an image-binding key, acquiring one sampler per slot.
///
/// On failure every sampler acquired so far is released again.
pub(crate) fn build_image_bindings<B: GlBackend>(
    gl: &mut B,
    binder: &mut StateBinder,
    samplers: &mut SamplerCache,
    images: &SlotMap<ImageId, Image>,
    key: &ImageBindingsKey,
) -> Result<ImageBindingTable> {
    let count = key.bindings.iter().map(|b| b.binding as usize + 1).max().unwrap_or(0);
    let mut table = ImageBindingTable { slots: SmallVec::from_elem(None, count), samplers: SmallVec::new() };

    for binding in &key.bindings {
        let slot = images
            .get(binding.image)
            .ok_or(GlError::InvalidHandle { kind: "image" })
            .and_then(|image| {
                let id = samplers.get_or_create(binding.sampler, |k| build_sampler(gl, k))?;
                Ok((id, image))
            });

        match slot {
            Ok((id, image)) => {
                table.samplers.push(id);
                table.slots[binding.binding as usize] = Some(TextureBinding {
                    sampler: samplers.get(id).handle,
                    target: image.target,
                    image: image.handle,
                });
            }
            Err(err) => {
                for id in table.samplers.drain(..) {
                    release_entry(samplers, id, gl, binder);
                }
                return Err(err);
            }
        }
    }

    Ok(table)
}
