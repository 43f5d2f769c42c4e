//! Canonical cache keys.
//!
//! A key captures exactly the fields that determine a derived object's
//! identity. Keys are order-sensitive: attachment order, attribute order and
//! binding order are all significant. Floats are stored as bit patterns so
//! the keys can derive `Eq` and `Hash`.
//!
//! The global-state block is its own key, see
//! [`GlobalSettings`](crate::builders::GlobalSettings).

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smallvec::SmallVec;
use xxhash_rust::xxh3::xxh3_128;

use crate::errors::ShaderStage;
use crate::formats::VertexFormat;
use crate::ids::{BufferId, ImageId};
use crate::resources::state::{CompareFunc, Filter, SamplerParams, Wrap};

// ─── Render-Target Sets ──────────────────────────────────────────────────────

/// Identity of a framebuffer: its attachments, in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FramebufferKey {
    pub color_attachments: SmallVec<[ImageId; 4]>,
    pub depth_stencil_attachment: Option<ImageId>,
}

// ─── Vertex-Input Sets ───────────────────────────────────────────────────────

/// One attribute fetch: where it reads from and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeKey {
    pub buffer: BufferId,
    pub location: u32,
    pub offset: u32,
    pub stride: u32,
    /// `0` per vertex, `1` per instance.
    pub divisor: u32,
    pub format: VertexFormat,
}

/// Identity of a vertex array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexArrayKey {
    pub index_buffer: Option<BufferId>,
    pub attributes: SmallVec<[VertexAttributeKey; 8]>,
}

// ─── Samplers ────────────────────────────────────────────────────────────────

/// Hashable mirror of [`SamplerParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerKey {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub min_lod_bits: u32,
    pub max_lod_bits: u32,
    pub lod_bias_bits: u32,
    pub wrap: [Wrap; 3],
    pub compare: Option<CompareFunc>,
    pub border_color_bits: [u32; 4],
}

impl From<&SamplerParams> for SamplerKey {
    fn from(p: &SamplerParams) -> Self {
        Self {
            min_filter: p.min_filter,
            mag_filter: p.mag_filter,
            min_lod_bits: p.min_lod.to_bits(),
            max_lod_bits: p.max_lod.to_bits(),
            lod_bias_bits: p.lod_bias.to_bits(),
            wrap: p.wrap,
            compare: p.compare,
            border_color_bits: p.border_color.map(f32::to_bits),
        }
    }
}

impl SamplerKey {
    #[inline]
    #[must_use]
    pub fn min_lod(&self) -> f32 {
        f32::from_bits(self.min_lod_bits)
    }

    #[inline]
    #[must_use]
    pub fn max_lod(&self) -> f32 {
        f32::from_bits(self.max_lod_bits)
    }

    #[inline]
    #[must_use]
    pub fn lod_bias(&self) -> f32 {
        f32::from_bits(self.lod_bias_bits)
    }

    #[inline]
    #[must_use]
    pub fn border_color(&self) -> [f32; 4] {
        self.border_color_bits.map(f32::from_bits)
    }
}

// ─── Binding Sets ────────────────────────────────────────────────────────────

/// One uniform-buffer range bound to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferBindingKey {
    pub binding: u32,
    pub buffer: BufferId,
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferBindingsKey {
    pub bindings: SmallVec<[BufferBindingKey; 8]>,
}

/// One sampled image bound to a texture unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageBindingKey {
    pub binding: u32,
    pub image: ImageId,
    pub sampler: SamplerKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ImageBindingsKey {
    pub bindings: SmallVec<[ImageBindingKey; 8]>,
}

// ─── Shaders & Programs ──────────────────────────────────────────────────────

/// Resolved shader text, hashed once with xxh3-128.
///
/// `Hash` uses the precomputed digest only; `Eq` also compares the text.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    hash: u128,
    code: Arc<str>,
}

impl ShaderSource {
    #[must_use]
    pub fn new(code: impl Into<Arc<str>>) -> Self {
        let code = code.into();
        Self { hash: xxh3_128(code.as_bytes()), code }
    }

    #[inline]
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[inline]
    #[must_use]
    pub fn digest(&self) -> u128 {
        self.hash
    }
}

impl PartialEq for ShaderSource {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.code == other.code
    }
}

impl Eq for ShaderSource {}

impl Hash for ShaderSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderKey {
    pub stage: ShaderStage,
    pub source: ShaderSource,
}

/// Identity of a program: the resolved source pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub vertex: ShaderSource,
    pub fragment: ShaderSource,
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashSet;
    use slotmap::SlotMap;
    use smallvec::smallvec;

    use super::*;

    #[test]
    fn test_framebuffer_key_is_order_sensitive() {
        let mut images: SlotMap<ImageId, ()> = SlotMap::with_key();
        let a = images.insert(());
        let b = images.insert(());

        let ab = FramebufferKey { color_attachments: smallvec![a, b], depth_stencil_attachment: None };
        let ba = FramebufferKey { color_attachments: smallvec![b, a], depth_stencil_attachment: None };
        let ab2 = FramebufferKey { color_attachments: smallvec![a, b], depth_stencil_attachment: None };

        assert_ne!(ab, ba);
        assert_eq!(ab, ab2);
    }

    #[test]
    fn test_sampler_key_from_params() {
        let params = SamplerParams { lod_bias: 0.5, ..Default::default() };
        let key = SamplerKey::from(&params);
        assert!((key.lod_bias() - 0.5).abs() < f32::EPSILON);
        assert_eq!(key, SamplerKey::from(&params));
        assert_ne!(key, SamplerKey::from(&SamplerParams::default()));
    }

    #[test]
    fn test_shader_source_equality_compares_text() {
        let a = ShaderSource::new("void main() {}");
        let b = ShaderSource::new(String::from("void main() {}"));
        let c = ShaderSource::new("void main() { }");
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a, c);

        let set: FxHashSet<ShaderSource> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
