//! Render state vocabulary used by pipeline descriptors.
//!
//! Each enum maps onto one native enum through `to_gl`. The structs group the
//! optional pieces of fixed-function state a pipeline may enable.

use bitflags::bitflags;

use crate::backend::gl;

// ─── Comparison & Stencil ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunc {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl CompareFunc {
    #[must_use]
    pub const fn to_gl(self) -> u32 {
        match self {
            Self::Never => gl::NEVER,
            Self::Less => gl::LESS,
            Self::Equal => gl::EQUAL,
            Self::LessEqual => gl::LEQUAL,
            Self::Greater => gl::GREATER,
            Self::NotEqual => gl::NOTEQUAL,
            Self::GreaterEqual => gl::GEQUAL,
            Self::Always => gl::ALWAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    Increment,
    Decrement,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

impl StencilOp {
    #[must_use]
    pub const fn to_gl(self) -> u32 {
        match self {
            Self::Keep => gl::KEEP,
            Self::Zero => gl::ZERO,
            Self::Replace => gl::REPLACE,
            Self::Increment => gl::INCR,
            Self::Decrement => gl::DECR,
            Self::Invert => gl::INVERT,
            Self::IncrementWrap => gl::INCR_WRAP,
            Self::DecrementWrap => gl::DECR_WRAP,
        }
    }
}

// ─── Blending ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturate,
}

impl BlendFactor {
    #[must_use]
    pub const fn to_gl(self) -> u32 {
        match self {
            Self::Zero => gl::ZERO,
            Self::One => gl::ONE,
            Self::SrcColor => gl::SRC_COLOR,
            Self::OneMinusSrcColor => gl::ONE_MINUS_SRC_COLOR,
            Self::SrcAlpha => gl::SRC_ALPHA,
            Self::OneMinusSrcAlpha => gl::ONE_MINUS_SRC_ALPHA,
            Self::DstColor => gl::DST_COLOR,
            Self::OneMinusDstColor => gl::ONE_MINUS_DST_COLOR,
            Self::DstAlpha => gl::DST_ALPHA,
            Self::OneMinusDstAlpha => gl::ONE_MINUS_DST_ALPHA,
            Self::SrcAlphaSaturate => gl::SRC_ALPHA_SATURATE,
        }
    }
}

bitflags! {
    /// Channels written to one color attachment.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWrites: u8 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

impl ColorWrites {
    /// Per-channel flags in `[r, g, b, a]` order.
    #[must_use]
    pub fn channels(self) -> [bool; 4] {
        [
            self.contains(Self::RED),
            self.contains(Self::GREEN),
            self.contains(Self::BLUE),
            self.contains(Self::ALPHA),
        ]
    }

    /// Mask of attachment `index` inside a packed 4-bits-per-attachment mask.
    #[must_use]
    pub fn of_attachment(packed: u64, index: u32) -> Self {
        Self::from_bits_truncate(((packed >> (index * 4)) & 0xF) as u8)
    }
}

// ─── Rasterization ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullFace {
    #[default]
    None,
    Front,
    Back,
    FrontAndBack,
}

impl CullFace {
    /// Native face enum, `None` when culling is off.
    #[must_use]
    pub const fn to_gl(self) -> Option<u32> {
        match self {
            Self::None => None,
            Self::Front => Some(gl::FRONT),
            Self::Back => Some(gl::BACK),
            Self::FrontAndBack => Some(gl::FRONT_AND_BACK),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    #[default]
    Ccw,
    Cw,
}

impl FrontFace {
    #[must_use]
    pub const fn to_gl(self) -> u32 {
        match self {
            Self::Ccw => gl::CCW,
            Self::Cw => gl::CW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl Topology {
    #[must_use]
    pub const fn to_gl(self) -> u32 {
        match self {
            Self::Points => gl::POINTS,
            Self::Lines => gl::LINES,
            Self::LineLoop => gl::LINE_LOOP,
            Self::LineStrip => gl::LINE_STRIP,
            Self::Triangles => gl::TRIANGLES,
            Self::TriangleStrip => gl::TRIANGLE_STRIP,
            Self::TriangleFan => gl::TRIANGLE_FAN,
        }
    }
}

/// Width of the indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    Uint16,
    #[default]
    Uint32,
}

impl IndexFormat {
    #[must_use]
    pub const fn to_gl(self) -> u32 {
        match self {
            Self::Uint16 => gl::UNSIGNED_SHORT,
            Self::Uint32 => gl::UNSIGNED_INT,
        }
    }

    /// Bytes per index.
    #[must_use]
    pub const fn size(self) -> i32 {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

/// Whether an attribute advances per vertex or per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StepMode {
    #[default]
    Vertex,
    Instance,
}

// ─── Sampling ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl Filter {
    #[must_use]
    pub const fn to_gl(self) -> u32 {
        match self {
            Self::Nearest => gl::NEAREST,
            Self::Linear => gl::LINEAR,
            Self::NearestMipmapNearest => gl::NEAREST_MIPMAP_NEAREST,
            Self::LinearMipmapNearest => gl::LINEAR_MIPMAP_NEAREST,
            Self::NearestMipmapLinear => gl::NEAREST_MIPMAP_LINEAR,
            Self::LinearMipmapLinear => gl::LINEAR_MIPMAP_LINEAR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Wrap {
    #[default]
    Repeat,
    ClampToEdge,
    MirroredRepeat,
    ClampToBorder,
}

impl Wrap {
    #[must_use]
    pub const fn to_gl(self) -> u32 {
        match self {
            Self::Repeat => gl::REPEAT,
            Self::ClampToEdge => gl::CLAMP_TO_EDGE,
            Self::MirroredRepeat => gl::MIRRORED_REPEAT,
            Self::ClampToBorder => gl::CLAMP_TO_BORDER,
        }
    }
}

/// Sampler parameters of one sampled-image binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerParams {
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub min_lod: f32,
    pub max_lod: f32,
    pub lod_bias: f32,
    /// Wrap modes for `s`, `t` and `r`.
    pub wrap: [Wrap; 3],
    /// Depth comparison, `None` for regular sampling.
    pub compare: Option<CompareFunc>,
    pub border_color: [f32; 4],
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            min_lod: -1000.0,
            max_lod: 1000.0,
            lod_bias: 0.0,
            wrap: [Wrap::Repeat; 3],
            compare: None,
            border_color: [0.0; 4],
        }
    }
}

// ─── Fixed-Function Groups ───────────────────────────────────────────────────

/// Depth test configuration. Absent means the depth test is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub func: CompareFunc,
    pub write: bool,
}

impl Default for DepthState {
    fn default() -> Self {
        Self { func: CompareFunc::Less, write: true }
    }
}

/// Stencil configuration of one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilFaceState {
    pub fail_op: StencilOp,
    pub pass_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub compare_op: CompareFunc,
    pub compare_mask: u32,
    pub write_mask: u32,
    pub reference: i32,
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self {
            fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            compare_op: CompareFunc::Always,
            compare_mask: 0xFF,
            write_mask: 0xFF,
            reference: 0,
        }
    }
}

/// Stencil test configuration. Absent means the stencil test is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StencilState {
    pub front: StencilFaceState,
    pub back: StencilFaceState,
}

/// Blend configuration shared by every attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// Bit `i` enables blending on color attachment `i`.
    pub enable_mask: u32,
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enable_mask: 1,
            src_color: BlendFactor::One,
            dst_color: BlendFactor::Zero,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PolygonOffset {
    pub factor: f32,
    pub units: f32,
}

/// Viewport rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// `[x0, y0, x1, y1]` corners, as blits take them.
    #[must_use]
    pub const fn corners(self) -> [i32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_writes_unpack_per_attachment() {
        let packed: u64 = 0xF | (0b0101 << 4);
        assert_eq!(ColorWrites::of_attachment(packed, 0), ColorWrites::ALL);
        assert_eq!(ColorWrites::of_attachment(packed, 1).channels(), [true, false, true, false]);
        assert!(ColorWrites::of_attachment(packed, 2).is_empty());
    }

    #[test]
    fn test_viewport_corners() {
        assert_eq!(Viewport::new(2, 3, 10, 20).corners(), [2, 3, 12, 23]);
    }
}
