//! Image and vertex format tables.
//!
//! Formats use WebGPU-style names (`rgba8unorm`, `float32x3`) and resolve to
//! the native enums the builders need. Both enums implement [`FromStr`] so
//! descriptors can be written from strings.

use std::str::FromStr;

use crate::backend::gl;
use crate::errors::GlError;

// ─── Vertex Formats ──────────────────────────────────────────────────────────

/// Format of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Uint8x2,
    Uint8x4,
    Sint8x2,
    Sint8x4,
    Unorm8x2,
    Unorm8x4,
    Snorm8x2,
    Snorm8x4,
    Uint16x2,
    Uint16x4,
    Sint16x2,
    Sint16x4,
    Unorm16x2,
    Unorm16x4,
    Snorm16x2,
    Snorm16x4,
    Float16x2,
    Float16x4,
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
    Uint32x2,
    Uint32x3,
    Uint32x4,
    Sint32,
    Sint32x2,
    Sint32x3,
    Sint32x4,
}

/// Native description of a [`VertexFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexFormatInfo {
    /// Component type (`FLOAT`, `UNSIGNED_BYTE`, ...).
    pub ty: u32,
    pub components: i32,
    pub normalized: bool,
    /// Integer attributes use the `I` pointer variant.
    pub integer: bool,
    pub size: u32,
}

impl VertexFormat {
    #[must_use]
    pub const fn info(self) -> VertexFormatInfo {
        use VertexFormat as F;
        let (ty, components, normalized, integer) = match self {
            F::Uint8x2 => (gl::UNSIGNED_BYTE, 2, false, true),
            F::Uint8x4 => (gl::UNSIGNED_BYTE, 4, false, true),
            F::Sint8x2 => (gl::BYTE, 2, false, true),
            F::Sint8x4 => (gl::BYTE, 4, false, true),
            F::Unorm8x2 => (gl::UNSIGNED_BYTE, 2, true, false),
            F::Unorm8x4 => (gl::UNSIGNED_BYTE, 4, true, false),
            F::Snorm8x2 => (gl::BYTE, 2, true, false),
            F::Snorm8x4 => (gl::BYTE, 4, true, false),
            F::Uint16x2 => (gl::UNSIGNED_SHORT, 2, false, true),
            F::Uint16x4 => (gl::UNSIGNED_SHORT, 4, false, true),
            F::Sint16x2 => (gl::SHORT, 2, false, true),
            F::Sint16x4 => (gl::SHORT, 4, false, true),
            F::Unorm16x2 => (gl::UNSIGNED_SHORT, 2, true, false),
            F::Unorm16x4 => (gl::UNSIGNED_SHORT, 4, true, false),
            F::Snorm16x2 => (gl::SHORT, 2, true, false),
            F::Snorm16x4 => (gl::SHORT, 4, true, false),
            F::Float16x2 => (gl::HALF_FLOAT, 2, false, false),
            F::Float16x4 => (gl::HALF_FLOAT, 4, false, false),
            F::Float32 => (gl::FLOAT, 1, false, false),
            F::Float32x2 => (gl::FLOAT, 2, false, false),
            F::Float32x3 => (gl::FLOAT, 3, false, false),
            F::Float32x4 => (gl::FLOAT, 4, false, false),
            F::Uint32 => (gl::UNSIGNED_INT, 1, false, true),
            F::Uint32x2 => (gl::UNSIGNED_INT, 2, false, true),
            F::Uint32x3 => (gl::UNSIGNED_INT, 3, false, true),
            F::Uint32x4 => (gl::UNSIGNED_INT, 4, false, true),
            F::Sint32 => (gl::INT, 1, false, true),
            F::Sint32x2 => (gl::INT, 2, false, true),
            F::Sint32x3 => (gl::INT, 3, false, true),
            F::Sint32x4 => (gl::INT, 4, false, true),
        };
        let component_size = match ty {
            gl::BYTE | gl::UNSIGNED_BYTE => 1,
            gl::SHORT | gl::UNSIGNED_SHORT | gl::HALF_FLOAT => 2,
            _ => 4,
        };
        VertexFormatInfo { ty, components, normalized, integer, size: component_size * components as u32 }
    }
}

impl FromStr for VertexFormat {
    type Err = GlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use VertexFormat as F;
        Ok(match s {
            "uint8x2" => F::Uint8x2,
            "uint8x4" => F::Uint8x4,
            "sint8x2" => F::Sint8x2,
            "sint8x4" => F::Sint8x4,
            "unorm8x2" => F::Unorm8x2,
            "unorm8x4" => F::Unorm8x4,
            "snorm8x2" => F::Snorm8x2,
            "snorm8x4" => F::Snorm8x4,
            "uint16x2" => F::Uint16x2,
            "uint16x4" => F::Uint16x4,
            "sint16x2" => F::Sint16x2,
            "sint16x4" => F::Sint16x4,
            "unorm16x2" => F::Unorm16x2,
            "unorm16x4" => F::Unorm16x4,
            "snorm16x2" => F::Snorm16x2,
            "snorm16x4" => F::Snorm16x4,
            "float16x2" => F::Float16x2,
            "float16x4" => F::Float16x4,
            "float32" => F::Float32,
            "float32x2" => F::Float32x2,
            "float32x3" => F::Float32x3,
            "float32x4" => F::Float32x4,
            "uint32" => F::Uint32,
            "uint32x2" => F::Uint32x2,
            "uint32x3" => F::Uint32x3,
            "uint32x4" => F::Uint32x4,
            "sint32" => F::Sint32,
            "sint32x2" => F::Sint32x2,
            "sint32x3" => F::Sint32x3,
            "sint32x4" => F::Sint32x4,
            other => return Err(GlError::UnknownFormat(other.to_string())),
        })
    }
}

// ─── Image Formats ───────────────────────────────────────────────────────────

/// Pixel format of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    R8Unorm,
    Rg8Unorm,
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba8UnormSrgb,
    R16Float,
    Rgba16Float,
    R32Float,
    Rg32Float,
    Rgba32Float,
    R32Sint,
    R32Uint,
    Rgba32Sint,
    Rgba32Uint,
    Depth16Unorm,
    Depth24Plus,
    Depth24PlusStencil8,
    Depth32Float,
    Stencil8,
}

/// How [`Context::clear_image`](crate::Context::clear_image) clears an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearKind {
    Float,
    Int,
    Uint,
    DepthStencil,
}

/// Native description of an [`ImageFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFormatInfo {
    pub internal_format: u32,
    pub format: u32,
    pub ty: u32,
    pub components: u32,
    pub pixel_size: u32,
    /// `COLOR`, `DEPTH`, `STENCIL` or `DEPTH_STENCIL`.
    pub buffer: u32,
    pub clear: ClearKind,
}

impl ImageFormatInfo {
    #[inline]
    #[must_use]
    pub const fn is_color(&self) -> bool {
        self.buffer == gl::COLOR
    }

    /// Framebuffer attachment point for non-color formats.
    #[must_use]
    pub const fn depth_attachment(&self) -> u32 {
        match self.buffer {
            gl::DEPTH => gl::DEPTH_ATTACHMENT,
            gl::STENCIL => gl::STENCIL_ATTACHMENT,
            _ => gl::DEPTH_STENCIL_ATTACHMENT,
        }
    }
}

impl ImageFormat {
    #[must_use]
    pub const fn info(self) -> ImageFormatInfo {
        use ClearKind as C;
        use ImageFormat as F;
        let (internal_format, format, ty, components, pixel_size, buffer, clear) = match self {
            F::R8Unorm => (gl::R8, gl::RED, gl::UNSIGNED_BYTE, 1, 1, gl::COLOR, C::Float),
            F::Rg8Unorm => (gl::RG8, gl::RG, gl::UNSIGNED_BYTE, 2, 2, gl::COLOR, C::Float),
            F::Rgba8Unorm => (gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE, 4, 4, gl::COLOR, C::Float),
            F::Bgra8Unorm => (gl::RGBA8, gl::BGRA, gl::UNSIGNED_BYTE, 4, 4, gl::COLOR, C::Float),
            F::Rgba8UnormSrgb => (gl::SRGB8_ALPHA8, gl::RGBA, gl::UNSIGNED_BYTE, 4, 4, gl::COLOR, C::Float),
            F::R16Float => (gl::R16F, gl::RED, gl::HALF_FLOAT, 1, 2, gl::COLOR, C::Float),
            F::Rgba16Float => (gl::RGBA16F, gl::RGBA, gl::HALF_FLOAT, 4, 8, gl::COLOR, C::Float),
            F::R32Float => (gl::R32F, gl::RED, gl::FLOAT, 1, 4, gl::COLOR, C::Float),
            F::Rg32Float => (gl::RG32F, gl::RG, gl::FLOAT, 2, 8, gl::COLOR, C::Float),
            F::Rgba32Float => (gl::RGBA32F, gl::RGBA, gl::FLOAT, 4, 16, gl::COLOR, C::Float),
            F::R32Sint => (gl::R32I, gl::RED_INTEGER, gl::INT, 1, 4, gl::COLOR, C::Int),
            F::R32Uint => (gl::R32UI, gl::RED_INTEGER, gl::UNSIGNED_INT, 1, 4, gl::COLOR, C::Uint),
            F::Rgba32Sint => (gl::RGBA32I, gl::RGBA_INTEGER, gl::INT, 4, 16, gl::COLOR, C::Int),
            F::Rgba32Uint => (gl::RGBA32UI, gl::RGBA_INTEGER, gl::UNSIGNED_INT, 4, 16, gl::COLOR, C::Uint),
            F::Depth16Unorm => (
                gl::DEPTH_COMPONENT16,
                gl::DEPTH_COMPONENT,
                gl::UNSIGNED_SHORT,
                1,
                2,
                gl::DEPTH,
                C::DepthStencil,
            ),
            F::Depth24Plus => (
                gl::DEPTH_COMPONENT24,
                gl::DEPTH_COMPONENT,
                gl::UNSIGNED_INT,
                1,
                4,
                gl::DEPTH,
                C::DepthStencil,
            ),
            F::Depth24PlusStencil8 => (
                gl::DEPTH24_STENCIL8,
                gl::DEPTH_STENCIL,
                gl::UNSIGNED_INT_24_8,
                2,
                4,
                gl::DEPTH_STENCIL,
                C::DepthStencil,
            ),
            F::Depth32Float => (
                gl::DEPTH_COMPONENT32F,
                gl::DEPTH_COMPONENT,
                gl::FLOAT,
                1,
                4,
                gl::DEPTH,
                C::DepthStencil,
            ),
            F::Stencil8 => (gl::STENCIL_INDEX8, gl::STENCIL_INDEX, gl::UNSIGNED_BYTE, 1, 1, gl::STENCIL, C::DepthStencil),
        };
        ImageFormatInfo { internal_format, format, ty, components, pixel_size, buffer, clear }
    }
}

impl FromStr for ImageFormat {
    type Err = GlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ImageFormat as F;
        Ok(match s {
            "r8unorm" => F::R8Unorm,
            "rg8unorm" => F::Rg8Unorm,
            "rgba8unorm" => F::Rgba8Unorm,
            "bgra8unorm" => F::Bgra8Unorm,
            "rgba8unorm-srgb" => F::Rgba8UnormSrgb,
            "r16float" => F::R16Float,
            "rgba16float" => F::Rgba16Float,
            "r32float" => F::R32Float,
            "rg32float" => F::Rg32Float,
            "rgba32float" => F::Rgba32Float,
            "r32sint" => F::R32Sint,
            "r32uint" => F::R32Uint,
            "rgba32sint" => F::Rgba32Sint,
            "rgba32uint" => F::Rgba32Uint,
            "depth16unorm" => F::Depth16Unorm,
            "depth24plus" => F::Depth24Plus,
            "depth24plus-stencil8" => F::Depth24PlusStencil8,
            "depth32float" => F::Depth32Float,
            "stencil8" => F::Stencil8,
            other => return Err(GlError::UnknownFormat(other.to_string())),
        })
    }
}
