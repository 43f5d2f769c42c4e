//! Global-state blocks.
//!
//! A [`GlobalSettings`] value is both the cache key and the cached value: the
//! block has no native object, it is a normalized record of every
//! fixed-function field a pipeline sets. Binding a block re-applies all of
//! its fields.

use crate::backend::{GlBackend, gl};
use crate::errors::{GlError, Result};
use crate::resources::pipeline::PipelineDescriptor;
use crate::resources::state::{
    BlendFactor, BlendState, ColorWrites, CompareFunc, CullFace, DepthState, FrontFace, StencilFaceState, StencilState,
};

/// Normalized fixed-function state of a pipeline.
///
/// Floats are stored as bit patterns so the block can be hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalSettings {
    pub primitive_restart: bool,
    pub front_face: FrontFace,
    pub cull_face: CullFace,
    pub line_width_bits: u32,
    pub depth: Option<DepthState>,
    pub stencil: Option<StencilState>,
    pub blend: Option<BlendState>,
    /// `(factor, units)` bit patterns.
    pub polygon_offset: Option<(u32, u32)>,
    /// 4 bits per color attachment, RGBA from the low bit.
    pub color_mask: u64,
    pub attachments: u32,
}

impl GlobalSettings {
    /// Normalizes a descriptor's state against its render-target set.
    ///
    /// Depth testing is dropped when the targets carry no depth component,
    /// and masks are clipped to the attachments that exist, so equivalent
    /// pipelines produce equal blocks.
    pub(crate) fn from_descriptor(desc: &PipelineDescriptor, attachments: u32, has_depth: bool) -> Result<Self> {
        if !(desc.line_width > 0.0) {
            return Err(GlError::invalid(format!("line width must be positive, got {}", desc.line_width)));
        }

        let mask_bits = attachments * 4;
        let color_mask = if mask_bits >= 64 { desc.color_mask } else { desc.color_mask & ((1u64 << mask_bits) - 1) };
        let blend = desc.blend.map(|blend| BlendState {
            enable_mask: blend.enable_mask & ((1u32 << attachments.min(31)) - 1),
            ..blend
        });

        Ok(Self {
            primitive_restart: desc.primitive_restart,
            front_face: desc.front_face,
            cull_face: desc.cull_face,
            line_width_bits: desc.line_width.to_bits(),
            depth: desc.depth.filter(|_| has_depth),
            stencil: desc.stencil,
            blend,
            polygon_offset: desc.polygon_offset.map(|offset| (offset.factor.to_bits(), offset.units.to_bits())),
            color_mask,
            attachments,
        })
    }

    #[inline]
    #[must_use]
    pub fn line_width(&self) -> f32 {
        f32::from_bits(self.line_width_bits)
    }

    /// Write mask of color attachment `index`.
    #[inline]
    #[must_use]
    pub fn color_writes(&self, index: u32) -> ColorWrites {
        ColorWrites::of_attachment(self.color_mask, index)
    }

    /// Depth write flag as applied: off whenever the depth test is off.
    #[inline]
    #[must_use]
    pub fn depth_write(&self) -> bool {
        self.depth.is_some_and(|depth| depth.write)
    }

    /// Front-face stencil write mask as applied.
    #[inline]
    #[must_use]
    pub fn stencil_front_write_mask(&self) -> u32 {
        self.stencil.unwrap_or_default().front.write_mask
    }

    /// Issues every field of the block.
    pub(crate) fn apply<B: GlBackend>(&self, gl: &mut B) {
        let toggle = |gl: &mut B, capability: u32, on: bool| {
            if on {
                gl.enable(capability);
            } else {
                gl.disable(capability);
            }
        };

        toggle(gl, gl::PRIMITIVE_RESTART_FIXED_INDEX, self.primitive_restart);
        for capability in [gl::POLYGON_OFFSET_FILL, gl::POLYGON_OFFSET_LINE, gl::POLYGON_OFFSET_POINT] {
            toggle(gl, capability, self.polygon_offset.is_some());
        }
        toggle(gl, gl::STENCIL_TEST, self.stencil.is_some());
        toggle(gl, gl::DEPTH_TEST, self.depth.is_some());

        match self.cull_face.to_gl() {
            Some(face) => {
                gl.enable(gl::CULL_FACE);
                gl.cull_face(face);
            }
            None => gl.disable(gl::CULL_FACE),
        }

        gl.line_width(self.line_width());
        gl.front_face(self.front_face.to_gl());
        gl.depth_mask(self.depth_write());
        gl.depth_func(self.depth.map_or(CompareFunc::Less, |depth| depth.func).to_gl());

        let stencil = self.stencil.unwrap_or_default();
        for (face, state) in [(gl::FRONT, stencil.front), (gl::BACK, stencil.back)] {
            apply_stencil_face(gl, face, &state);
        }

        let blend = self.blend.unwrap_or(BlendState {
            enable_mask: 0,
            src_color: BlendFactor::One,
            dst_color: BlendFactor::Zero,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
        });
        gl.blend_func_separate(
            blend.src_color.to_gl(),
            blend.dst_color.to_gl(),
            blend.src_alpha.to_gl(),
            blend.dst_alpha.to_gl(),
        );

        let (factor, units) = self.polygon_offset.unwrap_or((0, 0));
        gl.polygon_offset(f32::from_bits(factor), f32::from_bits(units));

        for index in 0..self.attachments {
            if blend.enable_mask & (1 << index) != 0 {
                gl.enable_indexed(gl::BLEND, index);
            } else {
                gl.disable_indexed(gl::BLEND, index);
            }
            gl.color_mask_indexed(index, self.color_writes(index).channels());
        }
    }
}

fn apply_stencil_face<B: GlBackend>(gl: &mut B, face: u32, state: &StencilFaceState) {
    gl.stencil_mask_separate(face, state.write_mask);
    gl.stencil_func_separate(face, state.compare_op.to_gl(), state.reference, state.compare_mask);
    gl.stencil_op_separate(face, state.fail_op.to_gl(), state.depth_fail_op.to_gl(), state.pass_op.to_gl());
}
