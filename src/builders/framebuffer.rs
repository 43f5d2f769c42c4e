//! Render-target sets.

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::backend::{GlBackend, NativeHandle, gl};
use crate::binder::StateBinder;
use crate::cache::keys::FramebufferKey;
use crate::errors::{GlError, Result};
use crate::ids::ImageId;
use crate::resources::image::Image;

/// A native framebuffer and the size of its attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framebuffer {
    pub handle: NativeHandle,
    pub width: u32,
    pub height: u32,
    pub color_attachments: u32,
}

/// Canonical key for an ordered attachment list.
///
/// Color images keep their relative order; at most one depth/stencil image is
/// allowed. All attachments must share size and sample count.
pub(crate) fn framebuffer_key(
    images: &SlotMap<ImageId, Image>,
    attachments: &[ImageId],
    max_color_attachments: u32,
) -> Result<FramebufferKey> {
    let Some(&first) = attachments.first() else {
        return Err(GlError::invalid("a framebuffer needs at least one attachment"));
    };
    let reference = images.get(first).ok_or(GlError::InvalidHandle { kind: "image" })?;

    let mut color_attachments = SmallVec::new();
    let mut depth_stencil_attachment = None;

    for &id in attachments {
        let image = images.get(id).ok_or(GlError::InvalidHandle { kind: "image" })?;
        if image.is_layered() {
            return Err(GlError::invalid("cubemap and array images cannot be attached"));
        }
        if (image.width, image.height, image.samples) != (reference.width, reference.height, reference.samples) {
            return Err(GlError::invalid("framebuffer attachments must share size and sample count"));
        }
        if image.format.info().is_color() {
            color_attachments.push(id);
        } else if depth_stencil_attachment.replace(id).is_some() {
            return Err(GlError::invalid("a framebuffer takes at most one depth/stencil attachment"));
        }
    }

    if color_attachments.len() as u32 > max_color_attachments {
        return Err(GlError::invalid(format!(
            "{} color attachments exceed the limit of {max_color_attachments}",
            color_attachments.len()
        )));
    }

    Ok(FramebufferKey { color_attachments, depth_stencil_attachment })
}

fn attach<B: GlBackend>(gl: &mut B, attachment: u32, image: &Image) {
    if image.renderbuffer {
        gl.framebuffer_renderbuffer(attachment, image.handle);
    } else {
        gl.framebuffer_texture_2d(attachment, gl::TEXTURE_2D, image.handle);
    }
}

/// Creates the framebuffer for `key`. Leaves it bound through `binder`.
pub(crate) fn build_framebuffer<B: GlBackend>(
    gl: &mut B,
    binder: &mut StateBinder,
    images: &SlotMap<ImageId, Image>,
    key: &FramebufferKey,
) -> Result<Framebuffer> {
    let lookup = |id: ImageId| images.get(id).ok_or(GlError::InvalidHandle { kind: "image" });
    let colors = key.color_attachments.iter().map(|&id| lookup(id)).collect::<Result<SmallVec<[&Image; 4]>>>()?;
    let depth = key.depth_stencil_attachment.map(lookup).transpose()?;
    let Some(first) = colors.first().copied().or(depth) else {
        return Err(GlError::invalid("a framebuffer needs at least one attachment"));
    };

    let handle = gl.create_framebuffer().map_err(GlError::creation("framebuffer"))?;
    binder.bind_framebuffer(gl, handle);

    let mut draw_buffers: SmallVec<[u32; 8]> = SmallVec::new();
    for (index, image) in colors.iter().enumerate() {
        let attachment = gl::COLOR_ATTACHMENT0 + index as u32;
        attach(gl, attachment, image);
        draw_buffers.push(attachment);
    }
    if let Some(image) = depth {
        attach(gl, image.format.info().depth_attachment(), image);
    }

    gl.draw_buffers(&draw_buffers);
    gl.read_buffer(if colors.is_empty() { gl::NONE } else { gl::COLOR_ATTACHMENT0 });

    log::debug!(
        "Created framebuffer {handle} ({} color, depth: {})",
        colors.len(),
        depth.is_some()
    );

    Ok(Framebuffer {
        handle,
        width: first.width,
        height: first.height,
        color_attachments: colors.len() as u32,
    })
}
