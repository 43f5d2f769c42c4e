//! Images: textures and renderbuffers.
//!
//! Images that are neither arrays nor cubemaps own one use of a
//! single-attachment render-target set, created with the image. Pipelines
//! drawing into the same image share that cache entry, so `clear_image` and
//! `blit` never build a framebuffer of their own.
//!
//! | Descriptor                         | Native object         | Target set |
//! |------------------------------------|-----------------------|------------|
//! | `samples > 1` or `texture: false`  | renderbuffer          | yes        |
//! | plain                              | `TEXTURE_2D`          | yes        |
//! | `array: n`                         | `TEXTURE_2D_ARRAY`    | no         |
//! | `cubemap: true`                    | `TEXTURE_CUBE_MAP`    | no         |

use crate::backend::{GlBackend, NativeHandle, gl};
use crate::builders::framebuffer::{build_framebuffer, framebuffer_key};
use crate::context::Context;
use crate::errors::{GlError, Result};
use crate::formats::{ClearKind, ImageFormat};
use crate::ids::{FramebufferId, ImageId};
use crate::resources::state::{ColorWrites, Viewport};

/// Value an image is cleared to by [`Context::clear_image`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Float([f32; 4]),
    Int([i32; 4]),
    Uint([u32; 4]),
    /// Depth and stencil values.
    DepthStencil(f32, i32),
}

impl ClearValue {
    /// Zero for color formats; depth 1.0 for depth formats.
    #[must_use]
    pub fn default_for(format: ImageFormat) -> Self {
        match format.info().clear {
            ClearKind::Float => Self::Float([0.0; 4]),
            ClearKind::Int => Self::Int([0; 4]),
            ClearKind::Uint => Self::Uint([0; 4]),
            ClearKind::DepthStencil => Self::DepthStencil(1.0, 0),
        }
    }

    const fn kind(&self) -> ClearKind {
        match self {
            Self::Float(_) => ClearKind::Float,
            Self::Int(_) => ClearKind::Int,
            Self::Uint(_) => ClearKind::Uint,
            Self::DepthStencil(..) => ClearKind::DepthStencil,
        }
    }
}

/// A texture or renderbuffer owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Image {
    pub(crate) handle: NativeHandle,
    pub(crate) framebuffer: Option<FramebufferId>,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    /// Layer count, `0` for non-array images.
    pub array: u32,
    pub cubemap: bool,
    pub renderbuffer: bool,
    /// Native texture target (`TEXTURE_2D`, `TEXTURE_2D_ARRAY`, `TEXTURE_CUBE_MAP`).
    pub target: u32,
    pub format: ImageFormat,
    pub clear_value: ClearValue,
}

impl Image {
    /// Arrays and cubemaps cannot be attached to a render-target set.
    #[inline]
    #[must_use]
    pub fn is_layered(&self) -> bool {
        self.array > 0 || self.cubemap
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    /// The image's own render-target set, if it has one.
    #[inline]
    #[must_use]
    pub fn framebuffer(&self) -> Option<FramebufferId> {
        self.framebuffer
    }

    #[inline]
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        Viewport::new(0, 0, self.width as i32, self.height as i32)
    }
}

/// Parameters of [`Context::image`].
#[derive(Debug, Clone, Copy)]
pub struct ImageDescriptor<'a> {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub data: Option<&'a [u8]>,
    pub samples: u32,
    pub array: u32,
    /// Force a texture (`Some(true)`) or a renderbuffer (`Some(false)`).
    pub texture: Option<bool>,
    pub cubemap: bool,
}

impl<'a> ImageDescriptor<'a> {
    #[must_use]
    pub fn new(width: u32, height: u32, format: ImageFormat) -> Self {
        Self { width, height, format, data: None, samples: 1, array: 0, texture: None, cubemap: false }
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.width > i32::MAX as u32 || self.height > i32::MAX as u32 {
            return Err(GlError::invalid(format!("invalid image size {}x{}", self.width, self.height)));
        }
        if self.samples == 0 {
            return Err(GlError::invalid("image sample count must be at least 1"));
        }
        if self.samples > 1 && self.texture == Some(true) {
            return Err(GlError::invalid("for multisampled images texture must be false"));
        }
        if self.cubemap && self.array > 0 {
            return Err(GlError::invalid("cubemap arrays are not supported"));
        }
        if self.array > 0 && self.samples > 1 {
            return Err(GlError::invalid("multisampled array images are not supported"));
        }
        if self.cubemap && self.samples > 1 {
            return Err(GlError::invalid("multisampled cubemap images are not supported"));
        }
        if (self.array > 0 || self.cubemap) && self.texture == Some(false) {
            return Err(GlError::invalid("array and cubemap images must be textures"));
        }

        if let Some(data) = self.data {
            if self.renderbuffer() {
                return Err(GlError::invalid("renderbuffer images cannot take initial data"));
            }
            let expected = self.byte_size();
            if data.len() as u64 != expected {
                return Err(GlError::invalid(format!(
                    "image data is {} bytes, expected {expected}",
                    data.len()
                )));
            }
        }
        Ok(())
    }

    #[inline]
    fn renderbuffer(&self) -> bool {
        self.samples > 1 || self.texture == Some(false)
    }

    fn byte_size(&self) -> u64 {
        let layers = if self.cubemap { 6 } else { u64::from(self.array.max(1)) };
        u64::from(self.width) * u64::from(self.height) * u64::from(self.format.info().pixel_size) * layers
    }

    fn target(&self) -> u32 {
        if self.cubemap {
            gl::TEXTURE_CUBE_MAP
        } else if self.array > 0 {
            gl::TEXTURE_2D_ARRAY
        } else {
            gl::TEXTURE_2D
        }
    }
}

impl<B: GlBackend> Context<B> {
    /// Creates an image and, unless layered, its render-target set.
    pub fn image(&mut self, desc: &ImageDescriptor<'_>) -> Result<ImageId> {
        desc.validate()?;

        let info = desc.format.info();
        let renderbuffer = desc.renderbuffer();
        let target = desc.target();
        let (width, height) = (desc.width as i32, desc.height as i32);

        let handle = if renderbuffer {
            let handle = self.gl.create_renderbuffer().map_err(GlError::creation("renderbuffer"))?;
            self.gl.renderbuffer_storage_multisample(handle, desc.samples as i32, info.internal_format, width, height);
            handle
        } else {
            let handle = self.gl.create_texture().map_err(GlError::creation("texture"))?;
            self.gl.active_texture(gl::TEXTURE0 + self.default_texture_unit);
            self.gl.bind_texture(target, handle);
            if desc.cubemap {
                let face_size = desc.byte_size() as usize / 6;
                for face in 0..6u32 {
                    let data = desc.data.map(|data| &data[face as usize * face_size..(face as usize + 1) * face_size]);
                    self.gl.tex_image_2d(
                        gl::TEXTURE_CUBE_MAP_POSITIVE_X + face,
                        info.internal_format,
                        width,
                        height,
                        info.format,
                        info.ty,
                        data,
                    );
                }
            } else if desc.array > 0 {
                self.gl.tex_image_3d(
                    target,
                    info.internal_format,
                    width,
                    height,
                    desc.array as i32,
                    info.format,
                    info.ty,
                    desc.data,
                );
            } else {
                self.gl.tex_image_2d(target, info.internal_format, width, height, info.format, info.ty, desc.data);
            }
            handle
        };

        let id = self.images.insert(Image {
            handle,
            framebuffer: None,
            width: desc.width,
            height: desc.height,
            samples: desc.samples,
            array: desc.array,
            cubemap: desc.cubemap,
            renderbuffer,
            target,
            format: desc.format,
            clear_value: ClearValue::default_for(desc.format),
        });

        if !desc.cubemap && desc.array == 0 {
            let framebuffer = framebuffer_key(&self.images, &[id], self.settings.max_color_attachments).and_then(|key| {
                self.caches
                    .framebuffers
                    .get_or_create(key, |key| build_framebuffer(&mut self.gl, &mut self.binder, &self.images, key))
            });
            match framebuffer {
                Ok(framebuffer) => self.images[id].framebuffer = Some(framebuffer),
                Err(err) => {
                    self.images.remove(id);
                    if renderbuffer {
                        self.gl.delete_renderbuffer(handle);
                    } else {
                        self.gl.delete_texture(handle);
                    }
                    return Err(err);
                }
            }
        }

        log::debug!(
            "Created image {handle} ({}x{} {:?}, samples: {}, renderbuffer: {renderbuffer})",
            desc.width,
            desc.height,
            desc.format,
            desc.samples
        );
        Ok(id)
    }

    #[must_use]
    pub fn get_image(&self, id: ImageId) -> Option<&Image> {
        self.images.get(id)
    }

    /// Sets the value [`clear_image`](Self::clear_image) clears to.
    pub fn set_clear_value(&mut self, id: ImageId, value: ClearValue) -> Result<()> {
        let image = self.images.get_mut(id).ok_or(GlError::InvalidHandle { kind: "image" })?;
        if value.kind() != image.format.info().clear {
            return Err(GlError::invalid(format!("clear value {value:?} does not fit {:?}", image.format)));
        }
        image.clear_value = value;
        Ok(())
    }

    /// Clears an image to its clear value.
    ///
    /// Write masks are forced open for the clear and restored from the
    /// currently bound global-state block afterwards.
    pub fn clear_image(&mut self, id: ImageId) -> Result<()> {
        let image = *self.images.get(id).ok_or(GlError::InvalidHandle { kind: "image" })?;
        let Some(framebuffer) = image.framebuffer else {
            return Err(GlError::invalid("cubemap and array images cannot be cleared"));
        };

        let handle = self.caches.framebuffers.get(framebuffer).handle;
        self.binder.bind_framebuffer(&mut self.gl, handle);
        self.gl.color_mask_indexed(0, [true; 4]);
        self.gl.depth_mask(true);
        self.gl.stencil_mask_separate(gl::FRONT, 0xFF);

        let buffer = image.format.info().buffer;
        match image.clear_value {
            ClearValue::Float(values) => self.gl.clear_buffer_f32(gl::COLOR, 0, values),
            ClearValue::Int(values) => self.gl.clear_buffer_i32(gl::COLOR, 0, values),
            ClearValue::Uint(values) => self.gl.clear_buffer_u32(gl::COLOR, 0, values),
            ClearValue::DepthStencil(depth, stencil) => match buffer {
                gl::DEPTH => self.gl.clear_buffer_f32(gl::DEPTH, 0, [depth, 0.0, 0.0, 0.0]),
                gl::STENCIL => self.gl.clear_buffer_i32(gl::STENCIL, 0, [stencil, 0, 0, 0]),
                _ => self.gl.clear_buffer_depth_stencil(depth, stencil),
            },
        }

        if let Some(current) = self.binder.current_global_settings() {
            let settings = *self.caches.global_settings.get(current);
            self.gl.color_mask_indexed(0, settings.color_writes(0).channels());
            self.gl.stencil_mask_separate(gl::FRONT, settings.stencil_front_write_mask());
            self.gl.depth_mask(settings.depth_write());
        }
        Ok(())
    }

    /// Copies a color image into another color image, or into the default
    /// framebuffer when `target` is `None`.
    ///
    /// Viewports default to the full source and destination. `filter`
    /// selects linear over nearest sampling; `srgb: false` disables sRGB
    /// conversion for the copy.
    pub fn blit(
        &mut self,
        source: ImageId,
        target: Option<ImageId>,
        source_viewport: Option<Viewport>,
        target_viewport: Option<Viewport>,
        filter: bool,
        srgb: bool,
    ) -> Result<()> {
        let src = *self.images.get(source).ok_or(GlError::InvalidHandle { kind: "image" })?;
        let dst = target
            .map(|id| self.images.get(id).copied().ok_or(GlError::InvalidHandle { kind: "image" }))
            .transpose()?;

        let blittable = |image: &Image, role: &str| match image.framebuffer {
            Some(framebuffer) if image.format.info().is_color() => Ok(framebuffer),
            Some(_) => Err(GlError::invalid(format!("cannot blit {role} depth or stencil images"))),
            None => Err(GlError::invalid(format!("cannot blit {role} cubemap or array images"))),
        };
        let src_framebuffer = blittable(&src, "from")?;
        let dst_framebuffer = dst.as_ref().map(|image| blittable(image, "to")).transpose()?;

        let source_viewport = source_viewport.unwrap_or_else(|| src.viewport());
        let target_viewport = target_viewport.unwrap_or_else(|| dst.map_or_else(|| src.viewport(), |d| d.viewport()));
        check_viewport(source_viewport, Some(&src), "source")?;
        check_viewport(target_viewport, dst.as_ref(), "target")?;

        let read = self.caches.framebuffers.get(src_framebuffer).handle;
        let draw = dst_framebuffer.map_or(0, |id| self.caches.framebuffers.get(id).handle);
        let toggle_srgb = !srgb && self.settings.framebuffer_srgb;

        if toggle_srgb {
            self.gl.disable(gl::FRAMEBUFFER_SRGB);
        }
        self.gl.color_mask_indexed(0, [true; 4]);
        self.gl.bind_framebuffer(gl::READ_FRAMEBUFFER, read);
        self.gl.bind_framebuffer(gl::DRAW_FRAMEBUFFER, draw);
        self.gl.blit_framebuffer(
            source_viewport.corners(),
            target_viewport.corners(),
            gl::COLOR_BUFFER_BIT,
            if filter { gl::LINEAR } else { gl::NEAREST },
        );

        match self.binder.current_framebuffer() {
            Some(current) => self.gl.bind_framebuffer(gl::FRAMEBUFFER, current),
            None => self.binder.invalidate_framebuffer(),
        }
        let restored = self
            .binder
            .current_global_settings()
            .map_or(ColorWrites::ALL, |id| self.caches.global_settings.get(id).color_writes(0));
        self.gl.color_mask_indexed(0, restored.channels());
        if toggle_srgb {
            self.gl.enable(gl::FRAMEBUFFER_SRGB);
        }
        Ok(())
    }
}

/// Rejects empty viewports and, when the image is known, ones that leave it.
fn check_viewport(viewport: Viewport, image: Option<&Image>, role: &str) -> Result<()> {
    let inside = image.is_none_or(|image| {
        i64::from(viewport.x) + i64::from(viewport.width) <= i64::from(image.width)
            && i64::from(viewport.y) + i64::from(viewport.height) <= i64::from(image.height)
    });
    if viewport.x < 0 || viewport.y < 0 || viewport.width <= 0 || viewport.height <= 0 || !inside {
        return Err(GlError::invalid(format!("the {role} viewport is out of range")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_rules() {
        let base = ImageDescriptor::new(4, 4, ImageFormat::Rgba8Unorm);
        assert!(base.validate().is_ok());
        assert!(ImageDescriptor { samples: 4, texture: Some(true), ..base }.validate().is_err());
        assert!(ImageDescriptor { cubemap: true, array: 2, ..base }.validate().is_err());
        assert!(ImageDescriptor { array: 2, texture: Some(false), ..base }.validate().is_err());
        assert!(ImageDescriptor { data: Some(&[0; 8]), ..base }.validate().is_err());
        assert!(ImageDescriptor { data: Some(&[0; 64]), ..base }.validate().is_ok());
        assert!(ImageDescriptor { data: Some(&[0; 384]), cubemap: true, ..base }.validate().is_ok());
    }

    #[test]
    fn test_depth_formats_clear_to_far_plane() {
        assert_eq!(ClearValue::default_for(ImageFormat::Depth24Plus), ClearValue::DepthStencil(1.0, 0));
        assert_eq!(ClearValue::default_for(ImageFormat::Rgba32Uint), ClearValue::Uint([0; 4]));
    }

    #[test]
    fn test_viewport_bounds() {
        let image = Image {
            handle: 1,
            framebuffer: None,
            width: 8,
            height: 8,
            samples: 1,
            array: 0,
            cubemap: false,
            renderbuffer: false,
            target: gl::TEXTURE_2D,
            format: ImageFormat::Rgba8Unorm,
            clear_value: ClearValue::Float([0.0; 4]),
        };
        assert!(check_viewport(Viewport::new(0, 0, 8, 8), Some(&image), "source").is_ok());
        assert!(check_viewport(Viewport::new(4, 0, 8, 8), Some(&image), "source").is_err());
        assert!(check_viewport(Viewport::new(0, 0, 0, 8), None, "target").is_err());
        assert!(check_viewport(Viewport::new(0, 0, 4096, 4096), None, "target").is_ok());
    }
}
