//! Context Settings
//!
//! [`ContextSettings`] holds the limits and driver toggles a
//! [`Context`](crate::Context) is created with. Settings are plain data and
//! can be loaded from JSON; missing fields take their default.
//!
//! ```rust,ignore
//! use myth_gl::ContextSettings;
//!
//! let settings = ContextSettings::from_json(r#"{ "max_sampler_bindings": 8 }"#)?;
//! assert!(settings.framebuffer_srgb);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{GlError, Result};

/// Hard ceiling on color attachments: the color write mask packs 4 bits per
/// attachment into a `u64`.
pub const MAX_COLOR_ATTACHMENTS: u32 = 16;

/// Limits and driver toggles applied at context creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// Uniform-buffer binding slots available to a buffer-binding set.
    pub max_uniform_buffer_bindings: u32,
    /// Texture units available to an image-binding set. Must stay below the
    /// driver's unit count: the last unit is reserved for uploads.
    pub max_sampler_bindings: u32,
    /// Color attachments per render-target set, at most [`MAX_COLOR_ATTACHMENTS`].
    pub max_color_attachments: u32,
    /// Nesting limit for `#include` resolution.
    pub max_include_depth: u32,
    /// Enable `FRAMEBUFFER_SRGB` at startup.
    pub framebuffer_srgb: bool,
    /// Enable `TEXTURE_CUBE_MAP_SEAMLESS` at startup.
    pub seamless_cubemaps: bool,
    /// Enable `PROGRAM_POINT_SIZE` at startup.
    pub program_point_size: bool,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            max_uniform_buffer_bindings: 16,
            max_sampler_bindings: 16,
            max_color_attachments: 8,
            max_include_depth: 16,
            framebuffer_srgb: true,
            seamless_cubemaps: true,
            program_point_size: true,
        }
    }
}

impl ContextSettings {
    /// Parses settings from a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks the limits against each other and the driver's texture units.
    pub(crate) fn validate(&self, texture_units: u32) -> Result<()> {
        if self.max_color_attachments == 0 || self.max_color_attachments > MAX_COLOR_ATTACHMENTS {
            return Err(GlError::invalid(format!(
                "max_color_attachments must be within 1..={MAX_COLOR_ATTACHMENTS}"
            )));
        }
        if self.max_sampler_bindings >= texture_units {
            return Err(GlError::invalid(format!(
                "max_sampler_bindings ({}) must be below the driver's {texture_units} texture units",
                self.max_sampler_bindings
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = ContextSettings::from_json(r#"{ "max_sampler_bindings": 4, "framebuffer_srgb": false }"#).unwrap();
        assert_eq!(settings.max_sampler_bindings, 4);
        assert!(!settings.framebuffer_srgb);
        assert_eq!(settings.max_uniform_buffer_bindings, 16);
    }

    #[test]
    fn test_malformed_json_is_a_settings_error() {
        assert!(matches!(ContextSettings::from_json("{ nope"), Err(GlError::Settings(_))));
    }

    #[test]
    fn test_sampler_limit_must_leave_upload_unit() {
        let settings = ContextSettings::default();
        assert!(settings.validate(16).is_err());
        assert!(settings.validate(17).is_ok());
    }
}
