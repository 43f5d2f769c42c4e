//! Error Types
//!
//! This module defines the error types returned by the cache, the builders
//! and the [`Context`](crate::Context) entry points.
//!
//! # Overview
//!
//! Recoverable failures fall into three groups:
//! - Invalid caller input, rejected before any native call is made
//! - Shader compilation and program link failures, carrying the driver log
//! - Native object creation failures reported by the backend
//!
//! Broken internal invariants (releasing an entry that is not live, binding
//! an identity no cache knows about) are not represented here. They panic.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_gl::errors::{GlError, Result};
//!
//! fn build() -> Result<()> {
//!     Err(GlError::InvalidParameter("viewport has zero width".into()))
//! }
//! ```

use std::fmt;

use thiserror::Error;

/// Shader stage, used to label compile errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Native shader type enum for this stage.
    #[inline]
    #[must_use]
    pub const fn to_gl(self) -> u32 {
        match self {
            Self::Vertex => crate::backend::gl::VERTEX_SHADER,
            Self::Fragment => crate::backend::gl::FRAGMENT_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("Vertex Shader"),
            Self::Fragment => f.write_str("Fragment Shader"),
        }
    }
}

/// The main error type for `myth-gl`.
#[derive(Error, Debug)]
pub enum GlError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// A caller-supplied value is out of range or inconsistent.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A handle refers to an object that was never created or already released.
    #[error("Invalid handle: {kind} is not live")]
    InvalidHandle {
        /// Kind of object the handle was expected to name
        kind: &'static str,
    },

    /// An image or vertex format name is not in the format tables.
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// The driver rejected a shader. `log` is the native info log.
    #[error("{stage} Error\n\n{log}")]
    ShaderCompile {
        /// Stage that failed
        stage: ShaderStage,
        /// Native compile log
        log: String,
    },

    /// The driver failed to link a program. `log` is the native info log.
    #[error("Linker Error\n\n{log}")]
    ProgramLink {
        /// Native link log
        log: String,
    },

    /// An `#include` directive names a source that was never registered.
    #[error("Missing include: \"{0}\"")]
    MissingInclude(String),

    /// Nested includes went deeper than the configured limit.
    #[error("Include depth exceeded while resolving \"{0}\"")]
    IncludeDepthExceeded(String),

    // ========================================================================
    // Native Errors
    // ========================================================================
    /// The backend could not create a native object.
    #[error("Failed to create {kind}: {message}")]
    ObjectCreation {
        /// Kind of native object
        kind: &'static str,
        /// Backend-provided message
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Settings could not be parsed.
    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),
}

impl GlError {
    /// Shorthand for [`GlError::InvalidParameter`].
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// Maps a backend creation failure for `kind`.
    pub(crate) fn creation(kind: &'static str) -> impl FnOnce(String) -> Self {
        move |message| Self::ObjectCreation { kind, message }
    }
}

/// Alias for `Result<T, GlError>`.
pub type Result<T> = std::result::Result<T, GlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_message_carries_stage_and_log() {
        let err = GlError::ShaderCompile {
            stage: ShaderStage::Fragment,
            log: "0:3: syntax error".to_string(),
        };
        assert_eq!(err.to_string(), "Fragment Shader Error\n\n0:3: syntax error");
    }

    #[test]
    fn test_link_error_message() {
        let err = GlError::ProgramLink { log: "undefined symbol".to_string() };
        assert_eq!(err.to_string(), "Linker Error\n\nundefined symbol");
    }
}
