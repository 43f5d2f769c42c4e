//! # Myth GL
//!
//! Content-addressed GPU object cache and minimal-transition state binder for
//! stateful OpenGL-style drivers.
//!
//! Pipelines are described declaratively. Every derived native object a
//! pipeline needs (framebuffer, vertex array, samplers, binding tables,
//! fixed-function state, shaders, program) is looked up by a canonical key
//! and materialized at most once per context, then shared by use count.
//! Rendering goes through a binder that skips every transition to an
//! identity that is already current.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use myth_gl::*;
//!
//! let mut ctx = Context::new(RecordingBackend::new(), ContextSettings::default())?;
//! let target = ctx.image(&ImageDescriptor::new(64, 64, ImageFormat::Rgba8Unorm))?;
//! let pipeline = ctx.pipeline(&PipelineDescriptor {
//!     vertex_shader: VERTEX.into(),
//!     fragment_shader: FRAGMENT.into(),
//!     framebuffer: vec![target],
//!     vertex_count: 3,
//!     ..Default::default()
//! })?;
//! ctx.render(pipeline)?;
//! ctx.release(pipeline);
//! ```
//!
//! ## Modules
//!
//! - [`cache`]: the generic Resource Cache and canonical keys
//! - [`builders`]: one builder per derived-object category
//! - [`binder`]: the Active-State Binder
//! - [`lifecycle`]: cascading release of pipelines, images and buffers
//! - [`backend`]: the native driver boundary
//! - [`resources`]: caller-owned objects and their descriptors

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod backend;
pub mod binder;
pub mod builders;
pub mod cache;
pub mod context;
pub mod errors;
pub mod formats;
pub mod ids;
pub mod lifecycle;
pub mod resources;
pub mod settings;

pub use backend::{GlBackend, GlCall, NativeHandle, NativeObjectKind, RecordingBackend};
pub use binder::{BinderStats, StateBinder};
pub use cache::ResourceCache;
pub use context::{Context, ContextInfo, ResourceCaches};
pub use errors::{GlError, Result, ShaderStage};
pub use formats::{ImageFormat, VertexFormat};
pub use ids::{BufferId, ImageId, PipelineId};
pub use lifecycle::ReleaseTarget;
pub use resources::state::*;
pub use resources::{
    Buffer, BufferDescriptor, ClearValue, Image, ImageDescriptor, LayoutBinding, Pipeline, PipelineDescriptor,
    ResourceBinding, VertexAttribute, VertexBufferLayout,
};
pub use settings::ContextSettings;

#[cfg(all(feature = "glow", not(target_arch = "wasm32")))]
pub use backend::GlowBackend;
