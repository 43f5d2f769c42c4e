//! Caller-owned resources and their descriptors.
//!
//! - [`buffer`]: GPU buffers
//! - [`image`]: textures and renderbuffers, with their eager render-target set
//! - [`pipeline`]: drawable units composed of cached objects
//! - [`state`]: plain render-state values shared by descriptors and keys

pub mod buffer;
pub mod image;
pub mod pipeline;
pub mod state;

pub use buffer::{Buffer, BufferDescriptor};
pub use image::{ClearValue, Image, ImageDescriptor};
pub use pipeline::{
    LayoutBinding, Pipeline, PipelineDescriptor, ResourceBinding, VertexAttribute, VertexBufferLayout,
};
