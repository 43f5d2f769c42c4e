//! Derived-Object Builders
//!
//! Each builder turns a canonical key into a native object, and each value
//! type knows how to tear its native object down again (see
//! [`NativeObject`](crate::lifecycle::NativeObject)). Builders only run on a
//! cache miss.
//!
//! | Category          | Key                  | Value                  |
//! |-------------------|----------------------|------------------------|
//! | render-target set | [`FramebufferKey`]   | [`Framebuffer`]        |
//! | vertex-input set  | [`VertexArrayKey`]   | [`VertexArray`]        |
//! | sampler           | [`SamplerKey`]       | [`Sampler`]            |
//! | buffer bindings   | [`BufferBindingsKey`]| [`BufferBindingTable`] |
//! | image bindings    | [`ImageBindingsKey`] | [`ImageBindingTable`]  |
//! | global state      | [`GlobalSettings`]   | [`GlobalSettings`]     |
//! | shader            | [`ShaderKey`]        | [`Shader`]             |
//! | program           | [`ProgramKey`]       | [`Program`]            |

pub mod bindings;
pub mod framebuffer;
pub mod global_settings;
pub mod includes;
pub mod program;
pub mod sampler;
pub mod vertex_array;

pub use bindings::{BufferBindingTable, BufferRange, ImageBindingTable, TextureBinding};
pub use framebuffer::Framebuffer;
pub use global_settings::GlobalSettings;
pub use program::{ActiveAttribute, ActiveUniform, ActiveUniformBlock, Program, ProgramReflection, Shader};
pub use sampler::Sampler;
pub use vertex_array::VertexArray;

use crate::cache::ResourceCache;
use crate::cache::keys::{
    BufferBindingsKey, FramebufferKey, ImageBindingsKey, ProgramKey, SamplerKey, ShaderKey, VertexArrayKey,
};
use crate::ids::{
    BufferBindingsId, FramebufferId, GlobalSettingsId, ImageBindingsId, ProgramId, SamplerId, ShaderId, VertexArrayId,
};

pub type FramebufferCache = ResourceCache<FramebufferId, FramebufferKey, Framebuffer>;
pub type VertexArrayCache = ResourceCache<VertexArrayId, VertexArrayKey, VertexArray>;
pub type SamplerCache = ResourceCache<SamplerId, SamplerKey, Sampler>;
pub type BufferBindingsCache = ResourceCache<BufferBindingsId, BufferBindingsKey, BufferBindingTable>;
pub type ImageBindingsCache = ResourceCache<ImageBindingsId, ImageBindingsKey, ImageBindingTable>;
pub type GlobalSettingsCache = ResourceCache<GlobalSettingsId, GlobalSettings, GlobalSettings>;
pub type ShaderCache = ResourceCache<ShaderId, ShaderKey, Shader>;
pub type ProgramCache = ResourceCache<ProgramId, ProgramKey, Program>;
