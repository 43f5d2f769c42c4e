//! Vertex-input sets.

use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::backend::{GlBackend, NativeHandle, gl};
use crate::binder::StateBinder;
use crate::cache::keys::{VertexArrayKey, VertexAttributeKey};
use crate::errors::{GlError, Result};
use crate::ids::BufferId;
use crate::resources::buffer::Buffer;
use crate::resources::pipeline::VertexBufferLayout;
use crate::resources::state::StepMode;

/// A native vertex array object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexArray {
    pub handle: NativeHandle,
    pub attributes: u32,
}

/// Flattens vertex buffer layouts into the ordered attribute list of a key.
pub(crate) fn vertex_array_key(
    buffers: &SlotMap<BufferId, Buffer>,
    layouts: &[VertexBufferLayout],
    index_buffer: Option<BufferId>,
) -> Result<VertexArrayKey> {
    let mut attributes = SmallVec::new();
    let mut locations = FxHashSet::default();

    for layout in layouts {
        let buffer = buffers.get(layout.buffer).ok_or(GlError::InvalidHandle { kind: "buffer" })?;
        for attribute in &layout.attributes {
            if !locations.insert(attribute.location) {
                return Err(GlError::invalid(format!(
                    "vertex attribute location {} is fed twice",
                    attribute.location
                )));
            }
            let end = u64::from(attribute.offset) + u64::from(attribute.format.info().size);
            if end > u64::from(buffer.size) {
                return Err(GlError::invalid(format!(
                    "vertex attribute at location {} reads past the end of its buffer",
                    attribute.location
                )));
            }
            attributes.push(VertexAttributeKey {
                buffer: layout.buffer,
                location: attribute.location,
                offset: attribute.offset,
                stride: layout.stride,
                divisor: match layout.step_mode {
                    StepMode::Vertex => 0,
                    StepMode::Instance => 1,
                },
                format: attribute.format,
            });
        }
    }

    if let Some(index) = index_buffer
        && !buffers.contains_key(index)
    {
        return Err(GlError::InvalidHandle { kind: "buffer" });
    }

    Ok(VertexArrayKey { index_buffer, attributes })
}

/// Creates the vertex array for `key`. Leaves it bound through `binder`.
pub(crate) fn build_vertex_array<B: GlBackend>(
    gl: &mut B,
    binder: &mut StateBinder,
    buffers: &SlotMap<BufferId, Buffer>,
    key: &VertexArrayKey,
) -> Result<VertexArray> {
    let handle_of = |id: BufferId| {
        buffers
            .get(id)
            .map(|buffer| buffer.handle)
            .ok_or(GlError::InvalidHandle { kind: "buffer" })
    };
    let sources = key
        .attributes
        .iter()
        .map(|attribute| handle_of(attribute.buffer))
        .collect::<Result<SmallVec<[NativeHandle; 8]>>>()?;
    let index_buffer = key.index_buffer.map(handle_of).transpose()?;

    let handle = gl.create_vertex_array().map_err(GlError::creation("vertex array"))?;
    binder.bind_vertex_array(gl, handle);

    for (attribute, &buffer) in key.attributes.iter().zip(&sources) {
        let info = attribute.format.info();
        let (location, stride, offset) = (attribute.location, attribute.stride as i32, attribute.offset as i32);
        gl.bind_buffer(gl::ARRAY_BUFFER, buffer);
        if info.integer {
            gl.vertex_attrib_i_pointer(location, info.components, info.ty, stride, offset);
        } else {
            gl.vertex_attrib_pointer(location, info.components, info.ty, info.normalized, stride, offset);
        }
        gl.vertex_attrib_divisor(location, attribute.divisor);
        gl.enable_vertex_attrib_array(location);
    }

    if let Some(index_buffer) = index_buffer {
        gl.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, index_buffer);
    }

    log::debug!("Created vertex array {handle} ({} attributes)", key.attributes.len());

    Ok(VertexArray { handle, attributes: key.attributes.len() as u32 })
}
