//! GPU buffers.

use crate::backend::{GlBackend, NativeHandle, gl};
use crate::context::Context;
use crate::errors::{GlError, Result};
use crate::ids::BufferId;

/// A native buffer object owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buffer {
    pub(crate) handle: NativeHandle,
    pub size: u32,
    pub dynamic: bool,
}

impl Buffer {
    #[inline]
    #[must_use]
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }
}

/// Parameters of [`Context::buffer`].
///
/// Exactly one of `size` and `data` must be set.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferDescriptor<'a> {
    pub size: Option<u32>,
    pub data: Option<&'a [u8]>,
    pub dynamic: bool,
}

impl<'a> BufferDescriptor<'a> {
    #[must_use]
    pub fn with_size(size: u32) -> Self {
        Self { size: Some(size), ..Default::default() }
    }

    #[must_use]
    pub fn with_data(data: &'a [u8]) -> Self {
        Self { data: Some(data), ..Default::default() }
    }

    fn resolved_size(&self) -> Result<u32> {
        let size = match (self.size, self.data) {
            (Some(size), None) => size,
            (None, Some(data)) => u32::try_from(data.len())
                .map_err(|_| GlError::invalid(format!("buffer data of {} bytes is too large", data.len())))?,
            (None, None) => return Err(GlError::invalid("a buffer needs either a size or initial data")),
            (Some(_), Some(_)) => return Err(GlError::invalid("a buffer takes a size or initial data, not both")),
        };
        if size == 0 || size > i32::MAX as u32 {
            return Err(GlError::invalid(format!("invalid buffer size {size}")));
        }
        Ok(size)
    }
}

impl<B: GlBackend> Context<B> {
    /// Creates a buffer, optionally initialized with data.
    pub fn buffer(&mut self, desc: &BufferDescriptor<'_>) -> Result<BufferId> {
        let size = desc.resolved_size()?;
        let usage = if desc.dynamic { gl::DYNAMIC_DRAW } else { gl::STATIC_DRAW };

        let handle = self.gl.create_buffer().map_err(GlError::creation("buffer"))?;
        self.gl.bind_buffer(gl::ARRAY_BUFFER, handle);
        self.gl.buffer_data(gl::ARRAY_BUFFER, size as i32, desc.data, usage);

        log::debug!("Created buffer {handle} ({size} bytes, dynamic: {})", desc.dynamic);
        Ok(self.buffers.insert(Buffer { handle, size, dynamic: desc.dynamic }))
    }

    /// Overwrites `data.len()` bytes of a buffer starting at `offset`.
    pub fn write_buffer(&mut self, id: BufferId, offset: u32, data: &[u8]) -> Result<()> {
        let buffer = self.buffers.get(id).ok_or(GlError::InvalidHandle { kind: "buffer" })?;
        if data.is_empty() {
            return Err(GlError::invalid("buffer write is empty"));
        }
        if u64::from(offset) + data.len() as u64 > u64::from(buffer.size) {
            return Err(GlError::invalid(format!(
                "write of {} bytes at offset {offset} overflows a buffer of {} bytes",
                data.len(),
                buffer.size
            )));
        }

        self.gl.bind_buffer(gl::ARRAY_BUFFER, buffer.handle);
        self.gl.buffer_sub_data(gl::ARRAY_BUFFER, offset as i32, data);
        Ok(())
    }

    #[must_use]
    pub fn get_buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_and_data_are_exclusive() {
        let both = BufferDescriptor { size: Some(4), data: Some(&[0; 4]), dynamic: false };
        assert!(both.resolved_size().is_err());
        assert!(BufferDescriptor::default().resolved_size().is_err());
        assert!(BufferDescriptor::with_size(0).resolved_size().is_err());
        assert_eq!(BufferDescriptor::with_data(&[1, 2, 3]).resolved_size().unwrap(), 3);
    }
}
