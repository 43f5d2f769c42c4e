//! Active-State Binder
//!
//! The driver keeps one current object per binding point and changing it is
//! not free. [`StateBinder`] mirrors what is currently bound, one slot per
//! category plus the viewport, and only issues native calls when a request
//! names a different identity than the slot holds.
//!
//! # Identities
//!
//! | Slot              | Identity                         |
//! |-------------------|----------------------------------|
//! | framebuffer       | native name (`0` = default)      |
//! | program           | native name                      |
//! | vertex array      | native name                      |
//! | buffer bindings   | [`BufferBindingsId`]             |
//! | image bindings    | [`ImageBindingsId`]              |
//! | global state      | [`GlobalSettingsId`]             |
//! | viewport          | the rectangle itself             |
//!
//! Every slot starts out unbound, so the first request always reaches the
//! driver. When a native object is destroyed its slot is forgotten: drivers
//! recycle names, and a recycled name must not be mistaken for the object
//! that is already bound.

use crate::backend::{GlBackend, NativeHandle, gl};
use crate::builders::{BufferBindingTable, GlobalSettings, ImageBindingTable};
use crate::ids::{BufferBindingsId, GlobalSettingsId, ImageBindingsId};
use crate::resources::state::Viewport;

#[derive(Debug, Clone, Copy)]
struct Slot<T>(Option<T>);

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T: Copy + PartialEq> Slot<T> {
    /// Records `identity` as current. `false` if it already was.
    #[inline]
    fn transition(&mut self, identity: T) -> bool {
        if self.0 == Some(identity) {
            return false;
        }
        self.0 = Some(identity);
        true
    }

    #[inline]
    fn forget(&mut self, identity: T) {
        if self.0 == Some(identity) {
            self.0 = None;
        }
    }
}

/// Counters of issued and suppressed transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinderStats {
    pub applied: u64,
    pub skipped: u64,
}

/// Snapshot of the driver's current bindings. One per context.
#[derive(Debug, Default)]
pub struct StateBinder {
    framebuffer: Slot<NativeHandle>,
    program: Slot<NativeHandle>,
    vertex_array: Slot<NativeHandle>,
    buffer_bindings: Slot<BufferBindingsId>,
    image_bindings: Slot<ImageBindingsId>,
    global_settings: Slot<GlobalSettingsId>,
    viewport: Slot<Viewport>,
    stats: BinderStats,
}

impl StateBinder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn record(&mut self, slot: &'static str, changed: bool) -> bool {
        if changed {
            self.stats.applied += 1;
        } else {
            self.stats.skipped += 1;
            log::trace!("{slot} already bound");
        }
        changed
    }

    // ─── Transitions ─────────────────────────────────────────────────────────

    pub fn bind_framebuffer<B: GlBackend>(&mut self, gl: &mut B, framebuffer: NativeHandle) -> bool {
        let changed = self.framebuffer.transition(framebuffer);
        if changed {
            gl.bind_framebuffer(gl::FRAMEBUFFER, framebuffer);
        }
        self.record("framebuffer", changed)
    }

    pub fn bind_program<B: GlBackend>(&mut self, gl: &mut B, program: NativeHandle) -> bool {
        let changed = self.program.transition(program);
        if changed {
            gl.use_program(program);
        }
        self.record("program", changed)
    }

    pub fn bind_vertex_array<B: GlBackend>(&mut self, gl: &mut B, vertex_array: NativeHandle) -> bool {
        let changed = self.vertex_array.transition(vertex_array);
        if changed {
            gl.bind_vertex_array(vertex_array);
        }
        self.record("vertex array", changed)
    }

    /// Binds every populated slot of `table` as a uniform-buffer range.
    pub fn bind_buffer_bindings<B: GlBackend>(
        &mut self,
        gl: &mut B,
        id: BufferBindingsId,
        table: &BufferBindingTable,
    ) -> bool {
        let changed = self.buffer_bindings.transition(id);
        if changed {
            for (index, range) in table.slots.iter().enumerate() {
                if let Some(range) = range {
                    gl.bind_buffer_range(gl::UNIFORM_BUFFER, index as u32, range.buffer, range.offset, range.size);
                }
            }
        }
        self.record("buffer bindings", changed)
    }

    /// Binds every populated slot of `table` to its texture unit.
    pub fn bind_image_bindings<B: GlBackend>(
        &mut self,
        gl: &mut B,
        id: ImageBindingsId,
        table: &ImageBindingTable,
    ) -> bool {
        let changed = self.image_bindings.transition(id);
        if changed {
            for (index, binding) in table.slots.iter().enumerate() {
                if let Some(binding) = binding {
                    gl.active_texture(gl::TEXTURE0 + index as u32);
                    gl.bind_texture(binding.target, binding.image);
                    gl.bind_sampler(index as u32, binding.sampler);
                }
            }
        }
        self.record("image bindings", changed)
    }

    /// Re-applies every field of `settings` when the block changes.
    pub fn bind_global_settings<B: GlBackend>(
        &mut self,
        gl: &mut B,
        id: GlobalSettingsId,
        settings: &GlobalSettings,
    ) -> bool {
        let changed = self.global_settings.transition(id);
        if changed {
            settings.apply(gl);
        }
        self.record("global settings", changed)
    }

    pub fn set_viewport<B: GlBackend>(&mut self, gl: &mut B, viewport: Viewport) -> bool {
        let changed = self.viewport.transition(viewport);
        if changed {
            gl.viewport(viewport.x, viewport.y, viewport.width, viewport.height);
        }
        self.record("viewport", changed)
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn current_framebuffer(&self) -> Option<NativeHandle> {
        self.framebuffer.0
    }

    #[inline]
    #[must_use]
    pub fn current_program(&self) -> Option<NativeHandle> {
        self.program.0
    }

    #[inline]
    #[must_use]
    pub fn current_vertex_array(&self) -> Option<NativeHandle> {
        self.vertex_array.0
    }

    #[inline]
    #[must_use]
    pub fn current_global_settings(&self) -> Option<GlobalSettingsId> {
        self.global_settings.0
    }

    #[inline]
    #[must_use]
    pub fn current_viewport(&self) -> Option<Viewport> {
        self.viewport.0
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> BinderStats {
        self.stats
    }

    // ─── Invalidation ────────────────────────────────────────────────────────

    pub(crate) fn forget_framebuffer(&mut self, framebuffer: NativeHandle) {
        self.framebuffer.forget(framebuffer);
    }

    pub(crate) fn forget_program(&mut self, program: NativeHandle) {
        self.program.forget(program);
    }

    pub(crate) fn forget_vertex_array(&mut self, vertex_array: NativeHandle) {
        self.vertex_array.forget(vertex_array);
    }

    pub(crate) fn forget_buffer_bindings(&mut self, id: BufferBindingsId) {
        self.buffer_bindings.forget(id);
    }

    pub(crate) fn forget_image_bindings(&mut self, id: ImageBindingsId) {
        self.image_bindings.forget(id);
    }

    pub(crate) fn forget_global_settings(&mut self, id: GlobalSettingsId) {
        self.global_settings.forget(id);
    }

    /// Marks the framebuffer slot unknown after it was changed behind the binder's back.
    pub(crate) fn invalidate_framebuffer(&mut self) {
        self.framebuffer = Slot::default();
    }
}
