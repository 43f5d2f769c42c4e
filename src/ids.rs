//! Handle types.
//!
//! Every object the crate hands out, and every Resource Cache entry, is
//! addressed through a generational [`slotmap`] key. A released handle never
//! aliases a later object, so stale handles are always detected.

use slotmap::new_key_type;

new_key_type! {
    // ── Caller-owned objects ──
    /// A GPU buffer created by [`Context::buffer`](crate::Context::buffer).
    pub struct BufferId;
    /// An image created by [`Context::image`](crate::Context::image).
    pub struct ImageId;
    /// A pipeline created by [`Context::pipeline`](crate::Context::pipeline).
    pub struct PipelineId;

    // ── Cache entries ──
    pub struct FramebufferId;
    pub struct VertexArrayId;
    pub struct SamplerId;
    pub struct BufferBindingsId;
    pub struct ImageBindingsId;
    pub struct GlobalSettingsId;
    pub struct ShaderId;
    pub struct ProgramId;
}
