/// CommandList trait - one allocator/list pair

use std::any::Any;

use crate::device::{Buffer, ResourceState, Texture, UploadFootprint};
use crate::error::Result;

/// Backend command list
///
/// Created closed. `reset` reopens it for recording and `close` finalizes
/// it for submission. State bookkeeping lives in `CommandRecorder`.
pub trait CommandList: Send + Sync {
    /// Reset the allocator and reopen the list for recording
    fn reset(&mut self) -> Result<()>;

    /// Finalize the recorded commands
    fn close(&mut self) -> Result<()>;

    /// Record a state transition barrier
    fn transition(
        &mut self,
        texture: &dyn Texture,
        before: ResourceState,
        after: ResourceState,
    ) -> Result<()>;

    /// Clear a color target (must be in `RenderTarget` state)
    fn clear_render_target(&mut self, target: &dyn Texture, color: [f32; 4]) -> Result<()>;

    /// Clear a depth/stencil target (must be in `DepthWrite` state)
    fn clear_depth_stencil(&mut self, target: &dyn Texture, depth: f32, stencil: u8) -> Result<()>;

    /// Copy staged texels into the top mip of `dst` (must be in `CopyDest` state)
    fn copy_buffer_to_texture(
        &mut self,
        src: &dyn Buffer,
        dst: &dyn Texture,
        footprint: &UploadFootprint,
    ) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}
