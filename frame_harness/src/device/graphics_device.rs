/// GraphicsDevice trait - logical device and object factory

use crate::device::{
    AdapterInfo, Buffer, BufferDesc, CommandList, Fence, Queue, SurfaceHandle,
    Swapchain, SwapchainDesc, Texture, TextureDesc, UploadFootprint,
};
use crate::error::Result;

/// Optional device capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Immediate (uncapped) present with tearing on variable-refresh displays
    AllowTearing,
}

/// Logical device created on one adapter
///
/// Every other backend object is created through this trait and must be
/// dropped before the device.
pub trait GraphicsDevice: Send + Sync {
    /// Adapter the device was created on
    fn adapter(&self) -> &AdapterInfo;

    /// Create the direct (graphics-capable) queue at normal priority
    ///
    /// # Errors
    ///
    /// `Error::QueueCreationFailed`
    fn create_queue(&self) -> Result<Box<dyn Queue>>;

    /// Probe an optional capability (absence is not an error)
    fn query_feature(&self, feature: Feature) -> bool;

    /// Create a counting fence starting at `initial_value`
    fn create_fence(&self, initial_value: u64) -> Result<Box<dyn Fence>>;

    /// Create a command allocator/list pair, already closed
    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    /// Create the presentation chain bound to `surface` and presenting on `queue`
    ///
    /// # Errors
    ///
    /// `Error::SurfaceCreationFailed`
    fn create_swapchain(
        &self,
        queue: &dyn Queue,
        surface: &SurfaceHandle,
        desc: &SwapchainDesc,
    ) -> Result<Box<dyn Swapchain>>;

    /// Allocate a linear buffer
    ///
    /// # Errors
    ///
    /// `Error::ResourceAllocationFailed`
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Box<dyn Buffer>>;

    /// Allocate an image (the descriptor is already validated)
    ///
    /// # Errors
    ///
    /// `Error::ResourceAllocationFailed`
    fn create_texture(&self, desc: &TextureDesc) -> Result<Box<dyn Texture>>;

    /// Staging layout required to upload the top mip of `texture`
    fn upload_footprint(&self, texture: &dyn Texture) -> UploadFootprint;
}
