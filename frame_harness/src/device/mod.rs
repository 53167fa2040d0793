/// Device module - backend traits and the types they exchange
///
/// A backend (Vulkan, Direct3D 12, the test mock) implements these traits.
/// The components in the crate root (DeviceContext, FrameSync, ...) are
/// written only against them.

pub mod adapter;
pub mod backend;
pub mod graphics_device;
pub mod queue;
pub mod fence;
pub mod resource;
pub mod buffer;
pub mod texture;
pub mod swapchain;
pub mod command_list;

pub use adapter::*;
pub use backend::*;
pub use graphics_device::*;
pub use queue::*;
pub use fence::*;
pub use resource::*;
pub use buffer::*;
pub use texture::*;
pub use swapchain::*;
pub use command_list::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
