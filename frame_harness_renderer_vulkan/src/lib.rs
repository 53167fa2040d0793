/*!
# Frame Harness - Vulkan Backend

Vulkan implementation of the frame_harness device traits.

This crate provides a [`Backend`](frame_harness::harness::device::Backend) built
on the Ash bindings with gpu-allocator for memory management. Hand a
[`VulkanBackend`] to `DeviceContext::new` (or `GraphicsContext::new`) and the
harness drives it like any other backend.

Requires Vulkan 1.3 with timeline semaphores and dynamic rendering.

# Example

```no_run
use frame_harness::harness::Config;
use frame_harness_renderer_vulkan::VulkanBackend;
# fn run(display: raw_window_handle::RawDisplayHandle) -> frame_harness::harness::Result<()> {
let backend = VulkanBackend::new(&Config::default(), display)?;
# Ok(())
# }
```
*/

// Shared instance/device state
mod vulkan_context;
mod vulkan_format;

// Trait implementations
mod vulkan_backend;
mod vulkan_device;
mod vulkan_queue;
mod vulkan_fence;
mod vulkan_command_list;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_swapchain;

// Validation layer message routing
#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan_backend::{VulkanBackend, MIN_FEATURE_LEVEL};
pub use vulkan_context::GpuContext;
pub use vulkan_device::VulkanGraphicsDevice;
pub use vulkan_queue::VulkanQueue;
pub use vulkan_fence::VulkanFence;
pub use vulkan_command_list::VulkanCommandList;
pub use vulkan_buffer::VulkanBuffer;
pub use vulkan_texture::VulkanTexture;
pub use vulkan_swapchain::VulkanSwapchain;

// Re-export debug utilities
#[cfg(feature = "vulkan-validation")]
pub use debug::{get_validation_stats, log_validation_stats_report, ValidationStats};
