/// Buffer - Vulkan implementation of the Buffer trait
///
/// Upload-heap allocations are persistently mapped by gpu-allocator, so
/// `map`/`unmap` only hand out and withdraw the pointer.

use frame_harness::harness::{Error, Result};
use frame_harness::harness::device::{Buffer, HeapKind};
use frame_harness::harness_error;
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::any::Any;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer implementation
pub struct VulkanBuffer {
    /// Shared GPU context (device, allocator, queue)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    /// Buffer size
    size: u64,
    heap: HeapKind,
}

impl VulkanBuffer {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        buffer: vk::Buffer,
        allocation: Allocation,
        size: u64,
        heap: HeapKind,
    ) -> Self {
        Self {
            ctx,
            buffer,
            allocation: Some(allocation),
            size,
            heap,
        }
    }
}

impl Buffer for VulkanBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn heap(&self) -> HeapKind {
        self.heap
    }

    fn map(&mut self) -> Result<NonNull<u8>> {
        if !self.heap.is_cpu_visible() {
            return Err(Error::InvalidBufferState(
                "device-local buffers cannot be mapped".to_string(),
            ));
        }
        let pointer = self
            .allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .ok_or_else(|| {
                harness_error!("harness::vulkan", "Buffer map failed: allocation is not host-visible");
                Error::InvalidBufferState("allocation is not host-visible".to_string())
            })?;
        Ok(pointer.cast::<u8>())
    }

    fn unmap(&mut self) {
        // The allocation stays mapped until it is freed
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                self.ctx.lock_allocator().free(allocation).ok();
            }

            // Destroy buffer
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
