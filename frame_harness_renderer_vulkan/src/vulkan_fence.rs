/// Fence - timeline semaphore implementation of the Fence trait

use frame_harness::harness::Result;
use frame_harness::harness::device::Fence;
use frame_harness::harness_err;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Counting fence backed by a timeline semaphore
pub struct VulkanFence {
    ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
}

impl VulkanFence {
    pub(crate) fn new(ctx: Arc<GpuContext>, initial_value: u64) -> Result<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let create_info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);

        let semaphore = unsafe {
            ctx.device.create_semaphore(&create_info, None).map_err(|e| {
                harness_err!("harness::vulkan", "Failed to create timeline semaphore: {:?}", e)
            })?
        };
        Ok(Self { ctx, semaphore })
    }
}

impl Fence for VulkanFence {
    fn completed_value(&self) -> Result<u64> {
        unsafe {
            self.ctx
                .device
                .get_semaphore_counter_value(self.semaphore)
                .map_err(|e| harness_err!("harness::vulkan", "Failed to read fence value: {:?}", e))
        }
    }

    fn wait_until(&self, value: u64) -> Result<()> {
        let semaphores = [self.semaphore];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);
        unsafe {
            self.ctx
                .device
                .wait_semaphores(&wait_info, u64::MAX)
                .map_err(|e| {
                    harness_err!("harness::vulkan", "Failed to wait for fence value {}: {:?}", value, e)
                })
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}
