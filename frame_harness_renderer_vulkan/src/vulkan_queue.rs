/// Queue - Vulkan implementation of the Queue trait
///
/// All queues created by one device share the same `VkQueue`, guarded by the
/// context's queue lock.

use frame_harness::harness::{Error, Result};
use frame_harness::harness::device::{CommandList, Fence, Queue};
use frame_harness::{harness_err, harness_error, harness_trace};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_command_list::VulkanCommandList;
use crate::vulkan_context::GpuContext;
use crate::vulkan_fence::VulkanFence;

/// Direct (graphics) queue
pub struct VulkanQueue {
    ctx: Arc<GpuContext>,
}

impl VulkanQueue {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Self {
        Self { ctx }
    }

    pub(crate) fn gpu_context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }
}

impl Queue for VulkanQueue {
    fn submit(&self, list: &dyn CommandList) -> Result<()> {
        let list = list
            .as_any()
            .downcast_ref::<VulkanCommandList>()
            .ok_or_else(|| {
                harness_error!("harness::vulkan", "submit: command list is not a Vulkan command list");
                Error::SubmissionFailed("foreign command list".to_string())
            })?;
        if !list.is_closed() {
            harness_error!("harness::vulkan", "submit: command list is not closed");
            return Err(Error::SubmissionFailed("command list is not closed".to_string()));
        }

        let command_buffers = [list.command_buffer()];
        let _queue = self.ctx.lock_queue();
        let mut present_sync = self.ctx.lock_present_sync();

        // An acquired swap image: wait for it and signal render-finished for present
        let wait_semaphores: Vec<vk::Semaphore> = present_sync.wait.into_iter().collect();
        let wait_stages = vec![vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT; wait_semaphores.len()];
        let signal_semaphores: Vec<vk::Semaphore> = present_sync.signal.into_iter().collect();

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| {
                    harness_error!("harness::vulkan", "Failed to submit commands to GPU queue: {:?}", e);
                    Error::SubmissionFailed(format!("vkQueueSubmit failed: {:?}", e))
                })?;
        }

        if let Some(signal) = present_sync.signal.take() {
            present_sync.wait = None;
            present_sync.present_wait = Some(signal);
        }
        self.ctx.bump_work_serial();
        Ok(())
    }

    fn signal(&self, fence: &dyn Fence, value: u64) -> Result<()> {
        let fence = fence
            .as_any()
            .downcast_ref::<VulkanFence>()
            .ok_or_else(|| harness_err!("harness::vulkan", "signal: fence is not a Vulkan fence"))?;

        let signal_semaphores = [fence.semaphore];
        let signal_values = [value];
        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::default()
            .signal_semaphore_values(&signal_values);
        let submit_info = vk::SubmitInfo::default()
            .signal_semaphores(&signal_semaphores)
            .push_next(&mut timeline_info);

        let _queue = self.ctx.lock_queue();
        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| {
                    harness_error!("harness::vulkan", "Failed to signal fence value {}: {:?}", value, e);
                    Error::SubmissionFailed(format!("fence signal failed: {:?}", e))
                })?;
        }
        harness_trace!("harness::vulkan", "fence signal {} enqueued", value);
        Ok(())
    }

    fn work_serial(&self) -> u64 {
        self.ctx.work_serial()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
