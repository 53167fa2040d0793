/// CommandList - Vulkan implementation of the CommandList trait
///
/// One command pool per list, reset as a whole: the pool plays the role of
/// the command allocator and the primary buffer the role of the list.

use frame_harness::harness::{Error, Result};
use frame_harness::harness::device::{
    Buffer, CommandList, ResourceState, Texture, TextureDimension, UploadFootprint,
};
use frame_harness::harness_error;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::state_to_vk;
use crate::vulkan_texture::VulkanTexture;

fn vulkan_texture(texture: &dyn Texture) -> Result<&VulkanTexture> {
    texture.as_any().downcast_ref::<VulkanTexture>().ok_or_else(|| {
        harness_error!("harness::vulkan", "texture is not a Vulkan texture");
        Error::InvalidCommandListState("foreign texture".to_string())
    })
}

/// Vulkan command list implementation
pub struct VulkanCommandList {
    ctx: Arc<GpuContext>,
    /// Command pool owning the command buffer
    command_pool: vk::CommandPool,
    /// Command buffer for recording
    command_buffer: vk::CommandBuffer,
    /// Whether the command list is currently recording
    is_recording: bool,
    /// Whether the list was closed and can be submitted
    is_closed: bool,
}

impl VulkanCommandList {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        unsafe {
            // Create command pool
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT);

            let command_pool = ctx
                .device
                .create_command_pool(&command_pool_create_info, None)
                .map_err(|e| {
                    harness_error!("harness::vulkan", "Failed to create command pool: {:?}", e);
                    Error::BackendError(format!("Failed to create command pool: {:?}", e))
                })?;

            // Allocate command buffer
            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = match ctx.device.allocate_command_buffers(&command_buffer_allocate_info) {
                Ok(buffers) => buffers[0],
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    harness_error!("harness::vulkan", "Failed to allocate command buffer: {:?}", e);
                    return Err(Error::BackendError(format!(
                        "Failed to allocate command buffers: {:?}",
                        e
                    )));
                }
            };

            Ok(Self {
                ctx,
                command_pool,
                command_buffer,
                is_recording: false,
                is_closed: false,
            })
        }
    }

    /// Get the underlying Vulkan command buffer
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.is_closed
    }

    fn ensure_recording(&self, command: &str) -> Result<()> {
        if !self.is_recording {
            harness_error!("harness::vulkan", "{}: command list not recording", command);
            return Err(Error::InvalidCommandListState(format!(
                "{} recorded outside reset/close",
                command
            )));
        }
        Ok(())
    }

    /// Record one image barrier between two states
    ///
    /// The first barrier ever recorded on an image starts from UNDEFINED.
    fn image_barrier(&self, texture: &VulkanTexture, before: ResourceState, after: ResourceState) {
        let src = state_to_vk(before);
        let dst = state_to_vk(after);
        let (old_layout, src_access, src_stage) = if texture.take_first_use() {
            (
                vk::ImageLayout::UNDEFINED,
                vk::AccessFlags::empty(),
                vk::PipelineStageFlags::TOP_OF_PIPE | src.stage,
            )
        } else {
            (src.layout, src.access, src.stage)
        };

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(old_layout)
            .new_layout(dst.layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(texture.image)
            .subresource_range(texture.subresource_range())
            .src_access_mask(src_access)
            .dst_access_mask(dst.access);

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                self.command_buffer,
                src_stage,
                dst.stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }

    /// Move a never-used image into `state` before a command that needs it there
    fn ensure_initialized(&self, texture: &VulkanTexture, state: ResourceState) {
        if !texture.is_initialized() {
            self.image_barrier(texture, state, state);
        }
    }

    fn render_area(texture: &VulkanTexture) -> vk::Rect2D {
        vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: texture.info().width,
                height: texture.info().height,
            },
        }
    }
}

impl CommandList for VulkanCommandList {
    fn reset(&mut self) -> Result<()> {
        unsafe {
            if self.is_recording {
                // Discard the partial recording
                self.ctx.device.end_command_buffer(self.command_buffer).ok();
            }
            self.is_recording = false;
            self.is_closed = false;

            self.ctx
                .device
                .reset_command_pool(self.command_pool, vk::CommandPoolResetFlags::empty())
                .map_err(|e| {
                    harness_error!("harness::vulkan", "Failed to reset command pool: {:?}", e);
                    Error::CommandListResetFailed(format!("vkResetCommandPool failed: {:?}", e))
                })?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.ctx
                .device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| {
                    harness_error!("harness::vulkan", "Failed to begin command buffer: {:?}", e);
                    Error::CommandListResetFailed(format!("vkBeginCommandBuffer failed: {:?}", e))
                })?;
        }
        self.is_recording = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.is_recording {
            return Err(Error::CommandListCloseFailed(
                "command list is not recording".to_string(),
            ));
        }
        self.is_recording = false;
        unsafe {
            self.ctx
                .device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| {
                    harness_error!("harness::vulkan", "Failed to end command buffer: {:?}", e);
                    Error::CommandListCloseFailed(format!("vkEndCommandBuffer failed: {:?}", e))
                })?;
        }
        self.is_closed = true;
        Ok(())
    }

    fn transition(
        &mut self,
        texture: &dyn Texture,
        before: ResourceState,
        after: ResourceState,
    ) -> Result<()> {
        self.ensure_recording("transition")?;
        let texture = vulkan_texture(texture)?;
        self.image_barrier(texture, before, after);
        Ok(())
    }

    fn clear_render_target(&mut self, target: &dyn Texture, color: [f32; 4]) -> Result<()> {
        self.ensure_recording("clear_render_target")?;
        let target = vulkan_texture(target)?;
        self.ensure_initialized(target, ResourceState::RenderTarget);

        let color_attachments = [vk::RenderingAttachmentInfo::default()
            .image_view(target.view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue { float32: color },
            })];

        let rendering_info = vk::RenderingInfo::default()
            .render_area(Self::render_area(target))
            .layer_count(1)
            .color_attachments(&color_attachments);

        unsafe {
            self.ctx.device.cmd_begin_rendering(self.command_buffer, &rendering_info);
            self.ctx.device.cmd_end_rendering(self.command_buffer);
        }
        Ok(())
    }

    fn clear_depth_stencil(&mut self, target: &dyn Texture, depth: f32, stencil: u8) -> Result<()> {
        self.ensure_recording("clear_depth_stencil")?;
        let target = vulkan_texture(target)?;
        if !target.info().format.is_depth() {
            harness_error!("harness::vulkan", "clear_depth_stencil on color format {:?}", target.info().format);
            return Err(Error::InvalidCommandListState(format!(
                "clear_depth_stencil on non-depth format {:?}",
                target.info().format
            )));
        }
        self.ensure_initialized(target, ResourceState::DepthWrite);

        let attachment = vk::RenderingAttachmentInfo::default()
            .image_view(target.view)
            .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth,
                    stencil: stencil as u32,
                },
            });

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(Self::render_area(target))
            .layer_count(1)
            .depth_attachment(&attachment);
        if target.info().format.has_stencil() {
            rendering_info = rendering_info.stencil_attachment(&attachment);
        }

        unsafe {
            self.ctx.device.cmd_begin_rendering(self.command_buffer, &rendering_info);
            self.ctx.device.cmd_end_rendering(self.command_buffer);
        }
        Ok(())
    }

    fn copy_buffer_to_texture(
        &mut self,
        src: &dyn Buffer,
        dst: &dyn Texture,
        footprint: &UploadFootprint,
    ) -> Result<()> {
        self.ensure_recording("copy_buffer_to_texture")?;
        let buffer = src.as_any().downcast_ref::<VulkanBuffer>().ok_or_else(|| {
            harness_error!("harness::vulkan", "copy source is not a Vulkan buffer");
            Error::InvalidCommandListState("foreign buffer".to_string())
        })?;
        let texture = vulkan_texture(dst)?;
        if src.size() < footprint.total_size {
            harness_error!(
                "harness::vulkan",
                "staging buffer too small ({} < {} bytes)",
                src.size(), footprint.total_size
            );
            return Err(Error::InvalidDescriptor(format!(
                "staging buffer holds {} bytes, footprint needs {}",
                src.size(),
                footprint.total_size
            )));
        }
        self.ensure_initialized(texture, ResourceState::CopyDest);

        let info = texture.info();
        let texel_size = info.format.bytes_per_texel() as u64;
        let (layer_count, depth) = match info.dimension {
            TextureDimension::Tex3D => (1, footprint.slices),
            _ => (footprint.slices, 1),
        };

        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .buffer_row_length((footprint.row_pitch / texel_size) as u32)
            .buffer_image_height(footprint.rows)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: texture.aspect_mask(),
                mip_level: 0,
                base_array_layer: 0,
                layer_count,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D {
                width: info.width,
                height: info.height,
                depth,
            });

        unsafe {
            self.ctx.device.cmd_copy_buffer_to_image(
                self.command_buffer,
                buffer.buffer,
                texture.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanCommandList {
    fn drop(&mut self) {
        unsafe {
            // Destroying the pool frees its command buffer
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
