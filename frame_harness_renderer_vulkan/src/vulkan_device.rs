/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Central object for creating resources. Every object it creates holds the
/// shared `GpuContext`, so the logical device outlives all of them.

use frame_harness::harness::{Error, Result};
use frame_harness::harness::device::{
    AdapterInfo, Buffer, BufferDesc, CommandList, Feature, Fence, GraphicsDevice, HeapKind,
    Queue, SurfaceHandle, Swapchain, SwapchainDesc, Texture, TextureDesc, TextureLayout,
    UploadFootprint,
};
use frame_harness::{harness_debug, harness_err, harness_error};
use ash::vk;
use gpu_allocator::vulkan::{AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_command_list::VulkanCommandList;
use crate::vulkan_context::GpuContext;
use crate::vulkan_fence::VulkanFence;
use crate::vulkan_format::{
    aspect_mask, depth_fallback, format_to_vk, image_type, sample_count_to_vk,
    texture_usage_to_vk, view_type,
};
use crate::vulkan_queue::VulkanQueue;
use crate::vulkan_swapchain::VulkanSwapchain;
use crate::vulkan_texture::VulkanTexture;

/// Memory location of a heap kind
pub(crate) fn memory_location(heap: HeapKind) -> MemoryLocation {
    match heap {
        HeapKind::Upload => MemoryLocation::CpuToGpu,
        HeapKind::DeviceLocal => MemoryLocation::GpuOnly,
    }
}

/// Vulkan logical device
pub struct VulkanGraphicsDevice {
    ctx: Arc<GpuContext>,
    adapter: AdapterInfo,
}

impl VulkanGraphicsDevice {
    pub(crate) fn new(ctx: Arc<GpuContext>, adapter: AdapterInfo) -> Self {
        Self { ctx, adapter }
    }

    /// Shared GPU context (device, allocator, queue)
    pub fn gpu_context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    /// Requested format, or its fallback when the device can't use it as an attachment
    fn supported_format(&self, desc: &TextureDesc) -> vk::Format {
        let format = format_to_vk(desc.format);
        if !desc.format.is_depth() {
            return format;
        }
        let supports = |format: vk::Format| unsafe {
            self.ctx
                .instance
                .instance
                .get_physical_device_format_properties(self.ctx.physical_device, format)
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        };
        if supports(format) {
            return format;
        }
        match depth_fallback(format) {
            Some(fallback) if supports(fallback) => {
                harness_debug!(
                    "harness::vulkan",
                    "{:?} not supported as depth attachment, using {:?}",
                    format, fallback
                );
                fallback
            }
            _ => format,
        }
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn adapter(&self) -> &AdapterInfo {
        &self.adapter
    }

    fn create_queue(&self) -> Result<Box<dyn Queue>> {
        Ok(Box::new(VulkanQueue::new(Arc::clone(&self.ctx))))
    }

    fn query_feature(&self, feature: Feature) -> bool {
        match feature {
            // The swapchain checks the surface's present modes and falls back
            Feature::AllowTearing => true,
        }
    }

    fn create_fence(&self, initial_value: u64) -> Result<Box<dyn Fence>> {
        Ok(Box::new(VulkanFence::new(Arc::clone(&self.ctx), initial_value)?))
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(VulkanCommandList::new(Arc::clone(&self.ctx))?))
    }

    fn create_swapchain(
        &self,
        queue: &dyn Queue,
        surface: &SurfaceHandle,
        desc: &SwapchainDesc,
    ) -> Result<Box<dyn Swapchain>> {
        if queue.as_any().downcast_ref::<VulkanQueue>().is_none() {
            return Err(Error::SurfaceCreationFailed(
                "queue does not belong to the Vulkan backend".to_string(),
            ));
        }
        Ok(Box::new(VulkanSwapchain::new(Arc::clone(&self.ctx), surface, desc)?))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Box<dyn Buffer>> {
        let device = &self.ctx.device;
        unsafe {
            // Create buffer
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(
                    vk::BufferUsageFlags::VERTEX_BUFFER
                        | vk::BufferUsageFlags::INDEX_BUFFER
                        | vk::BufferUsageFlags::UNIFORM_BUFFER
                        | vk::BufferUsageFlags::TRANSFER_SRC
                        | vk::BufferUsageFlags::TRANSFER_DST,
                )
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = device.create_buffer(&buffer_create_info, None).map_err(|e| {
                harness_error!("harness::vulkan", "Failed to create buffer of size {} bytes: {:?}", desc.size, e);
                Error::ResourceAllocationFailed(format!("vkCreateBuffer failed: {:?}", e))
            })?;

            // Allocate memory
            let requirements = device.get_buffer_memory_requirements(buffer);
            let allocation = self.ctx.lock_allocator().allocate(&AllocationCreateDesc {
                name: "buffer",
                requirements,
                location: memory_location(desc.heap),
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_buffer(buffer, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    harness_error!("harness::vulkan", "Out of GPU memory for buffer (required: {:.2} MB)", size_mb);
                    return Err(Error::ResourceAllocationFailed(format!(
                        "{} bytes in {:?} heap: {}",
                        desc.size, desc.heap, e
                    )));
                }
            };

            // Bind memory
            if let Err(e) = device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                self.ctx.lock_allocator().free(allocation).ok();
                device.destroy_buffer(buffer, None);
                return Err(harness_err!("harness::vulkan", "Failed to bind buffer memory: {:?}", e));
            }

            Ok(Box::new(VulkanBuffer::new(
                Arc::clone(&self.ctx),
                buffer,
                allocation,
                desc.size,
                desc.heap,
            )))
        }
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Box<dyn Texture>> {
        let device = &self.ctx.device;
        let format = self.supported_format(desc);
        let tiling = match desc.layout {
            TextureLayout::Unknown => vk::ImageTiling::OPTIMAL,
            TextureLayout::RowMajor => vk::ImageTiling::LINEAR,
        };

        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(image_type(desc.dimension))
                .format(format)
                .extent(vk::Extent3D {
                    width: desc.width,
                    height: desc.height,
                    depth: desc.depth,
                })
                .mip_levels(desc.mip_levels)
                .array_layers(desc.array_layers)
                .samples(sample_count_to_vk(desc.sample_count))
                .tiling(tiling)
                .usage(texture_usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = device.create_image(&image_create_info, None).map_err(|e| {
                harness_error!("harness::vulkan", "Failed to create {}x{} image: {:?}", desc.width, desc.height, e);
                Error::ResourceAllocationFailed(format!("vkCreateImage failed: {:?}", e))
            })?;

            let requirements = device.get_image_memory_requirements(image);
            let allocation = self.ctx.lock_allocator().allocate(&AllocationCreateDesc {
                name: "texture",
                requirements,
                location: memory_location(desc.heap),
                linear: tiling == vk::ImageTiling::LINEAR,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_image(image, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    harness_error!("harness::vulkan", "Out of GPU memory for texture (required: {:.2} MB)", size_mb);
                    return Err(Error::ResourceAllocationFailed(format!(
                        "{}x{} {:?}: {}",
                        desc.width, desc.height, desc.format, e
                    )));
                }
            };

            if let Err(e) = device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                self.ctx.lock_allocator().free(allocation).ok();
                device.destroy_image(image, None);
                return Err(harness_err!("harness::vulkan", "Failed to bind image memory: {:?}", e));
            }

            // Create image view
            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(view_type(desc.dimension, desc.array_layers))
                .format(format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: aspect_mask(desc.format),
                    base_mip_level: 0,
                    level_count: desc.mip_levels,
                    base_array_layer: 0,
                    layer_count: desc.array_layers,
                });

            let view = match device.create_image_view(&view_create_info, None) {
                Ok(view) => view,
                Err(e) => {
                    self.ctx.lock_allocator().free(allocation).ok();
                    device.destroy_image(image, None);
                    return Err(harness_err!("harness::vulkan", "Failed to create image view: {:?}", e));
                }
            };

            Ok(Box::new(VulkanTexture::new_owned(
                Arc::clone(&self.ctx),
                image,
                view,
                allocation,
                desc.info(),
            )))
        }
    }

    fn upload_footprint(&self, texture: &dyn Texture) -> UploadFootprint {
        let info = texture.info();
        let row_pitch = info.width as u64 * info.format.bytes_per_texel() as u64;
        UploadFootprint {
            row_pitch,
            rows: info.height,
            slices: info.depth_or_layers,
            total_size: row_pitch * info.height as u64 * info.depth_or_layers as u64,
        }
    }
}
