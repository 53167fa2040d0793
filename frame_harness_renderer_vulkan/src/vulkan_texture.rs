/// Texture - Vulkan implementation of the Texture trait
///
/// Used both for allocated textures and for swapchain images (which the
/// swapchain owns, so only the view is destroyed here).

use frame_harness::harness::device::{Texture, TextureDimension, TextureInfo};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::aspect_mask;

/// Vulkan texture implementation
pub struct VulkanTexture {
    ctx: Arc<GpuContext>,
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// Vulkan image view
    pub(crate) view: vk::ImageView,
    /// GPU memory allocation (None for swapchain images)
    allocation: Option<Allocation>,
    /// Read-only texture properties
    info: TextureInfo,
    /// False until the first barrier moved the image out of UNDEFINED
    initialized: AtomicBool,
}

impl VulkanTexture {
    pub(crate) fn new_owned(
        ctx: Arc<GpuContext>,
        image: vk::Image,
        view: vk::ImageView,
        allocation: Allocation,
        info: TextureInfo,
    ) -> Self {
        Self {
            ctx,
            image,
            view,
            allocation: Some(allocation),
            info,
            initialized: AtomicBool::new(false),
        }
    }

    pub(crate) fn new_swapchain_image(
        ctx: Arc<GpuContext>,
        image: vk::Image,
        view: vk::ImageView,
        info: TextureInfo,
    ) -> Self {
        Self {
            ctx,
            image,
            view,
            allocation: None,
            info,
            initialized: AtomicBool::new(false),
        }
    }

    pub(crate) fn aspect_mask(&self) -> vk::ImageAspectFlags {
        aspect_mask(self.info.format)
    }

    pub(crate) fn subresource_range(&self) -> vk::ImageSubresourceRange {
        let layer_count = match self.info.dimension {
            TextureDimension::Tex3D => 1,
            _ => self.info.depth_or_layers,
        };
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect_mask(),
            base_mip_level: 0,
            level_count: self.info.mip_levels,
            base_array_layer: 0,
            layer_count,
        }
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Mark the image as initialized, returning true if this call did it
    ///
    /// The first barrier recorded on an image must start from UNDEFINED.
    pub(crate) fn take_first_use(&self) -> bool {
        !self.initialized.swap(true, Ordering::AcqRel)
    }
}

impl Texture for VulkanTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        unsafe {
            // Destroy image view
            self.ctx.device.destroy_image_view(self.view, None);

            // Owned texture: free GPU memory and destroy the image
            if let Some(allocation) = self.allocation.take() {
                self.ctx.lock_allocator().free(allocation).ok();
                self.ctx.device.destroy_image(self.image, None);
            }
        }
    }
}
