/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Manages presentation to the window. The image index is acquired lazily on
/// the first `current_image_index` call of a frame; the acquire semaphore is
/// handed to the next queue submission through the shared `PresentSync`.
/// Resizing recreates the chain in place with `old_swapchain`, at the extent
/// the surface dictates.

use frame_harness::harness::{Error, Result};
use frame_harness::harness::device::{
    Queue, ResourceState, SurfaceHandle, Swapchain, SwapchainDesc, Texture, TextureDimension,
    TextureFormat, TextureInfo, TextureUsage,
};
use frame_harness::{harness_debug, harness_err, harness_error, harness_info, harness_warn};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    choose_present_mode, choose_surface_format, clamp_image_count, format_to_vk,
    vk_format_to_format,
};
use crate::vulkan_queue::VulkanQueue;
use crate::vulkan_texture::VulkanTexture;

/// Vulkan swapchain implementation
pub struct VulkanSwapchain {
    ctx: Arc<GpuContext>,

    /// Surface
    surface: vk::SurfaceKHR,

    /// Swapchain
    swapchain: vk::SwapchainKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    surface_format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
    /// Present modes the surface supports
    present_modes: Vec<vk::PresentModeKHR>,
    /// Image count requested at creation
    requested_image_count: u32,
    /// Image count of the current chain (kept while images are released)
    image_count: u32,

    /// Swap images wrapped as textures (empty while released)
    images: Vec<VulkanTexture>,

    /// Synchronization primitives
    /// Rotating image-available semaphores (one more than the image count)
    acquire_semaphores: Vec<vk::Semaphore>,
    /// One render-finished semaphore per swapchain image
    render_finished_semaphores: Vec<vk::Semaphore>,
    next_acquire: usize,

    /// Image acquired for the current frame
    acquired: Option<u32>,
    /// A present request that differs from the chain's mode was already reported
    mode_mismatch_reported: bool,
}

impl VulkanSwapchain {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        surface_handle: &SurfaceHandle,
        desc: &SwapchainDesc,
    ) -> Result<Self> {
        let instance = &ctx.instance;
        let surface_loader = &instance.surface_loader;

        unsafe {
            let surface = ash_window::create_surface(
                &instance.entry,
                &instance.instance,
                surface_handle.display,
                surface_handle.window,
                None,
            )
            .map_err(|e| {
                harness_error!("harness::vulkan", "Failed to create surface: {:?}", e);
                Error::SurfaceCreationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            // Anything below fails: destroy the surface before returning
            let fail = |message: String| {
                surface_loader.destroy_surface(surface, None);
                harness_error!("harness::vulkan", "{}", message);
                Error::SurfaceCreationFailed(message)
            };

            let supported = surface_loader
                .get_physical_device_surface_support(ctx.physical_device, ctx.graphics_queue_family, surface)
                .unwrap_or(false);
            if !supported {
                return Err(fail("graphics queue family cannot present to this surface".to_string()));
            }

            let surface_formats = surface_loader
                .get_physical_device_surface_formats(ctx.physical_device, surface)
                .map_err(|e| fail(format!("Failed to query surface formats: {:?}", e)))?;
            let surface_format = choose_surface_format(&surface_formats, format_to_vk(desc.format))
                .ok_or_else(|| fail("surface reports no formats".to_string()))?;
            if surface_format.format != format_to_vk(desc.format) {
                harness_info!(
                    "harness::vulkan",
                    "surface format {:?} unavailable, using {:?}",
                    desc.format, surface_format.format
                );
            }

            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(ctx.physical_device, surface)
                .map_err(|e| fail(format!("Failed to query present modes: {:?}", e)))?;
            let present_mode = choose_present_mode(&present_modes, desc.present_interval, desc.allow_tearing);
            if desc.present_interval == 0 && desc.allow_tearing && present_mode != vk::PresentModeKHR::IMMEDIATE {
                harness_info!(
                    "harness::vulkan",
                    "IMMEDIATE present mode unavailable, falling back to {:?}",
                    present_mode
                );
            }

            let swapchain_loader = ash::khr::swapchain::Device::new(&instance.instance, &ctx.device);

            let mut swapchain = Self {
                ctx: Arc::clone(&ctx),
                surface,
                swapchain: vk::SwapchainKHR::null(),
                swapchain_loader,
                surface_format,
                extent: vk::Extent2D { width: 0, height: 0 },
                present_mode,
                present_modes,
                requested_image_count: desc.image_count,
                image_count: 0,
                images: Vec::new(),
                acquire_semaphores: Vec::new(),
                render_finished_semaphores: Vec::new(),
                next_acquire: 0,
                acquired: None,
                mode_mismatch_reported: false,
            };

            // From here on, Drop cleans up whatever was created
            swapchain
                .create_chain(desc.width, desc.height)
                .map_err(|e| Error::SurfaceCreationFailed(e.message().to_string()))?;
            swapchain
                .acquire_images()
                .map_err(|e| Error::SurfaceCreationFailed(e.message().to_string()))?;

            harness_info!(
                "harness::vulkan",
                "Swapchain created: {}x{}, {} images, {:?}, {:?}",
                swapchain.extent.width,
                swapchain.extent.height,
                swapchain.image_count,
                swapchain.surface_format.format,
                swapchain.present_mode
            );
            Ok(swapchain)
        }
    }

    /// Create (or recreate in place) the VkSwapchainKHR at the requested size
    fn create_chain(&mut self, width: u32, height: u32) -> Result<()> {
        let surface_loader = &self.ctx.instance.surface_loader;
        unsafe {
            let capabilities = surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
                .map_err(|e| harness_err!("harness::vulkan", "Failed to get surface capabilities: {:?}", e))?;

            // Choose extent
            let extent = if capabilities.current_extent.width != u32::MAX {
                capabilities.current_extent
            } else {
                vk::Extent2D {
                    width: width.clamp(
                        capabilities.min_image_extent.width,
                        capabilities.max_image_extent.width,
                    ),
                    height: height.clamp(
                        capabilities.min_image_extent.height,
                        capabilities.max_image_extent.height,
                    ),
                }
            };
            if extent.width == 0 || extent.height == 0 {
                return Err(harness_err!("harness::vulkan", "surface extent is zero (window minimized?)"));
            }

            let min_image_count = clamp_image_count(
                self.requested_image_count,
                capabilities.min_image_count,
                capabilities.max_image_count,
            );

            let old_swapchain = self.swapchain;
            let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(min_image_count)
                .image_format(self.surface_format.format)
                .image_color_space(self.surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(self.present_mode)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = self
                .swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| harness_err!("harness::vulkan", "Failed to create swapchain: {:?}", e))?;

            // Destroy old swapchain
            if old_swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;
            self.extent = extent;
        }
        Ok(())
    }

    fn destroy_semaphores(&mut self) {
        unsafe {
            for semaphore in self.acquire_semaphores.drain(..) {
                self.ctx.device.destroy_semaphore(semaphore, None);
            }
            for semaphore in self.render_finished_semaphores.drain(..) {
                self.ctx.device.destroy_semaphore(semaphore, None);
            }
        }
        self.next_acquire = 0;
    }

    fn create_semaphores(&mut self, image_count: usize) -> Result<()> {
        let semaphore_create_info = vk::SemaphoreCreateInfo::default();
        unsafe {
            for _ in 0..=image_count {
                let semaphore = self
                    .ctx
                    .device
                    .create_semaphore(&semaphore_create_info, None)
                    .map_err(|e| harness_err!("harness::vulkan", "Failed to create image-available semaphore: {:?}", e))?;
                self.acquire_semaphores.push(semaphore);
            }
            for _ in 0..image_count {
                let semaphore = self
                    .ctx
                    .device
                    .create_semaphore(&semaphore_create_info, None)
                    .map_err(|e| harness_err!("harness::vulkan", "Failed to create render-finished semaphore: {:?}", e))?;
                self.render_finished_semaphores.push(semaphore);
            }
        }
        Ok(())
    }

    fn image_info(&self) -> TextureInfo {
        TextureInfo {
            dimension: TextureDimension::Tex2D,
            format: self.format(),
            usage: TextureUsage::RENDER_TARGET,
            initial_state: ResourceState::Present,
            width: self.extent.width,
            height: self.extent.height,
            depth_or_layers: 1,
            mip_levels: 1,
            sample_count: 1,
        }
    }

    /// Forget an acquired-but-not-presented image
    fn drop_pending_acquire(&mut self) {
        if self.acquired.take().is_some() {
            self.ctx.lock_present_sync().take_for_present();
        }
    }

    fn acquire_next(&mut self) -> std::result::Result<u32, vk::Result> {
        let semaphore = self.acquire_semaphores[self.next_acquire];
        let (index, suboptimal) = unsafe {
            self.swapchain_loader
                .acquire_next_image(self.swapchain, u64::MAX, semaphore, vk::Fence::null())?
        };
        if suboptimal {
            harness_debug!("harness::vulkan", "acquired image {} is suboptimal", index);
        }
        self.next_acquire = (self.next_acquire + 1) % self.acquire_semaphores.len();

        let mut present_sync = self.ctx.lock_present_sync();
        present_sync.wait = Some(semaphore);
        present_sync.signal = Some(self.render_finished_semaphores[index as usize]);
        present_sync.present_wait = None;
        Ok(index)
    }
}

impl Swapchain for VulkanSwapchain {
    fn image_count(&self) -> u32 {
        self.image_count
    }

    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn format(&self) -> TextureFormat {
        vk_format_to_format(self.surface_format.format).unwrap_or(TextureFormat::B8G8R8A8_UNORM)
    }

    fn current_image_index(&mut self) -> Result<u32> {
        if let Some(index) = self.acquired {
            return Ok(index);
        }
        if self.images.is_empty() {
            return Err(harness_err!("harness::vulkan", "swap images are released"));
        }

        let index = match self.acquire_next() {
            Ok(index) => index,
            // The surface rebuilds the chain together with its depth image
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                harness_debug!("harness::vulkan", "acquire: swapchain out of date");
                return Err(Error::SurfaceOutOfDate(format!(
                    "swapchain {}x{} no longer matches its surface",
                    self.extent.width, self.extent.height
                )));
            }
            Err(e) => {
                return Err(harness_err!("harness::vulkan", "Failed to acquire next swapchain image: {:?}", e));
            }
        };
        self.acquired = Some(index);
        Ok(index)
    }

    fn image(&self, index: u32) -> Option<&dyn Texture> {
        self.images.get(index as usize).map(|image| image as &dyn Texture)
    }

    fn release_images(&mut self) {
        self.drop_pending_acquire();
        // Dropping the textures destroys their views; the chain owns the images
        self.images.clear();
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.images.is_empty() {
            return Err(harness_err!("harness::vulkan", "resize_buffers with swap images still referenced"));
        }
        self.create_chain(width, height)
    }

    fn acquire_images(&mut self) -> Result<()> {
        let vk_images = unsafe {
            self.swapchain_loader
                .get_swapchain_images(self.swapchain)
                .map_err(|e| harness_err!("harness::vulkan", "Failed to get swapchain images: {:?}", e))?
        };

        let info = self.image_info();
        let mut images = Vec::with_capacity(vk_images.len());
        for &image in &vk_images {
            let create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.surface_format.format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = unsafe {
                self.ctx
                    .device
                    .create_image_view(&create_info, None)
                    .map_err(|e| harness_err!("harness::vulkan", "Failed to create swapchain image view: {:?}", e))?
            };
            images.push(VulkanTexture::new_swapchain_image(
                Arc::clone(&self.ctx),
                image,
                view,
                info.clone(),
            ));
        }

        if vk_images.len() != self.render_finished_semaphores.len() {
            self.destroy_semaphores();
            self.create_semaphores(vk_images.len())?;
        }
        self.images = images;
        self.image_count = vk_images.len() as u32;
        Ok(())
    }

    fn present(&mut self, queue: &dyn Queue, interval: u32, allow_tearing: bool) -> Result<()> {
        let queue = queue.as_any().downcast_ref::<VulkanQueue>().ok_or_else(|| {
            harness_err!("harness::vulkan", "present: queue is not a Vulkan queue")
        })?;
        if !Arc::ptr_eq(queue.gpu_context(), &self.ctx) {
            return Err(harness_err!("harness::vulkan", "present: queue belongs to another device"));
        }
        let image_index = self.acquired.take().ok_or_else(|| {
            harness_err!("harness::vulkan", "present without an acquired image")
        })?;

        let wanted = choose_present_mode(&self.present_modes, interval, allow_tearing);
        if wanted != self.present_mode && !self.mode_mismatch_reported {
            self.mode_mismatch_reported = true;
            harness_warn!(
                "harness::vulkan",
                "present requested {:?} but the swapchain was created with {:?}",
                wanted, self.present_mode
            );
        }

        let wait_semaphores: Vec<vk::Semaphore> =
            self.ctx.lock_present_sync().take_for_present().into_iter().collect();
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = {
            let _queue = self.ctx.lock_queue();
            unsafe {
                self.swapchain_loader
                    .queue_present(self.ctx.graphics_queue, &present_info)
            }
        };
        self.ctx.bump_work_serial();

        match result {
            Ok(suboptimal) => {
                if suboptimal {
                    harness_debug!("harness::vulkan", "present: swapchain suboptimal");
                }
                Ok(())
            }
            // The window resize event that caused it rebuilds the chain
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                harness_debug!("harness::vulkan", "present: swapchain out of date, frame dropped");
                Ok(())
            }
            Err(e) => Err(harness_err!("harness::vulkan", "Failed to present swapchain image: {:?}", e)),
        }
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish
            self.ctx.device.device_wait_idle().ok();
        }

        self.release_images();
        self.destroy_semaphores();

        unsafe {
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.ctx.instance.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
