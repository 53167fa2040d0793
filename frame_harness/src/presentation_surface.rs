/// PresentationSurface - rotating color images plus the shared depth image
///
/// State machine: `Uninitialized -> Ready <-> Resizing -> Ready ... -> Destroyed`.
/// A failed resize lands in `Failed`, which is terminal: the frame loop must
/// stop instead of rendering into stale images.

use crate::device::{SurfaceHandle, Swapchain, SwapchainDesc, Texture, TextureDesc, TextureFormat, Queue};
use crate::device_context::DeviceContext;
use crate::error::{Error, Result};
use crate::frame_sync::FrameSync;
use crate::resource_factory::{GpuTexture, ResourceFactory};
use crate::{harness_debug, harness_error, harness_info};

/// Lifecycle state of the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Uninitialized,
    Ready,
    Resizing,
    /// Terminal failure (resize could not complete)
    Failed,
    Destroyed,
}

/// Creation parameters of a `PresentationSurface`
#[derive(Debug, Clone)]
pub struct SurfaceDesc {
    pub width: u32,
    pub height: u32,
    pub image_count: u32,
    pub color_format: TextureFormat,
    pub depth_format: TextureFormat,
    /// Present interval the surface is mostly driven with
    pub present_interval: u32,
    /// Use tearing for interval 0 when the device supports it
    pub allow_tearing: bool,
}

/// Presentation chain bound to a window, and its depth image
pub struct PresentationSurface {
    // Depth first: dropped before the chain
    depth: Option<GpuTexture>,
    swapchain: Option<Box<dyn Swapchain>>,
    state: SurfaceState,
    width: u32,
    height: u32,
    image_count: u32,
    depth_format: TextureFormat,
    tearing_enabled: bool,
}

impl PresentationSurface {
    /// Surface with no chain yet (`Uninitialized`)
    pub fn new() -> Self {
        Self {
            depth: None,
            swapchain: None,
            state: SurfaceState::Uninitialized,
            width: 0,
            height: 0,
            image_count: 0,
            depth_format: TextureFormat::D24_UNORM_S8_UINT,
            tearing_enabled: false,
        }
    }

    /// Create a surface bound to `surface` and presenting on the device's queue
    pub fn create(device: &DeviceContext, surface: &SurfaceHandle, desc: &SurfaceDesc) -> Result<Self> {
        let mut presentation = Self::new();
        presentation.initialize(device, surface, desc)?;
        Ok(presentation)
    }

    /// Create the presentation chain, its color images and the depth image
    ///
    /// # Errors
    ///
    /// `Error::SurfaceCreationFailed` if the surface is already initialized,
    /// the extent is zero, or the chain or depth image cannot be created.
    pub fn initialize(
        &mut self,
        device: &DeviceContext,
        surface: &SurfaceHandle,
        desc: &SurfaceDesc,
    ) -> Result<()> {
        if self.state != SurfaceState::Uninitialized {
            return Err(Error::SurfaceCreationFailed(format!(
                "surface is already {:?}",
                self.state
            )));
        }
        if desc.width == 0 || desc.height == 0 || desc.image_count == 0 {
            return Err(Error::SurfaceCreationFailed(format!(
                "invalid surface {}x{} with {} images",
                desc.width, desc.height, desc.image_count
            )));
        }

        let tearing_enabled = desc.allow_tearing && device.tearing_supported();
        let swapchain = device
            .device()
            .create_swapchain(
                device.queue(),
                surface,
                &SwapchainDesc {
                    width: desc.width,
                    height: desc.height,
                    image_count: desc.image_count,
                    format: desc.color_format,
                    present_interval: desc.present_interval,
                    allow_tearing: tearing_enabled,
                },
            )
            .map_err(|e| {
                harness_error!("harness::PresentationSurface", "Failed to create presentation chain: {}", e);
                match e {
                    Error::SurfaceCreationFailed(_) => e,
                    other => Error::SurfaceCreationFailed(other.to_string()),
                }
            })?;

        let depth = create_depth_image(device, desc.depth_format, desc.width, desc.height)
            .map_err(|e| {
                harness_error!("harness::PresentationSurface", "Failed to create depth image: {}", e);
                Error::SurfaceCreationFailed(e.to_string())
            })?;

        self.width = swapchain.width();
        self.height = swapchain.height();
        self.image_count = swapchain.image_count();
        self.swapchain = Some(swapchain);
        self.depth = Some(depth);
        self.depth_format = desc.depth_format;
        self.tearing_enabled = tearing_enabled;
        self.state = SurfaceState::Ready;

        harness_info!(
            "harness::PresentationSurface",
            "presentation surface created ({} x {}, {} images)",
            self.width, self.height, self.image_count
        );
        Ok(())
    }

    /// Rebuild the color images and the depth image at a new size
    ///
    /// Performs the full GPU wait itself before touching any image. Resizing
    /// to the current size is a no-op after the wait.
    ///
    /// # Errors
    ///
    /// `Error::SurfaceResizeFailed` for a zero extent (state unchanged), when
    /// the surface is not `Ready`, or when any rebuild step fails. In the last
    /// case the surface becomes `Failed`.
    pub fn resize(
        &mut self,
        device: &DeviceContext,
        frame_sync: &mut FrameSync,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.ensure_ready("resize")
            .map_err(|e| Error::SurfaceResizeFailed(e.message().to_string()))?;

        if width == 0 || height == 0 {
            return Err(Error::SurfaceResizeFailed(format!(
                "cannot resize to an empty extent ({} x {})",
                width, height
            )));
        }

        if let Err(e) = frame_sync.wait_for_idle(device.queue()) {
            return Err(self.fail(format!("GPU wait before resize failed: {}", e)));
        }

        if width == self.width && height == self.height {
            harness_debug!("harness::PresentationSurface", "resize to current size ignored");
            return Ok(());
        }

        self.state = SurfaceState::Resizing;
        match self.rebuild(device, width, height) {
            Ok(()) => {
                self.state = SurfaceState::Ready;
                harness_info!("harness::PresentationSurface", "Window resized ({} x {})", width, height);
                Ok(())
            }
            Err(e) => Err(self.fail(e.to_string())),
        }
    }

    fn rebuild(&mut self, device: &DeviceContext, width: u32, height: u32) -> Result<()> {
        let swapchain = self
            .swapchain
            .as_mut()
            .ok_or_else(|| Error::SurfaceResizeFailed("presentation chain is missing".to_string()))?;

        // Every image goes before the chain is rebuilt
        swapchain.release_images();
        self.depth = None;

        swapchain.resize_buffers(width, height)?;
        swapchain.acquire_images()?;

        self.width = swapchain.width();
        self.height = swapchain.height();
        self.image_count = swapchain.image_count();
        self.depth = Some(create_depth_image(device, self.depth_format, self.width, self.height)?);
        Ok(())
    }

    fn fail(&mut self, reason: String) -> Error {
        self.state = SurfaceState::Failed;
        harness_error!("harness::PresentationSurface", "Surface resize failed: {}", reason);
        Error::SurfaceResizeFailed(reason)
    }

    fn ensure_ready(&self, operation: &str) -> Result<()> {
        match self.state {
            SurfaceState::Ready => Ok(()),
            SurfaceState::Failed => Err(Error::SurfaceResizeFailed(format!(
                "cannot {}: surface is in a failed state",
                operation
            ))),
            other => Err(Error::SurfaceCreationFailed(format!(
                "cannot {}: surface is {:?}",
                operation, other
            ))),
        }
    }

    fn swapchain_mut(&mut self, operation: &str) -> Result<&mut dyn Swapchain> {
        self.ensure_ready(operation)?;
        match self.swapchain.as_mut() {
            Some(swapchain) => Ok(swapchain.as_mut()),
            None => Err(Error::SurfaceCreationFailed("presentation chain is missing".to_string())),
        }
    }

    /// Index of the color image that receives the next frame
    ///
    /// Supplied by the presentation engine; it can repeat or skip. Returns
    /// `Error::SurfaceOutOfDate` when the chain must be rebuilt first (see
    /// `acquire_image`).
    pub fn current_image_index(&mut self) -> Result<u32> {
        self.swapchain_mut("acquire an image")?.current_image_index()
    }

    /// Index of the color image for the next frame, rebuilding a stale chain
    ///
    /// An out-of-date chain goes through the resize path at the extent the
    /// window now dictates, depth image included, before the image is
    /// acquired again. Still out of date after that, the surface fails.
    pub fn acquire_image(&mut self, device: &DeviceContext, frame_sync: &mut FrameSync) -> Result<u32> {
        match self.current_image_index() {
            Err(Error::SurfaceOutOfDate(reason)) => {
                harness_debug!(
                    "harness::PresentationSurface",
                    "presentation chain out of date ({}), rebuilding",
                    reason
                );
                self.rebuild_out_of_date(device, frame_sync)?;
                self.current_image_index()
                    .map_err(|e| self.fail(format!("acquire after rebuild failed: {}", e)))
            }
            other => other,
        }
    }

    fn rebuild_out_of_date(&mut self, device: &DeviceContext, frame_sync: &mut FrameSync) -> Result<()> {
        if let Err(e) = frame_sync.wait_for_idle(device.queue()) {
            return Err(self.fail(format!("GPU wait before rebuild failed: {}", e)));
        }

        let (width, height) = (self.width, self.height);
        self.state = SurfaceState::Resizing;
        if let Err(e) = self.rebuild(device, width, height) {
            return Err(self.fail(e.to_string()));
        }
        self.state = SurfaceState::Ready;
        if (self.width, self.height) != (width, height) {
            harness_info!(
                "harness::PresentationSurface",
                "Window resized ({} x {})",
                self.width, self.height
            );
        }
        Ok(())
    }

    /// Queue the finished frame for display
    ///
    /// Interval 0 presents immediately (with tearing when supported and
    /// enabled), interval 1 synchronizes to the display refresh.
    pub fn present_frame(&mut self, queue: &dyn Queue, interval: u32) -> Result<()> {
        let allow_tearing = interval == 0 && self.tearing_enabled;
        self.swapchain_mut("present")?
            .present(queue, interval, allow_tearing)
            .map_err(|e| {
                harness_error!("harness::PresentationSurface", "Present failed: {}", e);
                match e {
                    Error::SubmissionFailed(_) => e,
                    other => Error::SubmissionFailed(other.to_string()),
                }
            })
    }

    /// Color image `index` (None while images are released or out of range)
    pub fn color_image(&self, index: u32) -> Option<&dyn Texture> {
        self.swapchain.as_ref().and_then(|s| s.image(index))
    }

    /// Depth image (None while it is being rebuilt or after destroy)
    pub fn depth_image(&self) -> Option<&GpuTexture> {
        self.depth.as_ref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn image_count(&self) -> u32 {
        self.image_count
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// True if interval-0 presents may tear
    pub fn tearing_enabled(&self) -> bool {
        self.tearing_enabled
    }

    /// Release the depth image, the color images and the chain
    ///
    /// The GPU must be idle. Called by `Drop`.
    pub fn destroy(&mut self) {
        if self.state == SurfaceState::Destroyed {
            return;
        }
        self.depth = None;
        if let Some(mut swapchain) = self.swapchain.take() {
            swapchain.release_images();
        }
        if self.state != SurfaceState::Uninitialized {
            harness_debug!("harness::PresentationSurface", "presentation surface destroyed");
        }
        self.state = SurfaceState::Destroyed;
    }
}

impl Default for PresentationSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PresentationSurface {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn create_depth_image(
    device: &DeviceContext,
    format: TextureFormat,
    width: u32,
    height: u32,
) -> Result<GpuTexture> {
    ResourceFactory::new(device).create_texture(&TextureDesc::depth_stencil(format, width, height))
}

#[cfg(test)]
#[path = "presentation_surface_tests.rs"]
mod tests;
