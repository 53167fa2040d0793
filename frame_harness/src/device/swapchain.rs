/// Swapchain trait - for window presentation

use crate::device::{Queue, Texture, TextureFormat};
use crate::error::Result;

/// Parameters of a presentation chain
#[derive(Debug, Clone)]
pub struct SwapchainDesc {
    pub width: u32,
    pub height: u32,
    /// Number of color images (3 for triple buffering)
    pub image_count: u32,
    /// Storage format of the color images
    pub format: TextureFormat,
    /// Present interval the chain is mostly driven with
    pub present_interval: u32,
    /// Tearing allowed (device probe succeeded and the caller enabled it)
    pub allow_tearing: bool,
}

/// Presentation chain: a rotating set of color images bound to a window
///
/// The chain lives in two phases. While images are held (`acquire_images`),
/// `image` returns them and frames can be presented. `release_images` drops
/// every reference so `resize_buffers` can rebuild the chain in place.
pub trait Swapchain: Send + Sync {
    /// Number of color images
    fn image_count(&self) -> u32;

    /// Width of the color images in pixels
    fn width(&self) -> u32;

    /// Height of the color images in pixels
    fn height(&self) -> u32;

    /// Storage format of the color images
    fn format(&self) -> TextureFormat;

    /// Index of the image that receives the next frame
    ///
    /// Chosen by the presentation engine. Repeated calls before `present`
    /// return the same index. No round-robin order may be assumed.
    ///
    /// Returns `Error::SurfaceOutOfDate` when the chain no longer matches its
    /// window. The chain is left untouched; the caller rebuilds it with
    /// `release_images` / `resize_buffers` / `acquire_images`.
    fn current_image_index(&mut self) -> Result<u32>;

    /// Color image at `index` (None while images are released)
    fn image(&self, index: u32) -> Option<&dyn Texture>;

    /// Drop every held color image reference
    fn release_images(&mut self);

    /// Rebuild the chain's buffers at a new size (images must be released)
    ///
    /// A window system that dictates the extent wins over the requested size;
    /// `width`/`height` report the size actually used.
    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<()>;

    /// Re-acquire the color images after creation or resize
    fn acquire_images(&mut self) -> Result<()>;

    /// Queue the current image for display on `queue`
    ///
    /// # Arguments
    ///
    /// * `queue` - The queue the chain was created with
    /// * `interval` - 0 = immediate, 1 = synchronize to refresh
    /// * `allow_tearing` - Permit tearing for interval 0
    fn present(&mut self, queue: &dyn Queue, interval: u32, allow_tearing: bool) -> Result<()>;
}
