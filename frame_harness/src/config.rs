/// Harness configuration

use crate::device::{FeatureLevel, TextureFormat};

/// Number of color images in the presentation chain
pub const DEFAULT_IMAGE_COUNT: u32 = 3;

/// Default window width used by the demo
pub const DEFAULT_WIDTH: u32 = 1600;

/// Default window height used by the demo
pub const DEFAULT_HEIGHT: u32 = 900;

/// Configuration for a `GraphicsContext`
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name (passed to the backend instance)
    pub app_name: String,

    /// Enable backend validation layers (requires the backend's validation feature)
    pub enable_validation: bool,

    /// Number of color images in the presentation chain
    pub image_count: u32,

    /// Minimum adapter capability level (None = backend minimum)
    pub min_feature_level: Option<FeatureLevel>,

    /// Present interval: 0 = immediate, 1 = synchronize to refresh
    pub present_interval: u32,

    /// Allow tearing when presenting with interval 0 (only if the device supports it)
    pub allow_tearing: bool,

    /// Color used to clear the render target at the start of each frame
    pub clear_color: [f32; 4],

    /// Swap image storage format
    pub color_format: TextureFormat,

    /// Depth/stencil image format
    pub depth_format: TextureFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Frame Harness".to_string(),
            enable_validation: cfg!(debug_assertions),
            image_count: DEFAULT_IMAGE_COUNT,
            min_feature_level: None,
            present_interval: 1,
            allow_tearing: true,
            clear_color: [0.1, 0.1, 0.1, 0.1],
            color_format: TextureFormat::B8G8R8A8_UNORM,
            depth_format: TextureFormat::D24_UNORM_S8_UINT,
        }
    }
}
