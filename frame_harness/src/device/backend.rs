/// Backend trait - entry point of a graphics API implementation

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::device::{AdapterInfo, FeatureLevel, GpuPreference, GraphicsDevice};
use crate::error::Result;

/// Native window the presentation chain is bound to
///
/// Produced by the windowing layer. The core only forwards it to the backend.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHandle {
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
}

impl SurfaceHandle {
    pub fn new(display: RawDisplayHandle, window: RawWindowHandle) -> Self {
        Self { display, window }
    }
}

/// Graphics API instance: adapter enumeration and device creation
///
/// One backend value lives for the whole process (DXGI factory, VkInstance).
pub trait Backend {
    /// Backend name for log output (e.g. "vulkan")
    fn name(&self) -> &str;

    /// Lowest capability level the harness accepts on this backend
    fn minimum_feature_level(&self) -> FeatureLevel;

    /// List adapters in the order requested by `preference`
    ///
    /// Software adapters are included; selection filters them out.
    fn enumerate_adapters(&self, preference: GpuPreference) -> Result<Vec<AdapterInfo>>;

    /// Check whether a device at `min_level` can be created on `adapter`
    ///
    /// The default compares the reported level. Backends override this when
    /// capability depends on more than a version number.
    fn probe_adapter(&self, adapter: &AdapterInfo, min_level: FeatureLevel) -> bool {
        adapter.feature_level >= min_level
    }

    /// Create the logical device on a selected adapter
    ///
    /// # Errors
    ///
    /// `Error::DeviceCreationFailed` if the device cannot be instantiated.
    fn create_device(
        &mut self,
        adapter: &AdapterInfo,
        min_level: FeatureLevel,
    ) -> Result<Box<dyn GraphicsDevice>>;
}
