/// DeviceContext - logical device, direct queue and capability flags

use crate::config::Config;
use crate::device::{
    select_adapter, AdapterInfo, Backend, Feature, FeatureLevel, GraphicsDevice, Queue,
    DEFAULT_SELECTION_PASSES,
};
use crate::error::{Error, Result};
use crate::{harness_error, harness_info};

/// Owner of the GPU device and its single submission queue
///
/// Every other GPU object is created through this context and must be dropped
/// before it. Fields are declared queue first so the queue goes before the
/// device.
pub struct DeviceContext {
    queue: Box<dyn Queue>,
    device: Box<dyn GraphicsDevice>,
    adapter: AdapterInfo,
    min_feature_level: FeatureLevel,
    tearing_supported: bool,
}

impl DeviceContext {
    /// Select an adapter, create the logical device and the direct queue
    ///
    /// Adapters are searched with the default two passes (discrete first,
    /// then any hardware adapter). The minimum capability level is
    /// `config.min_feature_level`, or the backend's own minimum.
    ///
    /// # Errors
    ///
    /// * `Error::AdapterSelectionFailed` - no hardware adapter meets the minimum level
    /// * `Error::DeviceCreationFailed` - the device could not be created on the chosen adapter
    /// * `Error::QueueCreationFailed` - the direct queue could not be created
    pub fn new(backend: &mut dyn Backend, config: &Config) -> Result<Self> {
        let min_level = config
            .min_feature_level
            .unwrap_or_else(|| backend.minimum_feature_level());

        let adapter = {
            let backend_ref: &dyn Backend = backend;
            select_adapter(
                &DEFAULT_SELECTION_PASSES,
                |preference| backend_ref.enumerate_adapters(preference),
                |adapter| backend_ref.probe_adapter(adapter, min_level),
            )
        }
        .map_err(|e| {
            harness_error!(
                "harness::DeviceContext",
                "No {} adapter meets capability level {}: {}",
                backend.name(), min_level, e
            );
            e
        })?;

        harness_info!("harness::DeviceContext", "selected adapter: {}", adapter.name);

        let device = backend.create_device(&adapter, min_level).map_err(|e| {
            harness_error!("harness::DeviceContext", "Failed to create device on '{}': {}", adapter.name, e);
            match e {
                Error::DeviceCreationFailed(_) => e,
                other => Error::DeviceCreationFailed(other.to_string()),
            }
        })?;

        let queue = device.create_queue().map_err(|e| {
            harness_error!("harness::DeviceContext", "Failed to create direct queue: {}", e);
            match e {
                Error::QueueCreationFailed(_) => e,
                other => Error::QueueCreationFailed(other.to_string()),
            }
        })?;

        let tearing_supported = device.query_feature(Feature::AllowTearing);
        harness_info!(
            "harness::DeviceContext",
            "device ready (level {}, tearing {})",
            adapter.feature_level,
            if tearing_supported { "supported" } else { "unsupported" }
        );

        Ok(Self {
            queue,
            device,
            adapter,
            min_feature_level: min_level,
            tearing_supported,
        })
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    pub fn queue(&self) -> &dyn Queue {
        self.queue.as_ref()
    }

    /// Adapter the device was created on
    pub fn adapter(&self) -> &AdapterInfo {
        &self.adapter
    }

    /// Capability level the adapter was required to meet
    pub fn min_feature_level(&self) -> FeatureLevel {
        self.min_feature_level
    }

    /// Result of the tearing probe made at creation
    pub fn tearing_supported(&self) -> bool {
        self.tearing_supported
    }

    /// Probe an optional capability (absence is not an error)
    pub fn query_feature(&self, feature: Feature) -> bool {
        self.device.query_feature(feature)
    }
}

#[cfg(test)]
#[path = "device_context_tests.rs"]
mod tests;
