/// Adapter description and prioritized adapter selection

use std::fmt;

use crate::error::{Error, Result};
use crate::{harness_debug, harness_warn};

/// Capability level an adapter supports (major.minor)
///
/// Backends map their own notion of capability onto this scale
/// (Direct3D feature levels such as 11.0, Vulkan API versions such as 1.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureLevel {
    pub major: u32,
    pub minor: u32,
}

impl FeatureLevel {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Kind of adapter reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Dedicated GPU
    Discrete,
    /// GPU sharing memory with the CPU
    Integrated,
    /// GPU exposed through a hypervisor
    Virtual,
    /// CPU rasterizer (WARP, llvmpipe, SwiftShader, ...)
    Software,
    /// Anything the backend cannot classify
    Other,
}

impl AdapterKind {
    pub fn is_software(&self) -> bool {
        matches!(self, AdapterKind::Software)
    }
}

/// Ordering hint passed to adapter enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuPreference {
    /// High-performance adapters first
    HighPerformance,
    /// Platform enumeration order
    Unspecified,
}

/// Description of an adapter as reported by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterInfo {
    /// Backend-specific index used to open the adapter
    pub index: usize,
    /// Human-readable name
    pub name: String,
    pub kind: AdapterKind,
    pub vendor_id: u32,
    pub device_id: u32,
    /// Highest capability level the adapter supports
    pub feature_level: FeatureLevel,
    /// Dedicated video memory in bytes (0 if unknown)
    pub dedicated_video_memory: u64,
}

/// Predicate deciding whether an adapter is acceptable in a selection pass
pub type AdapterPredicate = fn(&AdapterInfo) -> bool;

/// One pass of the adapter search
#[derive(Clone, Copy)]
pub struct SelectionPass {
    /// Name used in log output
    pub name: &'static str,
    /// Enumeration order requested from the backend
    pub preference: GpuPreference,
    /// Adapter filter
    pub accepts: AdapterPredicate,
}

impl fmt::Debug for SelectionPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionPass")
            .field("name", &self.name)
            .field("preference", &self.preference)
            .finish()
    }
}

/// Accept only discrete hardware adapters
pub fn prefer_discrete(adapter: &AdapterInfo) -> bool {
    adapter.kind == AdapterKind::Discrete
}

/// Accept any adapter that is not a software rasterizer
pub fn any_hardware(adapter: &AdapterInfo) -> bool {
    !adapter.kind.is_software()
}

/// Default search: discrete GPUs in high-performance order, then any hardware adapter
pub const DEFAULT_SELECTION_PASSES: [SelectionPass; 2] = [
    SelectionPass {
        name: "prefer_discrete",
        preference: GpuPreference::HighPerformance,
        accepts: prefer_discrete,
    },
    SelectionPass {
        name: "any_hardware",
        preference: GpuPreference::Unspecified,
        accepts: any_hardware,
    },
];

/// Select the first adapter that passes a selection pass and the capability probe
///
/// Passes are evaluated in order. Within a pass, adapters are tried in the
/// order `enumerate` returns them. Software adapters are never selected.
/// An enumeration failure counts as an empty list, so a later pass still runs.
///
/// # Arguments
///
/// * `passes` - Prioritized selection passes
/// * `enumerate` - Lists adapters for a given preference
/// * `probe` - Returns true if the adapter meets the minimum capability level
///
/// # Errors
///
/// `Error::AdapterSelectionFailed` if no pass yields a capable adapter.
pub fn select_adapter<E, P>(
    passes: &[SelectionPass],
    mut enumerate: E,
    mut probe: P,
) -> Result<AdapterInfo>
where
    E: FnMut(GpuPreference) -> Result<Vec<AdapterInfo>>,
    P: FnMut(&AdapterInfo) -> bool,
{
    let mut rejected = 0usize;

    for pass in passes {
        let adapters = match enumerate(pass.preference) {
            Ok(adapters) => adapters,
            Err(e) => {
                harness_warn!("harness::adapter", "pass '{}': enumeration failed: {}", pass.name, e);
                continue;
            }
        };

        for adapter in adapters {
            if adapter.kind.is_software() || !(pass.accepts)(&adapter) {
                continue;
            }
            if probe(&adapter) {
                harness_debug!(
                    "harness::adapter",
                    "pass '{}' accepted adapter {} ({})",
                    pass.name, adapter.index, adapter.name
                );
                return Ok(adapter);
            }
            rejected += 1;
            harness_debug!(
                "harness::adapter",
                "pass '{}': adapter {} ({}) below minimum capability level",
                pass.name, adapter.index, adapter.name
            );
        }
    }

    Err(Error::AdapterSelectionFailed(format!(
        "no hardware adapter meets the minimum capability level ({} candidate(s) rejected)",
        rejected
    )))
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
