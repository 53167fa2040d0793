/// Fence trait - GPU completion counter

use std::any::Any;

use crate::error::Result;

/// Monotonic 64-bit counter advanced by the GPU
///
/// Values are set through `Queue::signal`.
pub trait Fence: Send + Sync {
    /// Highest value the GPU has reached
    fn completed_value(&self) -> Result<u64>;

    /// Block the calling thread until the completed value reaches `value`
    ///
    /// There is no timeout. Returns immediately if the value was already reached.
    fn wait_until(&self, value: u64) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}
