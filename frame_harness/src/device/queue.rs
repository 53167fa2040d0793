/// Queue trait - the single direct submission queue

use std::any::Any;

use crate::device::{CommandList, Fence};
use crate::error::Result;

/// FIFO submission channel
///
/// All command lists, the fence and the presentation chain use one queue for
/// the lifetime of the process.
pub trait Queue: Send + Sync {
    /// Enqueue a closed command list
    fn submit(&self, list: &dyn CommandList) -> Result<()>;

    /// Enqueue a fence signal to `value` after all previously enqueued work
    fn signal(&self, fence: &dyn Fence, value: u64) -> Result<()>;

    /// Count of work items (submissions and presents) enqueued so far
    ///
    /// Fence signals do not count. Monotonic.
    fn work_serial(&self) -> u64;

    fn as_any(&self) -> &dyn Any;
}
