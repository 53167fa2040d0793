/// FrameSync - the single counting fence that serializes CPU and GPU
///
/// Only one frame is ever in flight, so one fence is enough. `wait_for_idle`
/// is the only blocking point of the harness: it is called at the start of
/// every frame, before a surface resize, after a synchronous upload and at
/// shutdown.

use std::thread;
use std::time::Duration;

use crate::device::{Fence, Queue};
use crate::device_context::DeviceContext;
use crate::error::Result;
use crate::{harness_error, harness_trace};

/// Result of a `wait_for_idle` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Nothing was enqueued since the last wait: no signal, no block
    AlreadyIdle,
    /// The fence was signaled to `value` and the GPU reached it
    Waited { value: u64 },
}

/// "Wait for the GPU to reach frame N" barrier
///
/// `next_value` is monotonic: it only grows, and only after a successful wait.
pub struct FrameSync {
    fence: Box<dyn Fence>,
    /// Value the next wait signals (the fence starts at 0)
    next_value: u64,
    /// Queue work serial observed by the last completed wait
    waited_serial: u64,
}

impl FrameSync {
    /// Create the fence on the device's queue
    pub fn new(device: &DeviceContext) -> Result<Self> {
        let fence = device.device().create_fence(0).map_err(|e| {
            harness_error!("harness::FrameSync", "Failed to create frame fence: {}", e);
            e
        })?;

        Ok(Self {
            fence,
            next_value: 1,
            waited_serial: device.queue().work_serial(),
        })
    }

    /// Block until all work enqueued on `queue` so far has completed
    ///
    /// Idempotent: a second call with no intervening submission or present
    /// returns `WaitOutcome::AlreadyIdle` without signaling or blocking.
    /// There is no timeout.
    pub fn wait_for_idle(&mut self, queue: &dyn Queue) -> Result<WaitOutcome> {
        let serial = queue.work_serial();
        if serial == self.waited_serial {
            return Ok(WaitOutcome::AlreadyIdle);
        }

        let value = self.next_value;
        queue.signal(self.fence.as_ref(), value).map_err(|e| {
            harness_error!("harness::FrameSync", "Failed to signal fence value {}: {}", value, e);
            e
        })?;

        if self.fence.completed_value()? < value {
            self.fence.wait_until(value).map_err(|e| {
                harness_error!("harness::FrameSync", "Wait for fence value {} failed: {}", value, e);
                e
            })?;
        }

        self.next_value += 1;
        self.waited_serial = serial;
        harness_trace!("harness::FrameSync", "GPU reached fence value {}", value);

        Ok(WaitOutcome::Waited { value })
    }

    /// True if nothing was enqueued on `queue` since the last wait
    pub fn is_idle(&self, queue: &dyn Queue) -> bool {
        queue.work_serial() == self.waited_serial
    }

    /// Value the next wait will signal
    pub fn next_value(&self) -> u64 {
        self.next_value
    }

    /// Highest value the GPU has reached
    pub fn completed_value(&self) -> Result<u64> {
        self.fence.completed_value()
    }

    pub fn fence(&self) -> &dyn Fence {
        self.fence.as_ref()
    }
}

/// Number of busy-spin rounds before yielding
const SPIN_ROUNDS: u32 = 6;

/// Number of yield rounds before sleeping
const YIELD_ROUNDS: u32 = 10;

/// Upper bound of the sleep between polls
const MAX_BACKOFF: Duration = Duration::from_millis(1);

/// Poll `fence` until it reaches `value`
///
/// Fallback for backends whose fence has no blocking wait primitive. The
/// backoff spins, then yields, then sleeps with a doubling interval capped at
/// 1 ms. It never times out.
pub fn spin_wait(fence: &dyn Fence, value: u64) -> Result<()> {
    let mut round = 0u32;
    let mut sleep = Duration::from_micros(10);

    while fence.completed_value()? < value {
        if round < SPIN_ROUNDS {
            for _ in 0..(1u32 << round) {
                std::hint::spin_loop();
            }
        } else if round < SPIN_ROUNDS + YIELD_ROUNDS {
            thread::yield_now();
        } else {
            thread::sleep(sleep);
            sleep = (sleep * 2).min(MAX_BACKOFF);
        }
        round = round.saturating_add(1);
    }

    Ok(())
}

#[cfg(test)]
#[path = "frame_sync_tests.rs"]
mod tests;
