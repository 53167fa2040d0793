/// Frame timer - delta and total time between frames, in milliseconds

use std::time::{Duration, Instant};

pub struct FrameTimer {
    start: Instant,
    last: Instant,
    delta: Duration,
}

impl FrameTimer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            delta: Duration::ZERO,
        }
    }

    /// Mark the start of a new frame
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub(crate) fn tick_at(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.last);
        self.last = now;
    }

    /// Restart both the frame and the total clock
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Time between the last two ticks
    pub fn delta_time_ms(&self) -> f64 {
        self.delta.as_secs_f64() * 1_000.0
    }

    /// Time from creation (or reset) to the last tick
    pub fn time_since_start_ms(&self) -> f64 {
        self.last.saturating_duration_since(self.start).as_secs_f64() * 1_000.0
    }

    /// Frames per second derived from the last delta (0 before the first frame)
    pub fn fps(&self) -> f64 {
        let delta = self.delta_time_ms();
        if delta > 0.0 {
            1_000.0 / delta
        } else {
            0.0
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "frame_timer_tests.rs"]
mod tests;
