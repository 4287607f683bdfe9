//! Monotonic runtime clock
//!
//! Millisecond resolution, anchored at the instant the clock was created.

use std::time::{Duration, Instant};

/// Elapsed-time tracker backing `millis()`.
///
/// The counter is a `u64` of milliseconds, so wrap-around is not a practical
/// concern (it would take ~584 million years).
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Milliseconds since the clock was created. Never decreases.
    pub fn millis(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
