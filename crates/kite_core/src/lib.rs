//! Kite Core
//!
//! Contains the scheduling primitives shared by the script host:
//! - Monotonic clock (`millis()` since startup)
//! - Timer service thread (the "native" timers)
//! - Cross-thread job queue from the timer thread to the host thread
//! - Timer registry owning script callbacks

pub mod time;
pub mod timer;

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
