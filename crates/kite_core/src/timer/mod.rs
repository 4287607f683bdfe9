//! Timers for the script host.
//!
//! Three layers, leaves first:
//!
//! - [`TimerService`] owns the native timers and runs them on a dedicated
//!   thread. It never sees script callbacks.
//! - [`Scheduler`] / [`JobQueue`] carry a [`ScheduledJob`] from the timer
//!   thread to the host thread. This is the only cross-thread handoff.
//! - [`TimerRegistry`] lives on the host thread and maps [`TimerId`] to the
//!   pending callback. It decides what a consumed job means.
//!
//! ```text
//! timer thread ── ScheduledJob ──▶ JobQueue ──▶ host thread ──▶ registry lookup ──▶ callback
//! ```

mod error;
mod id;
mod registry;
mod scheduler;
mod service;

pub use error::TimerError;
pub use id::TimerId;
pub use registry::{TimerEntry, TimerRegistry};
pub use scheduler::{channel, JobQueue, ScheduledJob, Scheduler};
pub use service::{Reload, TimerService};
