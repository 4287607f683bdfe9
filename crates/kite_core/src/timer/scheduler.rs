//! Cross-thread handoff from the timer thread to the host thread.
//!
//! The producer half ([`Scheduler`]) is `Send + Clone` and is handed to the
//! timer service. The consumer half ([`JobQueue`]) stays on the host thread
//! and is drained only during the host's cooperative turn.

use crate::timer::{TimerError, TimerId};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// One timer fire awaiting dispatch on the host thread.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub timer: TimerId,
    /// Remove the registry entry after the callback runs (one-shot timers).
    pub cleanup: bool,
}

/// Create a connected scheduler / job queue pair.
pub fn channel() -> (Scheduler, JobQueue) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (Scheduler { tx }, JobQueue { rx })
}

/// Producer half, used from the timer thread.
#[derive(Debug, Clone)]
pub struct Scheduler {
    tx: Sender<ScheduledJob>,
}

impl Scheduler {
    /// Enqueue a job. Never blocks; the queue is unbounded.
    pub fn schedule(&self, job: ScheduledJob) -> Result<(), TimerError> {
        self.tx.send(job).map_err(|_| TimerError::QueueClosed)
    }
}

/// Consumer half, owned by the host thread.
///
/// Jobs come out in the order they were scheduled, so successive fires of a
/// repeating timer are never reordered.
#[derive(Debug)]
pub struct JobQueue {
    rx: Receiver<ScheduledJob>,
}

impl JobQueue {
    /// Take the next job if one is ready.
    pub fn try_next(&self) -> Option<ScheduledJob> {
        match self.rx.try_recv() {
            Ok(job) => Some(job),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until a job arrives. `None` once every producer is gone.
    pub fn next(&self) -> Option<ScheduledJob> {
        self.rx.recv().ok()
    }

    /// Block for at most `timeout` waiting for a job.
    pub fn next_timeout(&self, timeout: Duration) -> Option<ScheduledJob> {
        match self.rx.recv_timeout(timeout) {
            Ok(job) => Some(job),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
