//! Single-threaded script host.
//!
//! Couples a [`ScriptRuntime`] with a timer registry and the job queue fed by
//! the timer thread. Each turn dequeues one job, resolves it against the
//! registry and runs the callback to completion before the next dequeue.
//! Waiting on the queue is the host's only blocking point.
//!
//! Deleting a timer removes its registry entry, so any job for it that is
//! dequeued afterwards is dropped. A job dequeued before the deletion has
//! already run; there is no cancellation of a running callback.

use crate::runtime::ScriptRuntime;
use crate::timers::{self, SharedTimers};
use crate::ScriptError;
use kite_core::timer::{JobQueue, ScheduledJob, TimerRegistry};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy)]
pub struct HostOptions {
    /// Run queued promise jobs after every timer callback.
    pub drain_pending_jobs: bool,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            drain_pending_jobs: true,
        }
    }
}

pub struct ScriptHost {
    timers: SharedTimers,
    queue: JobQueue,
    runtime: ScriptRuntime,
    options: HostOptions,
}

impl ScriptHost {
    pub fn new() -> Result<Self, ScriptError> {
        Self::with_options(HostOptions::default())
    }

    pub fn with_options(options: HostOptions) -> Result<Self, ScriptError> {
        let (registry, queue) = TimerRegistry::spawn()?;
        let timers: SharedTimers = Rc::new(RefCell::new(registry));

        let runtime = ScriptRuntime::new()?;
        runtime
            .context
            .with(|ctx| timers::install(&ctx, &timers).map_err(|err| ScriptError::from_js(&ctx, err)))?;

        Ok(Self {
            timers,
            queue,
            runtime,
            options,
        })
    }

    pub fn runtime(&self) -> &ScriptRuntime {
        &self.runtime
    }

    pub fn execute(&self, source: &str) -> Result<(), ScriptError> {
        self.runtime.execute(source)?;
        self.after_script();
        Ok(())
    }

    pub fn execute_file(&self, path: &std::path::Path) -> Result<(), ScriptError> {
        self.runtime.execute_file(path)?;
        self.after_script();
        Ok(())
    }

    /// Number of timers with a pending callback.
    pub fn timer_count(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn millis(&self) -> u64 {
        self.timers.borrow().millis()
    }

    /// One cooperative turn: wait up to `timeout` for a job and dispatch it.
    /// Returns whether a callback ran.
    pub fn poll(&self, timeout: Duration) -> Result<bool, ScriptError> {
        match self.queue.next_timeout(timeout) {
            Some(job) => self.dispatch(job),
            None => Ok(false),
        }
    }

    /// Dispatch every job that is already queued, without blocking.
    /// Returns how many callbacks ran.
    pub fn run_until_idle(&self) -> Result<usize, ScriptError> {
        let mut ran = 0;
        while let Some(job) = self.queue.try_next() {
            if self.dispatch(job)? {
                ran += 1;
            }
        }
        Ok(ran)
    }

    /// Run the event loop until no timers remain.
    ///
    /// A callback that throws is logged and the loop carries on; the timer
    /// itself is not cancelled by the failure.
    pub fn run(&self) -> Result<(), ScriptError> {
        debug!(timers = self.timer_count(), "event loop started");
        while !self.timers.borrow().is_empty() {
            let Some(job) = self.queue.next() else {
                break;
            };
            if let Err(err) = self.dispatch(job) {
                error!(timer = %job.timer, error = %err, "timer callback failed");
            }
        }
        debug!("event loop finished");
        Ok(())
    }

    /// Resolve `job` and invoke its callback. Jobs for deleted timers are
    /// dropped and return `Ok(false)`.
    fn dispatch(&self, job: ScheduledJob) -> Result<bool, ScriptError> {
        // Clone the callback out so the registry is not borrowed while script
        // code runs (the callback may create or delete timers).
        let callback = self.timers.borrow().lookup(&job);
        let Some(callback) = callback else {
            return Ok(false);
        };

        let result = self.runtime.context.with(|ctx| -> Result<(), ScriptError> {
            let func = callback.restore(&ctx)?;
            func.call::<_, ()>(())
                .map_err(|err| ScriptError::from_js(&ctx, err))
        });
        self.timers.borrow_mut().complete(&job);
        self.after_script();

        result.map(|()| true)
    }

    fn after_script(&self) {
        if self.options.drain_pending_jobs {
            self.runtime.run_pending_jobs();
        }
    }
}

impl Drop for ScriptHost {
    fn drop(&mut self) {
        // Callbacks are JS values; release them while the runtime is alive.
        self.timers.borrow_mut().clear();
    }
}
