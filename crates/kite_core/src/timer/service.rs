//! Timer service thread.
//!
//! Plays the role of the OS timer daemon: timers are created dormant, armed
//! with [`TimerService::start`], and expire on a dedicated preemptive thread.
//! On expiry the thread only produces a [`ScheduledJob`]; it never runs script
//! code and never touches host state.
//!
//! Deadlines live in a min-heap with lazy deletion. A heap entry is stale when
//! its timer was deleted or re-armed; stale entries are skipped on pop.

use crate::timer::{ScheduledJob, Scheduler, TimerError, TimerId};
use parking_lot::{Condvar, Mutex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Reload policy of a native timer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Reload {
    /// Fire once, then the native timer is destroyed.
    OneShot,
    /// Re-arm after every fire until deleted.
    Repeating,
}

impl Reload {
    pub fn from_one_shot(one_shot: bool) -> Self {
        if one_shot {
            Reload::OneShot
        } else {
            Reload::Repeating
        }
    }

    pub fn is_one_shot(self) -> bool {
        self == Reload::OneShot
    }
}

struct NativeTimer {
    period: Duration,
    reload: Reload,
    /// `None` while dormant (created but not started).
    deadline: Option<Instant>,
}

#[derive(Default)]
struct State {
    timers: HashMap<TimerId, NativeTimer>,
    deadlines: BinaryHeap<Reverse<(Instant, TimerId)>>,
    shutdown: bool,
}

impl State {
    fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.peek().map(|Reverse((deadline, _))| *deadline)
    }

    /// Expire every timer due at `now`, handing one job per fire to the host.
    fn fire_due(&mut self, now: Instant, scheduler: &Scheduler) {
        while let Some(&Reverse((deadline, id))) = self.deadlines.peek() {
            if deadline > now {
                break;
            }
            self.deadlines.pop();

            let Some(timer) = self.timers.get_mut(&id) else {
                continue;
            };
            if timer.deadline != Some(deadline) {
                continue;
            }

            let cleanup = match timer.reload {
                Reload::OneShot => {
                    self.timers.remove(&id);
                    true
                }
                Reload::Repeating => {
                    // Keep the period grid; skip missed periods instead of bursting.
                    let mut next = deadline + timer.period;
                    if next <= now {
                        next = now + timer.period;
                    }
                    timer.deadline = Some(next);
                    self.deadlines.push(Reverse((next, id)));
                    false
                }
            };

            trace!(timer = %id, cleanup, "timer fired");
            if scheduler.schedule(ScheduledJob { timer: id, cleanup }).is_err() {
                warn!(timer = %id, "host job queue closed; dropping timer fire");
            }
        }
    }
}

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

/// Owner of the native timers and the thread that expires them.
///
/// Dropping the service stops the thread and destroys every remaining timer.
pub struct TimerService {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl TimerService {
    /// Spawn the timer thread. Fires are delivered through `scheduler`.
    pub fn spawn(scheduler: Scheduler) -> Result<Self, TimerError> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            wake: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("kite-timers".into())
            .spawn(move || run(thread_shared, scheduler))?;

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Create a dormant timer under `id`. It does not fire until started.
    pub fn create(&self, id: TimerId, period: Duration, reload: Reload) -> Result<(), TimerError> {
        if period.is_zero() {
            return Err(TimerError::InvalidArgument(
                "timers with no period are not supported".into(),
            ));
        }

        let mut state = self.shared.state.lock();
        if state.timers.contains_key(&id) {
            return Err(TimerError::DuplicateTimer(id));
        }
        state.timers.insert(
            id,
            NativeTimer {
                period,
                reload,
                deadline: None,
            },
        );
        Ok(())
    }

    /// Arm a timer; the first fire happens one period from now.
    pub fn start(&self, id: TimerId) -> Result<(), TimerError> {
        let mut state = self.shared.state.lock();
        let timer = state
            .timers
            .get_mut(&id)
            .ok_or(TimerError::UnknownTimer(id))?;

        let deadline = Instant::now() + timer.period;
        timer.deadline = Some(deadline);
        state.deadlines.push(Reverse((deadline, id)));
        drop(state);

        self.shared.wake.notify_one();
        Ok(())
    }

    /// Destroy a timer. Returns `false` if it no longer exists (e.g. a
    /// one-shot that already fired).
    ///
    /// Fires are produced while the state lock is held, so once this returns
    /// the timer thread will not schedule another job for `id`.
    pub fn delete(&self, id: TimerId) -> bool {
        let removed = self.shared.state.lock().timers.remove(&id).is_some();
        if removed {
            // Let the thread recompute its wait if this was the earliest deadline.
            self.shared.wake.notify_one();
        }
        removed
    }

    pub fn is_live(&self, id: TimerId) -> bool {
        self.shared.state.lock().timers.contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.shared.state.lock().timers.len()
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.wake.notify_all();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("timer thread panicked");
            }
        }
    }
}

fn run(shared: Arc<Shared>, scheduler: Scheduler) {
    debug!("timer thread started");
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            break;
        }

        state.fire_due(Instant::now(), &scheduler);

        match state.next_deadline() {
            Some(deadline) => {
                shared.wake.wait_until(&mut state, deadline);
            }
            None => shared.wake.wait(&mut state),
        }
    }
    debug!(remaining = state.timers.len(), "timer thread stopped");
}
