//! Host-side timer registry.
//!
//! Maps [`TimerId`] to the pending callback and owns the [`TimerService`].
//! The registry is only ever touched on the host thread; the timer thread
//! talks to it exclusively through [`ScheduledJob`]s.
//!
//! Dispatch comes in two flavours. [`TimerRegistry::dispatch`] is enough for
//! hosts whose callbacks never call back into the registry. Reentrant hosts
//! (script callbacks that create or delete timers) use
//! [`TimerRegistry::lookup`] and [`TimerRegistry::complete`] around the call
//! so no borrow of the registry is held while the callback runs.

use crate::time::Clock;
use crate::timer::{channel, JobQueue, Reload, ScheduledJob, TimerError, TimerId, TimerService};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace};

/// A registered timer and the callback it will invoke.
#[derive(Debug)]
pub struct TimerEntry<C> {
    pub period: Duration,
    pub reload: Reload,
    pub callback: C,
}

/// Owner of the id -> callback mapping.
///
/// Invariant: an entry exists for an id iff the service has a live timer for
/// it, except for a fired one-shot whose job has not been dispatched yet.
pub struct TimerRegistry<C> {
    entries: HashMap<TimerId, TimerEntry<C>>,
    next_id: u64,
    service: TimerService,
    clock: Clock,
}

impl<C> TimerRegistry<C> {
    pub fn new(service: TimerService) -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
            service,
            clock: Clock::new(),
        }
    }

    /// Spawn a timer service and return the registry together with the queue
    /// the host thread must drain.
    pub fn spawn() -> Result<(Self, JobQueue), TimerError> {
        let (scheduler, queue) = channel();
        let service = TimerService::spawn(scheduler)?;
        Ok((Self::new(service), queue))
    }

    /// Register `callback` and arm a timer firing every `period_ms`.
    pub fn create(
        &mut self,
        period_ms: u64,
        reload: Reload,
        callback: C,
    ) -> Result<TimerId, TimerError> {
        if period_ms == 0 {
            return Err(TimerError::InvalidArgument(
                "timers with no period are not supported".into(),
            ));
        }

        let id = TimerId::from_raw(self.next_id);
        self.next_id += 1;

        let period = Duration::from_millis(period_ms);
        self.service.create(id, period, reload)?;

        // The callback must be in place before the first fire can happen.
        self.entries.insert(
            id,
            TimerEntry {
                period,
                reload,
                callback,
            },
        );
        if let Err(err) = self.service.start(id) {
            self.entries.remove(&id);
            self.service.delete(id);
            return Err(err);
        }

        debug!(timer = %id, period_ms, ?reload, "timer created");
        Ok(id)
    }

    /// Remove the callback and destroy the native timer. Unknown ids are a
    /// no-op. Returns whether anything was removed.
    ///
    /// Jobs already queued for `id` are dropped at dispatch because the entry
    /// is gone; a job dequeued before this call has already run.
    pub fn delete(&mut self, id: TimerId) -> bool {
        if self.entries.remove(&id).is_none() {
            return false;
        }
        // A fired one-shot has no native timer left; that is fine.
        self.service.delete(id);
        debug!(timer = %id, "timer deleted");
        true
    }

    /// Delete every timer and drop every callback.
    pub fn clear(&mut self) {
        for (id, _) in self.entries.drain() {
            self.service.delete(id);
        }
    }

    /// Milliseconds since the registry was created.
    pub fn millis(&self) -> u64 {
        self.clock.millis()
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: TimerId) -> Option<&TimerEntry<C>> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn service(&self) -> &TimerService {
        &self.service
    }

    /// Resolve a job to its callback, or `None` if the timer was deleted.
    pub fn lookup(&self, job: &ScheduledJob) -> Option<C>
    where
        C: Clone,
    {
        match self.entries.get(&job.timer) {
            Some(entry) => Some(entry.callback.clone()),
            None => {
                trace!(timer = %job.timer, "dropping job for deleted timer");
                None
            }
        }
    }

    /// Finish a job after its callback ran: one-shot entries are removed.
    pub fn complete(&mut self, job: &ScheduledJob) {
        if job.cleanup {
            self.entries.remove(&job.timer);
        }
    }

    /// Look up, invoke and complete a job in one step. Returns whether the
    /// callback ran.
    pub fn dispatch<F>(&mut self, job: ScheduledJob, invoke: F) -> bool
    where
        F: FnOnce(TimerId, &mut C),
    {
        let Some(entry) = self.entries.get_mut(&job.timer) else {
            trace!(timer = %job.timer, "dropping job for deleted timer");
            return false;
        };
        invoke(job.timer, &mut entry.callback);
        self.complete(&job);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    type Registry = TimerRegistry<&'static str>;

    #[test]
    fn zero_period_fails_and_registers_nothing() {
        let (mut registry, _queue) = Registry::spawn().unwrap();
        let err = registry.create(0, Reload::OneShot, "never").unwrap_err();
        assert!(matches!(err, TimerError::InvalidArgument(_)));
        assert!(registry.is_empty());
        assert_eq!(registry.service().live_count(), 0);
    }

    #[test]
    fn one_shot_invoked_exactly_once_then_absent() {
        let (mut registry, queue) = Registry::spawn().unwrap();
        let id = registry.create(5, Reload::OneShot, "once").unwrap();
        assert!(registry.contains(id));

        let job = queue.next_timeout(WAIT).expect("fire");
        assert!(job.cleanup);
        // Native timer is gone, callback still pending dispatch.
        assert!(!registry.service().is_live(id));
        assert!(registry.contains(id));

        let mut calls = Vec::new();
        assert!(registry.dispatch(job, |id, cb| calls.push((id, *cb))));
        assert_eq!(calls, vec![(id, "once")]);
        assert!(!registry.contains(id));
        assert!(queue.next_timeout(Duration::from_millis(50)).is_none());
    }

    #[test]
    fn repeating_invoked_until_deleted() {
        let (mut registry, queue) = Registry::spawn().unwrap();
        let id = registry.create(5, Reload::Repeating, "tick").unwrap();

        let mut calls = 0;
        for _ in 0..3 {
            let job = queue.next_timeout(WAIT).expect("fire");
            assert!(!job.cleanup);
            assert!(registry.dispatch(job, |_, _| calls += 1));
        }
        assert_eq!(calls, 3);
        assert!(registry.contains(id));

        assert!(registry.delete(id));
        // Anything still queued is dropped without invocation.
        while let Some(job) = queue.next_timeout(Duration::from_millis(30)) {
            assert!(!registry.dispatch(job, |_, _| calls += 1));
        }
        assert_eq!(calls, 3);
        assert!(!registry.service().is_live(id));
    }

    #[test]
    fn delete_unknown_is_noop() {
        let (mut registry, _queue) = Registry::spawn().unwrap();
        let id = registry.create(60_000, Reload::Repeating, "kept").unwrap();

        assert!(!registry.delete(TimerId::from_raw(12345)));
        assert_eq!(registry.len(), 1);
        assert!(registry.service().is_live(id));
    }

    #[test]
    fn delete_before_dispatch_drops_pending_one_shot() {
        let (mut registry, queue) = Registry::spawn().unwrap();
        let id = registry.create(5, Reload::OneShot, "raced").unwrap();
        let job = queue.next_timeout(WAIT).expect("fire");

        assert!(registry.delete(id));
        assert_eq!(registry.lookup(&job), None);
        assert!(!registry.dispatch(job, |_, _| panic!("must not run")));
    }

    #[test]
    fn ids_are_never_reused() {
        let (mut registry, _queue) = Registry::spawn().unwrap();
        let first = registry.create(60_000, Reload::OneShot, "a").unwrap();
        registry.delete(first);
        let second = registry.create(60_000, Reload::OneShot, "b").unwrap();
        assert_ne!(first, second);
        assert!(second > first);
    }

    #[test]
    fn lookup_and_complete_split_dispatch() {
        let (mut registry, queue) = Registry::spawn().unwrap();
        let id = registry.create(5, Reload::OneShot, "split").unwrap();
        let job = queue.next_timeout(WAIT).expect("fire");

        assert_eq!(registry.lookup(&job), Some("split"));
        // Still registered while the callback would be running.
        assert!(registry.contains(id));
        registry.complete(&job);
        assert!(!registry.contains(id));
    }

    #[test]
    fn entry_records_period_and_policy() {
        let (mut registry, _queue) = Registry::spawn().unwrap();
        let id = registry.create(250, Reload::Repeating, "meta").unwrap();
        let entry = registry.get(id).unwrap();
        assert_eq!(entry.period, Duration::from_millis(250));
        assert_eq!(entry.reload, Reload::Repeating);
    }

    #[test]
    fn clear_destroys_everything() {
        let (mut registry, _queue) = Registry::spawn().unwrap();
        registry.create(60_000, Reload::Repeating, "a").unwrap();
        registry.create(60_000, Reload::OneShot, "b").unwrap();
        assert_eq!(registry.service().live_count(), 2);

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.service().live_count(), 0);
    }

    #[test]
    fn millis_is_non_decreasing() {
        let (registry, _queue) = Registry::spawn().unwrap();
        let a = registry.millis();
        std::thread::sleep(Duration::from_millis(5));
        let b = registry.millis();
        assert!(b >= a + 5);
    }
}
