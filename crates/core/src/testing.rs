//! Deterministic scheduling for engine tests.
//!
//! [`ManualScheduler`] records timers instead of sleeping. Tests move a
//! virtual clock forward with [`advance`], which fires due timers into the
//! engine in deadline order, including timers armed while firing.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::engine::{Dispatch, SyncEngine};
use crate::sync::ports::{Scheduler, Timer, TimerHandle, TimerKind};

#[derive(Debug)]
struct Scheduled {
    due: Duration,
    seq: u64,
    timer: Timer,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct State {
    now: Duration,
    seq: u64,
    timers: Vec<Scheduled>,
}

/// Virtual-time [`Scheduler`].
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<State>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Remove and return the earliest live timer due at or before `until`,
    /// moving the clock to its deadline.
    pub fn pop_due(&self, until: Duration) -> Option<Timer> {
        let mut state = self.lock();
        state.timers.retain(|scheduled| !scheduled.token.is_cancelled());

        let next = state
            .timers
            .iter()
            .enumerate()
            .filter(|(_, scheduled)| scheduled.due <= until)
            .min_by_key(|(_, scheduled)| (scheduled.due, scheduled.seq))
            .map(|(index, _)| index)?;

        let scheduled = state.timers.swap_remove(next);
        state.now = state.now.max(scheduled.due);
        Some(scheduled.timer)
    }

    /// Move the clock to `until` without firing anything.
    pub fn set_now(&self, until: Duration) {
        let mut state = self.lock();
        state.now = state.now.max(until);
    }

    /// Remaining delay of every live timer of `kind`, soonest first.
    pub fn pending(&self, kind: TimerKind) -> Vec<Duration> {
        let state = self.lock();
        let mut remaining: Vec<Duration> = state
            .timers
            .iter()
            .filter(|scheduled| scheduled.timer.kind == kind && !scheduled.token.is_cancelled())
            .map(|scheduled| scheduled.due.saturating_sub(state.now))
            .collect();
        remaining.sort();
        remaining
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, timer: Timer) -> TimerHandle {
        let token = CancellationToken::new();
        let mut state = self.lock();
        let due = state.now + delay;
        let seq = state.seq;
        state.seq += 1;
        state.timers.push(Scheduled { due, seq, timer, token: token.clone() });
        TimerHandle::new(token)
    }
}

/// Advance `scheduler` by `by`, delivering every timer that comes due to
/// `engine`. Returns the batches the engine dispatched along the way.
pub fn advance(engine: &mut SyncEngine, scheduler: &ManualScheduler, by: Duration) -> Vec<Dispatch> {
    let until = scheduler.now() + by;
    let mut dispatched = Vec::new();
    while let Some(timer) = scheduler.pop_due(until) {
        if let Some(dispatch) = engine.on_timer(timer) {
            dispatched.push(dispatch);
        }
    }
    scheduler.set_now(until);
    dispatched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_order_and_skips_cancelled() {
        let scheduler = ManualScheduler::new();
        let late = Timer { id: 1, kind: TimerKind::Periodic };
        let early = Timer { id: 2, kind: TimerKind::Debounce };
        let cancelled = Timer { id: 3, kind: TimerKind::Drain };

        scheduler.schedule(Duration::from_secs(30), late);
        scheduler.schedule(Duration::from_secs(2), early);
        scheduler.schedule(Duration::from_secs(1), cancelled).cancel();

        assert_eq!(scheduler.pop_due(Duration::from_secs(60)), Some(early));
        assert_eq!(scheduler.now(), Duration::from_secs(2));
        assert_eq!(scheduler.pending(TimerKind::Periodic), vec![Duration::from_secs(28)]);
        assert_eq!(scheduler.pop_due(Duration::from_secs(10)), None);
        assert_eq!(scheduler.pop_due(Duration::from_secs(30)), Some(late));
    }
}
