//! Sync engine
//!
//! [`SyncEngine`] owns the queue, the connectivity flag, the in-flight batch
//! and every timer. It never performs I/O: each operation returns the batch
//! to submit (if any) as a [`Dispatch`], and the host reports the outcome
//! through [`SyncEngine::on_submit_result`]. Timers are requested from the
//! injected [`Scheduler`] and come back through [`SyncEngine::on_timer`].
//!
//! At most one batch is in flight. Triggers that arrive meanwhile are
//! remembered and served when the result comes in.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use notesync_domain::{
    BatchRequest, HostMessage, Result, SyncConfig, SyncError, SyncEvent, SyncItem, SyncStats,
    SyncStatus,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::batch::next_batch;
use crate::queue::SyncQueue;
use crate::retry::{RetryOutcome, RetryPolicy};
use crate::sync::ports::{Scheduler, Timer, TimerHandle, TimerKind};

#[cfg(test)]
mod tests;

/// A batch the host must submit, then report back with `batch_id`.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub batch_id: u64,
    pub request: BatchRequest,
    /// Ids of the queued items folded into `request`
    pub item_ids: Vec<String>,
}

/// Result of applying a submission outcome.
#[derive(Debug, Default)]
pub struct Completion {
    /// Notification for the host, if the outcome warrants one
    pub event: Option<SyncEvent>,
    /// Deferred flush that can start now
    pub dispatch: Option<Dispatch>,
}

struct ArmedTimer {
    id: u64,
    handle: TimerHandle,
}

struct InFlight {
    batch_id: u64,
    items: Vec<SyncItem>,
    /// Clear generation the batch was taken in
    epoch: u64,
}

struct ScheduledRetry {
    handle: TimerHandle,
    items: Vec<SyncItem>,
}

/// Offline-first sync state machine.
pub struct SyncEngine {
    scheduler: Arc<dyn Scheduler>,
    policy: RetryPolicy,
    batch_size: usize,
    debounce_delay: Duration,
    drain_delay: Duration,
    periodic_interval: Duration,
    queue: SyncQueue,
    online: bool,
    in_flight: Option<InFlight>,
    flush_deferred: bool,
    debounce: Option<ArmedTimer>,
    drain: Option<ArmedTimer>,
    periodic: Option<ArmedTimer>,
    retries: HashMap<u64, ScheduledRetry>,
    next_timer_id: u64,
    next_batch_id: u64,
    epoch: u64,
    stats: SyncStats,
}

impl SyncEngine {
    /// Create an engine. It starts online with an empty queue; call
    /// [`start`](Self::start) to arm the periodic trigger.
    pub fn new(config: &SyncConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            policy: RetryPolicy::from_config(config),
            batch_size: config.batch_size.max(1),
            debounce_delay: config.debounce_delay(),
            drain_delay: config.drain_delay(),
            periodic_interval: config.periodic_interval(),
            queue: SyncQueue::new(),
            online: true,
            in_flight: None,
            flush_deferred: false,
            debounce: None,
            drain: None,
            periodic: None,
            retries: HashMap::new(),
            next_timer_id: 0,
            next_batch_id: 0,
            epoch: 0,
            stats: SyncStats::default(),
        }
    }

    /// Arm the periodic trigger. Idempotent.
    pub fn start(&mut self) {
        if self.periodic.is_none() {
            self.periodic = Some(self.arm(TimerKind::Periodic, self.periodic_interval));
        }
    }

    /// Apply one host command.
    pub fn handle(&mut self, message: HostMessage) -> Option<Dispatch> {
        match message {
            HostMessage::Enqueue(items) => {
                self.enqueue(items);
                None
            }
            HostMessage::FlushNow => self.flush_now(),
            HostMessage::ClearQueue => {
                self.clear();
                None
            }
            HostMessage::SetConnectivity(online) => self.set_connectivity(online),
        }
    }

    /// Append `items` and restart the debounce window.
    pub fn enqueue(&mut self, items: Vec<SyncItem>) {
        if items.is_empty() {
            debug!("Ignoring empty enqueue");
            return;
        }

        let count = items.len();
        self.queue.append(items);
        Self::disarm(&mut self.debounce);
        self.debounce = Some(self.arm(TimerKind::Debounce, self.debounce_delay));
        debug!(count, queued = self.queue.len(), "Items enqueued");
    }

    /// Cancel the debounce window and flush now.
    pub fn flush_now(&mut self) -> Option<Dispatch> {
        Self::disarm(&mut self.debounce);
        self.try_flush("explicit")
    }

    /// Drop all queued and retry-scheduled items and cancel the debounce and
    /// drain timers. The periodic trigger is restarted, not stopped.
    ///
    /// An in-flight batch keeps running. If it later fails, its items are
    /// discarded without a notification.
    pub fn clear(&mut self) {
        let dropped = self.queue.clear();
        Self::disarm(&mut self.debounce);
        Self::disarm(&mut self.drain);

        let discarded_retries: usize = self
            .retries
            .drain()
            .map(|(_, retry)| {
                retry.handle.cancel();
                retry.items.len()
            })
            .sum();

        if self.periodic.is_some() {
            Self::disarm(&mut self.periodic);
            self.periodic = Some(self.arm(TimerKind::Periodic, self.periodic_interval));
        }

        self.flush_deferred = false;
        self.epoch += 1;
        info!(
            dropped,
            discarded_retries,
            in_flight = self.in_flight.is_some(),
            "Sync queue cleared"
        );
    }

    /// Record a connectivity change. Going (or staying) online flushes.
    pub fn set_connectivity(&mut self, online: bool) -> Option<Dispatch> {
        if self.online != online {
            info!(online, "Connectivity changed");
        }
        self.online = online;

        if online {
            self.try_flush("connectivity")
        } else {
            None
        }
    }

    /// Deliver a fired timer. Fires from cancelled or superseded timers are
    /// ignored.
    pub fn on_timer(&mut self, timer: Timer) -> Option<Dispatch> {
        match timer.kind {
            TimerKind::Debounce => {
                if !Self::take_if_current(&mut self.debounce, timer.id) {
                    return self.stale(timer);
                }
                self.try_flush("debounce")
            }
            TimerKind::Drain => {
                if !Self::take_if_current(&mut self.drain, timer.id) {
                    return self.stale(timer);
                }
                self.try_flush("drain")
            }
            TimerKind::Periodic => {
                if !Self::take_if_current(&mut self.periodic, timer.id) {
                    return self.stale(timer);
                }
                self.periodic = Some(self.arm(TimerKind::Periodic, self.periodic_interval));
                if self.queue.is_empty() {
                    return None;
                }
                self.try_flush("periodic")
            }
            TimerKind::Retry => {
                let Some(retry) = self.retries.remove(&timer.id) else {
                    return self.stale(timer);
                };
                debug!(items = retry.items.len(), "Returning retried items to queue head");
                self.queue.prepend(retry.items);
                self.try_flush("retry")
            }
        }
    }

    /// Apply the outcome of the submission started by `batch_id`.
    pub fn on_submit_result(&mut self, batch_id: u64, result: Result<Value>) -> Completion {
        let in_flight = match self.in_flight.take() {
            Some(in_flight) if in_flight.batch_id == batch_id => in_flight,
            other => {
                self.in_flight = other;
                warn!(batch_id, "Ignoring result for a batch that is not in flight");
                return Completion::default();
            }
        };

        let cleared = in_flight.epoch != self.epoch;
        let event = match result {
            Ok(body) => Some(self.commit(batch_id, in_flight.items, body)),
            Err(err) => self.fail(batch_id, in_flight.items, &err, cleared),
        };

        let dispatch = if std::mem::take(&mut self.flush_deferred) {
            self.try_flush("deferred")
        } else {
            None
        };

        Completion { event, dispatch }
    }

    /// Id of the batch currently awaiting a result.
    pub fn in_flight_batch(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|in_flight| in_flight.batch_id)
    }

    pub const fn is_online(&self) -> bool {
        self.online
    }

    /// Items waiting in the queue, head first.
    pub fn queued(&self) -> impl Iterator<Item = &SyncItem> {
        self.queue.iter()
    }

    /// Items parked until their retry timer fires.
    pub fn awaiting_retry(&self) -> impl Iterator<Item = &SyncItem> {
        self.retries.values().flat_map(|retry| retry.items.iter())
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            queued: self.queue.len(),
            awaiting_retry: self.retries.values().map(|retry| retry.items.len()).sum(),
            in_flight: self.in_flight.is_some(),
            online: self.online,
            stats: self.stats.clone(),
        }
    }

    fn try_flush(&mut self, trigger: &'static str) -> Option<Dispatch> {
        if !self.online {
            debug!(trigger, queued = self.queue.len(), "Offline, flush skipped");
            return None;
        }
        if self.queue.is_empty() {
            return None;
        }
        if let Some(in_flight) = &self.in_flight {
            debug!(trigger, batch_id = in_flight.batch_id, "Flush deferred behind in-flight batch");
            self.flush_deferred = true;
            return None;
        }

        let batch = next_batch(&mut self.queue, self.batch_size)?;
        let batch_id = self.next_batch_id;
        self.next_batch_id += 1;
        let item_ids = batch.item_ids();

        info!(
            trigger,
            batch_id,
            items = item_ids.len(),
            records = batch.request.record_count(),
            remaining = self.queue.len(),
            "Dispatching sync batch"
        );

        self.in_flight = Some(InFlight { batch_id, items: batch.items, epoch: self.epoch });
        Some(Dispatch { batch_id, request: batch.request, item_ids })
    }

    fn commit(&mut self, batch_id: u64, items: Vec<SyncItem>, result: Value) -> SyncEvent {
        let ids: Vec<String> = items.into_iter().map(|item| item.id).collect();

        self.stats.batches_committed += 1;
        self.stats.items_committed += ids.len() as u64;
        self.stats.last_commit_at = Some(Utc::now());
        info!(batch_id, items = ids.len(), "Sync batch committed");

        if !self.queue.is_empty() && !self.flush_deferred {
            Self::disarm(&mut self.drain);
            self.drain = Some(self.arm(TimerKind::Drain, self.drain_delay));
        }

        SyncEvent::Committed { ids, result }
    }

    fn fail(
        &mut self,
        batch_id: u64,
        items: Vec<SyncItem>,
        err: &SyncError,
        cleared: bool,
    ) -> Option<SyncEvent> {
        self.stats.batches_failed += 1;
        self.stats.last_error = Some(err.to_string());

        if cleared {
            warn!(batch_id, items = items.len(), error = %err, "Batch failed after clear, discarding");
            return None;
        }

        let RetryOutcome { retryable, exhausted, delay } = self.policy.apply_failure(items);
        warn!(
            batch_id,
            error = %err,
            category = ?err.category(),
            retryable = retryable.len(),
            exhausted = exhausted.len(),
            "Sync batch failed"
        );

        if let Some(delay) = delay {
            self.stats.items_retried += retryable.len() as u64;
            let armed = self.arm(TimerKind::Retry, delay);
            debug!(items = retryable.len(), delay = ?delay, "Retry scheduled");
            self.retries.insert(armed.id, ScheduledRetry { handle: armed.handle, items: retryable });
        }

        if exhausted.is_empty() {
            return None;
        }

        let ids: Vec<String> = exhausted.into_iter().map(|item| item.id).collect();
        self.stats.items_dropped += ids.len() as u64;
        error!(batch_id, ids = ?ids, error = %err, "Items dropped after exhausting retries");
        Some(SyncEvent::Failed { ids, error: err.to_string() })
    }

    fn arm(&mut self, kind: TimerKind, delay: Duration) -> ArmedTimer {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let handle = self.scheduler.schedule(delay, Timer { id, kind });
        ArmedTimer { id, handle }
    }

    fn disarm(slot: &mut Option<ArmedTimer>) {
        if let Some(timer) = slot.take() {
            timer.handle.cancel();
        }
    }

    fn take_if_current(slot: &mut Option<ArmedTimer>, id: u64) -> bool {
        if slot.as_ref().is_some_and(|armed| armed.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    fn stale(&self, timer: Timer) -> Option<Dispatch> {
        debug!(timer_id = timer.id, kind = ?timer.kind, "Ignoring stale timer");
        None
    }
}
