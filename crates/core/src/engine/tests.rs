use std::sync::Arc;
use std::time::Duration;

use notesync_domain::{
    EntityPayload, EntityRef, EntityType, HostMessage, Mutation, NoteRecord, SyncConfig,
    SyncError, SyncEvent, SyncItem,
};
use serde_json::json;

use super::{Completion, Dispatch, SyncEngine};
use crate::sync::ports::TimerKind;
use crate::testing::{advance, ManualScheduler};

struct Harness {
    engine: SyncEngine,
    scheduler: ManualScheduler,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(SyncConfig::with_endpoint("http://localhost/api/batch-sync"))
    }

    fn with_config(config: SyncConfig) -> Self {
        let scheduler = ManualScheduler::new();
        let mut engine = SyncEngine::new(&config, Arc::new(scheduler.clone()));
        engine.start();
        Self { engine, scheduler }
    }

    fn advance_ms(&mut self, ms: u64) -> Vec<Dispatch> {
        advance(&mut self.engine, &self.scheduler, Duration::from_millis(ms))
    }

    fn succeed(&mut self, dispatch: &Dispatch) -> Completion {
        self.engine.on_submit_result(dispatch.batch_id, Ok(json!({"ok": true})))
    }

    fn fail(&mut self, dispatch: &Dispatch) -> Completion {
        self.engine.on_submit_result(
            dispatch.batch_id,
            Err(SyncError::Server("batch sync returned status 500".into())),
        )
    }
}

fn note_update(id: &str, note: &str, updated_at: i64) -> SyncItem {
    SyncItem::with_id(id, Mutation::Update(EntityPayload::Note(NoteRecord::new(note, updated_at))))
}

fn creates(count: usize) -> Vec<SyncItem> {
    (0..count)
        .map(|i| {
            SyncItem::with_id(
                format!("c{i}"),
                Mutation::Create(EntityPayload::Note(NoteRecord::new(format!("n{i}"), 1))),
            )
        })
        .collect()
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

#[test]
fn debounce_fires_after_quiet_period() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![note_update("a", "n1", 1)]);

    assert!(h.advance_ms(1_999).is_empty());
    let dispatched = h.advance_ms(1);

    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].item_ids, ids(&["a"]));
}

#[test]
fn new_arrivals_restart_the_debounce_window() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![note_update("a", "n1", 1)]);
    assert!(h.advance_ms(1_500).is_empty());

    h.engine.enqueue(vec![note_update("b", "n2", 1)]);
    assert!(h.advance_ms(1_500).is_empty());

    let dispatched = h.advance_ms(500);
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].item_ids, ids(&["a", "b"]));
}

#[test]
fn empty_enqueue_is_ignored() {
    let mut h = Harness::new();
    h.engine.enqueue(Vec::new());

    assert!(h.scheduler.pending(TimerKind::Debounce).is_empty());
    assert_eq!(h.engine.status().queued, 0);
}

#[test]
fn flush_now_cancels_debounce() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![note_update("a", "n1", 1)]);

    let dispatch = h.engine.flush_now().expect("dispatch");
    assert_eq!(dispatch.item_ids, ids(&["a"]));
    assert!(h.scheduler.pending(TimerKind::Debounce).is_empty());
}

#[test]
fn scenario_a_merges_note_updates() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![
        note_update("a", "n1", 100),
        note_update("b", "n1", 300),
        note_update("c", "n1", 200),
    ]);

    let dispatch = h.engine.flush_now().expect("dispatch");

    assert_eq!(dispatch.request.notes.len(), 1);
    assert_eq!(dispatch.request.notes[0].id, "n1");
    assert_eq!(dispatch.request.notes[0].updated_at, 300);
    assert_eq!(dispatch.item_ids, ids(&["a", "b", "c"]));
}

#[test]
fn scenario_b_drains_backlog_in_batches_of_ten() {
    let mut h = Harness::new();
    h.engine.enqueue(creates(12));

    let first = h.advance_ms(2_000);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].item_ids.len(), 10);
    assert_eq!(h.engine.status().queued, 2);

    let completion = h.succeed(&first[0]);
    let Some(SyncEvent::Committed { ids: committed, .. }) = completion.event else {
        panic!("expected commit, got {:?}", completion.event);
    };
    assert_eq!(committed.len(), 10);
    assert_eq!(h.scheduler.pending(TimerKind::Drain), vec![Duration::from_millis(1_000)]);

    let second = h.advance_ms(1_000);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].item_ids, ids(&["c10", "c11"]));

    let completion = h.succeed(&second[0]);
    assert!(completion.event.is_some());
    assert!(h.scheduler.pending(TimerKind::Drain).is_empty());
}

#[test]
fn scenario_c_first_failure_schedules_retry() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![note_update("a", "n1", 1), note_update("b", "n2", 1)]);
    let dispatch = h.engine.flush_now().expect("dispatch");

    let completion = h.fail(&dispatch);

    assert!(completion.event.is_none(), "no failure notification on first failure");
    let status = h.engine.status();
    assert_eq!(status.queued, 0);
    assert_eq!(status.awaiting_retry, 2);
    assert!(h.engine.awaiting_retry().all(|item| item.retry_count == 1));
    assert_eq!(h.scheduler.pending(TimerKind::Retry), vec![Duration::from_millis(5_000)]);

    assert!(h.advance_ms(4_999).is_empty());
    let retried = h.advance_ms(1);
    assert_eq!(retried.len(), 1);
    assert_eq!(retried[0].item_ids, ids(&["a", "b"]));
}

#[test]
fn scenario_d_third_failure_reports_once() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![note_update("a", "n1", 1), note_update("b", "n2", 1)]);

    let first = h.engine.flush_now().expect("dispatch");
    assert!(h.fail(&first).event.is_none());

    let second = h.advance_ms(5_000).pop().expect("first retry");
    assert!(h.fail(&second).event.is_none());
    assert_eq!(h.scheduler.pending(TimerKind::Retry), vec![Duration::from_millis(15_000)]);
    assert!(h.engine.awaiting_retry().all(|item| item.retry_count == 2));

    let third = h.advance_ms(15_000).pop().expect("second retry");
    let completion = h.fail(&third);

    match completion.event {
        Some(SyncEvent::Failed { ids: failed, error }) => {
            assert_eq!(failed, ids(&["a", "b"]));
            assert!(error.contains("500"), "{error}");
        }
        other => panic!("expected failure notification, got {other:?}"),
    }
    assert_eq!(h.engine.status().pending(), 0);
    assert!(h.scheduler.pending(TimerKind::Retry).is_empty());

    // Dropped items never come back.
    assert!(h.advance_ms(120_000).is_empty());
    assert_eq!(h.engine.status().stats.items_dropped, 2);
}

#[test]
fn retried_items_return_ahead_of_newer_arrivals() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![note_update("a", "n1", 1), note_update("b", "n2", 1)]);
    let dispatch = h.engine.flush_now().expect("dispatch");
    h.fail(&dispatch);

    h.engine.set_connectivity(false);
    h.engine.enqueue(vec![note_update("c", "n3", 1)]);
    assert!(h.advance_ms(5_000).is_empty());
    let queued: Vec<(&str, u32)> =
        h.engine.queued().map(|item| (item.id.as_str(), item.retry_count)).collect();
    assert_eq!(queued, vec![("a", 1), ("b", 1), ("c", 0)]);

    let dispatch = h.engine.set_connectivity(true).expect("dispatch on reconnect");
    assert_eq!(dispatch.item_ids, ids(&["a", "b", "c"]));
    assert_eq!(h.engine.status().queued, 0);
}

#[test]
fn offline_suppresses_every_trigger() {
    let mut h = Harness::new();
    assert!(h.engine.set_connectivity(false).is_none());
    h.engine.enqueue(creates(3));

    assert!(h.advance_ms(2_000).is_empty(), "debounce");
    assert!(h.engine.flush_now().is_none(), "explicit");
    assert!(h.advance_ms(60_000).is_empty(), "periodic");
    assert_eq!(h.engine.status().queued, 3);

    let dispatch = h.engine.set_connectivity(true).expect("flush on reconnect");
    assert_eq!(dispatch.item_ids.len(), 3);
}

#[test]
fn periodic_trigger_flushes_a_stalled_queue() {
    let mut config = SyncConfig::with_endpoint("http://localhost/api/batch-sync");
    config.debounce_ms = 120_000;
    let mut h = Harness::with_config(config);
    h.engine.enqueue(creates(1));

    assert!(h.advance_ms(29_999).is_empty());
    let dispatched = h.advance_ms(1);
    assert_eq!(dispatched.len(), 1);
    assert_eq!(h.scheduler.pending(TimerKind::Periodic), vec![Duration::from_millis(30_000)]);
}

#[test]
fn triggers_during_flight_are_deferred() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![note_update("a", "n1", 1)]);
    let first = h.engine.flush_now().expect("dispatch");

    h.engine.enqueue(vec![note_update("b", "n1", 2)]);
    assert!(h.engine.flush_now().is_none(), "single flight");
    assert!(h.engine.status().in_flight);

    let completion = h.succeed(&first);
    assert!(matches!(completion.event, Some(SyncEvent::Committed { .. })));
    let deferred = completion.dispatch.expect("deferred flush");
    assert_eq!(deferred.item_ids, ids(&["b"]));
    assert!(h.scheduler.pending(TimerKind::Drain).is_empty());
}

#[test]
fn deferred_trigger_is_served_after_a_failure() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![note_update("a", "n1", 1)]);
    let first = h.engine.flush_now().expect("dispatch");

    h.engine.enqueue(vec![note_update("b", "n2", 1)]);
    assert!(h.engine.flush_now().is_none());

    let completion = h.fail(&first);
    assert!(completion.event.is_none());
    let deferred = completion.dispatch.expect("deferred flush");
    assert_eq!(deferred.item_ids, ids(&["b"]));
    assert!(h.scheduler.pending(TimerKind::Drain).is_empty());
    assert_eq!(h.scheduler.pending(TimerKind::Retry), vec![Duration::from_millis(5_000)]);
}

#[test]
fn late_failure_after_clear_is_discarded() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![note_update("a", "n1", 1)]);
    let dispatch = h.engine.flush_now().expect("dispatch");

    h.engine.enqueue(vec![note_update("b", "n2", 1)]);
    h.engine.clear();
    assert_eq!(h.engine.status().queued, 0);

    let completion = h.fail(&dispatch);
    assert!(completion.event.is_none());
    assert!(completion.dispatch.is_none());
    assert_eq!(h.engine.status().pending(), 0);
    assert!(h.scheduler.pending(TimerKind::Retry).is_empty());
}

#[test]
fn late_success_after_clear_is_still_reported() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![note_update("a", "n1", 1)]);
    let dispatch = h.engine.flush_now().expect("dispatch");
    h.engine.clear();

    let completion = h.succeed(&dispatch);
    assert!(matches!(completion.event, Some(SyncEvent::Committed { ref ids, .. }) if ids == &vec!["a".to_string()]));
    assert!(h.scheduler.pending(TimerKind::Drain).is_empty());
}

#[test]
fn clear_cancels_timers_and_scheduled_retries() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![note_update("a", "n1", 1)]);
    let dispatch = h.engine.flush_now().expect("dispatch");
    h.fail(&dispatch);
    h.engine.enqueue(vec![note_update("b", "n2", 1)]);

    h.engine.clear();

    assert!(h.scheduler.pending(TimerKind::Debounce).is_empty());
    assert!(h.scheduler.pending(TimerKind::Retry).is_empty());
    assert_eq!(h.scheduler.pending(TimerKind::Periodic), vec![Duration::from_millis(30_000)]);
    assert!(h.advance_ms(120_000).is_empty());
}

#[test]
fn results_for_unknown_batches_are_ignored() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![note_update("a", "n1", 1)]);
    let dispatch = h.engine.flush_now().expect("dispatch");

    let completion = h.engine.on_submit_result(dispatch.batch_id + 7, Ok(json!({})));
    assert!(completion.event.is_none());
    assert_eq!(h.engine.in_flight_batch(), Some(dispatch.batch_id));
}

#[test]
fn host_messages_drive_the_engine() {
    let mut h = Harness::new();
    let deletion = SyncItem::with_id("d", Mutation::Delete(EntityRef::new(EntityType::File, "f1")));

    assert!(h.engine.handle(HostMessage::Enqueue(vec![deletion])).is_none());
    let dispatch = h.engine.handle(HostMessage::FlushNow).expect("dispatch");
    assert_eq!(dispatch.request.deletions, vec![EntityRef::new(EntityType::File, "f1")]);

    h.succeed(&dispatch);
    assert!(h.engine.handle(HostMessage::SetConnectivity(false)).is_none());
    assert!(!h.engine.is_online());
    assert!(h.engine.handle(HostMessage::ClearQueue).is_none());

    let stats = h.engine.status().stats;
    assert_eq!(stats.batches_committed, 1);
    assert_eq!(stats.items_committed, 1);
    assert!(stats.last_commit_at.is_some());
}

#[test]
fn replaced_debounce_fire_is_ignored() {
    let mut h = Harness::new();
    h.engine.enqueue(vec![note_update("a", "n1", 1)]);
    let first = h.scheduler.pop_due(Duration::from_millis(2_000)).expect("debounce timer");
    assert_eq!(first.kind, TimerKind::Debounce);

    h.engine.enqueue(vec![note_update("b", "n2", 1)]);
    assert!(h.engine.on_timer(first).is_none());
    assert_eq!(h.engine.in_flight_batch(), None);
    assert_eq!(h.engine.queued().count(), 2);

    let dispatched = h.advance_ms(2_000);
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].item_ids, ids(&["a", "b"]));
}

#[test]
fn superseded_periodic_fire_is_ignored() {
    let mut h = Harness::new();
    let tick = h.scheduler.pop_due(Duration::from_millis(30_000)).expect("periodic timer");
    assert_eq!(tick.kind, TimerKind::Periodic);
    assert!(h.engine.on_timer(tick).is_none());

    h.engine.enqueue(vec![note_update("a", "n1", 1)]);
    assert!(h.engine.on_timer(tick).is_none());
    assert_eq!(h.engine.in_flight_batch(), None);
    assert_eq!(h.scheduler.pending(TimerKind::Periodic), vec![Duration::from_millis(30_000)]);
}
