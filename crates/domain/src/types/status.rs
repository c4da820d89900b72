//! Sync status snapshot for hosts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cumulative counters kept by the engine since it was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub batches_committed: u64,
    pub batches_failed: u64,
    pub items_committed: u64,
    /// Item retries scheduled (one per item per failed batch)
    pub items_retried: u64,
    /// Items dropped after exhausting their retries
    pub items_dropped: u64,
    pub last_error: Option<String>,
    pub last_commit_at: Option<DateTime<Utc>>,
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Items waiting in the queue
    pub queued: usize,
    /// Items waiting for a scheduled retry to put them back on the queue
    pub awaiting_retry: usize,
    pub in_flight: bool,
    pub online: bool,
    pub stats: SyncStats,
}

impl SyncStatus {
    /// Items not yet committed or dropped, excluding an in-flight batch.
    pub const fn pending(&self) -> usize {
        self.queued + self.awaiting_retry
    }
}
