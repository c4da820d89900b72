//! Port interfaces for sync operations

use std::time::Duration;

use async_trait::async_trait;
use notesync_domain::{BatchRequest, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Sends one grouped batch to the remote store.
#[async_trait]
pub trait BatchSubmitter: Send + Sync {
    /// Submit `request` as a single call.
    ///
    /// Returns the decoded response body on success. Any error fails the
    /// whole batch.
    async fn submit(&self, request: &BatchRequest) -> Result<Value>;
}

/// Trait for providing access tokens
///
/// Called immediately before every submission, so implementations may
/// refresh on demand.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Get a valid bearer token
    async fn access_token(&self) -> Result<String>;
}

/// Which engine timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Quiet period after the last enqueue
    Debounce,
    /// Follow-up flush after a successful batch left items queued
    Drain,
    /// Safety-net flush
    Periodic,
    /// Returns a failed batch's retryable items to the queue
    Retry,
}

/// A timer request. `id` is unique per engine and lets the engine ignore
/// fires from timers it has since cancelled or replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timer {
    /// Engine-assigned, never reused
    pub id: u64,
    pub kind: TimerKind,
}

/// Cancellable handle for a scheduled timer.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    /// Wrap the token the scheduler watches for this timer.
    pub const fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Stop the timer. A fire already delivered is not recalled.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Delivers `timer` back to the engine after `delay` unless cancelled first.
pub trait Scheduler: Send + Sync {
    /// Arm `timer` to fire once after `delay`.
    fn schedule(&self, delay: Duration, timer: Timer) -> TimerHandle;
}
