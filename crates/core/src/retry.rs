//! Retry bookkeeping for failed batches.

use std::time::Duration;

use notesync_domain::constants::FALLBACK_RETRY_DELAY_MS;
use notesync_domain::{SyncConfig, SyncItem};

/// Retry ceiling and backoff table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retry_count: u32,
    delays: Vec<Duration>,
}

/// How a failed batch splits up.
#[derive(Debug, Default)]
pub struct RetryOutcome {
    /// Items to return to the head of the queue after `delay`
    pub retryable: Vec<SyncItem>,
    /// Items that reached the ceiling and are dropped
    pub exhausted: Vec<SyncItem>,
    /// Set whenever `retryable` is non-empty
    pub delay: Option<Duration>,
}

impl RetryPolicy {
    pub fn new(max_retry_count: u32, delays: Vec<Duration>) -> Self {
        Self { max_retry_count, delays }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.max_retry_count, config.retry_delays())
    }

    /// Backoff for an item that has now failed `retry_count` times.
    ///
    /// Indexes the table at `retry_count - 1`, clamped to the last entry.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let index = usize::try_from(retry_count.saturating_sub(1)).unwrap_or(usize::MAX);
        self.delays
            .get(index)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::from_millis(FALLBACK_RETRY_DELAY_MS))
    }

    pub const fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retry_count
    }

    /// Charge one failure to every item of a batch.
    ///
    /// The whole batch shares one delay, taken from the first retryable item.
    pub fn apply_failure(&self, items: Vec<SyncItem>) -> RetryOutcome {
        let mut outcome = RetryOutcome::default();

        for mut item in items {
            item.retry_count = item.retry_count.saturating_add(1);
            if self.is_exhausted(item.retry_count) {
                outcome.exhausted.push(item);
            } else {
                outcome.retryable.push(item);
            }
        }

        outcome.delay = outcome.retryable.first().map(|item| self.delay_for(item.retry_count));
        outcome
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}
