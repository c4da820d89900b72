//! Engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    BATCH_SIZE, DEBOUNCE_DELAY_MS, DRAIN_DELAY_MS, MAX_RETRY_COUNT, PERIODIC_FLUSH_INTERVAL_MS,
    RETRY_DELAYS_MS,
};
use crate::errors::{Result, SyncError};

/// Tunables for the sync engine and its HTTP submitter.
///
/// Every field except `endpoint_url` has a default, so a file or env source
/// only needs to name the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Full URL of the batch ingestion endpoint
    pub endpoint_url: String,
    /// Static bearer token, for hosts without a token provider of their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_drain_delay_ms")]
    pub drain_delay_ms: u64,
    #[serde(default = "default_periodic_interval_ms")]
    pub periodic_interval_ms: u64,
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,
    #[serde(default = "default_retry_delays_ms")]
    pub retry_delays_ms: Vec<u64>,
    /// Per-request timeout; `None` leaves the transport default in place
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            api_token: None,
            batch_size: default_batch_size(),
            debounce_ms: default_debounce_ms(),
            drain_delay_ms: default_drain_delay_ms(),
            periodic_interval_ms: default_periodic_interval_ms(),
            max_retry_count: default_max_retry_count(),
            retry_delays_ms: default_retry_delays_ms(),
            request_timeout_ms: None,
        }
    }
}

impl SyncConfig {
    /// Default configuration pointed at `endpoint_url`.
    pub fn with_endpoint(endpoint_url: impl Into<String>) -> Self {
        Self { endpoint_url: endpoint_url.into(), ..Self::default() }
    }

    pub const fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub const fn drain_delay(&self) -> Duration {
        Duration::from_millis(self.drain_delay_ms)
    }

    pub const fn periodic_interval(&self) -> Duration {
        Duration::from_millis(self.periodic_interval_ms)
    }

    pub fn retry_delays(&self) -> Vec<Duration> {
        self.retry_delays_ms.iter().copied().map(Duration::from_millis).collect()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Reject settings the engine cannot run with.
    ///
    /// # Errors
    /// Returns `SyncError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint_url.trim().is_empty() {
            return Err(SyncError::Config("endpoint_url must not be empty".into()));
        }
        if self.batch_size == 0 {
            return Err(SyncError::Config("batch_size must be at least 1".into()));
        }
        if self.max_retry_count == 0 {
            return Err(SyncError::Config("max_retry_count must be at least 1".into()));
        }
        if self.retry_delays_ms.is_empty() {
            return Err(SyncError::Config("retry_delays_ms must not be empty".into()));
        }
        if self.periodic_interval_ms == 0 {
            return Err(SyncError::Config("periodic_interval_ms must be positive".into()));
        }
        Ok(())
    }
}

const fn default_batch_size() -> usize {
    BATCH_SIZE
}

const fn default_debounce_ms() -> u64 {
    DEBOUNCE_DELAY_MS
}

const fn default_drain_delay_ms() -> u64 {
    DRAIN_DELAY_MS
}

const fn default_periodic_interval_ms() -> u64 {
    PERIODIC_FLUSH_INTERVAL_MS
}

const fn default_max_retry_count() -> u32 {
    MAX_RETRY_COUNT
}

fn default_retry_delays_ms() -> Vec<u64> {
    RETRY_DELAYS_MS.to_vec()
}
