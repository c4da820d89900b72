//! Engine defaults.

/// Maximum number of queued items consumed by a single flush.
pub const BATCH_SIZE: usize = 10;

/// Quiet period after the last enqueue before a flush is attempted.
pub const DEBOUNCE_DELAY_MS: u64 = 2_000;

/// Delay before the next flush when a successful flush leaves items queued.
pub const DRAIN_DELAY_MS: u64 = 1_000;

/// Interval of the safety-net flush trigger.
pub const PERIODIC_FLUSH_INTERVAL_MS: u64 = 30_000;

/// Failed submissions an item survives before it is dropped.
pub const MAX_RETRY_COUNT: u32 = 3;

/// Backoff table indexed by `retry_count - 1`; the last entry is the ceiling.
pub const RETRY_DELAYS_MS: [u64; 3] = [5_000, 15_000, 30_000];

/// Backoff used when no table entry applies.
pub const FALLBACK_RETRY_DELAY_MS: u64 = 30_000;

/// Path of the batch ingestion endpoint on the sync server.
pub const BATCH_SYNC_PATH: &str = "/api/batch-sync";
