//! Sync infrastructure
//!
//! - [`BatchSyncClient`]: HTTP submitter for grouped batches
//! - [`SyncWorker`]: hosts the engine on the tokio runtime
//! - [`WorkerError`]: worker lifecycle errors

pub mod batch_client;
pub mod errors;
pub mod worker;

pub use batch_client::BatchSyncClient;
pub use errors::WorkerError;
pub use worker::{SyncHandle, SyncWorker};
