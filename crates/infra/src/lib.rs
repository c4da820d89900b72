//! # NoteSync Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - HTTP batch submitter (`reqwest`)
//! - Tokio timer scheduler
//! - The sync worker that hosts the engine
//! - Configuration loading and logging setup
//!
//! ## Architecture
//! - Implements traits defined in `notesync-core`
//! - Depends on `notesync-domain` and `notesync-core`
//! - Contains all "impure" code (I/O, timers, runtime tasks)

pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod scheduling;
pub mod sync;

// Re-export commonly used items
pub use auth::StaticTokenProvider;
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::{init_tracing, LogFormat};
pub use scheduling::TimerScheduler;
pub use sync::{BatchSyncClient, SyncHandle, SyncWorker, WorkerError};
