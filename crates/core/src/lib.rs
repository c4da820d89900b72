//! # NoteSync Core
//!
//! Pure sync logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The pending-item queue
//! - Batch grouping with last-write-wins merge
//! - The retry policy and backoff table
//! - The `SyncEngine` state machine
//! - Port interfaces (traits) for scheduling, submission and auth
//!
//! ## Architecture Principles
//! - Only depends on `notesync-domain`
//! - No network or runtime code; timers are requested through [`Scheduler`]
//! - The engine never awaits: hosts run submissions and feed results back
//! - Pure, testable business logic

pub mod batch;
pub mod engine;
pub mod queue;
pub mod retry;
pub mod sync;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use batch::{group, next_batch, resolve_conflict, ConflictSource, GroupedBatch, LastWriteWins};
pub use engine::{Completion, Dispatch, SyncEngine};
pub use queue::SyncQueue;
pub use retry::{RetryOutcome, RetryPolicy};
pub use sync::ports::{
    AccessTokenProvider, BatchSubmitter, Scheduler, Timer, TimerHandle, TimerKind,
};
