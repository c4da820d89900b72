//! Batch grouping
//!
//! Turns the head of the queue into one [`BatchRequest`]: deletions are
//! deduplicated, notes and page notes merged last-write-wins, files passed
//! through.
//!
//! [`BatchRequest`]: notesync_domain::BatchRequest

pub mod grouper;
pub mod merge;

pub use grouper::{group, next_batch, GroupedBatch};
pub use merge::{resolve_conflict, ConflictSource, LastWriteWins};
