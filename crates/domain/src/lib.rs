//! # NoteSync Domain
//!
//! Data types shared by every NoteSync layer.
//!
//! This crate contains:
//! - Sync items, entity records and the batch wire format
//! - Host ↔ engine message types
//! - Engine configuration and defaults
//! - The `SyncError` type and `Result` alias
//!
//! ## Architecture
//! - No dependencies on other NoteSync crates
//! - No I/O, no async runtime
//! - Pure data structures plus validation at decode time

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
