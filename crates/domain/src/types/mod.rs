//! Domain types

pub mod batch;
pub mod entity;
pub mod item;
pub mod message;
pub mod status;

pub use batch::BatchRequest;
pub use entity::{EntityPayload, EntityRef, EntityType, FileRecord, NoteRecord, PageNoteRecord};
pub use item::{Mutation, Operation, SyncItem};
pub use message::{HostMessage, SyncEvent};
pub use status::{SyncStats, SyncStatus};
