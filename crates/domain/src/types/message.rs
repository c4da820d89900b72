//! Messages exchanged between a host and the engine.
//!
//! Both directions serialize as `{"type": "<NAME>", "payload": ...}` so they
//! can cross a JSON channel unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::item::SyncItem;

/// Inbound commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    /// Append items and re-arm the debounce timer
    Enqueue(Vec<SyncItem>),
    /// Cancel the debounce timer and flush immediately
    FlushNow,
    /// Drop everything queued and cancel pending timers
    ClearQueue,
    /// Update the connectivity flag; `true` flushes immediately
    SetConnectivity(bool),
}

/// Outbound notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum SyncEvent {
    /// A batch was accepted by the server
    #[serde(rename = "SYNC_COMMITTED")]
    Committed { ids: Vec<String>, result: Value },
    /// Items dropped after exhausting their retries
    #[serde(rename = "SYNC_FAILED")]
    Failed { ids: Vec<String>, error: String },
}

impl SyncEvent {
    pub fn ids(&self) -> &[String] {
        match self {
            Self::Committed { ids, .. } | Self::Failed { ids, .. } => ids,
        }
    }
}
