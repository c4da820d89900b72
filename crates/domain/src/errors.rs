//! Error types used throughout the sync engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a [`SyncError`], attached to log events.
///
/// The engine does not branch on it: every submission failure takes the
/// same retry path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorCategory {
    /// Payload rejected before it entered the queue
    Validation,
    /// Transport failure or timeout
    Network,
    /// 401 / 403 or token provider failure
    Authentication,
    /// 429
    RateLimit,
    /// 5xx
    Server,
    /// Other 4xx, or a 2xx whose body could not be decoded
    Client,
    /// Misconfiguration
    Config,
    /// Channel or task failures inside the engine host
    Internal,
}

/// Main error type for NoteSync
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SyncError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel closed: {0}")]
    Channel(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Get the error category for this error
    pub const fn category(&self) -> SyncErrorCategory {
        match self {
            Self::InvalidPayload(_) => SyncErrorCategory::Validation,
            Self::Network(_) | Self::Timeout(_) => SyncErrorCategory::Network,
            Self::Auth(_) => SyncErrorCategory::Authentication,
            Self::RateLimited(_) => SyncErrorCategory::RateLimit,
            Self::Server(_) => SyncErrorCategory::Server,
            Self::Client(_) | Self::Decode(_) => SyncErrorCategory::Client,
            Self::Config(_) => SyncErrorCategory::Config,
            Self::Channel(_) | Self::Internal(_) => SyncErrorCategory::Internal,
        }
    }
}

/// Result type alias for NoteSync operations
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_variant() {
        assert_eq!(SyncError::Timeout("x".into()).category(), SyncErrorCategory::Network);
        assert_eq!(SyncError::Auth("x".into()).category(), SyncErrorCategory::Authentication);
        assert_eq!(SyncError::Decode("x".into()).category(), SyncErrorCategory::Client);
        assert_eq!(SyncError::Channel("x".into()).category(), SyncErrorCategory::Internal);
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(SyncError::Server("boom".into())).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Server", "message": "boom"}));
    }
}
