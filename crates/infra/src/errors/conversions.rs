//! Conversions from external infrastructure errors into domain errors.

use notesync_domain::SyncError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SyncError);

impl From<InfraError> for SyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SyncError> for InfraError {
    fn from(value: SyncError) -> Self {
        InfraError(value)
    }
}

trait IntoSyncError {
    fn into_sync_error(self) -> SyncError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SyncError */
/* -------------------------------------------------------------------------- */

/// Status codes never reach this mapping. Non-2xx responses are classified
/// by the batch client from the response itself.
impl IntoSyncError for HttpError {
    fn into_sync_error(self) -> SyncError {
        if self.is_timeout() {
            return SyncError::Timeout("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SyncError::Network(format!("HTTP connection failure: {self}"));
        }

        if self.is_builder() {
            return SyncError::Config(format!("invalid HTTP request: {self}"));
        }

        SyncError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_sync_error())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
