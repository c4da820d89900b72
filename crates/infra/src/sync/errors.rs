//! Worker lifecycle errors

use notesync_domain::SyncError;
use thiserror::Error;

use crate::errors::InfraError;

/// Misuse of the [`SyncWorker`](super::SyncWorker) lifecycle or failures
/// joining its task.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Worker is already running
    #[error("Sync worker already running")]
    AlreadyRunning,

    /// Worker is not running
    #[error("Sync worker not running")]
    NotRunning,

    /// Join did not finish in time
    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Task join failed
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<WorkerError> for InfraError {
    fn from(err: WorkerError) -> Self {
        let sync_err = match err {
            WorkerError::AlreadyRunning | WorkerError::NotRunning => {
                SyncError::Config(err.to_string())
            }
            WorkerError::Timeout { .. } => SyncError::Timeout(err.to_string()),
            WorkerError::TaskJoinFailed(_) => SyncError::Internal(err.to_string()),
        };
        InfraError(sync_err)
    }
}

impl From<WorkerError> for SyncError {
    fn from(err: WorkerError) -> Self {
        InfraError::from(err).into()
    }
}
