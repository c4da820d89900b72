//! Logging setup
//!
//! Every crate in the workspace logs through `tracing`. Binaries and hosts
//! call [`init_tracing`] once at startup to install a subscriber; `RUST_LOG`
//! overrides the default `notesync=info` filter.

use notesync_domain::{Result, SyncError};
use tracing_subscriber::EnvFilter;

/// Default directive when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "notesync=info";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Build the filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global `tracing` subscriber.
///
/// # Errors
/// Returns `SyncError::Config` if a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter()).with_target(true);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };

    installed.map_err(|e| SyncError::Config(format!("Failed to install tracing subscriber: {e}")))
}
