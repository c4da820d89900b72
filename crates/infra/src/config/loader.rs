//! Configuration loader
//!
//! Loads [`SyncConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `NOTESYNC_ENDPOINT_URL` is unset, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Whatever the source, the result is validated before it is returned.
//!
//! ## Environment Variables
//! - `NOTESYNC_ENDPOINT_URL`: Batch-sync URL (required)
//! - `NOTESYNC_API_TOKEN`: Static bearer token
//! - `NOTESYNC_BATCH_SIZE`: Items per batch
//! - `NOTESYNC_DEBOUNCE_MS`: Quiet period after an enqueue
//! - `NOTESYNC_DRAIN_DELAY_MS`: Delay before flushing leftovers after a commit
//! - `NOTESYNC_PERIODIC_INTERVAL_MS`: Safety-net flush interval
//! - `NOTESYNC_MAX_RETRY_COUNT`: Failures before an item is dropped
//! - `NOTESYNC_RETRY_DELAYS_MS`: Comma-separated backoff table
//! - `NOTESYNC_REQUEST_TIMEOUT_MS`: Per-request HTTP timeout
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./notesync.json` or `./notesync.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use notesync_domain::{Result, SyncConfig, SyncError};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["notesync.json", "notesync.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `SyncError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<SyncConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `NOTESYNC_ENDPOINT_URL` is required; every other variable overrides
/// the corresponding default when present.
///
/// # Errors
/// Returns `SyncError::Config` if the endpoint is missing or a variable has
/// an invalid value.
pub fn load_from_env() -> Result<SyncConfig> {
    let mut config = SyncConfig::with_endpoint(env_var("NOTESYNC_ENDPOINT_URL")?);

    config.api_token = std::env::var("NOTESYNC_API_TOKEN").ok();
    if let Some(batch_size) = env_parse("NOTESYNC_BATCH_SIZE")? {
        config.batch_size = batch_size;
    }
    if let Some(debounce_ms) = env_parse("NOTESYNC_DEBOUNCE_MS")? {
        config.debounce_ms = debounce_ms;
    }
    if let Some(drain_delay_ms) = env_parse("NOTESYNC_DRAIN_DELAY_MS")? {
        config.drain_delay_ms = drain_delay_ms;
    }
    if let Some(periodic_interval_ms) = env_parse("NOTESYNC_PERIODIC_INTERVAL_MS")? {
        config.periodic_interval_ms = periodic_interval_ms;
    }
    if let Some(max_retry_count) = env_parse("NOTESYNC_MAX_RETRY_COUNT")? {
        config.max_retry_count = max_retry_count;
    }
    if let Ok(raw) = std::env::var("NOTESYNC_RETRY_DELAYS_MS") {
        config.retry_delays_ms = parse_delay_list(&raw)?;
    }
    config.request_timeout_ms = env_parse("NOTESYNC_REQUEST_TIMEOUT_MS")?;

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `SyncError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<SyncConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SyncError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SyncError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SyncError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<SyncConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    probe_in(&dirs)
}

fn probe_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| SyncError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional environment variable.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SyncError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

fn parse_delay_list(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .map_err(|e| SyncError::Config(format!("Invalid retry delay '{part}': {e}")))
        })
        .collect()
}
