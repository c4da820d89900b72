//! Network submitter for grouped batches
//!
//! Posts one [`BatchRequest`] per call to the batch-sync endpoint with a
//! bearer token fetched immediately before the request. Non-2xx statuses are
//! classified into [`SyncError`] variants that carry the status in their
//! message; a 2xx body is returned as raw JSON for the committed event.

use std::sync::Arc;

use async_trait::async_trait;
use notesync_core::{AccessTokenProvider, BatchSubmitter};
use notesync_domain::constants::BATCH_SYNC_PATH;
use notesync_domain::{BatchRequest, Result, SyncConfig, SyncError};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::http::HttpClient;

/// HTTP implementation of [`BatchSubmitter`].
pub struct BatchSyncClient {
    http: HttpClient,
    endpoint: String,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl BatchSyncClient {
    /// Create a client posting to `endpoint` (the full batch-sync URL).
    pub fn new(
        http: HttpClient,
        endpoint: impl Into<String>,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self { http, endpoint: endpoint.into(), tokens }
    }

    /// Create a client for a server root, appending the standard batch path.
    pub fn for_base_url(
        http: HttpClient,
        base_url: &str,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        let endpoint = format!("{}{}", base_url.trim_end_matches('/'), BATCH_SYNC_PATH);
        Self::new(http, endpoint, tokens)
    }

    /// Build the HTTP client from `config` and post to `config.endpoint_url`.
    ///
    /// # Errors
    /// Returns `SyncError::Config` if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &SyncConfig, tokens: Arc<dyn AccessTokenProvider>) -> Result<Self> {
        config.validate()?;

        let mut builder =
            HttpClient::builder().user_agent(concat!("notesync/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build HttpClient: {e}")))?;

        Ok(Self::new(http, config.endpoint_url.clone(), tokens))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_status_error(status: StatusCode, body: &str) -> SyncError {
        let message = if body.is_empty() {
            format!("batch sync returned status {status}")
        } else {
            format!("batch sync returned status {status}: {body}")
        };

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            SyncError::Auth(message)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            SyncError::RateLimited(message)
        } else if status.is_server_error() {
            SyncError::Server(message)
        } else if status.is_client_error() {
            SyncError::Client(message)
        } else {
            SyncError::Network(message)
        }
    }
}

impl std::fmt::Debug for BatchSyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSyncClient").field("endpoint", &self.endpoint).finish_non_exhaustive()
    }
}

#[async_trait]
impl BatchSubmitter for BatchSyncClient {
    #[instrument(skip(self, request), fields(records = request.record_count()))]
    async fn submit(&self, request: &BatchRequest) -> Result<Value> {
        let token = self.tokens.access_token().await?;

        debug!(
            endpoint = %self.endpoint,
            notes = request.notes.len(),
            page_notes = request.page_notes.len(),
            files = request.files.len(),
            deletions = request.deletions.len(),
            "Submitting batch"
        );

        let builder = self.http.request(Method::POST, &self.endpoint).bearer_auth(token).json(request);
        let response = self.http.send(builder).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = Self::map_status_error(status, body.trim());
            warn!(status = status.as_u16(), error = %err, "Batch sync rejected");
            return Err(err);
        }

        let result = if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            Value::Null
        } else {
            response
                .json::<Value>()
                .await
                .map_err(|e| SyncError::Decode(format!("Failed to parse response: {e}")))?
        };

        info!(status = status.as_u16(), "Batch sync accepted");
        Ok(result)
    }
}
