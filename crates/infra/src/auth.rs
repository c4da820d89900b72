//! Bearer token providers

use async_trait::async_trait;
use notesync_core::AccessTokenProvider;
use notesync_domain::{Result, SyncConfig, SyncError};

/// Hands out a fixed token, typically read from configuration.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    /// Build from `api_token` in `config`.
    ///
    /// # Errors
    /// Returns `SyncError::Config` when no token is configured.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        config
            .api_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .map(Self::new)
            .ok_or_else(|| SyncError::Config("api_token is not configured".into()))
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_configured_token() {
        let mut config = SyncConfig::with_endpoint("https://example.test");
        config.api_token = Some("secret".into());

        let provider = StaticTokenProvider::from_config(&config).unwrap();

        assert_eq!(provider.access_token().await.unwrap(), "secret");
        assert!(!format!("{provider:?}").contains("secret"));
    }

    #[test]
    fn missing_token_is_a_config_error() {
        let config = SyncConfig::with_endpoint("https://example.test");
        assert!(matches!(StaticTokenProvider::from_config(&config), Err(SyncError::Config(_))));
    }
}
