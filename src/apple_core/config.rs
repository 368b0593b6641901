use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use super::apple_client::{AppleAuthClient, APPLE_TOKEN_URL};
use super::client_secret::ServiceIdentity;
use super::error::AppleAuthError;
use super::http_client::OAuthHttpClient;

/// Where the `.p8` signing key comes from.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivateKeySource {
    /// PEM text inline, e.g. injected from a secret store.
    Pem(String),
    /// Path to the key file downloaded from the Apple developer portal.
    File(PathBuf),
}

impl fmt::Debug for PrivateKeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivateKeySource::Pem(_) => f.write_str("Pem(<redacted>)"),
            PrivateKeySource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

/// Settings for an [`AppleAuthClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppleAuthConfig {
    /// Services ID or bundle ID, sent as `client_id`.
    pub app_id: String,
    /// Developer team ID.
    pub team_id: String,
    /// ID of the Sign in with Apple key.
    pub key_id: String,
    /// Signing key location.
    pub private_key: PrivateKeySource,
    /// Token endpoint, Apple's by default.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Timeout in milliseconds applied by the bundled HTTP transport. None waits indefinitely.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

fn default_token_url() -> String {
    APPLE_TOKEN_URL.to_string()
}

impl AppleAuthConfig {
    /// Config posting to Apple's token endpoint without a request timeout.
    pub fn new(
        app_id: impl Into<String>,
        team_id: impl Into<String>,
        key_id: impl Into<String>,
        private_key: PrivateKeySource,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            team_id: team_id.into(),
            key_id: key_id.into(),
            private_key,
            token_url: default_token_url(),
            request_timeout_ms: None,
        }
    }

    /// Sends token requests to `token_url` instead of Apple's endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Sets the transport timeout, rounded up to whole milliseconds.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.request_timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    /// Transport timeout, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Resolves the key source into a [`ServiceIdentity`].
    pub async fn load_identity(&self) -> Result<ServiceIdentity, AppleAuthError> {
        match &self.private_key {
            PrivateKeySource::Pem(pem) => Ok(ServiceIdentity::new(
                self.app_id.as_str(),
                self.team_id.as_str(),
                self.key_id.as_str(),
                pem.as_bytes(),
            )),
            PrivateKeySource::File(path) => {
                ServiceIdentity::from_key_file(
                    self.app_id.as_str(),
                    self.team_id.as_str(),
                    self.key_id.as_str(),
                    path,
                )
                .await
            }
        }
    }
}

impl<C: OAuthHttpClient> AppleAuthClient<C> {
    /// Builds a client from configuration, loading the key and using `http_client`.
    pub async fn from_config(config: &AppleAuthConfig, http_client: C) -> Result<Self, AppleAuthError> {
        let identity = config.load_identity().await?;
        Ok(AppleAuthClient::new(identity, http_client).with_token_url(config.token_url.as_str()))
    }
}

#[cfg(feature = "http")]
impl AppleAuthClient<super::http_client::ReqwestHttpClient> {
    /// Builds a client from configuration with the bundled reqwest transport.
    pub async fn connect(config: &AppleAuthConfig) -> Result<Self, AppleAuthError> {
        let http_client = super::http_client::ReqwestHttpClient::new(config.request_timeout())
            .map_err(AppleAuthError::Transport)?;
        Self::from_config(config, http_client).await
    }
}
