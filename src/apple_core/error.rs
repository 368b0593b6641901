use super::http_client::HttpClientError;
use super::types::{ErrorResponse, OAuthErrorCode};

/// Errors produced while signing client secrets, talking to the token endpoint
/// or decoding identity tokens.
#[derive(Debug, thiserror::Error)]
pub enum AppleAuthError {
    /// The private key contains no PEM block.
    #[error("empty block after decoding private key PEM")]
    KeyDecode,
    /// The PEM block is not a PKCS#8 P-256 private key.
    #[error("invalid PKCS#8 private key: {0}")]
    KeyParse(String),
    /// The private key file could not be read.
    #[error("failed to read private key file: {0}")]
    KeyFile(#[source] std::io::Error),
    /// The client secret could not be signed.
    #[error("failed to sign client secret: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    /// The HTTP transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[source] HttpClientError),
    /// The token endpoint answered with a body that is not the expected JSON.
    #[error("failed to decode token endpoint response: {0}")]
    ResponseDecode(#[source] serde_json::Error),
    /// The token endpoint rejected the grant with a known OAuth error.
    #[error(transparent)]
    OAuth(ErrorResponse),
    /// The token endpoint rejected the grant with an error code outside the taxonomy.
    #[error("unrecognized response error: {0}")]
    UnrecognizedOAuth(String),
    /// The identity token is not a well-formed compact JWT.
    #[error("malformed identity token: {0}")]
    TokenDecode(String),
}

impl AppleAuthError {
    /// OAuth error code carried by this error, if the endpoint returned a known one.
    pub fn oauth_code(&self) -> Option<OAuthErrorCode> {
        match self {
            AppleAuthError::OAuth(resp) => Some(resp.code),
            _ => None,
        }
    }
}
