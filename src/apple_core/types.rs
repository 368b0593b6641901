//! Token endpoint primitives: grants, token responses and the OAuth error taxonomy.

use std::fmt;
use serde::{Deserialize, Serialize};
use super::error::AppleAuthError;
use super::user::AppleUser;

/// Grants accepted by Apple's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppleGrant {
    /// Authorization code grant, optionally bound to the redirect URI used at authorization.
    AuthorizationCode {
        /// The authorization code received from Apple.
        code: String,
        /// Redirect URI sent along with the code, if any.
        redirect_uri: Option<String>,
    },
    /// Refresh token grant.
    RefreshToken {
        /// The refresh token previously issued by Apple.
        refresh_token: String,
    },
}

impl AppleGrant {
    /// Value of the `grant_type` form field for this grant.
    pub fn grant_type(&self) -> &'static str {
        match self {
            AppleGrant::AuthorizationCode { .. } => "authorization_code",
            AppleGrant::RefreshToken { .. } => "refresh_token",
        }
    }
}

/// Successful response of the token endpoint.
///
/// Missing fields decode to their empty value; Apple leaves `refresh_token` out of
/// refresh grant responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenResponse {
    /// Reserved by Apple for future use.
    pub access_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: u64,
    /// JWT carrying the user's identity claims.
    pub id_token: String,
    /// Token used to obtain new access tokens. Store it securely.
    pub refresh_token: String,
    /// Type of the access token, usually `bearer`.
    pub token_type: String,
}

impl TokenResponse {
    /// Decode the user identity carried by `id_token`.
    ///
    /// The identity token signature is not verified, see [`AppleUser::from_id_token`].
    pub fn user(&self) -> Result<AppleUser, AppleAuthError> {
        AppleUser::from_id_token(&self.id_token)
    }
}

/// Error codes the token endpoint returns in the `error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthErrorCode {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnauthorizedClient,
    UnsupportedGrantType,
    InvalidScope,
}

impl OAuthErrorCode {
    /// Every known code, in registry order.
    pub const ALL: [OAuthErrorCode; 6] = [
        OAuthErrorCode::InvalidRequest,
        OAuthErrorCode::InvalidClient,
        OAuthErrorCode::InvalidGrant,
        OAuthErrorCode::UnauthorizedClient,
        OAuthErrorCode::UnsupportedGrantType,
        OAuthErrorCode::InvalidScope,
    ];

    /// Look up a code by its wire value.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "invalid_request" => Some(OAuthErrorCode::InvalidRequest),
            "invalid_client" => Some(OAuthErrorCode::InvalidClient),
            "invalid_grant" => Some(OAuthErrorCode::InvalidGrant),
            "unauthorized_client" => Some(OAuthErrorCode::UnauthorizedClient),
            "unsupported_grant_type" => Some(OAuthErrorCode::UnsupportedGrantType),
            "invalid_scope" => Some(OAuthErrorCode::InvalidScope),
            _ => None,
        }
    }

    /// Wire value of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthErrorCode::InvalidRequest => "invalid_request",
            OAuthErrorCode::InvalidClient => "invalid_client",
            OAuthErrorCode::InvalidGrant => "invalid_grant",
            OAuthErrorCode::UnauthorizedClient => "unauthorized_client",
            OAuthErrorCode::UnsupportedGrantType => "unsupported_grant_type",
            OAuthErrorCode::InvalidScope => "invalid_scope",
        }
    }

    /// Fixed description of the failure, as documented by Apple.
    pub fn message(&self) -> &'static str {
        match self {
            OAuthErrorCode::InvalidRequest => "The request is malformed, typically because it is missing a parameter, contains an unsupported parameter, includes multiple credentials, or uses more than one mechanism for authenticating the client.",
            OAuthErrorCode::InvalidClient => "The client authentication failed, typically due to a mismatched or invalid client identifier, invalid client secret (expired token, malformed claims, or invalid signature), or mismatched or invalid redirect URI.",
            OAuthErrorCode::InvalidGrant => "The authorization grant or refresh token is invalid, typically due to a mismatched or invalid client identifier, invalid code (expired or previously used authorization code), or invalid refresh token.",
            OAuthErrorCode::UnauthorizedClient => "The client is not authorized to use this authorization grant type.",
            OAuthErrorCode::UnsupportedGrantType => "the authenticated client is not authorized to use this grant type.",
            OAuthErrorCode::InvalidScope => "The requested scope is invalid.",
        }
    }
}

impl fmt::Display for OAuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured rejection returned by the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ErrorResponse {
    /// The OAuth error code.
    pub code: OAuthErrorCode,
    /// Human-readable description of the code.
    pub message: &'static str,
}

impl From<OAuthErrorCode> for ErrorResponse {
    fn from(code: OAuthErrorCode) -> Self {
        ErrorResponse { code, message: code.message() }
    }
}

/// Error body of a non-200 token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: String,
}

impl ErrorBody {
    /// Map the raw `error` string onto the taxonomy.
    pub(crate) fn into_error(self) -> AppleAuthError {
        match OAuthErrorCode::from_code(&self.error) {
            Some(code) => AppleAuthError::OAuth(code.into()),
            None => AppleAuthError::UnrecognizedOAuth(self.error),
        }
    }
}
