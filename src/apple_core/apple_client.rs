use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument, warn};
use super::client_secret::ServiceIdentity;
use super::error::AppleAuthError;
use super::http_client::{FormRequest, HttpResponse, OAuthHttpClient};
use super::types::{AppleGrant, ErrorBody, TokenResponse};

/// Apple's token endpoint.
pub const APPLE_TOKEN_URL: &str = "https://appleid.apple.com/auth/token";

/// Token exchange operations offered by Apple's token endpoint.
#[async_trait]
pub trait AppleAuth: Send + Sync {
    /// Exchanges an authorization code for access, refresh and identity tokens.
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppleAuthError>;

    /// Exchanges an authorization code obtained with `redirect_uri`.
    async fn exchange_code_with_redirect(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AppleAuthError>;

    /// Exchanges a refresh token for a fresh access token and identity token.
    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppleAuthError>;
}

/// Client for Apple's token endpoint.
///
/// Holds no mutable state: a fresh client secret is signed for every call and
/// exactly one request is sent. Nothing is retried.
#[derive(Clone, Debug)]
pub struct AppleAuthClient<C> {
    identity: ServiceIdentity,
    http_client: C,
    token_url: String,
}

impl<C: OAuthHttpClient> AppleAuthClient<C> {
    /// Creates a client posting to [`APPLE_TOKEN_URL`] through `http_client`.
    pub fn new(identity: ServiceIdentity, http_client: C) -> Self {
        Self { identity, http_client, token_url: APPLE_TOKEN_URL.to_string() }
    }

    /// Overrides the token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// The service identity used to sign client secrets.
    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// The token endpoint requests are sent to.
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Signs a client secret and exchanges `grant` at the token endpoint.
    #[instrument(
        skip(self, grant),
        fields(grant_type = grant.grant_type(), app_id = %self.identity.app_id()),
        level = "debug"
    )]
    pub async fn exchange(&self, grant: AppleGrant) -> Result<TokenResponse, AppleAuthError> {
        let request = self.grant_form(grant)?;
        debug!(url = %request.url, "requesting tokens");
        let response = self
            .http_client
            .post_form(request)
            .await
            .map_err(AppleAuthError::Transport)?;
        debug!(status = response.status, "token endpoint responded");
        parse_token_response(response)
    }

    fn grant_form(&self, grant: AppleGrant) -> Result<FormRequest, AppleAuthError> {
        let client_secret = self.identity.client_secret(Utc::now())?;
        let grant_type = grant.grant_type();
        let form = FormRequest::new(self.token_url.clone())
            .field("client_id", self.identity.app_id())
            .field("client_secret", client_secret);
        let form = match grant {
            AppleGrant::AuthorizationCode { code, redirect_uri } => {
                let form = form.field("code", code).field("grant_type", grant_type);
                match redirect_uri {
                    Some(uri) => form.field("redirect_uri", uri),
                    None => form,
                }
            }
            AppleGrant::RefreshToken { refresh_token } => form
                .field("refresh_token", refresh_token)
                .field("grant_type", grant_type),
        };
        Ok(form)
    }
}

#[async_trait]
impl<C: OAuthHttpClient> AppleAuth for AppleAuthClient<C> {
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppleAuthError> {
        self.exchange(AppleGrant::AuthorizationCode {
            code: code.to_string(),
            redirect_uri: None,
        })
        .await
    }

    async fn exchange_code_with_redirect(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AppleAuthError> {
        self.exchange(AppleGrant::AuthorizationCode {
            code: code.to_string(),
            redirect_uri: Some(redirect_uri.to_string()),
        })
        .await
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppleAuthError> {
        self.exchange(AppleGrant::RefreshToken { refresh_token: refresh_token.to_string() })
            .await
    }
}

/// Maps a token endpoint response onto a [`TokenResponse`] or an error.
///
/// Only a 200 with a decodable body yields tokens; every other status goes through
/// the OAuth error taxonomy.
pub fn parse_token_response(response: HttpResponse) -> Result<TokenResponse, AppleAuthError> {
    if response.status != 200 {
        let body: ErrorBody =
            serde_json::from_slice(&response.body).map_err(AppleAuthError::ResponseDecode)?;
        let err = body.into_error();
        warn!(
            http_status = response.status,
            error_code = err.oauth_code().map(|c| c.as_str()).unwrap_or("unrecognized"),
            "token endpoint rejected grant"
        );
        return Err(err);
    }
    serde_json::from_slice(&response.body).map_err(AppleAuthError::ResponseDecode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_200_success_body_is_still_an_error() {
        let resp = HttpResponse::json(201, &json!({ "access_token": "a" }));
        assert!(matches!(
            parse_token_response(resp),
            Err(AppleAuthError::UnrecognizedOAuth(raw)) if raw.is_empty()
        ));
    }

    #[test]
    fn success_body_with_wrong_types_fails_to_decode() {
        let resp = HttpResponse::json(200, &json!({ "expires_in": "soon" }));
        assert!(matches!(parse_token_response(resp), Err(AppleAuthError::ResponseDecode(_))));
    }

    #[test]
    fn error_body_that_is_not_json_fails_to_decode() {
        let resp = HttpResponse { status: 502, body: b"<html>bad gateway</html>".to_vec() };
        assert!(matches!(parse_token_response(resp), Err(AppleAuthError::ResponseDecode(_))));
    }
}
