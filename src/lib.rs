//! Server-side Sign in with Apple for Starberry.
//!
//! [`AppleAuthClient`] exchanges authorization codes and refresh tokens at Apple's
//! token endpoint, signing a fresh ES256 client secret for every request.
//! [`AppleUser::from_id_token`] extracts the user from the returned identity token.
//!
//! Identity token signatures are **not** verified. The token is trusted because it
//! arrives directly from Apple over TLS as part of the exchange. Verify tokens
//! received from any other party against Apple's JWKS before trusting them.
//!
//! ```no_run
//! use starberry_apple_auth::{AppleAuth, AppleAuthClient, AppleAuthConfig, PrivateKeySource};
//!
//! # async fn run() -> Result<(), starberry_apple_auth::AppleAuthError> {
//! let config = AppleAuthConfig::new(
//!     "com.example.web",
//!     "TEAM123456",
//!     "KEY1234567",
//!     PrivateKeySource::File("AuthKey_KEY1234567.p8".into()),
//! );
//! let client = AppleAuthClient::connect(&config).await?;
//! let tokens = client.exchange_code("c0de").await?;
//! let user = tokens.user()?;
//! println!("signed in {}", user.uid);
//! # Ok(())
//! # }
//! ```

pub mod apple_core;

pub use apple_core::apple_client::{parse_token_response, AppleAuth, AppleAuthClient, APPLE_TOKEN_URL};
pub use apple_core::client_secret::{ClientSecretClaims, ServiceIdentity, APPLE_AUDIENCE, CLIENT_SECRET_LIFETIME_SECS};
pub use apple_core::config::{AppleAuthConfig, PrivateKeySource};
pub use apple_core::error::AppleAuthError;
pub use apple_core::http_client::{FormRequest, HttpClientError, HttpResponse, InMemoryHttpClient, OAuthHttpClient};
#[cfg(feature = "http")]
pub use apple_core::http_client::ReqwestHttpClient;
pub use apple_core::types::{AppleGrant, ErrorResponse, OAuthErrorCode, TokenResponse};
pub use apple_core::user::{decode_claims, AppleUser, RealUserStatus};
