//! Client secret generation for Apple's token endpoint.
//!
//! Apple does not hand out static client secrets. Every token request carries an
//! ES256-signed JWT minted from the team's private key instead.

use std::fmt;
use std::path::Path;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use serde::{Deserialize, Serialize};
use super::error::AppleAuthError;

/// Audience of every client secret.
pub const APPLE_AUDIENCE: &str = "https://appleid.apple.com";

/// Lifetime of a client secret, one second short of Apple's six month limit.
pub const CLIENT_SECRET_LIFETIME_SECS: i64 = 15_776_999;

const PEM_END: &[u8] = b"-----END ";
const PEM_DASHES: &[u8] = b"-----";

/// Claims of the client secret JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSecretClaims {
    /// Team identifier.
    pub iss: String,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Always [`APPLE_AUDIENCE`].
    pub aud: String,
    /// Application (services) identifier.
    pub sub: String,
}

impl ClientSecretClaims {
    /// Claims for a secret issued at `now`.
    pub fn new(team_id: &str, app_id: &str, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp();
        Self {
            iss: team_id.to_string(),
            iat,
            exp: iat + CLIENT_SECRET_LIFETIME_SECS,
            aud: APPLE_AUDIENCE.to_string(),
            sub: app_id.to_string(),
        }
    }
}

/// Identity of the calling service: identifiers plus the PEM encoded PKCS#8 signing key.
#[derive(Clone)]
pub struct ServiceIdentity {
    app_id: String,
    team_id: String,
    key_id: String,
    private_key: Vec<u8>,
}

impl ServiceIdentity {
    /// Creates an identity from raw PEM bytes. The key is only parsed when signing.
    pub fn new(
        app_id: impl Into<String>,
        team_id: impl Into<String>,
        key_id: impl Into<String>,
        private_key: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            team_id: team_id.into(),
            key_id: key_id.into(),
            private_key: private_key.into(),
        }
    }

    /// Creates an identity reading the `.p8` key from `path`.
    pub async fn from_key_file(
        app_id: impl Into<String>,
        team_id: impl Into<String>,
        key_id: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, AppleAuthError> {
        let private_key = tokio::fs::read(path).await.map_err(AppleAuthError::KeyFile)?;
        Ok(Self::new(app_id, team_id, key_id, private_key))
    }

    /// Application (services) identifier, sent as `client_id`.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Team identifier.
    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    /// Identifier of the signing key.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Signs a client secret valid from `now` for [`CLIENT_SECRET_LIFETIME_SECS`].
    pub fn client_secret(&self, now: DateTime<Utc>) -> Result<String, AppleAuthError> {
        let der = decode_pem_block(&self.private_key)?;
        let rng = SystemRandom::new();
        EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &der, &rng)
            .map_err(|e| AppleAuthError::KeyParse(e.to_string()))?;

        let claims = ClientSecretClaims::new(&self.team_id, &self.app_id, now);
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());
        Ok(encode(&header, &claims, &EncodingKey::from_ec_der(&der))?)
    }
}

impl fmt::Debug for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceIdentity")
            .field("app_id", &self.app_id)
            .field("team_id", &self.team_id)
            .field("key_id", &self.key_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Returns the DER contents of the first PEM block in `input` that decodes.
///
/// Blocks whose framing or base64 body is broken are skipped.
fn decode_pem_block(input: &[u8]) -> Result<Vec<u8>, AppleAuthError> {
    let mut rest = input;
    loop {
        match pem::parse(rest) {
            Ok(block) => return Ok(block.contents().to_vec()),
            Err(_) => rest = after_end_marker(rest).ok_or(AppleAuthError::KeyDecode)?,
        }
    }
}

/// Remainder of `input` after the first `-----END <label>-----` line.
fn after_end_marker(input: &[u8]) -> Option<&[u8]> {
    let start = find(input, PEM_END)? + PEM_END.len();
    let label_end = start + find(&input[start..], PEM_DASHES)? + PEM_DASHES.len();
    Some(&input[label_end..])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
