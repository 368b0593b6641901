//! User identity carried by Apple's identity token.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use super::error::AppleAuthError;

/// Whether the user appears to be a real person.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum RealUserStatus {
    /// Not supported on the device (before iOS 14) or on the web.
    #[default]
    Unsupported,
    /// The system cannot determine whether the user is real.
    Unknown,
    /// The user is likely real.
    LikelyReal,
}

impl From<i64> for RealUserStatus {
    fn from(value: i64) -> Self {
        match value {
            1 => RealUserStatus::Unknown,
            2 => RealUserStatus::LikelyReal,
            _ => RealUserStatus::Unsupported,
        }
    }
}

impl From<RealUserStatus> for i64 {
    fn from(status: RealUserStatus) -> Self {
        match status {
            RealUserStatus::Unsupported => 0,
            RealUserStatus::Unknown => 1,
            RealUserStatus::LikelyReal => 2,
        }
    }
}

/// User information extracted from an identity token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppleUser {
    /// Stable Apple identifier of the user (`sub`).
    pub uid: String,
    /// Real or relay email address. Empty when Apple did not share one.
    pub email: String,
    /// Whether Apple verified the email.
    pub email_verified: bool,
    /// Whether the email is a private relay address.
    pub is_private_email: bool,
    /// Real user indicator.
    pub real_user_status: RealUserStatus,
}

impl AppleUser {
    /// Extracts the user from an identity token.
    ///
    /// The token's signature is **not** verified. The token is trusted because it
    /// came straight from Apple's token endpoint over TLS in the same exchange; do
    /// not feed it tokens received from clients.
    pub fn from_id_token(id_token: &str) -> Result<Self, AppleAuthError> {
        let claims = decode_claims(id_token)?;
        Ok(Self::from_claims(&claims))
    }

    /// Builds the user from a decoded claim set. Claims of an unexpected type are ignored.
    pub fn from_claims(claims: &Map<String, Value>) -> Self {
        let string = |name: &str| claims.get(name).and_then(Value::as_str).map(str::to_string);
        let boolean = |name: &str| claims.get(name).and_then(Value::as_bool);

        AppleUser {
            uid: string("sub").unwrap_or_default(),
            email: string("email").unwrap_or_default(),
            email_verified: boolean("email_verified").unwrap_or_default(),
            is_private_email: boolean("is_private_email").unwrap_or_default(),
            real_user_status: claims
                .get("real_user_status")
                .and_then(Value::as_i64)
                .map(RealUserStatus::from)
                .unwrap_or_default(),
        }
    }
}

/// Decodes the payload of a compact JWT without checking its signature.
///
/// Expiry and audience are not checked either, and no claim is required.
pub fn decode_claims(token: &str) -> Result<Map<String, Value>, AppleAuthError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_aud = false;

    decode::<Map<String, Value>>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| AppleAuthError::TokenDecode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("claims must be an object"),
        }
    }

    #[test]
    fn real_user_status_maps_known_values() {
        assert_eq!(RealUserStatus::from(0), RealUserStatus::Unsupported);
        assert_eq!(RealUserStatus::from(1), RealUserStatus::Unknown);
        assert_eq!(RealUserStatus::from(2), RealUserStatus::LikelyReal);
        assert_eq!(RealUserStatus::from(99), RealUserStatus::Unsupported);
        assert_eq!(RealUserStatus::from(-1), RealUserStatus::Unsupported);
    }

    #[test]
    fn wrong_types_are_left_empty() {
        let user = AppleUser::from_claims(&claims(json!({
            "sub": 42,
            "email": ["a@b.com"],
            "email_verified": "true",
            "is_private_email": 1,
            "real_user_status": "2",
        })));
        assert_eq!(user, AppleUser::default());
    }

    #[test]
    fn fractional_status_is_ignored() {
        let user = AppleUser::from_claims(&claims(json!({ "real_user_status": 2.5 })));
        assert_eq!(user.real_user_status, RealUserStatus::Unsupported);
    }

    #[test]
    fn user_serializes_status_as_integer() {
        let user = AppleUser { real_user_status: RealUserStatus::LikelyReal, ..AppleUser::default() };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["real_user_status"], json!(2));
    }

    #[test]
    fn expired_token_with_audience_still_decodes() {
        // header {"alg":"RS256"}, payload {"sub":"1","aud":"com.example.web","exp":1}
        let token = "eyJhbGciOiJSUzI1NiJ9.eyJzdWIiOiIxIiwiYXVkIjoiY29tLmV4YW1wbGUud2ViIiwiZXhwIjoxfQ.c2ln";
        let decoded = decode_claims(token).unwrap();
        assert_eq!(decoded["sub"], json!("1"));
        assert_eq!(decoded["aud"], json!("com.example.web"));
    }

    #[test]
    fn missing_segments_are_rejected() {
        assert!(matches!(decode_claims("eyJhbGciOiJSUzI1NiJ9.e30"), Err(AppleAuthError::TokenDecode(_))));
    }
}
