mod support;

use serde_json::json;
use starberry_apple_auth::{
    AppleAuth, AppleAuthClient, AppleAuthError, ErrorResponse, HttpResponse, InMemoryHttpClient,
    OAuthErrorCode,
};
use support::{generate_key, identity};

async fn exchange_with(response: HttpResponse) -> AppleAuthError {
    let key = generate_key();
    let client = AppleAuthClient::new(identity(&key), InMemoryHttpClient::with_default(response));
    client.exchange_code("code123").await.unwrap_err()
}

#[tokio::test]
async fn test_known_oauth_errors_map_to_taxonomy() {
    let cases = vec![
        (400, "invalid_request", OAuthErrorCode::InvalidRequest, "The request is malformed, typically because it is missing a parameter, contains an unsupported parameter, includes multiple credentials, or uses more than one mechanism for authenticating the client."),
        (401, "invalid_client", OAuthErrorCode::InvalidClient, "The client authentication failed, typically due to a mismatched or invalid client identifier, invalid client secret (expired token, malformed claims, or invalid signature), or mismatched or invalid redirect URI."),
        (400, "invalid_grant", OAuthErrorCode::InvalidGrant, "The authorization grant or refresh token is invalid, typically due to a mismatched or invalid client identifier, invalid code (expired or previously used authorization code), or invalid refresh token."),
        (400, "unauthorized_client", OAuthErrorCode::UnauthorizedClient, "The client is not authorized to use this authorization grant type."),
        (400, "unsupported_grant_type", OAuthErrorCode::UnsupportedGrantType, "the authenticated client is not authorized to use this grant type."),
        (400, "invalid_scope", OAuthErrorCode::InvalidScope, "The requested scope is invalid."),
    ];

    for (status, raw, expected_code, expected_message) in cases {
        let err = exchange_with(HttpResponse::json(status, &json!({ "error": raw }))).await;
        match err {
            AppleAuthError::OAuth(resp) => {
                assert_eq!(resp, ErrorResponse { code: expected_code, message: expected_message }, "Error for {raw}");
                assert_eq!(resp.code.as_str(), raw);
                assert_eq!(resp.to_string(), format!("{raw}: {expected_message}"));
            }
            other => panic!("Expected OAuth error for {raw}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_error_description_is_ignored() {
    let err = exchange_with(HttpResponse::json(400, &json!({
        "error": "invalid_grant",
        "error_description": "The code has expired or has been revoked."
    })))
    .await;
    assert_eq!(err.oauth_code(), Some(OAuthErrorCode::InvalidGrant));
}

#[tokio::test]
async fn test_unrecognized_error_keeps_raw_code() {
    let err = exchange_with(HttpResponse::json(400, &json!({ "error": "temporarily_unavailable" }))).await;
    match err {
        AppleAuthError::UnrecognizedOAuth(raw) => assert_eq!(raw, "temporarily_unavailable"),
        other => panic!("Expected unrecognized error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_error_body_is_decode_error() {
    let err = exchange_with(HttpResponse { status: 503, body: b"Service Unavailable".to_vec() }).await;
    assert!(matches!(err, AppleAuthError::ResponseDecode(_)));
    assert_eq!(err.oauth_code(), None);
}

#[tokio::test]
async fn test_malformed_success_body_is_decode_error() {
    let err = exchange_with(HttpResponse { status: 200, body: b"{\"access_token\":".to_vec() }).await;
    assert!(matches!(err, AppleAuthError::ResponseDecode(_)));
}
