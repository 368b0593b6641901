//! Sign in with Apple core: client secrets, token exchange and identity tokens.

pub mod apple_client;
pub mod client_secret;
pub mod config;
pub mod error;
pub mod http_client;
pub mod types;
pub mod user;
