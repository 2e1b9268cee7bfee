//! The identity provider as a collaborator trait.

use async_trait::async_trait;
use serde::Deserialize;

/// Decoded, verified access-token payload. Exists only for the duration of
/// a request; never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Subject -- the user's id at the identity provider.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    /// Issuer URL the token was verified against.
    pub iss: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
}

/// A fresh access/refresh pair issued by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
}

/// Token verification failures.
///
/// `Expired` is distinguished from `Invalid` so callers can decide whether
/// a refresh attempt is worthwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Access token expired")]
    Expired,
    #[error("Invalid access token")]
    Invalid,
}

/// Token lifecycle operations against the identity provider.
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Verify an access token's signature, issuer, and expiry.
    async fn verify(&self, access_token: &str) -> Result<Claims, AuthError>;

    /// Exchange a refresh token for a new access/refresh pair.
    ///
    /// One exchange attempt per call, no retry. Returns `None` on any
    /// failure -- the refresh token is opaque and never inspected locally.
    async fn refresh(&self, refresh_token: &str) -> Option<TokenPair>;
}
