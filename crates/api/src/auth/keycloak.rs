//! Production [`TokenService`] backed by a Keycloak-style OIDC provider.
//!
//! Access tokens are RS256 JWTs verified against the provider's published
//! key set (JWKS). Signing keys are cached in a small LRU with a bounded
//! TTL so verification does not cost a network round-trip per request.
//! Refresh tokens are opaque: they are only ever forwarded to the
//! provider's token endpoint, never decoded here.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::auth::service::{AuthError, Claims, TokenPair, TokenService};
use crate::config::OidcConfig;

/// How long a fetched signing key stays usable.
const JWKS_TTL: Duration = Duration::from_secs(10 * 60);

/// Maximum number of signing keys kept at once.
const JWKS_MAX_ENTRIES: usize = 5;

/// Token service for a Keycloak-compatible identity provider.
pub struct KeycloakTokenService {
    http: reqwest::Client,
    config: OidcConfig,
    jwks: Mutex<JwksCache>,
}

impl KeycloakTokenService {
    pub fn new(config: OidcConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            jwks: Mutex::new(JwksCache::new(JWKS_MAX_ENTRIES, JWKS_TTL)),
        }
    }

    fn certs_url(&self) -> String {
        format!("{}/protocol/openid-connect/certs", self.config.issuer_url)
    }

    fn token_url(&self) -> String {
        format!("{}/protocol/openid-connect/token", self.config.issuer_url)
    }

    /// Resolve the signing key for `kid`, from cache or a fresh JWKS fetch.
    async fn signing_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let mut cache = self.jwks.lock().await;
            if let Some(key) = cache.get(kid) {
                return Ok(key);
            }
        }

        let key_set: JwkSet = self
            .http
            .get(self.certs_url())
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "JWKS fetch failed");
                AuthError::Invalid
            })?
            .json()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "JWKS response was not valid JSON");
                AuthError::Invalid
            })?;

        let jwk = key_set
            .keys
            .iter()
            .find(|k| k.kid == kid)
            .ok_or(AuthError::Invalid)?;

        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|_| AuthError::Invalid)?;

        self.jwks.lock().await.insert(kid.to_string(), key.clone());
        Ok(key)
    }
}

#[async_trait]
impl TokenService for KeycloakTokenService {
    async fn verify(&self, access_token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(access_token).map_err(|_| AuthError::Invalid)?;
        let kid = header.kid.ok_or(AuthError::Invalid)?;
        let key = self.signing_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.config.issuer_url]);
        validation.validate_aud = false;

        let token_data =
            decode::<Claims>(access_token, &key, &validation).map_err(classify_error)?;
        Ok(token_data.claims)
    }

    async fn refresh(&self, refresh_token: &str) -> Option<TokenPair> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("refresh_token", refresh_token),
        ];

        let response = match self.http.post(self.token_url()).form(&params).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Refresh exchange failed to reach the provider");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::info!(status = %response.status(), "Refresh token rejected by provider");
            return None;
        }

        match response.json::<TokenPair>().await {
            Ok(pair) => Some(pair),
            Err(e) => {
                tracing::warn!(error = %e, "Malformed token response from provider");
                None
            }
        }
    }
}

/// An otherwise-valid token past its expiry is `Expired` so callers can try
/// a refresh; every other failure is `Invalid`.
fn classify_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::Invalid,
    }
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    #[serde(default)]
    kid: String,
    /// RSA modulus, base64url.
    #[serde(default)]
    n: String,
    /// RSA public exponent, base64url.
    #[serde(default)]
    e: String,
}

/// Explicit LRU-with-TTL cache for JWKS signing keys.
struct JwksCache {
    /// Entries ordered least- to most-recently used.
    entries: Vec<(String, CachedKey)>,
    max_entries: usize,
    ttl: Duration,
}

struct CachedKey {
    key: DecodingKey,
    inserted: Instant,
}

impl JwksCache {
    fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
            ttl,
        }
    }

    /// Look up a key, refreshing its recency. Expired entries are dropped.
    fn get(&mut self, kid: &str) -> Option<DecodingKey> {
        let index = self.entries.iter().position(|(k, _)| k == kid)?;
        if self.entries[index].1.inserted.elapsed() >= self.ttl {
            self.entries.remove(index);
            return None;
        }
        // Move to the back: most recently used.
        let entry = self.entries.remove(index);
        let key = entry.1.key.clone();
        self.entries.push(entry);
        Some(key)
    }

    fn insert(&mut self, kid: String, key: DecodingKey) {
        self.entries.retain(|(k, v)| *k != kid && v.inserted.elapsed() < self.ttl);
        if self.entries.len() >= self.max_entries {
            // Evict the least recently used entry.
            self.entries.remove(0);
        }
        self.entries.push((
            kid,
            CachedKey {
                key,
                inserted: Instant::now(),
            },
        ));
    }
}
