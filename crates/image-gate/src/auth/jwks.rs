//! JWKS model and fetcher.
//!
//! The fetcher retrieves the identity provider's signing keys from
//! `<issuer>/.well-known/jwks.json`. The URL is built from configuration,
//! never from the token, so a token cannot point us at an attacker's keys.
//! The fetcher does not touch the cache; the key resolver owns cache writes.

use crate::errors::AuthError;
use crate::observability::metrics;
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::instrument;

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Jwk {
    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Key type (expected "RSA").
    pub kty: String,

    /// Algorithm (expected "RS256").
    #[serde(default)]
    pub alg: Option<String>,

    /// RSA modulus (base64url, big-endian).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url, big-endian).
    #[serde(default)]
    pub e: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// An immutable set of signing keys from one fetch.
///
/// A refresh replaces the whole set; entries are never mutated in place.
/// Entries without a usable `kid` or `kty` are dropped when the document is
/// decoded, so one foreign key cannot poison the rest of the set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawKeySet")]
pub struct KeySet {
    /// Keys in the order the endpoint listed them.
    pub keys: Vec<Jwk>,
}

impl KeySet {
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }

    /// First key with the given key ID.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// JWKS document before per-entry filtering. A missing or non-array `keys`
/// still fails the whole decode.
#[derive(Deserialize)]
struct RawKeySet {
    keys: Vec<Value>,
}

impl From<RawKeySet> for KeySet {
    fn from(raw: RawKeySet) -> Self {
        let keys = raw
            .keys
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<Jwk>(entry) {
                Ok(key) => Some(key),
                Err(e) => {
                    tracing::warn!(
                        target: "gate.auth.jwks",
                        index = index,
                        error = %e,
                        "Skipping unusable JWKS entry"
                    );
                    None
                }
            })
            .collect();

        Self { keys }
    }
}

/// Source of fresh key sets (enables mocking).
#[async_trait::async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch the issuer's current key set.
    async fn fetch(&self) -> Result<KeySet, AuthError>;
}

/// HTTPS fetcher for the well-known JWKS endpoint.
pub struct JwksFetcher {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,
}

impl JwksFetcher {
    /// Create a fetcher with an explicit request timeout.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL to the issuer's JWKS endpoint
    /// * `timeout` - Bound on the whole HTTP exchange; expiry is a fetch failure
    pub fn new(jwks_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gate.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    async fn fetch_inner(&self) -> Result<KeySet, AuthError> {
        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to fetch JWKS");
                AuthError::JwksUnavailable(format!("request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "gate.auth.jwks",
                status = %status,
                "JWKS endpoint returned error"
            );
            return Err(AuthError::JwksUnavailable(format!("HTTP {}", status)));
        }

        let key_set: KeySet = response.json().await.map_err(|e| {
            tracing::error!(target: "gate.auth.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::JwksUnavailable(format!("invalid body: {}", e))
        })?;

        Ok(key_set)
    }
}

#[async_trait::async_trait]
impl KeySetSource for JwksFetcher {
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    async fn fetch(&self) -> Result<KeySet, AuthError> {
        tracing::debug!(target: "gate.auth.jwks", "Fetching JWKS");

        let start = Instant::now();
        let result = self.fetch_inner().await;
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_jwks_fetch(status, start.elapsed());

        if let Ok(key_set) = &result {
            tracing::info!(
                target: "gate.auth.jwks",
                key_count = key_set.len(),
                "JWKS fetched"
            );
        }

        result
    }
}

/// Mock key-set source for tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns scripted key sets and counts fetches.
    pub struct MockKeySetSource {
        /// Responses in order; the last one repeats.
        responses: Mutex<Vec<Result<KeySet, AuthError>>>,
        /// Number of fetches made.
        fetch_count: AtomicUsize,
    }

    impl MockKeySetSource {
        /// Always return the same key set.
        pub fn serving(key_set: KeySet) -> Self {
            Self::with_responses(vec![Ok(key_set)])
        }

        /// Always fail as if the endpoint were down.
        pub fn failing() -> Self {
            Self::with_responses(vec![Err(AuthError::JwksUnavailable(
                "mock endpoint down".to_string(),
            ))])
        }

        /// Return responses in sequence, repeating the last one.
        pub fn with_responses(responses: Vec<Result<KeySet, AuthError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                fetch_count: AtomicUsize::new(0),
            }
        }

        /// Number of fetches made.
        pub fn fetch_count(&self) -> usize {
            self.fetch_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl KeySetSource for MockKeySetSource {
        async fn fetch(&self) -> Result<KeySet, AuthError> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);

            let mut responses = self
                .responses
                .lock()
                .map_err(|_| AuthError::JwksUnavailable("mock poisoned".to_string()))?;
            if responses.len() > 1 {
                return responses.remove(0);
            }
            responses
                .first()
                .cloned()
                .unwrap_or_else(|| Ok(KeySet::default()))
        }
    }
}
