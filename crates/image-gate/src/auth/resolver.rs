//! Key resolution by key ID.
//!
//! Looks the key up in the cached key set and, on a miss, refreshes the
//! cache exactly once before giving up. A newly rotated key therefore
//! succeeds on first presentation, and a fabricated key ID costs at most one
//! fetch per validation.

use crate::auth::cache::KeySetCache;
use crate::auth::jwks::{Jwk, KeySetSource};
use crate::errors::AuthError;
use crate::observability::metrics;
use std::sync::Arc;
use tracing::instrument;

/// Resolves signing keys through the cache, refreshing on a miss.
pub struct KeyResolver {
    cache: Arc<KeySetCache>,
    source: Arc<dyn KeySetSource>,
}

impl KeyResolver {
    /// Create a resolver.
    ///
    /// # Arguments
    ///
    /// * `cache` - Shared key-set cache (one per process)
    /// * `source` - Where fresh key sets come from
    pub fn new(cache: Arc<KeySetCache>, source: Arc<dyn KeySetSource>) -> Self {
        Self { cache, source }
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &Arc<KeySetCache> {
        &self.cache
    }

    /// Get the key with the given key ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SigningKeyNotFound` if the key is absent after one
    /// refresh, or `AuthError::JwksUnavailable` if the refresh fails.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn resolve(&self, kid: &str) -> Result<Jwk, AuthError> {
        let cached = self.cache.get().await;
        let was_warm = cached.is_some();

        if let Some(key_set) = cached {
            if let Some(key) = key_set.find(kid) {
                tracing::debug!(target: "gate.auth.resolver", "Key cache hit");
                return Ok(key.clone());
            }
            tracing::debug!(target: "gate.auth.resolver", "Key not found in cached key set");
        } else {
            tracing::info!(target: "gate.auth.resolver", "No cached key set, cold start");
        }

        // Cache miss or cold - exactly one refresh
        let fresh = self.source.fetch().await?;
        let key_set = self.cache.replace(fresh).await;

        match key_set.find(kid) {
            Some(key) => {
                if was_warm {
                    tracing::info!(target: "gate.auth.resolver", "Signing keys rotated");
                    metrics::record_key_rotation();
                }
                Ok(key.clone())
            }
            None => {
                tracing::warn!(target: "gate.auth.resolver", "Key not found after refresh");
                Err(AuthError::SigningKeyNotFound)
            }
        }
    }
}
