//! Process-wide key-set cache.
//!
//! Holds zero or one [`KeySet`]. There is no TTL and no background refresh:
//! staleness is discovered when a lookup by key ID misses, and the resolver
//! then replaces the whole set. Readers get an `Arc` snapshot, so a
//! concurrent replace can never expose a half-written set.

use crate::auth::jwks::KeySet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cache of the most recently fetched key set.
#[derive(Debug, Default)]
pub struct KeySetCache {
    current: RwLock<Option<Arc<KeySet>>>,
}

impl KeySetCache {
    /// Create a cold (empty) cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current key set, or `None` when cold.
    pub async fn get(&self) -> Option<Arc<KeySet>> {
        self.current.read().await.clone()
    }

    /// Unconditionally replace the held key set.
    pub async fn replace(&self, key_set: KeySet) -> Arc<KeySet> {
        let key_set = Arc::new(key_set);
        let mut current = self.current.write().await;
        *current = Some(Arc::clone(&key_set));
        key_set
    }

    /// Drop the held key set.
    #[cfg(test)]
    pub async fn clear(&self) {
        let mut current = self.current.write().await;
        *current = None;
    }
}
