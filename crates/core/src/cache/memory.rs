//! In-memory cache backend.
//!
//! Same semantics as the SQLite store, nothing persisted. Used by tests
//! and by the server's `--ephemeral` mode.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{CacheKey, CacheStore, CachedResponse};
use crate::Error;

type NamedCache = HashMap<String, CachedResponse>;

/// Process-local cache store. Clones share the same maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    caches: Arc<RwLock<BTreeMap<String, NamedCache>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `cache_name`, or `None` if it does not exist.
    pub async fn entry_count(&self, cache_name: &str) -> Option<usize> {
        self.caches.read().await.get(cache_name).map(HashMap::len)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, cache_name: &str) -> Result<(), Error> {
        self.caches.write().await.entry(cache_name.to_string()).or_default();
        Ok(())
    }

    async fn match_entry(&self, cache_name: &str, key: &CacheKey) -> Result<Option<CachedResponse>, Error> {
        let caches = self.caches.read().await;
        Ok(caches.get(cache_name).and_then(|cache| cache.get(&key.hash)).cloned())
    }

    async fn put(&self, cache_name: &str, key: &CacheKey, response: &CachedResponse) -> Result<(), Error> {
        self.caches
            .write()
            .await
            .entry(cache_name.to_string())
            .or_default()
            .insert(key.hash.clone(), response.clone());
        Ok(())
    }

    async fn cache_names(&self) -> Result<Vec<String>, Error> {
        Ok(self.caches.read().await.keys().cloned().collect())
    }

    async fn delete_cache(&self, cache_name: &str) -> Result<bool, Error> {
        Ok(self.caches.write().await.remove(cache_name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_match() {
        let store = MemoryStore::new();
        let key = CacheKey::new("GET", "http://localhost:3000/api/alerts", "");
        let response = CachedResponse::new(200, vec![], b"{}".to_vec());

        store.put("dynamic-v1", &key, &response).await.unwrap();

        assert_eq!(store.match_entry("dynamic-v1", &key).await.unwrap(), Some(response));
        assert_eq!(store.entry_count("dynamic-v1").await, Some(1));
    }

    #[tokio::test]
    async fn test_names_sorted_and_delete() {
        let store = MemoryStore::new();
        store.open("static-v1").await.unwrap();
        store.open("dynamic-v1").await.unwrap();

        assert_eq!(store.cache_names().await.unwrap(), vec!["dynamic-v1", "static-v1"]);
        assert!(store.delete_cache("static-v1").await.unwrap());
        assert!(!store.delete_cache("static-v1").await.unwrap());
        assert_eq!(store.entry_count("static-v1").await, None);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        other.open("static-v1").await.unwrap();
        assert_eq!(store.entry_count("static-v1").await, Some(0));
    }
}
