//! The response-cache abstraction shared by every strategy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::hash::compute_cache_key;
use crate::Error;

/// The three cache names for one deployed version.
///
/// A single version string is baked into all of them; bumping it is the
/// only way to invalidate every cache on the next activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNames {
    pub version: String,
    /// Application-wide name. Not written by any strategy, so it is
    /// removed on activation like any other non-current cache.
    pub general: String,
    pub static_name: String,
    pub dynamic_name: String,
}

impl CacheNames {
    pub fn for_version(version: &str) -> Self {
        Self {
            version: version.to_string(),
            general: format!("flood-management-{version}"),
            static_name: format!("static-{version}"),
            dynamic_name: format!("dynamic-{version}"),
        }
    }

    /// Whether `name` survives activation.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_name || name == self.dynamic_name
    }
}

/// Identity of a cached request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
    pub hash: String,
}

impl CacheKey {
    /// Build a key from the request method, its absolute URL and the
    /// serialized values of the headers that take part in matching.
    pub fn new(method: &str, url: &str, vary_headers: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            hash: compute_cache_key(method, url, vary_headers),
        }
    }
}

/// A captured response as stored in a named cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    /// Header name/value pairs in the order they were received.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// RFC 3339 timestamp of the write.
    pub stored_at: String,
}

impl CachedResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self { status, headers, body, stored_at: chrono::Utc::now().to_rfc3339() }
    }

    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Durable mapping from named caches to request/response pairs.
///
/// Writes to the same key are last-write-wins; no locking is offered.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the named cache if it does not exist yet.
    async fn open(&self, cache_name: &str) -> Result<(), Error>;

    /// Look up an exact match for `key` in `cache_name`.
    async fn match_entry(&self, cache_name: &str, key: &CacheKey) -> Result<Option<CachedResponse>, Error>;

    /// Store or overwrite the entry for `key`, opening the cache if needed.
    async fn put(&self, cache_name: &str, key: &CacheKey, response: &CachedResponse) -> Result<(), Error>;

    /// Names of every existing cache, sorted.
    async fn cache_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a whole cache and its entries. Returns false if it did not exist.
    async fn delete_cache(&self, cache_name: &str) -> Result<bool, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_names_for_version() {
        let names = CacheNames::for_version("v1");
        assert_eq!(names.general, "flood-management-v1");
        assert_eq!(names.static_name, "static-v1");
        assert_eq!(names.dynamic_name, "dynamic-v1");
    }

    #[test]
    fn test_is_current_excludes_general_and_old_versions() {
        let names = CacheNames::for_version("v1");
        assert!(names.is_current("static-v1"));
        assert!(names.is_current("dynamic-v1"));
        assert!(!names.is_current("flood-management-v1"));
        assert!(!names.is_current("static-v0"));
    }

    #[test]
    fn test_cache_key_normalizes_method() {
        let key = CacheKey::new("get", "https://example.com/", "");
        assert_eq!(key.method, "GET");
        assert_eq!(key, CacheKey::new("GET", "https://example.com/", ""));
    }

    #[test]
    fn test_cached_response_header_lookup() {
        let response =
            CachedResponse::new(200, vec![("Content-Type".into(), "application/json".into())], b"{}".to_vec());
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("etag"), None);
    }
}
