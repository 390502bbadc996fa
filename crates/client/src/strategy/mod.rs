//! Caching strategies.
//!
//! Each strategy fully owns producing the response for the requests routed
//! to it. Network failures never escape a strategy except from the
//! document strategy once every fallback is exhausted. Other fetch errors,
//! such as an oversized body, escape the document and API strategies.
//!
//! Cache reads that fail are treated as misses and cache writes that fail
//! are logged and dropped: the cache is an accelerator, never a reason to
//! fail a request.

pub mod api;
pub mod document;
pub mod fallback;
pub mod image;
pub mod static_asset;

use std::sync::Arc;

use floodline_core::{CacheKey, CacheNames, CacheStore, Error};
use url::Url;

use crate::fetch::Fetcher;
use crate::http::{Request, Response};
use crate::router::StrategyKind;

/// Everything a strategy needs: the cache, the network and the names of
/// the current caches.
#[derive(Clone)]
pub struct StrategyContext {
    pub store: Arc<dyn CacheStore>,
    pub fetcher: Arc<dyn Fetcher>,
    pub names: CacheNames,
    pub vary_headers: Arc<[String]>,
    /// Origin root, used for the cached root-document fallback.
    pub origin: Url,
}

impl StrategyContext {
    pub fn new(
        store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>, names: CacheNames, vary_headers: &[String], origin: Url,
    ) -> Self {
        Self { store, fetcher, names, vary_headers: vary_headers.into(), origin }
    }

    /// Run the strategy selected by the router.
    pub async fn respond(&self, kind: StrategyKind, request: &Request) -> Result<Response, Error> {
        match kind {
            StrategyKind::Document => document::respond(self, request).await,
            StrategyKind::Api => api::respond(self, request).await,
            StrategyKind::Image => Ok(image::respond(self, request).await),
            StrategyKind::Static => Ok(static_asset::respond(self, request).await),
        }
    }

    /// Key for `request` in `cache_name`. The static cache is seeded by
    /// install without page headers, so vary headers only apply to the
    /// dynamic cache.
    pub(crate) fn key_for(&self, cache_name: &str, request: &Request) -> CacheKey {
        if cache_name == self.names.static_name {
            request.cache_key(&[])
        } else {
            request.cache_key(&self.vary_headers)
        }
    }

    /// Exact-match lookup. Read errors count as a miss.
    pub(crate) async fn lookup(&self, cache_name: &str, request: &Request) -> Option<Response> {
        let key = self.key_for(cache_name, request);
        match self.store.match_entry(cache_name, &key).await {
            Ok(Some(cached)) => {
                tracing::debug!(cache = cache_name, url = %request.url, "cache hit");
                Some(Response::from_cached(cached))
            }
            Ok(None) => {
                tracing::debug!(cache = cache_name, url = %request.url, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(cache = cache_name, url = %request.url, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Store a copy of `response` under `request`'s key.
    ///
    /// The write runs on its own task: if the caller is dropped mid-write
    /// (the page navigated away) the write still completes.
    pub(crate) async fn persist(&self, cache_name: &str, request: &Request, response: &Response) {
        let store = Arc::clone(&self.store);
        let key = self.key_for(cache_name, request);
        let cache_name = cache_name.to_string();
        let cached = response.to_cached();
        let url = request.url.clone();

        let write = tokio::spawn(async move {
            if let Err(e) = store.put(&cache_name, &key, &cached).await {
                tracing::warn!(cache = %cache_name, url = %url, error = %e, "cache write failed");
            }
        });

        if let Err(e) = write.await {
            tracing::warn!(error = %e, "cache write task did not complete");
        }
    }

    /// Fetch from the network and cache a 200 response in `cache_name`.
    pub(crate) async fn fetch_and_cache(&self, cache_name: &str, request: &Request) -> Result<Response, Error> {
        let response = self.fetcher.fetch(request).await?;
        if response.is_ok() {
            self.persist(cache_name, request, &response).await;
        }
        Ok(response)
    }
}


#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::testing::{FailingStore, FakeNetwork, context_with, origin, request};
    use super::*;
    use crate::http::{Destination, ResponseSource};

    #[tokio::test]
    async fn test_preloaded_asset_matches_request_with_vary_header() {
        let network = FakeNetwork::new();
        network.respond("/static/js/main.js", StatusCode::OK, "text/javascript", "boot()");
        let store = floodline_core::MemoryStore::new();
        let fetcher: Arc<dyn Fetcher> = network.clone();
        let vary = ["Accept-Language".to_string()];
        let names = CacheNames::for_version("v1");
        let ctx = StrategyContext::new(Arc::new(store.clone()), fetcher, names, &vary, origin());

        crate::lifecycle::install(&ctx, &["/static/js/main.js".to_string()]).await.unwrap();
        network.set_offline(true);

        let mut script = request("/static/js/main.js").with_destination(Destination::Script);
        script.headers.insert("accept-language", reqwest::header::HeaderValue::from_static("nl-NL"));
        let response = ctx.respond(StrategyKind::Static, &script).await.unwrap();

        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(&response.body[..], b"boot()");
    }

    #[tokio::test]
    async fn test_failed_cache_write_still_returns_network_response() {
        let network = FakeNetwork::new();
        network.respond("/alerts", StatusCode::OK, "text/html", "<h1>Alerts</h1>");
        let store = FailingStore::new();
        let ctx = context_with(&network, store.clone());

        let page = request("/alerts").with_destination(Destination::Document);
        let response = ctx.respond(StrategyKind::Document, &page).await.unwrap();

        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(&response.body[..], b"<h1>Alerts</h1>");
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_failed_cache_reads_still_reach_offline_fallbacks() {
        let network = FakeNetwork::new();
        network.set_offline(true);
        let store = FailingStore::new();
        let ctx = context_with(&network, store.clone());

        let image = ctx.respond(StrategyKind::Image, &request("/uploads/levee.jpg")).await.unwrap();
        assert_eq!(image.content_type(), Some("image/svg+xml"));

        let api = ctx.respond(StrategyKind::Api, &request("/api/alerts")).await.unwrap();
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);

        let asset = ctx.respond(StrategyKind::Static, &request("/static/js/main.js")).await.unwrap();
        assert_eq!(asset.status, StatusCode::NOT_FOUND);

        let page = request("/reports").with_destination(Destination::Document);
        let document = ctx.respond(StrategyKind::Document, &page).await;
        assert!(matches!(document, Err(Error::NetworkUnavailable(_))));

        assert!(store.reads() >= 4);
        assert_eq!(store.writes(), 0);
    }
}
