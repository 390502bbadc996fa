//! Network-first strategy for page navigations.

use floodline_core::Error;

use super::StrategyContext;
use crate::http::{Request, Response};

/// Network first. A 200 is copied into the dynamic cache. When the
/// network is unavailable, serve the cached copy of this request, then the
/// cached root document, and only then give up with the network error.
pub async fn respond(ctx: &StrategyContext, request: &Request) -> Result<Response, Error> {
    let dynamic = ctx.names.dynamic_name.as_str();

    let err = match ctx.fetch_and_cache(dynamic, request).await {
        Ok(response) => return Ok(response),
        Err(e) => e,
    };

    tracing::debug!(url = %request.url, error = %err, "document fetch failed, trying cache");

    if let Some(cached) = ctx.lookup(dynamic, request).await {
        return Ok(cached);
    }

    if let Some(root) = cached_root(ctx).await {
        tracing::debug!(url = %request.url, "serving cached root document");
        return Ok(root);
    }

    Err(err)
}

/// The root document as stored by install (static cache) or by an earlier
/// navigation (dynamic cache).
async fn cached_root(ctx: &StrategyContext) -> Option<Response> {
    let root = Request::get(ctx.origin.clone());
    for cache_name in [&ctx.names.dynamic_name, &ctx.names.static_name] {
        let key = ctx.key_for(cache_name, &root);
        match ctx.store.match_entry(cache_name, &key).await {
            Ok(Some(cached)) => return Some(Response::from_cached(cached)),
            Ok(None) => {}
            Err(e) => tracing::warn!(cache = %cache_name, error = %e, "cache read failed"),
        }
    }
    None
}
