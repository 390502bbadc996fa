//! Cache-first strategy for images.

use super::{StrategyContext, fallback};
use crate::http::{Request, Response};

/// Cached copy from the dynamic cache, then the network, then a
/// placeholder so the page never shows a broken image.
pub async fn respond(ctx: &StrategyContext, request: &Request) -> Response {
    let dynamic = ctx.names.dynamic_name.as_str();

    if let Some(cached) = ctx.lookup(dynamic, request).await {
        return cached;
    }

    match ctx.fetch_and_cache(dynamic, request).await {
        Ok(response) => response,
        Err(e) => {
            if e.is_network_unavailable() {
                tracing::debug!(url = %request.url, error = %e, "image unavailable, serving placeholder");
            } else {
                tracing::warn!(url = %request.url, error = %e, "image unavailable, serving placeholder");
            }
            fallback::image_placeholder()
        }
    }
}
