//! Cache-first strategy for application assets.

use super::{StrategyContext, fallback};
use crate::http::{Request, Response};

/// Cached copy from the static cache, then the network (a 200 is stored
/// in the static cache), then a plain 404. A missing asset points at a
/// deploy/version mismatch, so no substitute body is invented.
pub async fn respond(ctx: &StrategyContext, request: &Request) -> Response {
    let static_name = ctx.names.static_name.as_str();

    if let Some(cached) = ctx.lookup(static_name, request).await {
        return cached;
    }

    match ctx.fetch_and_cache(static_name, request).await {
        Ok(response) => response,
        Err(e) => {
            if e.is_network_unavailable() {
                tracing::debug!(url = %request.url, error = %e, "static asset unavailable");
            } else {
                tracing::warn!(url = %request.url, error = %e, "static asset unavailable");
            }
            fallback::asset_unavailable()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Destination, ResponseSource};
    use crate::strategy::testing::{FakeNetwork, context, request};
    use reqwest::StatusCode;

    fn script(path: &str) -> Request {
        request(path).with_destination(Destination::Script)
    }

    #[tokio::test]
    async fn test_miss_is_stored_in_static_cache() {
        let network = FakeNetwork::new();
        network.respond("/static/js/bundle.js", StatusCode::OK, "text/javascript", "console.log(1)");
        let (ctx, store) = context(&network);

        let response = respond(&ctx, &script("/static/js/bundle.js")).await;
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(store.entry_count("static-v1").await, Some(1));
        assert_eq!(store.entry_count("dynamic-v1").await, None);
    }

    #[tokio::test]
    async fn test_hit_makes_no_network_call() {
        let network = FakeNetwork::new();
        network.respond("/static/css/main.css", StatusCode::OK, "text/css", "body{}");
        let (ctx, _store) = context(&network);

        respond(&ctx, &script("/static/css/main.css")).await;
        network.set_offline(true);
        let response = respond(&ctx, &script("/static/css/main.css")).await;

        assert_eq!(&response.body[..], b"body{}");
        assert_eq!(network.call_count(), 1);
    }

    #[tokio::test]
    async fn test_offline_miss_is_404() {
        let network = FakeNetwork::new();
        network.set_offline(true);
        let (ctx, _store) = context(&network);

        let response = respond(&ctx, &script("/static/js/chunk-9.js")).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.content_type(), Some("text/plain"));
    }
}
