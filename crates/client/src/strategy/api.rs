//! Stale-while-revalidate strategy for API data.

use floodline_core::Error;

use super::{StrategyContext, fallback};
use crate::http::{Request, Response};

/// Serve the cached copy immediately and refresh it in the background.
/// On a miss, go to the network. If the network is unavailable, answer
/// with the offline 503 body; any other fetch error is returned.
pub async fn respond(ctx: &StrategyContext, request: &Request) -> Result<Response, Error> {
    let dynamic = ctx.names.dynamic_name.as_str();

    if let Some(cached) = ctx.lookup(dynamic, request).await {
        spawn_refresh(ctx.clone(), request.clone());
        return Ok(cached);
    }

    match ctx.fetch_and_cache(dynamic, request).await {
        Err(e) if e.is_network_unavailable() => {
            tracing::debug!(url = %request.url, error = %e, "API unreachable with no cached copy");
            Ok(fallback::offline_api())
        }
        other => other,
    }
}

/// Detached refresh of a cached API response. The outcome is only logged.
fn spawn_refresh(ctx: StrategyContext, request: Request) {
    tokio::spawn(async move {
        let refreshed: Result<Response, Error> = ctx.fetch_and_cache(&ctx.names.dynamic_name, &request).await;
        match refreshed {
            Ok(response) => {
                tracing::debug!(url = %request.url, status = response.status.as_u16(), "background refresh done")
            }
            Err(e) => tracing::debug!(url = %request.url, error = %e, "background refresh discarded"),
        }
    });
}
