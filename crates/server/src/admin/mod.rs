//! Admin endpoints under `/__floodline/`.
//!
//! A browser dispatches install, activate, sync, push and
//! notificationclick events on its own; here they are triggered over HTTP.

pub mod caches;
pub mod lifecycle;
pub mod notifications;
pub mod sync;

use floodline_client::{Request, Response};
use hyper::StatusCode;
use serde::Serialize;

use crate::error::ServerError;
use crate::handler::AppState;

/// Dispatch `endpoint` (the path after the admin prefix).
pub async fn handle(state: &AppState, endpoint: &str, request: &Request) -> Result<Response, ServerError> {
    let segments: Vec<&str> = endpoint.trim_end_matches('/').split('/').collect();

    match (request.method.as_str(), segments.as_slice()) {
        ("POST", ["install"]) => lifecycle::install(state).await,
        ("POST", ["activate"]) => lifecycle::activate(state).await,
        ("POST", ["sync"]) => sync::replay(state, query(request, "tag").as_deref()).await,
        ("GET", ["queue"]) => sync::pending(state).await,
        ("POST", ["push"]) => notifications::push(state, &request.body).await,
        ("GET", ["notifications"]) => notifications::list(state),
        ("POST", ["notifications", index, "click"]) => {
            notifications::click(state, index, query(request, "action").as_deref()).await
        }
        ("GET", ["caches"]) => caches::list(state).await,
        _ => Err(ServerError::NotFound(format!("{} /__floodline/{endpoint}", request.method))),
    }
}

/// First value of query parameter `name`.
fn query(request: &Request, name: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn json(status: StatusCode, value: &impl Serialize) -> Result<Response, ServerError> {
    let body = serde_json::to_vec_pretty(value).map_err(|e| ServerError::Encode(e.to_string()))?;
    Ok(Response::synthesized(status, "application/json", body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::dispatch;
    use crate::handler::testing::{request, state};

    #[tokio::test]
    async fn test_unknown_endpoint() {
        let (state, _origin, _store) = state().await;
        let err = dispatch(&state, request("GET", "/__floodline/reboot", b"")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_method() {
        let (state, _origin, _store) = state().await;
        let err = dispatch(&state, request("GET", "/__floodline/install", b"")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_query_lookup() {
        let req = request("POST", "/__floodline/sync?tag=rescue-sync&x=1", b"");
        assert_eq!(query(&req, "tag").as_deref(), Some("rescue-sync"));
        assert_eq!(query(&req, "action"), None);
    }
}
