//! Background sync endpoints.

use floodline_client::{FLOOD_REPORT_SYNC, Response};
use hyper::StatusCode;
use serde::Serialize;

use super::json;
use crate::error::ServerError;
use crate::handler::AppState;

/// A queued write without its body.
#[derive(Debug, Serialize)]
struct QueuedWrite {
    id: i64,
    tag: String,
    method: String,
    url: String,
    idempotency_key: String,
    enqueued_at: String,
    attempts: u32,
    last_error: Option<String>,
    size: usize,
}

/// Replay `tag`, defaulting to the flood report queue.
pub async fn replay(state: &AppState, tag: Option<&str>) -> Result<Response, ServerError> {
    let report = state.worker.on_sync(tag.unwrap_or(FLOOD_REPORT_SYNC)).await?;
    json(StatusCode::OK, &report)
}

pub async fn pending(state: &AppState) -> Result<Response, ServerError> {
    let writes: Vec<QueuedWrite> = state
        .worker
        .background_sync()
        .pending(None)
        .await?
        .into_iter()
        .map(|w| QueuedWrite {
            id: w.id,
            tag: w.tag,
            method: w.method,
            url: w.url,
            idempotency_key: w.idempotency_key,
            enqueued_at: w.enqueued_at,
            attempts: w.attempts,
            last_error: w.last_error,
            size: w.body.len(),
        })
        .collect();
    json(StatusCode::OK, &writes)
}

#[cfg(test)]
mod tests {
    use crate::handler::dispatch;
    use crate::handler::testing::{request, state};
    use hyper::StatusCode;

    #[tokio::test]
    async fn test_offline_report_is_queued_then_replayed() {
        let (state, origin, _store) = state().await;
        state.worker.activate().await.unwrap();
        origin.set_offline(true);

        let ack = dispatch(&state, request("POST", "/api/flood-reports", br#"{"level":4}"#)).await.unwrap();
        assert_eq!(ack.status, StatusCode::ACCEPTED);

        let queue = dispatch(&state, request("GET", "/__floodline/queue", b"")).await.unwrap();
        let queue: serde_json::Value = serde_json::from_slice(&queue.body).unwrap();
        assert_eq!(queue[0]["size"], 11);
        assert_eq!(queue[0]["attempts"], 0);

        origin.set_offline(false);
        origin.serve("/api/flood-reports", StatusCode::CREATED, r#"{"success":true}"#);
        let sync = dispatch(&state, request("POST", "/__floodline/sync?tag=flood-report-sync", b"")).await.unwrap();
        let report: serde_json::Value = serde_json::from_slice(&sync.body).unwrap();

        assert_eq!(report["replayed"], 1);
        assert_eq!(report["remaining"], 0);
    }
}
