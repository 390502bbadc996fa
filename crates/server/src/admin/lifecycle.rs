//! install / activate endpoints.

use floodline_client::{Response, WorkerState};
use hyper::StatusCode;
use serde::Serialize;

use super::json;
use crate::error::ServerError;
use crate::handler::AppState;

#[derive(Debug, Serialize)]
struct ActivateOutput {
    state: WorkerState,
    deleted: Vec<String>,
}

pub async fn install(state: &AppState) -> Result<Response, ServerError> {
    let report = state.worker.install().await?;
    json(StatusCode::OK, &report)
}

pub async fn activate(state: &AppState) -> Result<Response, ServerError> {
    let deleted = state.worker.activate().await?;
    json(StatusCode::OK, &ActivateOutput { state: state.worker.state(), deleted })
}

#[cfg(test)]
mod tests {
    use crate::handler::dispatch;
    use crate::handler::testing::{request, state};
    use floodline_core::{CacheKey, CacheStore, CachedResponse};
    use hyper::StatusCode;

    #[tokio::test]
    async fn test_install_reports_each_manifest_path() {
        let (state, origin, _store) = state().await;
        origin.serve("/", StatusCode::OK, "<html></html>");
        origin.serve("/manifest.json", StatusCode::OK, "{}");

        let response = dispatch(&state, request("POST", "/__floodline/install", b"")).await.unwrap();
        let report: serde_json::Value = serde_json::from_slice(&response.body).unwrap();

        assert_eq!(report["cached"].as_array().unwrap().len(), 2);
        assert_eq!(report["failed"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_activate_deletes_old_caches() {
        let (state, _origin, store) = state().await;
        let key = CacheKey::new("GET", "http://localhost:3000/", "");
        store.put("static-v0", &key, &CachedResponse::new(200, vec![], Vec::new())).await.unwrap();

        let response = dispatch(&state, request("POST", "/__floodline/activate", b"")).await.unwrap();
        let output: serde_json::Value = serde_json::from_slice(&response.body).unwrap();

        assert_eq!(output["state"], "activated");
        assert_eq!(output["deleted"], serde_json::json!(["static-v0"]));
        assert!(state.platform.clients_claimed());
    }
}
