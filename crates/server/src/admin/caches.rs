//! Cache inspection endpoint.

use floodline_client::{Response, WorkerState};
use hyper::StatusCode;
use serde::Serialize;

use super::json;
use crate::error::ServerError;
use crate::handler::AppState;

#[derive(Debug, Serialize)]
struct CachesOutput<'a> {
    state: WorkerState,
    version: &'a str,
    current: [&'a str; 2],
    caches: Vec<String>,
}

pub async fn list(state: &AppState) -> Result<Response, ServerError> {
    let names = state.worker.names();
    let caches = state.worker.store().cache_names().await?;

    json(
        StatusCode::OK,
        &CachesOutput {
            state: state.worker.state(),
            version: &names.version,
            current: [names.static_name.as_str(), names.dynamic_name.as_str()],
            caches,
        },
    )
}
