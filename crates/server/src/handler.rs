//! Inbound request handling.
//!
//! Every request that reaches the listener is a fetch event for the
//! worker, except paths under [`ADMIN_PREFIX`], which drive lifecycle,
//! sync and notification events directly.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use floodline_client::fetch::resolve;
use floodline_client::http::HOP_BY_HOP;
use floodline_client::{OfflineWorker, RecordingPlatform, Request, Response};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Incoming};
use hyper::header::{self, HeaderValue};
use url::Url;

use crate::admin;
use crate::error::ServerError;

pub const ADMIN_PREFIX: &str = "/__floodline/";

/// Response header naming where the body came from (network, cache or
/// fallback).
pub const SOURCE_HEADER: &str = "x-floodline-source";

/// Shared state for every connection.
pub struct AppState {
    pub worker: OfflineWorker,
    /// The same platform the worker reports to, kept concrete so admin
    /// endpoints can read what it recorded.
    pub platform: Arc<RecordingPlatform>,
    /// Largest inbound body accepted, in bytes.
    pub max_body_bytes: usize,
}

/// hyper service entry point. Never fails: errors become HTTP responses.
pub async fn serve(
    req: hyper::Request<Incoming>, state: Arc<AppState>,
) -> Result<hyper::Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let outcome = match into_request(req, state.worker.origin(), state.max_body_bytes).await {
        Ok(request) => dispatch(&state, request).await,
        Err(e) => Err(e),
    };

    let response = match outcome {
        Ok(response) => into_hyper(response),
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                tracing::warn!(%method, path, status = status.as_u16(), error = %e, "request failed");
            } else {
                tracing::debug!(%method, path, status = status.as_u16(), error = %e, "request rejected");
            }
            error_response(&e)
        }
    };
    Ok(response)
}

/// Route a request to the admin endpoints or the worker.
pub async fn dispatch(state: &AppState, request: Request) -> Result<Response, ServerError> {
    if let Some(endpoint) = request.url.path().strip_prefix(ADMIN_PREFIX) {
        let endpoint = endpoint.to_string();
        return admin::handle(state, &endpoint, &request).await;
    }

    Ok(state.worker.handle_fetch(&request).await?)
}

/// Convert an inbound request, reading at most `max_body_bytes` of body.
async fn into_request<B>(req: hyper::Request<B>, origin: &Url, max_body_bytes: usize) -> Result<Request, ServerError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();

    let path_and_query = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    let url = resolve(origin, path_and_query).map_err(floodline_core::Error::from)?;

    let body = Limited::new(body, max_body_bytes)
        .collect()
        .await
        .map_err(|e| ServerError::InvalidInput(format!("request body: {e}")))?
        .to_bytes();

    Ok(Request::from_parts(parts.method, url, parts.headers, body))
}

pub fn into_hyper(response: Response) -> hyper::Response<Full<Bytes>> {
    let mut out = hyper::Response::new(Full::new(response.body));
    *out.status_mut() = response.status;

    let headers = out.headers_mut();
    for (name, value) in &response.headers {
        if HOP_BY_HOP.contains(&name.as_str()) || *name == header::CONTENT_LENGTH {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers.insert(SOURCE_HEADER, HeaderValue::from_static(response.source.as_str()));
    out
}

fn error_response(err: &ServerError) -> hyper::Response<Full<Bytes>> {
    let mut out = hyper::Response::new(Full::new(Bytes::from(err.to_string())));
    *out.status_mut() = err.status();
    out.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    out
}
