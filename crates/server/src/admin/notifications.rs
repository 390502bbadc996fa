//! Push and notification click endpoints.

use floodline_client::{PushMessage, Response};
use hyper::StatusCode;

use super::json;
use crate::error::ServerError;
use crate::handler::AppState;

/// Deliver a push message. The raw request body is the payload.
pub async fn push(state: &AppState, payload: &[u8]) -> Result<Response, ServerError> {
    let message = if payload.is_empty() { PushMessage::empty() } else { PushMessage::new(payload) };
    let notification = state.worker.on_push(&message).await?;
    json(StatusCode::CREATED, &notification)
}

pub fn list(state: &AppState) -> Result<Response, ServerError> {
    json(StatusCode::OK, &state.platform.notifications())
}

/// Click notification number `index` (oldest shown is 0).
pub async fn click(state: &AppState, index: &str, action: Option<&str>) -> Result<Response, ServerError> {
    let index: usize = index
        .parse()
        .map_err(|_| ServerError::InvalidInput(format!("notification index must be a number, got {index:?}")))?;
    let notification = state
        .platform
        .notification(index)
        .ok_or_else(|| ServerError::NotFound(format!("notification {index}")))?;

    let outcome = state.worker.on_notification_click(&notification, action).await?;
    json(StatusCode::OK, &outcome)
}
