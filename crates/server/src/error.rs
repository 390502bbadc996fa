//! Structured errors for the floodline server.
//!
//! Each variant maps to the HTTP status the intermediary answers with.

use hyper::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Malformed admin request (bad index, unreadable query).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Unknown admin endpoint or notification.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Admin response could not be serialized.
    #[error("ENCODE_FAILED: {0}")]
    Encode(String),

    #[error(transparent)]
    Worker(#[from] floodline_core::Error),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        use floodline_core::Error;

        match self {
            ServerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Worker(Error::NetworkUnavailable(_)) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::Worker(Error::InvalidUrl(_) | Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ServerError::Worker(Error::FetchTooLarge(_) | Error::HttpError(_)) => StatusCode::BAD_GATEWAY,
            ServerError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
