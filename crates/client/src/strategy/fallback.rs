//! Responses synthesized when neither the network nor the cache can answer.

use reqwest::StatusCode;

use crate::http::Response;

/// Text carried by the offline API body.
pub const OFFLINE_MESSAGE: &str = "you are offline";

const IMAGE_PLACEHOLDER: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200"><rect width="200" height="200" fill="#f0f0f0"/><text x="100" y="100" font-family="Arial, sans-serif" font-size="14" fill="#999" text-anchor="middle" dominant-baseline="middle">Image Unavailable</text></svg>"##;

/// HTTP 503 JSON body telling application code to retry later.
///
/// Callers treat `offline: true` as "not a server error".
pub fn offline_api() -> Response {
    let body = serde_json::json!({
        "success": false,
        "message": OFFLINE_MESSAGE,
        "offline": true,
    });
    Response::synthesized(StatusCode::SERVICE_UNAVAILABLE, "application/json", body.to_string())
}

/// Inline SVG shown instead of a broken image.
pub fn image_placeholder() -> Response {
    Response::synthesized(StatusCode::OK, "image/svg+xml", IMAGE_PLACEHOLDER)
}

/// Plain-text 404 for static assets that cannot be served.
pub fn asset_unavailable() -> Response {
    Response::synthesized(StatusCode::NOT_FOUND, "text/plain", "Asset unavailable offline")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ResponseSource;

    #[test]
    fn test_offline_api_shape() {
        let response = offline_api();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.content_type(), Some("application/json"));

        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["offline"], true);
        assert_eq!(body["message"], OFFLINE_MESSAGE);
    }

    #[test]
    fn test_image_placeholder() {
        let response = image_placeholder();
        assert_eq!(response.content_type(), Some("image/svg+xml"));
        assert!(std::str::from_utf8(&response.body).unwrap().contains("Image Unavailable"));
        assert_eq!(response.source, ResponseSource::Fallback);
    }

    #[test]
    fn test_asset_unavailable() {
        let response = asset_unavailable();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(&response.body[..], b"Asset unavailable offline");
    }
}
