//! Request and response values passed between the router, strategies and
//! the network.

use bytes::Bytes;
use floodline_core::{CacheKey, CachedResponse};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

/// Headers that describe a single connection and are never stored or
/// forwarded.
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// What the page intends to do with a response, after the Fetch
/// standard's request destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    /// `fetch()`/XHR calls, which carry no destination.
    Empty,
    Other,
}

impl Destination {
    /// Parse a `Sec-Fetch-Dest` header value.
    pub fn from_fetch_dest(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" | "iframe" | "frame" => Destination::Document,
            "image" => Destination::Image,
            "script" | "worker" | "sharedworker" | "serviceworker" => Destination::Script,
            "style" => Destination::Style,
            "font" => Destination::Font,
            "manifest" => Destination::Manifest,
            "empty" => Destination::Empty,
            _ => Destination::Other,
        }
    }

    /// Derive the destination from request headers.
    ///
    /// `Sec-Fetch-Dest` wins when present. Otherwise an `Accept` header
    /// that prefers HTML means a navigation and one that starts with
    /// `image/` means an image.
    pub fn infer(headers: &HeaderMap) -> Self {
        if let Some(dest) = headers.get("sec-fetch-dest").and_then(|v| v.to_str().ok()) {
            return Self::from_fetch_dest(dest);
        }

        let accept = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if accept.starts_with("text/html") {
            Destination::Document
        } else if accept.starts_with("image/") {
            Destination::Image
        } else {
            Destination::Empty
        }
    }
}

/// An outgoing request as seen by the caching layer.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Absolute URL on the origin.
    pub url: Url,
    pub headers: HeaderMap,
    pub destination: Destination,
    pub body: Bytes,
}

impl Request {
    /// A bodiless GET with no headers and an empty destination.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            destination: Destination::Empty,
            body: Bytes::new(),
        }
    }

    /// Build a request and infer its destination from the headers.
    pub fn from_parts(method: Method, url: Url, headers: HeaderMap, body: Bytes) -> Self {
        let destination = Destination::infer(&headers);
        Self { method, url, headers, destination, body }
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Cache identity: method, URL and the values of `vary_headers`, one
    /// `name:value` line each in the configured order.
    pub fn cache_key(&self, vary_headers: &[String]) -> CacheKey {
        let vary = vary_headers
            .iter()
            .map(|name| {
                let value = self
                    .headers
                    .get(name.as_str())
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                format!("{}:{value}", name.to_ascii_lowercase())
            })
            .collect::<Vec<_>>()
            .join("\n");

        CacheKey::new(self.method.as_str(), self.url.as_str(), &vary)
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    /// Synthesized by a strategy because neither network nor cache could
    /// answer.
    Fallback,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::Fallback => "fallback",
        }
    }
}

/// A response handed back to the page.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl Response {
    /// A synthesized response with a single content type header.
    pub fn synthesized(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self { status, headers, body: body.into(), source: ResponseSource::Fallback }
    }

    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Capture this response for storage, dropping hop-by-hop headers.
    pub fn to_cached(&self) -> CachedResponse {
        let headers = self
            .headers
            .iter()
            .filter(|(name, _)| !HOP_BY_HOP.contains(&name.as_str()))
            .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
            .collect();

        CachedResponse::new(self.status.as_u16(), headers, self.body.to_vec())
    }

    /// Rebuild a response from storage. Header pairs that are no longer
    /// valid are skipped.
    pub fn from_cached(cached: CachedResponse) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &cached.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }

        Self {
            status: StatusCode::from_u16(cached.status).unwrap_or(StatusCode::OK),
            headers,
            body: Bytes::from(cached.body),
            source: ResponseSource::Cache,
        }
    }
}
