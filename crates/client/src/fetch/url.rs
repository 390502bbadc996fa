//! URL handling for cache keys and origin forwarding.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("not an origin-relative path: {0}")]
    NotAPath(String),
}

impl From<UrlError> for floodline_core::Error {
    fn from(err: UrlError) -> Self {
        floodline_core::Error::InvalidUrl(err.to_string())
    }
}

/// Canonicalize an origin URL.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to http:// if missing (origins are usually local)
/// 3. Lowercase the host
/// 4. Remove fragment, query and any path
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("http://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);
    parsed.set_query(None);
    parsed.set_path("/");

    Ok(parsed)
}

/// Resolve an origin-relative path (with optional query) against the
/// origin. The fragment, if any, is dropped; the query is kept as sent.
pub fn resolve(origin: &url::Url, path_and_query: &str) -> Result<url::Url, UrlError> {
    if !path_and_query.starts_with('/') || path_and_query.starts_with("//") {
        return Err(UrlError::NotAPath(path_and_query.to_string()));
    }

    let mut resolved = origin
        .join(path_and_query)
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    resolved.set_fragment(None);
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://floods.example.org").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("floods.example.org"));
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("localhost:3000").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("http://LOCALHOST:3000").unwrap();
        assert_eq!(url.host_str(), Some("localhost"));
    }

    #[test]
    fn test_canonicalize_strips_path_query_fragment() {
        let url = canonicalize("https://floods.example.org/app?x=1#top").unwrap();
        assert_eq!(url.as_str(), "https://floods.example.org/");
    }

    #[test]
    fn test_canonicalize_trim_whitespace() {
        let url = canonicalize("  http://localhost:3000  ").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/");
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize(""), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_resolve_keeps_query() {
        let origin = canonicalize("http://localhost:3000").unwrap();
        let url = resolve(&origin, "/api/flood-reports?status=active#list").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/flood-reports?status=active");
    }

    #[test]
    fn test_resolve_rejects_absolute_and_protocol_relative() {
        let origin = canonicalize("http://localhost:3000").unwrap();
        assert!(matches!(resolve(&origin, "http://evil.example/"), Err(UrlError::NotAPath(_))));
        assert!(matches!(resolve(&origin, "//evil.example/"), Err(UrlError::NotAPath(_))));
    }
}
