//! Request classification.
//!
//! Every GET request is matched against an ordered list of rules; the
//! first rule whose predicate holds selects the strategy. Anything that is
//! not a GET bypasses the rules entirely.

use regex::RegexSet;
use serde::{Deserialize, Serialize};

use crate::http::{Destination, Request};
use floodline_core::Error;

/// The four caching policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Network first, cached copy on failure, root document last.
    Document,
    /// Cached copy first with a background refresh.
    Api,
    /// Cached copy first, SVG placeholder on failure.
    Image,
    /// Cached copy first from the static cache, 404 on failure.
    Static,
}

/// Result of routing one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted; forwarded to the network as-is.
    Passthrough,
    Strategy(StrategyKind),
}

/// Condition a rule checks.
#[derive(Debug, Clone)]
pub enum Predicate {
    Destination(Destination),
    /// Any of the patterns matches the URL path.
    PathMatches(RegexSet),
    Always,
}

impl Predicate {
    pub fn matches(&self, request: &Request) -> bool {
        match self {
            Predicate::Destination(destination) => request.destination == *destination,
            Predicate::PathMatches(patterns) => patterns.is_match(request.url.path()),
            Predicate::Always => true,
        }
    }
}

/// One (predicate, strategy) pair.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub predicate: Predicate,
    pub strategy: StrategyKind,
}

/// Ordered first-match classifier.
#[derive(Debug, Clone)]
pub struct Router {
    rules: Vec<ClassificationRule>,
}

impl Router {
    /// Build the standard rule list: documents, API paths, images, then
    /// everything else as static assets.
    pub fn new(api_patterns: &[String]) -> Result<Self, Error> {
        let api = RegexSet::new(api_patterns).map_err(|e| Error::InvalidInput(format!("api pattern: {e}")))?;

        Ok(Self::with_rules(vec![
            ClassificationRule {
                predicate: Predicate::Destination(Destination::Document),
                strategy: StrategyKind::Document,
            },
            ClassificationRule { predicate: Predicate::PathMatches(api), strategy: StrategyKind::Api },
            ClassificationRule { predicate: Predicate::Destination(Destination::Image), strategy: StrategyKind::Image },
            ClassificationRule { predicate: Predicate::Always, strategy: StrategyKind::Static },
        ]))
    }

    pub fn with_rules(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Select the strategy for `request`.
    ///
    /// Non-GET requests are always `Route::Passthrough`. A GET request that
    /// matches no rule (only possible with custom rules lacking a catch-all)
    /// is passed through as well.
    pub fn route(&self, request: &Request) -> Route {
        if !request.is_get() {
            return Route::Passthrough;
        }

        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(request))
            .map_or(Route::Passthrough, |rule| Route::Strategy(rule.strategy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use floodline_core::config::DEFAULT_API_PATTERNS;
    use reqwest::Method;
    use reqwest::header::HeaderMap;
    use url::Url;

    fn router() -> Router {
        let patterns: Vec<String> = DEFAULT_API_PATTERNS.iter().map(|p| p.to_string()).collect();
        Router::new(&patterns).unwrap()
    }

    fn get(path: &str, destination: Destination) -> Request {
        let url = Url::parse("http://localhost:3000").unwrap().join(path).unwrap();
        Request::get(url).with_destination(destination)
    }

    #[test]
    fn test_document_wins_over_api_path() {
        let route = router().route(&get("/api/alerts", Destination::Document));
        assert_eq!(route, Route::Strategy(StrategyKind::Document));
    }

    #[test]
    fn test_api_paths() {
        let router = router();
        for path in ["/api/flood-reports", "/api/alerts?region=north", "/api/emergency/contacts", "/api/weather"] {
            assert_eq!(router.route(&get(path, Destination::Empty)), Route::Strategy(StrategyKind::Api), "{path}");
        }
    }

    #[test]
    fn test_api_path_wins_over_image_destination() {
        let route = router().route(&get("/api/weather/radar.png", Destination::Image));
        assert_eq!(route, Route::Strategy(StrategyKind::Api));
    }

    #[test]
    fn test_image_destination() {
        let route = router().route(&get("/uploads/flood-123.jpg", Destination::Image));
        assert_eq!(route, Route::Strategy(StrategyKind::Image));
    }

    #[test]
    fn test_default_is_static() {
        let router = router();
        let script = get("/static/js/bundle.js", Destination::Script);
        assert_eq!(router.route(&script), Route::Strategy(StrategyKind::Static));
        assert_eq!(router.route(&get("/api/users", Destination::Empty)), Route::Strategy(StrategyKind::Static));
    }

    #[test]
    fn test_non_get_is_passthrough() {
        let router = router();
        let url = Url::parse("http://localhost:3000/api/flood-reports").unwrap();
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
            let request = Request::from_parts(method, url.clone(), HeaderMap::new(), Bytes::from_static(b"{}"));
            assert_eq!(router.route(&request), Route::Passthrough);
        }
    }

    #[test]
    fn test_no_matching_rule_is_passthrough() {
        let router = Router::with_rules(vec![ClassificationRule {
            predicate: Predicate::Destination(Destination::Image),
            strategy: StrategyKind::Image,
        }]);
        assert_eq!(router.route(&get("/", Destination::Document)), Route::Passthrough);
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let kinds: Vec<StrategyKind> = router().rules().iter().map(|r| r.strategy).collect();
        assert_eq!(kinds, vec![StrategyKind::Document, StrategyKind::Api, StrategyKind::Image, StrategyKind::Static]);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(Router::new(&["(".to_string()]).is_err());
    }
}
