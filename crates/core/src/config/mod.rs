//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FLOODLINE_*)
//! 2. TOML config file (if FLOODLINE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::CacheNames;

mod validation;

pub use validation::ConfigError;

/// Path patterns whose GET responses are served stale-while-revalidate.
pub const DEFAULT_API_PATTERNS: &[&str] = &["/api/flood-reports", "/api/alerts", "/api/emergency", "/api/weather"];

/// Assets preloaded into the static cache on install.
pub const DEFAULT_STATIC_MANIFEST: &[&str] = &[
    "/",
    "/static/js/bundle.js",
    "/static/css/main.css",
    "/manifest.json",
    "/icons/icon-192x192.png",
    "/icons/icon-512x512.png",
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FLOODLINE_*)
/// 2. TOML config file (if FLOODLINE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin server that requests are forwarded to.
    ///
    /// Set via FLOODLINE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Address the intermediary listens on.
    ///
    /// Set via FLOODLINE_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path to SQLite cache database.
    ///
    /// Set via FLOODLINE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Version string baked into every cache name. Bumping it invalidates
    /// all caches on the next activation.
    ///
    /// Set via FLOODLINE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// User-Agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to read per response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Regular expressions matched against request paths to select the
    /// API strategy.
    #[serde(default = "default_api_patterns")]
    pub api_patterns: Vec<String>,

    /// Asset paths stored in the static cache on install.
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,

    /// Request header names that take part in the dynamic cache key.
    /// Static cache entries are keyed on method and URL only.
    #[serde(default)]
    pub vary_headers: Vec<String>,

    /// Regular expressions selecting mutating requests that are queued for
    /// background sync when the origin is unreachable.
    #[serde(default = "default_sync_patterns")]
    pub sync_patterns: Vec<String>,

    /// Seconds between automatic sync replays. 0 disables the timer.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Number of failed replays after which a queued write is dropped.
    #[serde(default = "default_max_sync_attempts")]
    pub max_sync_attempts: u32,
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./floodline-cache.sqlite")
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_user_agent() -> String {
    "floodline/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_api_patterns() -> Vec<String> {
    DEFAULT_API_PATTERNS.iter().map(|p| p.to_string()).collect()
}

fn default_static_manifest() -> Vec<String> {
    DEFAULT_STATIC_MANIFEST.iter().map(|p| p.to_string()).collect()
}

fn default_sync_patterns() -> Vec<String> {
    vec!["/api/flood-reports".into()]
}

fn default_sync_interval_secs() -> u64 {
    30
}

fn default_max_sync_attempts() -> u32 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            listen_addr: default_listen_addr(),
            db_path: default_db_path(),
            cache_version: default_cache_version(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            api_patterns: default_api_patterns(),
            static_manifest: default_static_manifest(),
            vary_headers: Vec::new(),
            sync_patterns: default_sync_patterns(),
            sync_interval_secs: default_sync_interval_secs(),
            max_sync_attempts: default_max_sync_attempts(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Sync replay interval, or `None` when the timer is disabled.
    pub fn sync_interval(&self) -> Option<Duration> {
        (self.sync_interval_secs > 0).then(|| Duration::from_secs(self.sync_interval_secs))
    }

    /// Cache names for the configured version.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames::for_version(&self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FLOODLINE_`
    /// 2. TOML file from `FLOODLINE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FLOODLINE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        Self::extract(figment)
    }

    /// Load configuration with an explicit TOML file taking the place of
    /// `FLOODLINE_CONFIG_FILE`.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(Self::default())).merge(Toml::file(path.into()));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let figment = figment.merge(
            Env::prefixed("FLOODLINE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.origin, "http://localhost:3000");
        assert_eq!(config.cache_version, "v1");
        assert_eq!(config.api_patterns.len(), 4);
        assert_eq!(config.static_manifest[0], "/");
        assert_eq!(config.static_manifest.len(), 6);
        assert!(config.vary_headers.is_empty());
    }

    #[test]
    fn test_timeout_conversion() {
        let config = AppConfig { timeout_ms: 5000, ..Default::default() };
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_sync_interval_disabled() {
        let config = AppConfig { sync_interval_secs: 0, ..Default::default() };
        assert!(config.sync_interval().is_none());

        let config = AppConfig::default();
        assert_eq!(config.sync_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_cache_names_follow_version() {
        let config = AppConfig { cache_version: "v7".into(), ..Default::default() };
        let names = config.cache_names();
        assert_eq!(names.static_name, "static-v7");
        assert_eq!(names.dynamic_name, "dynamic-v7");
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("floodline.toml");
        std::fs::write(
            &path,
            r#"
origin = "https://floods.example.org"
cache_version = "v2"
api_patterns = ["/api/alerts"]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.origin, "https://floods.example.org");
        assert_eq!(config.cache_version, "v2");
        assert_eq!(config.api_patterns, vec!["/api/alerts".to_string()]);
        assert_eq!(config.timeout_ms, 20_000);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("floodline.toml");
        std::fs::write(&path, "cache_version = \"\"\n").unwrap();

        let result = AppConfig::load_from(&path);
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));
    }
}
