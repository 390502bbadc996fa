//! Configuration validation.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::net::SocketAddr;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid { field: field.into(), reason: reason.into() }
    }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `listen_addr` is not a socket address
    /// - `cache_version` is empty or contains whitespace
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - an API or sync pattern is not a valid regular expression
    /// - a manifest entry is not an absolute path
    /// - `max_sync_attempts` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") && origin.host_str().is_some() => {}
            Ok(_) => return Err(ConfigError::invalid("origin", "must be an http or https URL with a host")),
            Err(e) => return Err(ConfigError::invalid("origin", e.to_string())),
        }

        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid("listen_addr", "must be a socket address such as 127.0.0.1:8787"));
        }

        if self.cache_version.is_empty() {
            return Err(ConfigError::invalid("cache_version", "must not be empty"));
        }
        if self.cache_version.chars().any(char::is_whitespace) {
            return Err(ConfigError::invalid("cache_version", "must not contain whitespace"));
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::invalid("user_agent", "must not be empty"));
        }

        for (field, patterns) in [("api_patterns", &self.api_patterns), ("sync_patterns", &self.sync_patterns)] {
            for pattern in patterns {
                regex::Regex::new(pattern).map_err(|e| ConfigError::invalid(field, format!("{pattern}: {e}")))?;
            }
        }

        if let Some(entry) = self.static_manifest.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::invalid("static_manifest", format!("{entry} is not an absolute path")));
        }

        if self.max_sync_attempts == 0 {
            return Err(ConfigError::invalid("max_sync_attempts", "must be at least 1"));
        }

        if self.api_patterns.is_empty() {
            tracing::warn!("api_patterns is empty; API responses will use the static strategy");
        }

        Ok(())
    }
}
