//! Application configuration module
//!
//! Provides the configuration shared by the sync client and its binaries:
//! record store location, request timeout, cache backend and reconciliation
//! strategy. Values come from a TOML file, environment overrides (applied by
//! `client::config`) or the builder.
//!
//! ```toml
//! store_url = "http://127.0.0.1:3000"
//! request_timeout_ms = 10000
//! probe_interval_secs = 15
//! reconcile = "replay_outbox"
//!
//! [cache]
//! backend = "sqlite"
//! path = "/var/lib/logitrack"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 15;

/// Where the local cache keeps its slots
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    /// Process memory only; nothing survives a restart
    Memory,
    /// One JSON file per slot
    #[default]
    File,
    /// SQLite key/value table
    Sqlite,
}

impl std::str::FromStr for CacheBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::InvalidValue {
                field: "cache.backend",
                message: format!("unknown backend '{}'", other),
            }),
        }
    }
}

/// What to do with queued local mutations when connectivity returns
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStrategy {
    /// Replay the outbox in order, then reload the full remote set
    #[default]
    ReplayOutbox,
    /// Discard queued mutations and reload the full remote set
    ReloadOnly,
}

/// Local cache settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    /// Directory (file backend) or database file (sqlite backend)
    pub path: Option<PathBuf>,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Record store base URL; `None` runs local-only
    pub store_url: Option<String>,
    /// Upper bound for every record store call
    pub request_timeout_ms: u64,
    /// Connectivity probe period for the network monitor
    pub probe_interval_secs: u64,
    pub cache: CacheConfig,
    pub reconcile: ReconcileStrategy,
    /// Base URL that share tokens are appended to
    pub share_base_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            cache: CacheConfig::default(),
            reconcile: ReconcileStrategy::default(),
            share_base_url: None,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for url in [&self.store_url, &self.share_base_url].into_iter().flatten() {
            validate_url(url)?;
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.probe_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "probe_interval_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }
}

fn validate_url(url: &str) -> Result<(), ConfigError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(ConfigError::InvalidUrl(url.to_string())),
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the record store URL
    pub fn store_url(mut self, url: impl Into<String>) -> Self {
        self.config.store_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn request_timeout_ms(mut self, millis: u64) -> Self {
        self.config.request_timeout_ms = millis;
        self
    }

    pub fn probe_interval_secs(mut self, secs: u64) -> Self {
        self.config.probe_interval_secs = secs;
        self
    }

    pub fn cache_backend(mut self, backend: CacheBackendKind) -> Self {
        self.config.cache.backend = backend;
        self
    }

    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache.path = Some(path.into());
        self
    }

    pub fn reconcile(mut self, strategy: ReconcileStrategy) -> Self {
        self.config.reconcile = strategy;
        self
    }

    pub fn share_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.share_base_url = Some(url.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.store_url.is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.cache.backend, CacheBackendKind::File);
        assert_eq!(config.reconcile, ReconcileStrategy::ReplayOutbox);
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let config = AppConfig::builder()
            .store_url("http://localhost:3000/")
            .build()
            .unwrap();
        assert_eq!(config.store_url.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn test_builder_rejects_bad_url() {
        let result = AppConfig::builder().store_url("ftp://example.com").build();
        assert!(matches!(result, Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = AppConfig::builder().request_timeout_ms(0).build();
        assert!(matches!(result, Err(ConfigError::InvalidValue { field: "request_timeout_ms", .. })));
    }

    #[test]
    fn test_from_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            store_url = "https://records.example.com"
            request_timeout_ms = 2500
            reconcile = "reload_only"

            [cache]
            backend = "sqlite"
            path = "/tmp/logitrack.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.store_url.as_deref(), Some("https://records.example.com"));
        assert_eq!(config.request_timeout_ms, 2500);
        assert_eq!(config.probe_interval_secs, DEFAULT_PROBE_INTERVAL_SECS);
        assert_eq!(config.reconcile, ReconcileStrategy::ReloadOnly);
        assert_eq!(config.cache.backend, CacheBackendKind::Sqlite);
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(matches!(AppConfig::from_toml_str("store_url = ["), Err(ConfigError::Parse(_))));
    }
}
