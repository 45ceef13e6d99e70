use crate::client::store::{HttpRecordStore, MemoryRecordStore, RecordStore};
use crate::shared::config::{AppConfig, ConfigError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name looked up in the platform config directory
const CONFIG_FILE: &str = "config.toml";

/// Client configuration wrapper.
///
/// Resolution order: built-in defaults, then the TOML file (explicit path or
/// `<config dir>/logitrack/config.toml` when present), then environment
/// overrides:
///
/// - `LOGITRACK_STORE_URL`
/// - `LOGITRACK_TIMEOUT_MS`
/// - `LOGITRACK_CACHE_DIR`
/// - `LOGITRACK_CACHE_BACKEND`
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
    source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            source: None,
        }
    }
}

impl Config {
    pub fn new(app: AppConfig) -> Self {
        Self { app, source: None }
    }

    /// Load from `path`, or from the default location if it exists
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (mut app, source) = match path {
            Some(path) => (Self::read_file(path)?, Some(path.to_path_buf())),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => (Self::read_file(&path)?, Some(path)),
                None => (AppConfig::default(), None),
            },
        };

        apply_overrides(&mut app, |key| std::env::var(key).ok())?;
        app.validate()?;

        match &source {
            Some(path) => tracing::debug!("[Config] Loaded {}", path.display()),
            None => tracing::debug!("[Config] No config file, using defaults"),
        }
        Ok(Self { app, source })
    }

    fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        AppConfig::from_toml_str(&contents)
    }

    /// `<config dir>/logitrack/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("logitrack");
        path.push(CONFIG_FILE);
        Some(path)
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    /// File the configuration was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn store_url(&self) -> Option<&str> {
        self.app.store_url.as_deref()
    }

    /// Store client for the configured URL
    ///
    /// Without a URL the engine runs local-only against a store that is
    /// never reachable.
    pub fn record_store(&self) -> Arc<dyn RecordStore> {
        match self.store_url() {
            Some(url) => Arc::new(HttpRecordStore::new(url)),
            None => {
                tracing::info!("[Config] No store URL configured, running local-only");
                Arc::new(MemoryRecordStore::unreachable())
            }
        }
    }
}

/// Apply `LOGITRACK_*` overrides from `lookup`
pub fn apply_overrides<F>(app: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("LOGITRACK_STORE_URL").filter(|v| !v.trim().is_empty()) {
        app.store_url = Some(url.trim().trim_end_matches('/').to_string());
    }
    if let Some(timeout) = lookup("LOGITRACK_TIMEOUT_MS") {
        app.request_timeout_ms = timeout.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: "request_timeout_ms",
            message: format!("'{}' is not a number of milliseconds", timeout),
        })?;
    }
    if let Some(dir) = lookup("LOGITRACK_CACHE_DIR").filter(|v| !v.trim().is_empty()) {
        app.cache.path = Some(PathBuf::from(dir));
    }
    if let Some(backend) = lookup("LOGITRACK_CACHE_BACKEND") {
        app.cache.backend = backend.parse()?;
    }
    Ok(())
}
