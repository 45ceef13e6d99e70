//! # Local Cache Module
//!
//! Durable single-slot storage of the last known record set, addressed by a
//! fixed key, plus a second slot holding the outbox of unconfirmed mutations.
//!
//! ## Architecture
//!
//! - **`CacheBackend`**: a string slot store (`get`/`put`/`remove` by key).
//!   Implementations: [`MemoryBackend`], [`FileBackend`], [`SqliteBackend`].
//! - **`LocalCache`**: typed access on top of a backend. `write` replaces the
//!   whole slot, `read` returns the last written value or an empty list. No
//!   merging, no conflict detection: last writer wins.
//!
//! ## Storage Format
//!
//! Every slot holds a JSON envelope with a schema version:
//!
//! ```json
//! {"schemaVersion": 1, "savedAt": "2024-05-01T10:00:00Z", "items": [...]}
//! ```
//!
//! A bare JSON array is the legacy (version 0) layout and is migrated on read.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use logitrack::client::local_cache::LocalCache;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = LocalCache::memory();
//! cache.write(&[]).await?;
//! assert!(cache.read().await?.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod file;
pub mod sqlite;

pub use file::FileBackend;
pub use sqlite::SqliteBackend;

use crate::client::error::CacheError;
use crate::client::offline::queue::PendingMutation;
use crate::shared::config::{CacheBackendKind, CacheConfig};
use crate::shared::LogisticsRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Slot holding the record set
pub const RECORDS_KEY: &str = "logistics_records";
/// Slot holding the outbox
pub const OUTBOX_KEY: &str = "logistics_outbox";
/// Envelope version written by this build
pub const SCHEMA_VERSION: u32 = 1;

/// Key/value slot storage
#[async_trait]
pub trait CacheBackend: Send + Sync + fmt::Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError>;
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// Process-local backend; contents vanish with the process
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.slots.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.slots.write().await.remove(key);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEnvelope<T> {
    #[allow(dead_code)]
    schema_version: u32,
    #[allow(dead_code)]
    saved_at: DateTime<Utc>,
    items: Vec<T>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CacheEnvelopeRef<'a, T> {
    schema_version: u32,
    saved_at: DateTime<Utc>,
    items: &'a [T],
}

/// Typed cache over a slot backend
#[derive(Debug, Clone)]
pub struct LocalCache {
    backend: Arc<dyn CacheBackend>,
}

impl LocalCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Cache backed by process memory
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Open the backend selected in the configuration
    pub async fn open(config: &CacheConfig) -> Result<Self, CacheError> {
        let backend: Arc<dyn CacheBackend> = match config.backend {
            CacheBackendKind::Memory => Arc::new(MemoryBackend::new()),
            CacheBackendKind::File => {
                let dir = config.path.clone().unwrap_or_else(default_data_dir);
                Arc::new(FileBackend::open(dir).await?)
            }
            CacheBackendKind::Sqlite => {
                let path = config
                    .path
                    .clone()
                    .unwrap_or_else(|| default_data_dir().join("cache.db"));
                Arc::new(SqliteBackend::open(&path).await?)
            }
        };
        tracing::debug!("[Cache] Opened {:?} backend", config.backend);
        Ok(Self::new(backend))
    }

    /// Last written record set, or empty if never written
    pub async fn read(&self) -> Result<Vec<LogisticsRecord>, CacheError> {
        self.read_slot(RECORDS_KEY).await
    }

    /// Replace the stored record set
    pub async fn write(&self, records: &[LogisticsRecord]) -> Result<(), CacheError> {
        self.write_slot(RECORDS_KEY, records).await
    }

    pub async fn read_outbox(&self) -> Result<Vec<PendingMutation>, CacheError> {
        self.read_slot(OUTBOX_KEY).await
    }

    pub async fn write_outbox(&self, mutations: &[PendingMutation]) -> Result<(), CacheError> {
        if mutations.is_empty() {
            return self.backend.remove(OUTBOX_KEY).await;
        }
        self.write_slot(OUTBOX_KEY, mutations).await
    }

    /// Drop both slots
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.backend.remove(RECORDS_KEY).await?;
        self.backend.remove(OUTBOX_KEY).await
    }

    async fn write_slot<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), CacheError> {
        let envelope = CacheEnvelopeRef {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            items,
        };
        let payload = serde_json::to_string(&envelope)?;
        self.backend.put(key, &payload).await?;
        tracing::debug!("[Cache] Wrote {} item(s) to '{}'", items.len(), key);
        Ok(())
    }

    async fn read_slot<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, CacheError> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(Vec::new());
        };
        decode_slot(key, &raw)
    }
}

fn decode_slot<T: DeserializeOwned>(key: &str, raw: &str) -> Result<Vec<T>, CacheError> {
    let corrupt = |message: String| CacheError::Corrupt {
        key: key.to_string(),
        message,
    };

    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| corrupt(e.to_string()))?;
    match value {
        serde_json::Value::Array(_) => {
            tracing::info!("[Cache] Migrating legacy array layout in '{}'", key);
            serde_json::from_value(value).map_err(|e| corrupt(e.to_string()))
        }
        serde_json::Value::Object(ref fields) => {
            let version = fields
                .get("schemaVersion")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| corrupt("missing schemaVersion".to_string()))?;
            if version > u64::from(SCHEMA_VERSION) {
                return Err(CacheError::UnsupportedVersion {
                    key: key.to_string(),
                    version: u32::try_from(version).unwrap_or(u32::MAX),
                });
            }
            let envelope: CacheEnvelope<T> =
                serde_json::from_value(value).map_err(|e| corrupt(e.to_string()))?;
            Ok(envelope.items)
        }
        _ => Err(corrupt("expected an array or an envelope object".to_string())),
    }
}

/// Platform data directory used when no cache path is configured
pub fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
    path.push("logitrack");
    path
}
