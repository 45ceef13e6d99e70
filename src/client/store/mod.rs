//! # Record Store Clients
//!
//! The remote service of record, seen from the sync engine.
//!
//! ## Implementations
//!
//! - [`HttpRecordStore`]: talks to the `logitrack-store` HTTP API and its
//!   server-sent change feed.
//! - [`MemoryRecordStore`]: in-process store with reachability and rejection
//!   controls. Used by tests and as the stand-in when no store URL is
//!   configured (it then reports itself unreachable).
//!
//! Every method can fail with a connectivity error ([`StoreError::Unreachable`]
//! or [`StoreError::Timeout`]) or a positive rejection; callers use
//! [`StoreError::is_connectivity`] to tell them apart.

pub mod http;
pub mod memory;

pub use http::HttpRecordStore;
pub use memory::MemoryRecordStore;

use crate::client::error::StoreError;
use crate::client::subscription::RecordSubscription;
use crate::shared::{LogisticsRecord, NewRecord, RecordPatch};
use async_trait::async_trait;

/// Remote record store operations
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Cheap reachability check
    async fn probe(&self) -> Result<(), StoreError>;

    /// Full record set, newest first
    async fn list(&self) -> Result<Vec<LogisticsRecord>, StoreError>;

    /// Create a record; `record.id` is honoured when set
    async fn create(&self, record: NewRecord) -> Result<LogisticsRecord, StoreError>;

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<LogisticsRecord, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Open the live change feed
    async fn subscribe(&self) -> Result<RecordSubscription, StoreError>;
}

/// Run a store call under a deadline; expiry is a `StoreError::Timeout`
pub async fn bounded<T, F>(limit: std::time::Duration, call: F) -> Result<T, StoreError>
where
    F: std::future::Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("[Store] Call timed out after {:?}", limit);
            Err(StoreError::Timeout(limit))
        }
    }
}
