//! In-process record store
//!
//! Behaves like the HTTP store (newest-first listing, `Conflict` on duplicate
//! ids, `NotFound` on unknown ids, change events for every write) and adds
//! controls for exercising the sync engine:
//!
//! - `set_reachable(false)` makes every call fail with `Unreachable`
//! - `set_rejection(Some(err))` makes every write fail with `err`
//! - `set_latency(d)` delays every call by `d`
//! - `call_count()` counts calls, including failed ones
//! - `inject_event(e)` pushes a change event to subscribers without touching
//!   the stored records

use super::RecordStore;
use crate::client::error::StoreError;
use crate::client::subscription::RecordSubscription;
use crate::shared::{LogisticsRecord, NewRecord, RecordEvent, RecordPatch};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

#[derive(Debug)]
struct Inner {
    records: RwLock<Vec<LogisticsRecord>>,
    rejection: RwLock<Option<StoreError>>,
    reachable: AtomicBool,
    latency_ms: AtomicU64,
    calls: AtomicUsize,
    events: broadcast::Sender<RecordEvent>,
}

#[derive(Debug, Clone)]
pub struct MemoryRecordStore {
    inner: Arc<Inner>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Store pre-populated with `records` (kept in the given order)
    pub fn with_records(records: Vec<LogisticsRecord>) -> Self {
        let (events, _) = broadcast::channel(1000);
        Self {
            inner: Arc::new(Inner {
                records: RwLock::new(records),
                rejection: RwLock::new(None),
                reachable: AtomicBool::new(true),
                latency_ms: AtomicU64::new(0),
                calls: AtomicUsize::new(0),
                events,
            }),
        }
    }

    /// Store that fails every call with `Unreachable`
    pub fn unreachable() -> Self {
        let store = Self::new();
        store.set_reachable(false);
        store
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn is_reachable(&self) -> bool {
        self.inner.reachable.load(Ordering::SeqCst)
    }

    pub async fn set_rejection(&self, rejection: Option<StoreError>) {
        *self.inner.rejection.write().await = rejection;
    }

    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.inner.latency_ms.store(millis, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Current contents, newest first
    pub async fn snapshot(&self) -> Vec<LogisticsRecord> {
        self.inner.records.read().await.clone()
    }

    /// Publish a change event without modifying the stored records
    pub fn inject_event(&self, event: RecordEvent) -> usize {
        self.inner.events.send(event).unwrap_or(0)
    }

    async fn enter(&self) -> Result<(), StoreError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let latency = self.inner.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if !self.is_reachable() {
            return Err(StoreError::Unreachable("memory store is offline".to_string()));
        }
        Ok(())
    }

    async fn enter_write(&self) -> Result<(), StoreError> {
        self.enter().await?;
        match self.inner.rejection.read().await.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn publish(&self, event: RecordEvent) {
        if let Err(e) = self.inner.events.send(event) {
            tracing::trace!("[MemoryStore] No subscribers: {:?}", e);
        }
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn probe(&self) -> Result<(), StoreError> {
        self.enter().await
    }

    async fn list(&self) -> Result<Vec<LogisticsRecord>, StoreError> {
        self.enter().await?;
        Ok(self.snapshot().await)
    }

    async fn create(&self, record: NewRecord) -> Result<LogisticsRecord, StoreError> {
        self.enter_write().await?;
        let mut records = self.inner.records.write().await;
        let id = match record.id.clone() {
            Some(id) if records.iter().any(|r| r.id == id) => {
                return Err(StoreError::Conflict(id));
            }
            Some(id) => id,
            None => uuid::Uuid::new_v4().to_string(),
        };
        let created = record.into_record(id, Utc::now());
        records.insert(0, created.clone());
        drop(records);

        self.publish(RecordEvent::Insert {
            record: created.clone(),
        });
        Ok(created)
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<LogisticsRecord, StoreError> {
        self.enter_write().await?;
        let mut records = self.inner.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.apply_patch(&patch, Utc::now());
        let updated = record.clone();
        drop(records);

        self.publish(RecordEvent::Update {
            record: updated.clone(),
        });
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.enter_write().await?;
        let mut records = self.inner.records.write().await;
        let index = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        records.remove(index);
        drop(records);

        self.publish(RecordEvent::Delete { id: id.to_string() });
        Ok(())
    }

    async fn subscribe(&self) -> Result<RecordSubscription, StoreError> {
        self.enter().await?;
        let mut events = self.inner.events.subscribe();
        let (tx, rx) = RecordSubscription::channel();

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("[MemoryStore] Subscriber lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(RecordSubscription::new(rx, task))
    }
}
