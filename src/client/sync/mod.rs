//! # Sync Controller
//!
//! Owns the in-memory record list and keeps it reconciled with the local
//! cache and the remote record store.
//!
//! ## Architecture
//!
//! The controller coordinates:
//! - **Record Store**: remote writes, each bounded by the request timeout
//! - **Local Cache**: rewritten after every change to the record list
//! - **Outbox**: local-only mutations, persisted and replayed on reconnect
//! - **Optimistic Updates**: undo information for in-flight writes
//! - **Change Subscription**: live inserts/updates/deletes from the store
//! - **Notifications**: one per state transition, over a broadcast channel
//!
//! ## Failure Handling
//!
//! A write the store positively rejects is rolled back and its error
//! returned. A write that fails for connectivity reasons (unreachable,
//! timeout) is kept locally, queued in the outbox, counted in
//! `pending_changes`, and the controller moves to `Disconnected`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use logitrack::client::local_cache::LocalCache;
//! use logitrack::client::store::MemoryRecordStore;
//! use logitrack::client::sync::{SyncController, SyncOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryRecordStore::new());
//! let mut controller = SyncController::new(store, LocalCache::memory(), SyncOptions::default());
//! controller.init().await?;
//! controller.add("1Z999AA10123456784", "ups").await?;
//! println!("{}", controller.status());
//! controller.dispose().await?;
//! # Ok(())
//! # }
//! ```

pub mod network_monitor;
pub mod notifications;
pub mod sync_state;

pub use network_monitor::{NetworkMonitor, NetworkStatus};
pub use notifications::Notification;
pub use sync_state::{ConnectionState, SyncStatus};

use crate::client::error::{CacheError, StoreError, SyncError};
use crate::client::export::{decode_snapshot, encode_snapshot, extract_token};
use crate::client::local_cache::LocalCache;
use crate::client::offline::{OptimisticManager, Outbox, PendingMutation, ReconciliationManager, Undo};
use crate::client::records::RecordList;
use crate::client::store::{bounded, RecordStore};
use crate::client::subscription::{apply_event, RecordSubscription};
use crate::shared::config::{AppConfig, DEFAULT_REQUEST_TIMEOUT_MS};
use crate::shared::{
    Carrier, LogisticsRecord, NewRecord, RecordEvent, RecordPatch, ReconcileStrategy, SharedError,
    TrackingStatus,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Controller tuning
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Upper bound for every store call
    pub request_timeout: Duration,
    pub reconcile: ReconcileStrategy,
    pub notification_capacity: usize,
    /// Skip the initial probe and work from the cache until `set_online(true)`
    pub start_offline: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            reconcile: ReconcileStrategy::default(),
            notification_capacity: 256,
            start_offline: false,
        }
    }
}

impl From<&AppConfig> for SyncOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            reconcile: config.reconcile,
            ..Self::default()
        }
    }
}

/// Offline-first sync controller
pub struct SyncController {
    store: Arc<dyn RecordStore>,
    cache: LocalCache,
    records: RecordList,
    outbox: Outbox,
    optimistic: OptimisticManager,
    connection: ConnectionState,
    pending_changes: u64,
    last_sync: Option<DateTime<Utc>>,
    subscription: Option<RecordSubscription>,
    notifications: broadcast::Sender<Notification>,
    options: SyncOptions,
}

impl SyncController {
    pub fn new(store: Arc<dyn RecordStore>, cache: LocalCache, options: SyncOptions) -> Self {
        let (notifications, _) = broadcast::channel(options.notification_capacity.max(1));
        Self {
            store,
            cache,
            records: RecordList::new(),
            outbox: Outbox::new(),
            optimistic: OptimisticManager::new(),
            connection: ConnectionState::Initializing,
            pending_changes: 0,
            last_sync: None,
            subscription: None,
            notifications,
            options,
        }
    }

    /// Restore the outbox, probe the store, load records and open the change feed
    ///
    /// With `start_offline` the store is not contacted at all: records come
    /// from the cache and queued mutations stay queued.
    pub async fn init(&mut self) -> Result<(), SyncError> {
        let queued = match self.cache.read_outbox().await {
            Ok(queued) => queued,
            Err(e) => {
                tracing::warn!("[Sync] Outbox unreadable, starting empty: {}", e);
                self.notify(Notification::CacheCorrupt { message: e.to_string() });
                Vec::new()
            }
        };
        self.outbox = Outbox::from_entries(queued);
        self.pending_changes = self.outbox.len() as u64;
        if !self.outbox.is_empty() {
            tracing::info!("[Sync] Restored {} queued mutation(s)", self.outbox.len());
        }

        if self.options.start_offline {
            self.set_disconnected("started offline".to_string());
        } else {
            match bounded(self.timeout(), self.store.probe()).await {
                Ok(()) => self.set_connected(),
                Err(e) => self.set_disconnected(e.to_string()),
            }
        }

        self.load().await?;
        if self.connection.is_connected() {
            self.open_subscription().await;
        }
        tracing::info!("[Sync] Initialized: {}", self.status());
        Ok(())
    }

    /// Cancel the change feed and flush state to the cache
    pub async fn dispose(&mut self) -> Result<(), SyncError> {
        self.close_subscription();
        self.cache.write(self.records.as_slice()).await?;
        self.cache.write_outbox(&self.outbox.to_vec()).await?;
        tracing::debug!("[Sync] Disposed");
        Ok(())
    }

    /// Refresh the record list
    ///
    /// Connected: reconcile the outbox, then replace the list with the store's
    /// full set. Falls back to the cache on failure, and reads the cache
    /// directly when disconnected.
    pub async fn load(&mut self) -> Result<(), SyncError> {
        if !self.connection.is_connected() {
            self.load_from_cache().await;
            return Ok(());
        }

        if !self.reconcile().await? {
            self.load_from_cache().await;
            return Ok(());
        }

        match bounded(self.timeout(), self.store.list()).await {
            Ok(records) => {
                let count = records.len();
                self.records.replace_all(records);
                self.cache.write(self.records.as_slice()).await?;
                self.pending_changes = 0;
                self.last_sync = Some(Utc::now());
                tracing::info!("[Sync] Loaded {} record(s) from store", count);
                self.notify(Notification::SyncSucceeded { records: count });
            }
            Err(e) => {
                tracing::warn!("[Sync] Load from store failed, using cache: {}", e);
                if e.is_connectivity() {
                    self.set_disconnected(e.to_string());
                }
                self.notify(Notification::SyncFailed { message: e.to_string() });
                self.load_from_cache().await;
            }
        }
        Ok(())
    }

    /// Add a tracking number
    ///
    /// Input is trimmed; blank input, unknown carrier codes and exact
    /// duplicates are rejected before any network call.
    pub async fn add(&mut self, tracking_number: &str, carrier_code: &str) -> Result<LogisticsRecord, SyncError> {
        let tracking_number = tracking_number.trim();
        if tracking_number.is_empty() {
            return Err(SharedError::validation("trackingNumber", "tracking number cannot be blank").into());
        }
        let carrier = Carrier::from_code(carrier_code).ok_or_else(|| {
            SharedError::validation("carrier", format!("unknown carrier code '{}'", carrier_code.trim()))
        })?;
        if self.records.contains_tracking_number(tracking_number) {
            return Err(SharedError::validation(
                "trackingNumber",
                format!("tracking number '{}' is already tracked", tracking_number),
            )
            .into());
        }

        self.create(NewRecord::new(tracking_number, carrier)).await
    }

    /// Flip the favorite flag; `Ok(None)` for unknown ids
    pub async fn toggle_favorite(&mut self, id: &str) -> Result<Option<LogisticsRecord>, SyncError> {
        self.mutate(id, |record, now| RecordPatch::favorite(!record.is_favorite, now))
            .await
    }

    /// Set the delivered flag; delivering also sets the status to delivered
    pub async fn mark_delivered(&mut self, id: &str, delivered: bool) -> Result<Option<LogisticsRecord>, SyncError> {
        self.mutate(id, |_, now| RecordPatch::delivered(delivered, now)).await
    }

    pub async fn set_status(&mut self, id: &str, status: TrackingStatus) -> Result<Option<LogisticsRecord>, SyncError> {
        self.mutate(id, |_, now| RecordPatch::status(status, now)).await
    }

    /// Remove a record; `Ok(false)` for unknown ids
    ///
    /// A rejected delete puts the record back at its former position.
    pub async fn delete(&mut self, id: &str) -> Result<bool, SyncError> {
        let Some((index, record)) = self.records.remove(id) else {
            tracing::debug!("[Sync] Delete ignored, unknown id {}", id);
            return Ok(false);
        };
        let token = self.optimistic.apply(Undo::Removed { index, record });
        self.persist_optimistic(&token).await?;

        if self.connection.is_connected() {
            match bounded(self.timeout(), self.store.delete(id)).await {
                Ok(()) | Err(StoreError::NotFound(_)) => {
                    self.optimistic.confirm(&token);
                    self.notify(Notification::RecordDeleted { id: id.to_string() });
                    return Ok(true);
                }
                Err(e) if e.is_connectivity() => self.set_disconnected(e.to_string()),
                Err(e) => {
                    self.rollback(&token, &e).await?;
                    return Err(e.into());
                }
            }
        }

        self.optimistic.confirm(&token);
        self.queue_local(PendingMutation::delete(id)).await?;
        Ok(true)
    }

    /// Encode the current list as a share token
    pub fn export_snapshot(&self) -> Result<String, SyncError> {
        Ok(encode_snapshot(self.records.as_slice())?)
    }

    /// Import records from a share token or URL
    ///
    /// Malformed or absent tokens are ignored. Records whose tracking number
    /// is already present are skipped; the rest go through the create path.
    /// Returns the number of records imported.
    pub async fn import_snapshot(&mut self, token_or_url: &str) -> Result<usize, SyncError> {
        let Some(records) = extract_token(token_or_url).and_then(|t| decode_snapshot(&t)) else {
            tracing::info!("[Sync] Ignoring share token without records");
            self.notify(Notification::ImportIgnored);
            return Ok(0);
        };

        let mut imported = 0;
        for record in records.into_iter().rev() {
            let tracking_number = record.tracking_number.trim().to_string();
            if tracking_number.is_empty() || self.records.contains_tracking_number(&tracking_number) {
                continue;
            }
            let payload = NewRecord {
                id: None,
                tracking_number,
                ..NewRecord::from(&record)
            };
            match self.create(payload).await {
                Ok(_) => imported += 1,
                Err(SyncError::Store(e)) => {
                    tracing::warn!("[Sync] Import of {} rejected: {}", record.tracking_number, e);
                }
                Err(e) => return Err(e),
            }
        }

        self.notify(Notification::Imported { count: imported });
        Ok(imported)
    }

    /// Online/offline signal from the environment
    ///
    /// Going online probes the store first. On success the change feed is
    /// reopened, and the outbox is reconciled and the list reloaded only when
    /// local changes are pending; remote changes made while offline appear on
    /// the next `load()`.
    pub async fn set_online(&mut self, online: bool) -> Result<(), SyncError> {
        if !online {
            self.close_subscription();
            self.set_disconnected("network offline".to_string());
            return Ok(());
        }
        if self.connection.is_connected() {
            return Ok(());
        }

        match bounded(self.timeout(), self.store.probe()).await {
            Ok(()) => {
                self.set_connected();
                if self.pending_changes > 0 || !self.outbox.is_empty() {
                    self.load().await?;
                }
                if self.connection.is_connected() {
                    self.open_subscription().await;
                }
            }
            Err(e) => {
                tracing::debug!("[Sync] Still offline: {}", e);
                self.set_disconnected(e.to_string());
            }
        }
        Ok(())
    }

    /// Wait for the next change from the store and apply it
    ///
    /// Returns `Ok(None)` when no feed is open or the feed has ended.
    pub async fn next_remote_event(&mut self) -> Result<Option<RecordEvent>, SyncError> {
        let Some(subscription) = self.subscription.as_mut() else {
            return Ok(None);
        };
        let Some(event) = subscription.recv().await else {
            tracing::warn!("[Sync] Change feed ended");
            self.subscription = None;
            return Ok(None);
        };
        self.apply_remote(&event).await?;
        Ok(Some(event))
    }

    /// Apply every change already buffered, without waiting
    pub async fn drain_remote_events(&mut self) -> Result<usize, SyncError> {
        let mut applied = 0;
        while let Some(event) = self.subscription.as_mut().and_then(|s| s.try_recv()) {
            self.apply_remote(&event).await?;
            applied += 1;
        }
        Ok(applied)
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            connection: self.connection,
            pending_changes: self.pending_changes,
            outbox_len: self.outbox.len(),
            record_count: self.records.len(),
            last_sync: self.last_sync,
            subscribed: self.is_subscribed(),
        }
    }

    pub fn records(&self) -> &[LogisticsRecord] {
        self.records.as_slice()
    }

    pub fn record(&self, id: &str) -> Option<&LogisticsRecord> {
        self.records.get(id)
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn pending_changes(&self) -> u64 {
        self.pending_changes
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Optimistic changes still awaiting a store answer
    pub fn optimistic_in_flight(&self) -> usize {
        self.optimistic.count_pending()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| s.is_active())
    }

    fn timeout(&self) -> Duration {
        self.options.request_timeout
    }

    async fn create(&mut self, payload: NewRecord) -> Result<LogisticsRecord, SyncError> {
        if self.connection.is_connected() {
            match bounded(self.timeout(), self.store.create(payload.clone())).await {
                Ok(record) => {
                    if self.records.replace(record.clone()).is_none() {
                        self.records.prepend(record.clone());
                    }
                    self.cache.write(self.records.as_slice()).await?;
                    tracing::info!("[Sync] Added {} ({})", record.tracking_number, record.id);
                    self.notify(Notification::RecordAdded {
                        tracking_number: record.tracking_number.clone(),
                    });
                    return Ok(record);
                }
                Err(e) if e.is_connectivity() => {
                    tracing::warn!("[Sync] Store unreachable, adding locally: {}", e);
                    self.set_disconnected(e.to_string());
                }
                Err(e) => {
                    tracing::warn!("[Sync] Store rejected {}: {}", payload.tracking_number, e);
                    self.notify(Notification::SyncFailed { message: e.to_string() });
                    return Err(e.into());
                }
            }
        }

        let record = payload.into_record(uuid::Uuid::new_v4().to_string(), Utc::now());
        self.records.prepend(record.clone());
        let token = self.optimistic.apply(Undo::Added { id: record.id.clone() });
        self.persist_optimistic(&token).await?;
        self.optimistic.confirm(&token);
        self.queue_local(PendingMutation::create(record.clone())).await?;
        Ok(record)
    }

    async fn mutate<F>(&mut self, id: &str, make_patch: F) -> Result<Option<LogisticsRecord>, SyncError>
    where
        F: FnOnce(&LogisticsRecord, DateTime<Utc>) -> RecordPatch,
    {
        let now = Utc::now();
        let Some(current) = self.records.get(id) else {
            tracing::debug!("[Sync] Update ignored, unknown id {}", id);
            return Ok(None);
        };
        let patch = make_patch(current, now);
        let Some(previous) = self.records.update(id, |r| r.apply_patch(&patch, now)) else {
            return Ok(None);
        };
        let token = self.optimistic.apply(Undo::Modified { previous });
        self.persist_optimistic(&token).await?;

        if self.connection.is_connected() {
            match bounded(self.timeout(), self.store.update(id, patch.clone())).await {
                Ok(confirmed) => {
                    self.optimistic.confirm(&token);
                    self.records.replace(confirmed.clone());
                    self.cache.write(self.records.as_slice()).await?;
                    return Ok(Some(confirmed));
                }
                Err(e) if e.is_connectivity() => self.set_disconnected(e.to_string()),
                Err(e) => {
                    self.rollback(&token, &e).await?;
                    return Err(e.into());
                }
            }
        }

        self.optimistic.confirm(&token);
        self.queue_local(PendingMutation::update(id, patch)).await?;
        Ok(self.records.get(id).cloned())
    }

    /// Write an optimistic change to the cache, reverting it in memory if the
    /// write fails
    async fn persist_optimistic(&mut self, token: &uuid::Uuid) -> Result<(), CacheError> {
        if let Err(e) = self.cache.write(self.records.as_slice()).await {
            if let Some(id) = self.optimistic.rollback(token, &mut self.records) {
                tracing::warn!("[Sync] Cache write failed, reverted change to {}: {}", id, e);
            }
            return Err(e);
        }
        Ok(())
    }

    async fn rollback(&mut self, token: &uuid::Uuid, error: &StoreError) -> Result<(), CacheError> {
        if let Some(id) = self.optimistic.rollback(token, &mut self.records) {
            self.cache.write(self.records.as_slice()).await?;
            self.notify(Notification::RolledBack {
                id,
                message: error.to_string(),
            });
        }
        Ok(())
    }

    async fn queue_local(&mut self, mutation: PendingMutation) -> Result<(), CacheError> {
        let id = mutation.record_id().to_string();
        self.outbox.push(mutation);
        self.pending_changes += 1;
        self.cache.write_outbox(&self.outbox.to_vec()).await?;
        tracing::debug!(
            "[Sync] Queued change to {} ({} pending, {} queued)",
            id,
            self.pending_changes,
            self.outbox.len()
        );
        self.notify(Notification::SavedLocally { id });
        Ok(())
    }

    /// Bring the outbox to the store; `false` when the store went away mid-way
    async fn reconcile(&mut self) -> Result<bool, SyncError> {
        if self.outbox.is_empty() {
            return Ok(true);
        }

        match self.options.reconcile {
            ReconcileStrategy::ReloadOnly => {
                let count = self.outbox.len();
                tracing::warn!("[Sync] Discarding {} queued mutation(s) before reload", count);
                self.outbox.clear();
                self.cache.write_outbox(&[]).await?;
                self.notify(Notification::OutboxDiscarded { count });
                Ok(true)
            }
            ReconcileStrategy::ReplayOutbox => {
                let timeout = self.timeout();
                let report = ReconciliationManager::new(self.store.as_ref(), &self.cache, timeout)
                    .replay(&mut self.outbox)
                    .await?;

                for dropped in report.rejected() {
                    self.notify(Notification::SyncFailed {
                        message: format!(
                            "queued {} for {} was rejected: {}",
                            dropped.mutation.operation.name(),
                            dropped.mutation.record_id(),
                            dropped.reason
                        ),
                    });
                }
                self.notify(Notification::OutboxReplayed {
                    applied: report.applied,
                    dropped: report.dropped.len(),
                    remaining: report.remaining,
                });

                match report.interrupted {
                    Some(e) => {
                        self.set_disconnected(e.to_string());
                        Ok(false)
                    }
                    None => Ok(true),
                }
            }
        }
    }

    async fn load_from_cache(&mut self) {
        match self.cache.read().await {
            Ok(records) => {
                tracing::debug!("[Sync] Loaded {} record(s) from cache", records.len());
                self.records.replace_all(records);
            }
            Err(e) => {
                tracing::warn!("[Sync] Cache unreadable, starting empty: {}", e);
                self.notify(Notification::CacheCorrupt { message: e.to_string() });
                self.records.replace_all(Vec::new());
            }
        }
    }

    async fn apply_remote(&mut self, event: &RecordEvent) -> Result<(), CacheError> {
        if !apply_event(&mut self.records, event) {
            tracing::trace!("[Sync] Remote {} for {} already applied", event.event_type().as_str(), event.record_id());
            return Ok(());
        }
        self.cache.write(self.records.as_slice()).await?;
        tracing::debug!("[Sync] Applied remote {} for {}", event.event_type().as_str(), event.record_id());
        self.notify(Notification::RemoteChange {
            event_type: event.event_type(),
            id: event.record_id().to_string(),
        });
        Ok(())
    }

    async fn open_subscription(&mut self) {
        if self.is_subscribed() {
            return;
        }
        match bounded(self.timeout(), self.store.subscribe()).await {
            Ok(subscription) => {
                tracing::info!("[Sync] Change feed open");
                self.subscription = Some(subscription);
            }
            Err(e) => {
                tracing::warn!("[Sync] Could not open change feed: {}", e);
                if e.is_connectivity() {
                    self.set_disconnected(e.to_string());
                }
            }
        }
    }

    fn close_subscription(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    fn set_connected(&mut self) {
        if self.connection == ConnectionState::Connected {
            return;
        }
        tracing::info!("[Sync] {} -> connected", self.connection);
        self.connection = ConnectionState::Connected;
        self.notify(Notification::Connected);
    }

    fn set_disconnected(&mut self, reason: String) {
        if self.connection == ConnectionState::Disconnected {
            return;
        }
        tracing::info!("[Sync] {} -> disconnected: {}", self.connection, reason);
        self.connection = ConnectionState::Disconnected;
        self.close_subscription();
        self.notify(Notification::Disconnected { reason });
    }

    fn notify(&self, notification: Notification) {
        if notification.is_error() {
            tracing::debug!("[Sync] Notify (error): {}", notification);
        }
        let _ = self.notifications.send(notification);
    }
}
