//! Common test utilities
//!
//! Controller fixtures over the in-process record store, notification
//! helpers and record builders shared by the integration tests.

#![allow(dead_code)]

use logitrack::client::{LocalCache, MemoryRecordStore, Notification, SyncController, SyncOptions};
use logitrack::shared::{Carrier, LogisticsRecord, ReconcileStrategy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Upper bound for waiting on change feed events
pub const EVENT_WAIT: Duration = Duration::from_secs(2);

pub fn options(reconcile: ReconcileStrategy) -> SyncOptions {
    SyncOptions {
        request_timeout: Duration::from_millis(500),
        reconcile,
        ..SyncOptions::default()
    }
}

pub fn controller(store: &MemoryRecordStore, cache: LocalCache) -> SyncController {
    SyncController::new(Arc::new(store.clone()), cache, options(ReconcileStrategy::ReplayOutbox))
}

/// Initialized controller against a reachable store
pub async fn online_controller(store: &MemoryRecordStore) -> SyncController {
    let mut controller = controller(store, LocalCache::memory());
    controller.init().await.expect("init");
    controller
}

/// Initialized controller against a store that is currently unreachable
pub async fn offline_controller(store: &MemoryRecordStore, cache: LocalCache) -> SyncController {
    store.set_reachable(false);
    let mut controller = controller(store, cache);
    controller.init().await.expect("init");
    controller
}

pub fn record(tracking_number: &str, carrier: Carrier) -> LogisticsRecord {
    LogisticsRecord::new(tracking_number, carrier)
}

/// Everything already sent on the notification channel
pub fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut seen = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(note) => seen.push(note),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return seen,
        }
    }
}

pub fn tracking_numbers(records: &[LogisticsRecord]) -> Vec<&str> {
    records.iter().map(|r| r.tracking_number.as_str()).collect()
}
