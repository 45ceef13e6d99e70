//! Sync controller integration tests
//!
//! Drives `SyncController` against the in-process record store through the
//! offline, reconnect, rollback and change feed paths.

mod common;

use assert_matches::assert_matches;
use common::*;
use logitrack::client::export::{decode_snapshot, share_url};
use async_trait::async_trait;
use logitrack::client::local_cache::{CacheBackend, MemoryBackend, OUTBOX_KEY, RECORDS_KEY};
use logitrack::client::{
    CacheError, ConnectionState, LocalCache, MemoryRecordStore, Notification, RecordStore, StoreError,
    SyncController, SyncError, SyncOptions,
};
use logitrack::shared::{Carrier, EventType, RecordEvent, ReconcileStrategy};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Memory backend whose writes can be switched to fail
#[derive(Debug, Default)]
struct FlakyBackend {
    inner: MemoryBackend,
    fail_writes: AtomicBool,
}

#[async_trait]
impl CacheBackend for FlakyBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Io(std::io::Error::other("disk full")));
        }
        self.inner.put(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key).await
    }
}

#[tokio::test]
async fn test_add_puts_one_record_at_the_head() {
    let store = MemoryRecordStore::new();
    let mut controller = online_controller(&store).await;

    controller.add("FIRST1", "ups").await.unwrap();
    let added = controller.add("  SECOND2 ", "dhl").await.unwrap();

    assert_eq!(added.tracking_number, "SECOND2");
    assert_eq!(added.carrier_name, "DHL Express");
    assert_eq!(tracking_numbers(controller.records()), vec!["SECOND2", "FIRST1"]);
    assert_eq!(controller.records(), store.snapshot().await.as_slice());
}

#[tokio::test]
async fn test_duplicate_add_is_rejected() {
    let store = MemoryRecordStore::new();
    let mut controller = online_controller(&store).await;
    controller.add("DUP1", "ups").await.unwrap();
    let before = controller.records().to_vec();

    let result = controller.add("DUP1", "fedex").await;

    assert_matches!(result, Err(SyncError::Validation(_)));
    assert_eq!(controller.records(), before.as_slice());
}

#[tokio::test]
async fn test_offline_add_is_local_and_queued() {
    let store = MemoryRecordStore::new();
    let cache = LocalCache::memory();
    let mut controller = offline_controller(&store, cache.clone()).await;
    assert_eq!(controller.connection(), ConnectionState::Disconnected);
    let calls = store.call_count();

    let record = controller.add("1Z999AA10123456784", "ups").await.unwrap();

    assert_eq!(store.call_count(), calls);
    assert_eq!(controller.pending_changes(), 1);
    assert_eq!(controller.records(), &[record.clone()]);
    assert_eq!(record.carrier_name, "UPS");
    assert_eq!(cache.read().await.unwrap(), vec![record.clone()]);
    assert_eq!(cache.read_outbox().await.unwrap().len(), 1);
}

async fn reconnect_with_three_pending(strategy: ReconcileStrategy) -> (MemoryRecordStore, SyncController, Vec<Notification>) {
    let remote = record("REMOTE1", Carrier::Dhl);
    let store = MemoryRecordStore::with_records(vec![remote]);
    store.set_reachable(false);

    let mut controller = SyncController::new(Arc::new(store.clone()), LocalCache::memory(), options(strategy));
    controller.init().await.unwrap();
    for tracking_number in ["OFF1", "OFF2", "OFF3"] {
        controller.add(tracking_number, "ups").await.unwrap();
    }
    assert_eq!(controller.pending_changes(), 3);

    let mut rx = controller.subscribe_notifications();
    store.set_reachable(true);
    controller.set_online(true).await.unwrap();
    controller.load().await.unwrap();

    let notes = drain(&mut rx);
    (store, controller, notes)
}

#[tokio::test]
async fn test_reconnect_replays_outbox_before_reload() {
    let (store, controller, notes) = reconnect_with_three_pending(ReconcileStrategy::ReplayOutbox).await;

    assert_eq!(controller.connection(), ConnectionState::Connected);
    assert_eq!(controller.pending_changes(), 0);
    assert!(controller.outbox().is_empty());

    let stored = store.snapshot().await;
    assert_eq!(controller.records(), stored.as_slice());
    assert_eq!(tracking_numbers(&stored), vec!["OFF3", "OFF2", "OFF1", "REMOTE1"]);
    assert!(notes.contains(&Notification::OutboxReplayed {
        applied: 3,
        dropped: 0,
        remaining: 0
    }));
    assert!(controller.is_subscribed());
}

#[tokio::test]
async fn test_reconnect_reload_only_discards_local_changes() {
    let (store, controller, notes) = reconnect_with_three_pending(ReconcileStrategy::ReloadOnly).await;

    assert_eq!(controller.pending_changes(), 0);
    assert!(controller.outbox().is_empty());
    assert_eq!(tracking_numbers(controller.records()), vec!["REMOTE1"]);
    assert_eq!(store.snapshot().await.len(), 1);
    assert!(notes.contains(&Notification::OutboxDiscarded { count: 3 }));
}

#[tokio::test]
async fn test_toggle_unknown_id_is_a_no_op() {
    let store = MemoryRecordStore::new();
    let mut controller = online_controller(&store).await;
    let calls = store.call_count();

    assert_eq!(controller.toggle_favorite("no-such-id").await.unwrap(), None);
    assert_eq!(controller.delete("no-such-id").await.unwrap(), false);
    assert_eq!(store.call_count(), calls);
}

#[tokio::test]
async fn test_empty_export_decodes_to_empty_array() {
    let store = MemoryRecordStore::new();
    let controller = online_controller(&store).await;

    let token = controller.export_snapshot().unwrap();
    assert_eq!(decode_snapshot(&token), Some(Vec::new()));
}

#[tokio::test]
async fn test_rejected_toggle_rolls_back() {
    let store = MemoryRecordStore::new();
    let mut controller = online_controller(&store).await;
    let added = controller.add("ROLL1", "fedex").await.unwrap();
    let mut rx = controller.subscribe_notifications();

    store.set_rejection(Some(StoreError::rejected(422, "record locked"))).await;
    let result = controller.toggle_favorite(&added.id).await;

    assert_matches!(result, Err(SyncError::Store(StoreError::Rejected { status: 422, .. })));
    assert!(!controller.record(&added.id).unwrap().is_favorite);
    assert_eq!(controller.pending_changes(), 0);
    assert_eq!(controller.connection(), ConnectionState::Connected);
    assert!(drain(&mut rx)
        .iter()
        .any(|n| matches!(n, Notification::RolledBack { id, .. } if *id == added.id)));
}

#[tokio::test]
async fn test_rejected_delete_restores_position() {
    let store = MemoryRecordStore::new();
    let mut controller = online_controller(&store).await;
    for tracking_number in ["A1", "B2", "C3"] {
        controller.add(tracking_number, "ups").await.unwrap();
    }
    let middle = controller.records()[1].clone();

    store.set_rejection(Some(StoreError::rejected(403, "read only"))).await;
    assert!(controller.delete(&middle.id).await.is_err());

    assert_eq!(tracking_numbers(controller.records()), vec!["C3", "B2", "A1"]);
    assert_eq!(controller.records()[1], middle);
}

#[tokio::test]
async fn test_delete_of_record_missing_remotely_succeeds() {
    let store = MemoryRecordStore::new();
    let mut controller = online_controller(&store).await;
    let added = controller.add("GONE1", "tnt").await.unwrap();
    RecordStore::delete(&store, &added.id).await.unwrap();
    let mut rx = controller.subscribe_notifications();

    assert!(controller.delete(&added.id).await.unwrap());

    assert!(controller.records().is_empty());
    let notes = drain(&mut rx);
    assert!(notes.contains(&Notification::RecordDeleted { id: added.id.clone() }));
    assert!(!notes.iter().any(|n| matches!(n, Notification::RolledBack { .. })));
}

#[tokio::test]
async fn test_connectivity_failure_keeps_change() {
    let store = MemoryRecordStore::new();
    let mut controller = online_controller(&store).await;
    let added = controller.add("KEEP1", "ems").await.unwrap();

    store.set_reachable(false);
    let updated = controller.mark_delivered(&added.id, true).await.unwrap().unwrap();

    assert!(updated.is_delivered);
    assert_eq!(controller.connection(), ConnectionState::Disconnected);
    assert_eq!(controller.pending_changes(), 1);
    assert!(controller.outbox().touches(&added.id));
    assert!(!controller.is_subscribed());
}

#[tokio::test]
async fn test_outbox_survives_restart() {
    let store = MemoryRecordStore::new();
    let cache = LocalCache::memory();

    let mut first = offline_controller(&store, cache.clone()).await;
    let added = first.add("PERSIST1", "sf").await.unwrap();
    first.toggle_favorite(&added.id).await.unwrap();
    first.dispose().await.unwrap();
    drop(first);

    store.set_reachable(true);
    let mut second = controller(&store, cache.clone());
    second.init().await.unwrap();

    assert_eq!(second.connection(), ConnectionState::Connected);
    assert_eq!(second.pending_changes(), 0);
    let stored = store.snapshot().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, added.id);
    assert!(stored[0].is_favorite);
    assert_eq!(second.records(), stored.as_slice());
    assert!(cache.read_outbox().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_then_delete_offline_never_reaches_store() {
    let store = MemoryRecordStore::new();
    let mut controller = offline_controller(&store, LocalCache::memory()).await;
    let added = controller.add("FLEETING1", "usps").await.unwrap();
    controller.delete(&added.id).await.unwrap();
    assert!(controller.outbox().is_empty());

    store.set_reachable(true);
    controller.set_online(true).await.unwrap();

    assert!(store.snapshot().await.is_empty());
    assert!(controller.records().is_empty());
}

#[tokio::test]
async fn test_duplicate_insert_events_keep_one_record() {
    let store = MemoryRecordStore::new();
    let mut controller = online_controller(&store).await;
    let added = controller.add("ECHO1", "ups").await.unwrap();

    let echoed = tokio::time::timeout(EVENT_WAIT, controller.next_remote_event())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(echoed, Some(RecordEvent::Insert { record: added.clone() }));

    store.inject_event(RecordEvent::Insert { record: added.clone() });
    tokio::time::timeout(EVENT_WAIT, controller.next_remote_event())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(controller.records().len(), 1);
    assert_eq!(controller.records()[0].id, added.id);
}

#[tokio::test]
async fn test_changes_from_another_client_arrive() {
    let store = MemoryRecordStore::new();
    let mut watcher = online_controller(&store).await;
    let mut writer = online_controller(&store).await;
    let mut rx = watcher.subscribe_notifications();

    let added = writer.add("OTHER1", "aramex").await.unwrap();
    tokio::time::timeout(EVENT_WAIT, watcher.next_remote_event()).await.unwrap().unwrap();
    assert_eq!(watcher.record(&added.id), Some(&added));

    writer.toggle_favorite(&added.id).await.unwrap();
    tokio::time::timeout(EVENT_WAIT, watcher.next_remote_event()).await.unwrap().unwrap();
    assert!(watcher.record(&added.id).unwrap().is_favorite);

    writer.delete(&added.id).await.unwrap();
    tokio::time::timeout(EVENT_WAIT, watcher.next_remote_event()).await.unwrap().unwrap();
    assert!(watcher.records().is_empty());

    let remote: Vec<EventType> = drain(&mut rx)
        .into_iter()
        .filter_map(|n| match n {
            Notification::RemoteChange { event_type, .. } => Some(event_type),
            _ => None,
        })
        .collect();
    assert_eq!(remote, vec![EventType::Insert, EventType::Update, EventType::Delete]);
}

#[tokio::test]
async fn test_legacy_cache_is_migrated() {
    let backend = Arc::new(MemoryBackend::new());
    let legacy = vec![record("LEGACY1", Carrier::Usps), record("LEGACY2", Carrier::Ups)];
    backend
        .put(RECORDS_KEY, &serde_json::to_string(&legacy).unwrap())
        .await
        .unwrap();

    let store = MemoryRecordStore::new();
    let controller = offline_controller(&store, LocalCache::new(backend.clone())).await;

    assert_eq!(controller.records(), legacy.as_slice());
}

#[tokio::test]
async fn test_corrupt_cache_starts_empty() {
    let backend = Arc::new(MemoryBackend::new());
    backend.put(RECORDS_KEY, "{ not json").await.unwrap();
    backend.put(OUTBOX_KEY, "[1, 2").await.unwrap();

    let store = MemoryRecordStore::unreachable();
    let mut controller = SyncController::new(
        Arc::new(store.clone()),
        LocalCache::new(backend.clone()),
        options(ReconcileStrategy::ReplayOutbox),
    );
    let mut rx = controller.subscribe_notifications();
    controller.init().await.unwrap();

    assert!(controller.records().is_empty());
    assert!(controller.outbox().is_empty());
    let corrupt = drain(&mut rx)
        .into_iter()
        .filter(|n| matches!(n, Notification::CacheCorrupt { .. }))
        .count();
    assert_eq!(corrupt, 2);
}

#[tokio::test]
async fn test_import_from_share_url_keeps_order() {
    let source_store = MemoryRecordStore::new();
    let mut source = online_controller(&source_store).await;
    source.add("EXP1", "ups").await.unwrap();
    source.add("EXP2", "dhl").await.unwrap();
    let url = share_url("https://track.example.com/share", &source.export_snapshot().unwrap());

    let target_store = MemoryRecordStore::new();
    let mut target = offline_controller(&target_store, LocalCache::memory()).await;
    let mut rx = target.subscribe_notifications();

    assert_eq!(target.import_snapshot(&url).await.unwrap(), 2);
    assert_eq!(tracking_numbers(target.records()), vec!["EXP2", "EXP1"]);
    assert_eq!(target.pending_changes(), 2);

    assert_eq!(target.import_snapshot(&url).await.unwrap(), 0);
    let notes = drain(&mut rx);
    assert!(notes.contains(&Notification::Imported { count: 2 }));
    assert!(notes.contains(&Notification::Imported { count: 0 }));
}

#[tokio::test]
async fn test_malformed_import_is_ignored() {
    let store = MemoryRecordStore::new();
    let mut controller = online_controller(&store).await;
    let mut rx = controller.subscribe_notifications();

    assert_eq!(controller.import_snapshot("%%% not a token %%%").await.unwrap(), 0);
    assert_eq!(controller.import_snapshot("").await.unwrap(), 0);

    assert!(controller.records().is_empty());
    assert_eq!(drain(&mut rx), vec![Notification::ImportIgnored, Notification::ImportIgnored]);
}

#[tokio::test]
async fn test_start_offline_never_contacts_store() {
    let backend = Arc::new(MemoryBackend::new());
    let earlier = MemoryRecordStore::unreachable();
    let mut first = controller(&earlier, LocalCache::new(backend.clone()));
    first.init().await.unwrap();
    let queued = first.add("QUEUED1", "ups").await.unwrap();
    first.dispose().await.unwrap();

    let store = MemoryRecordStore::new();
    let options = SyncOptions {
        start_offline: true,
        ..options(ReconcileStrategy::ReplayOutbox)
    };
    let mut controller = SyncController::new(Arc::new(store.clone()), LocalCache::new(backend), options);
    controller.init().await.unwrap();

    assert_eq!(store.call_count(), 0);
    assert_eq!(controller.connection(), ConnectionState::Disconnected);
    assert!(!controller.is_subscribed());
    assert_eq!(controller.pending_changes(), 1);
    assert_eq!(controller.records(), &[queued.clone()]);

    controller.set_online(true).await.unwrap();
    assert_eq!(controller.connection(), ConnectionState::Connected);
    assert!(controller.outbox().is_empty());
    assert_eq!(tracking_numbers(&store.list().await.unwrap()), vec!["QUEUED1"]);
}

#[tokio::test]
async fn test_failed_cache_write_reverts_optimistic_change() {
    let backend = Arc::new(FlakyBackend::default());
    let store = MemoryRecordStore::new();
    let mut controller = controller(&store, LocalCache::new(backend.clone()));
    controller.init().await.unwrap();
    let first = controller.add("KEEP1", "ups").await.unwrap();
    let second = controller.add("KEEP2", "dhl").await.unwrap();
    let calls = store.call_count();

    backend.fail_writes.store(true, Ordering::SeqCst);

    assert_matches!(controller.toggle_favorite(&first.id).await, Err(SyncError::Cache(_)));
    assert!(!controller.record(&first.id).unwrap().is_favorite);
    assert_matches!(controller.delete(&second.id).await, Err(SyncError::Cache(_)));
    assert_eq!(tracking_numbers(controller.records()), vec!["KEEP2", "KEEP1"]);
    assert_eq!(store.call_count(), calls);

    controller.set_online(false).await.unwrap();
    assert_matches!(controller.add("LOST1", "fedex").await, Err(SyncError::Cache(_)));
    assert_eq!(tracking_numbers(controller.records()), vec!["KEEP2", "KEEP1"]);

    assert_eq!(controller.optimistic_in_flight(), 0);
    assert_eq!(controller.pending_changes(), 0);
    assert!(controller.outbox().is_empty());
}
