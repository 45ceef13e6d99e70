//! # Outbox
//!
//! Ordered list of local mutations the record store has not confirmed yet.
//! Entries are appended whenever a change is applied locally without reaching
//! the store, persisted through the local cache after every change, and
//! replayed in order when connectivity returns.
//!
//! ## Compaction
//!
//! Mutations against a record whose `Create` is still queued are folded into
//! that `Create`: an update patches the queued record, a delete removes every
//! queued entry for the record. The store never sees a record that was created
//! and deleted while offline.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use logitrack::client::offline::queue::{Outbox, PendingMutation};
//!
//! let mut outbox = Outbox::new();
//! outbox.push(PendingMutation::delete("record-id"));
//! assert_eq!(outbox.len(), 1);
//! ```

use crate::shared::{LogisticsRecord, RecordPatch};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Queued mutation with metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PendingMutation {
    /// Mutation id
    pub id: Uuid,
    /// When the mutation was queued
    pub queued_at: DateTime<Utc>,
    pub operation: Operation,
}

/// Mutations that can be queued
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Create a record that so far only exists locally
    Create { record: LogisticsRecord },
    /// Apply a partial update
    Update { id: String, patch: RecordPatch },
    /// Remove a record
    Delete { id: String },
}

impl Operation {
    /// Id of the record the operation targets
    pub fn record_id(&self) -> &str {
        match self {
            Operation::Create { record } => &record.id,
            Operation::Update { id, .. } | Operation::Delete { id } => id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Create { .. } => "create",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
        }
    }
}

impl PendingMutation {
    pub fn new(operation: Operation) -> Self {
        Self {
            id: Uuid::new_v4(),
            queued_at: Utc::now(),
            operation,
        }
    }

    pub fn create(record: LogisticsRecord) -> Self {
        Self::new(Operation::Create { record })
    }

    pub fn update(id: impl Into<String>, patch: RecordPatch) -> Self {
        Self::new(Operation::Update {
            id: id.into(),
            patch,
        })
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::new(Operation::Delete { id: id.into() })
    }

    pub fn record_id(&self) -> &str {
        self.operation.record_id()
    }
}

/// Ordered queue of pending mutations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbox {
    entries: VecDeque<PendingMutation>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted entries, keeping their order
    pub fn from_entries(entries: Vec<PendingMutation>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// Queue a mutation, compacting against a queued `Create` for the same record
    pub fn push(&mut self, mutation: PendingMutation) {
        let record_id = mutation.record_id().to_string();
        let queued_create = self.entries.iter().position(
            |m| matches!(&m.operation, Operation::Create { record } if record.id == record_id),
        );

        match (mutation.operation, queued_create) {
            (Operation::Delete { .. }, Some(_)) => {
                self.entries.retain(|m| m.record_id() != record_id);
                tracing::debug!("[Outbox] Dropped offline-only record {}", record_id);
            }
            (Operation::Update { patch, .. }, Some(index)) => {
                if let Operation::Create { record } = &mut self.entries[index].operation {
                    record.apply_patch(&patch, mutation.queued_at);
                }
                tracing::debug!("[Outbox] Folded update into queued create for {}", record_id);
            }
            (operation, _) => {
                self.entries.push_back(PendingMutation {
                    id: mutation.id,
                    queued_at: mutation.queued_at,
                    operation,
                });
            }
        }
    }

    pub fn front(&self) -> Option<&PendingMutation> {
        self.entries.front()
    }

    pub fn pop_front(&mut self) -> Option<PendingMutation> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingMutation> {
        self.entries.iter()
    }

    /// Entries in queue order, for persistence
    pub fn to_vec(&self) -> Vec<PendingMutation> {
        self.entries.iter().cloned().collect()
    }

    /// Whether any queued mutation targets `record_id`
    pub fn touches(&self, record_id: &str) -> bool {
        self.entries.iter().any(|m| m.record_id() == record_id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{Carrier, TrackingStatus};

    fn record(id: &str) -> LogisticsRecord {
        LogisticsRecord::with_id(id, format!("TRK-{}", id), Carrier::Usps, Utc::now())
    }

    #[test]
    fn test_push_keeps_order() {
        let mut outbox = Outbox::new();
        outbox.push(PendingMutation::delete("a"));
        outbox.push(PendingMutation::update("b", RecordPatch::favorite(true, Utc::now())));
        outbox.push(PendingMutation::create(record("c")));

        let kinds: Vec<_> = outbox.iter().map(|m| m.operation.name()).collect();
        assert_eq!(kinds, vec!["delete", "update", "create"]);
        assert_eq!(outbox.pop_front().unwrap().record_id(), "a");
        assert_eq!(outbox.len(), 2);
    }

    #[test]
    fn test_update_folds_into_queued_create() {
        let mut outbox = Outbox::new();
        outbox.push(PendingMutation::create(record("a")));
        outbox.push(PendingMutation::update("a", RecordPatch::status(TrackingStatus::InTransit, Utc::now())));

        assert_eq!(outbox.len(), 1);
        match &outbox.front().unwrap().operation {
            Operation::Create { record } => assert_eq!(record.status, TrackingStatus::InTransit),
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_delete_cancels_queued_create() {
        let mut outbox = Outbox::new();
        outbox.push(PendingMutation::create(record("a")));
        outbox.push(PendingMutation::create(record("b")));
        outbox.push(PendingMutation::delete("a"));

        assert_eq!(outbox.len(), 1);
        assert!(!outbox.touches("a"));
        assert!(outbox.touches("b"));
    }

    #[test]
    fn test_delete_without_create_is_queued() {
        let mut outbox = Outbox::new();
        outbox.push(PendingMutation::update("a", RecordPatch::favorite(true, Utc::now())));
        outbox.push(PendingMutation::delete("a"));
        assert_eq!(outbox.len(), 2);
    }

    #[test]
    fn test_serialized_shape() {
        let mutation = PendingMutation::delete("a");
        let json = serde_json::to_value(&mutation).unwrap();
        assert_eq!(json["operation"], serde_json::json!({"kind": "delete", "id": "a"}));
        assert!(json.get("queuedAt").is_some());
    }
}
