//! # Optimistic Updates
//!
//! Local changes are applied to the record list before the store has
//! answered. Each applied change leaves an [`OptimisticUpdate`] holding what
//! is needed to undo it; the controller confirms it when the store accepts
//! the write and rolls it back only when the store positively rejects it.
//!
//! ```rust,no_run
//! use logitrack::client::offline::optimistic::{OptimisticManager, Undo};
//! use logitrack::client::records::RecordList;
//!
//! let mut records = RecordList::new();
//! let mut manager = OptimisticManager::new();
//! let token = manager.apply(Undo::Added { id: "r1".into() });
//! // store rejected the write
//! manager.rollback(&token, &mut records);
//! ```

use crate::client::records::RecordList;
use crate::shared::LogisticsRecord;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// How to revert one optimistic change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Undo {
    /// A record was added locally; undo removes it
    Added { id: String },
    /// A record was modified; undo restores the prior state in place
    Modified { previous: LogisticsRecord },
    /// A record was removed; undo reinserts it at its former position
    Removed { index: usize, record: LogisticsRecord },
}

impl Undo {
    pub fn record_id(&self) -> &str {
        match self {
            Undo::Added { id } => id,
            Undo::Modified { previous } => &previous.id,
            Undo::Removed { record, .. } => &record.id,
        }
    }

    fn revert(self, records: &mut RecordList) {
        match self {
            Undo::Added { id } => {
                records.remove(&id);
            }
            Undo::Modified { previous } => {
                records.replace(previous);
            }
            Undo::Removed { index, record } => {
                if !records.contains_id(&record.id) {
                    records.insert_at(index, record);
                }
            }
        }
    }
}

/// Optimistic change awaiting the store's answer
#[derive(Debug, Clone)]
pub struct OptimisticUpdate {
    pub id: Uuid,
    pub applied_at: DateTime<Utc>,
    pub undo: Undo,
}

/// Tracks in-flight optimistic changes
#[derive(Debug, Default)]
pub struct OptimisticManager {
    updates: HashMap<Uuid, OptimisticUpdate>,
}

impl OptimisticManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an applied change, returning its token
    pub fn apply(&mut self, undo: Undo) -> Uuid {
        let id = Uuid::new_v4();
        self.updates.insert(
            id,
            OptimisticUpdate {
                id,
                applied_at: Utc::now(),
                undo,
            },
        );
        id
    }

    /// The store accepted the change, or it was kept for later replay
    pub fn confirm(&mut self, token: &Uuid) {
        self.updates.remove(token);
    }

    /// The store rejected the change; revert it in `records`
    ///
    /// Returns the id of the reverted record, or `None` for an unknown token.
    pub fn rollback(&mut self, token: &Uuid, records: &mut RecordList) -> Option<String> {
        let update = self.updates.remove(token)?;
        let id = update.undo.record_id().to_string();
        update.undo.revert(records);
        tracing::info!("[Optimistic] Rolled back change to record {}", id);
        Some(id)
    }

    pub fn count_pending(&self) -> usize {
        self.updates.len()
    }

    pub fn has_update(&self, token: &Uuid) -> bool {
        self.updates.contains_key(token)
    }
}
