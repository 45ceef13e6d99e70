//! # Outbox Reconciliation
//!
//! Replays queued mutations against the record store when connectivity
//! returns, in the order they were queued. The outbox is persisted after every
//! step so an interrupted replay resumes where it stopped.
//!
//! ## Outcomes per entry
//!
//! | Store answer | Result |
//! |---|---|
//! | success | applied, removed |
//! | `Create` answered with conflict | already there, counted as applied |
//! | `Update`/`Delete` answered with not found | nothing to apply, dropped |
//! | any other rejection | dropped and reported |
//! | unreachable / timeout | replay stops, entry and the rest stay queued |

use crate::client::error::{CacheError, StoreError};
use crate::client::local_cache::LocalCache;
use crate::client::offline::queue::{Operation, Outbox, PendingMutation};
use crate::client::store::{bounded, RecordStore};
use crate::shared::NewRecord;
use std::time::Duration;

/// A queued mutation the store refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedMutation {
    pub mutation: PendingMutation,
    pub reason: StoreError,
}

impl DroppedMutation {
    /// "Not found" answers to updates and deletes are expected, not failures
    pub fn is_benign(&self) -> bool {
        matches!(self.reason, StoreError::NotFound(_))
    }
}

/// Result of one replay pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub applied: usize,
    pub dropped: Vec<DroppedMutation>,
    /// Entries still queued after the pass
    pub remaining: usize,
    /// Connectivity failure that stopped the pass early
    pub interrupted: Option<StoreError>,
}

impl ReplayReport {
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none() && self.remaining == 0
    }

    /// Dropped entries that were real rejections
    pub fn rejected(&self) -> impl Iterator<Item = &DroppedMutation> {
        self.dropped.iter().filter(|d| !d.is_benign())
    }
}

enum Outcome {
    Applied,
    Dropped(StoreError),
    Interrupted(StoreError),
}

/// Replays an outbox against a store
pub struct ReconciliationManager<'a> {
    store: &'a dyn RecordStore,
    cache: &'a LocalCache,
    timeout: Duration,
}

impl<'a> ReconciliationManager<'a> {
    pub fn new(store: &'a dyn RecordStore, cache: &'a LocalCache, timeout: Duration) -> Self {
        Self {
            store,
            cache,
            timeout,
        }
    }

    /// Replay `outbox` in order until it is empty or the store becomes unreachable
    pub async fn replay(&self, outbox: &mut Outbox) -> Result<ReplayReport, CacheError> {
        let mut report = ReplayReport::default();
        if outbox.is_empty() {
            return Ok(report);
        }
        tracing::info!("[Reconcile] Replaying {} queued mutation(s)", outbox.len());

        while let Some(mutation) = outbox.front().cloned() {
            match self.send(&mutation).await {
                Outcome::Applied => {
                    tracing::debug!(
                        "[Reconcile] Applied {} for {}",
                        mutation.operation.name(),
                        mutation.record_id()
                    );
                    report.applied += 1;
                }
                Outcome::Dropped(reason) => {
                    tracing::warn!(
                        "[Reconcile] Dropped {} for {}: {}",
                        mutation.operation.name(),
                        mutation.record_id(),
                        reason
                    );
                    report.dropped.push(DroppedMutation { mutation, reason });
                }
                Outcome::Interrupted(reason) => {
                    tracing::warn!("[Reconcile] Replay interrupted: {}", reason);
                    report.interrupted = Some(reason);
                    break;
                }
            }
            outbox.pop_front();
            self.cache.write_outbox(&outbox.to_vec()).await?;
        }

        report.remaining = outbox.len();
        tracing::info!(
            "[Reconcile] Replay finished: {} applied, {} dropped, {} remaining",
            report.applied,
            report.dropped.len(),
            report.remaining
        );
        Ok(report)
    }

    async fn send(&self, mutation: &PendingMutation) -> Outcome {
        let result = match &mutation.operation {
            Operation::Create { record } => {
                match bounded(self.timeout, self.store.create(NewRecord::from(record))).await {
                    Err(StoreError::Conflict(_)) => Ok(()),
                    other => other.map(|_| ()),
                }
            }
            Operation::Update { id, patch } => bounded(self.timeout, self.store.update(id, patch.clone()))
                .await
                .map(|_| ()),
            Operation::Delete { id } => bounded(self.timeout, self.store.delete(id)).await,
        };

        match result {
            Ok(()) => Outcome::Applied,
            Err(e) if e.is_connectivity() => Outcome::Interrupted(e),
            Err(e) => Outcome::Dropped(e),
        }
    }
}
