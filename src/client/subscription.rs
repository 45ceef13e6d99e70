//! Remote change subscription
//!
//! A [`RecordSubscription`] is the receiving end of a store's change feed: a
//! bounded channel of [`RecordEvent`]s filled by a background task. Cancelling
//! (or dropping) the subscription aborts the task.
//!
//! [`apply_event`] folds one event into the in-memory record list:
//!
//! - `Insert` appends only when no record with that id is present
//! - `Update` replaces the matching record in place; unknown ids are ignored
//! - `Delete` removes the matching record

use crate::client::records::RecordList;
use crate::shared::RecordEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the event channel between the feed task and the controller
pub const SUBSCRIPTION_BUFFER: usize = 256;

#[derive(Debug)]
pub struct RecordSubscription {
    receiver: mpsc::Receiver<RecordEvent>,
    task: Option<JoinHandle<()>>,
}

impl RecordSubscription {
    /// Create a subscription whose feed task will push into the returned sender
    pub fn channel() -> (mpsc::Sender<RecordEvent>, mpsc::Receiver<RecordEvent>) {
        mpsc::channel(SUBSCRIPTION_BUFFER)
    }

    pub fn new(receiver: mpsc::Receiver<RecordEvent>, task: JoinHandle<()>) -> Self {
        Self {
            receiver,
            task: Some(task),
        }
    }

    /// Next event; `None` once the feed has ended or been cancelled
    pub async fn recv(&mut self) -> Option<RecordEvent> {
        if self.task.is_none() {
            return None;
        }
        self.receiver.recv().await
    }

    /// Next already-buffered event, without waiting
    pub fn try_recv(&mut self) -> Option<RecordEvent> {
        if self.task.is_none() {
            return None;
        }
        self.receiver.try_recv().ok()
    }

    /// Stop the feed task; further `recv` calls return `None`
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("[Subscription] Cancelled");
        }
        self.receiver.close();
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for RecordSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Fold one change event into the record list
///
/// Returns whether the list changed.
pub fn apply_event(records: &mut RecordList, event: &RecordEvent) -> bool {
    match event {
        RecordEvent::Insert { record } => records.append_if_absent(record.clone()),
        RecordEvent::Update { record } => {
            if records.get(&record.id) == Some(record) {
                return false;
            }
            records.replace(record.clone()).is_some()
        }
        RecordEvent::Delete { id } => records.remove(id).is_some(),
    }
}
