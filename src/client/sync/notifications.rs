//! User-facing notifications
//!
//! Every state transition and every failure the controller absorbs produces
//! one [`Notification`], fanned out over a `tokio::sync::broadcast` channel.

use crate::shared::EventType;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Connected,
    Disconnected { reason: String },
    /// Full set reloaded from the store
    SyncSucceeded { records: usize },
    SyncFailed { message: String },
    RecordAdded { tracking_number: String },
    RecordDeleted { id: String },
    /// Change kept locally and queued for the store
    SavedLocally { id: String },
    /// Store rejected an optimistic change; it was reverted
    RolledBack { id: String, message: String },
    RemoteChange { event_type: EventType, id: String },
    OutboxReplayed { applied: usize, dropped: usize, remaining: usize },
    /// Queued mutations thrown away by a reload-only reconnect
    OutboxDiscarded { count: usize },
    Imported { count: usize },
    ImportIgnored,
    /// Cached data was unreadable and treated as empty
    CacheCorrupt { message: String },
}

impl Notification {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notification::SyncFailed { .. }
                | Notification::RolledBack { .. }
                | Notification::CacheCorrupt { .. }
        )
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Connected => write!(f, "Connected to record store"),
            Notification::Disconnected { reason } => write!(f, "Working offline: {}", reason),
            Notification::SyncSucceeded { records } => write!(f, "Synced {} record(s)", records),
            Notification::SyncFailed { message } => write!(f, "Sync failed: {}", message),
            Notification::RecordAdded { tracking_number } => write!(f, "Added {}", tracking_number),
            Notification::RecordDeleted { id } => write!(f, "Deleted {}", id),
            Notification::SavedLocally { id } => write!(f, "Saved locally, will sync later ({})", id),
            Notification::RolledBack { id, message } => write!(f, "Change to {} reverted: {}", id, message),
            Notification::RemoteChange { event_type, id } => {
                write!(f, "Remote {} for {}", event_type.as_str(), id)
            }
            Notification::OutboxReplayed { applied, dropped, remaining } => write!(
                f,
                "Replayed offline changes: {} applied, {} dropped, {} remaining",
                applied, dropped, remaining
            ),
            Notification::OutboxDiscarded { count } => {
                write!(f, "Discarded {} offline change(s)", count)
            }
            Notification::Imported { count } => write!(f, "Imported {} record(s)", count),
            Notification::ImportIgnored => write!(f, "Share link contained no records"),
            Notification::CacheCorrupt { message } => write!(f, "Local cache unreadable: {}", message),
        }
    }
}
