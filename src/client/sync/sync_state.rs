//! # Sync State
//!
//! Connection state machine and the status snapshot the UI renders.
//!
//! ```text
//! Initializing ──probe ok──▶ Connected ◀──online + probe ok── Disconnected
//!      │                        │                                 ▲
//!      └──────probe failed──────┴──offline / connectivity failure─┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Initializing,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Initializing => "initializing",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(label)
    }
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub connection: ConnectionState,
    /// Local-only mutations since the last full reload
    pub pending_changes: u64,
    /// Mutations still queued for replay
    pub outbox_len: usize,
    pub record_count: usize,
    pub last_sync: Option<DateTime<Utc>>,
    /// Whether a live change feed is open
    pub subscribed: bool,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} record(s) | {} pending change(s) | {} queued",
            self.connection, self.record_count, self.pending_changes, self.outbox_len
        )?;
        match self.last_sync {
            Some(at) => write!(f, " | last sync {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
            None => write!(f, " | never synced"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let status = SyncStatus {
            connection: ConnectionState::Disconnected,
            pending_changes: 3,
            outbox_len: 2,
            record_count: 7,
            last_sync: None,
            subscribed: false,
        };
        assert_eq!(
            status.to_string(),
            "disconnected | 7 record(s) | 3 pending change(s) | 2 queued | never synced"
        );
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = SyncStatus {
            connection: ConnectionState::Connected,
            pending_changes: 0,
            outbox_len: 0,
            record_count: 0,
            last_sync: None,
            subscribed: true,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["connection"], "connected");
        assert_eq!(json["pendingChanges"], 0);
    }
}
