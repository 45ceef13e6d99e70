/**
 * Record Change Events
 *
 * This module defines the change notifications pushed by the record store
 * to live subscribers. Events are tagged variants so that the subscriber can
 * apply them without inspecting payload shapes.
 *
 * # Wire Format
 *
 * Events serialize as internally tagged JSON:
 *
 * ```json
 * {"type":"insert","record":{...}}
 * {"type":"update","record":{...}}
 * {"type":"delete","id":"..."}
 * ```
 */
use crate::shared::record::LogisticsRecord;
use serde::{Deserialize, Serialize};

/// Kind of change carried by a [`RecordEvent`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Insert,
    Update,
    Delete,
}

impl EventType {
    /// Name used for the SSE `event:` field
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Insert => "insert",
            EventType::Update => "update",
            EventType::Delete => "delete",
        }
    }
}

/// Change notification for a single record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordEvent {
    /// A record was created
    Insert { record: LogisticsRecord },
    /// A record was modified; carries the full new state
    Update { record: LogisticsRecord },
    /// A record was removed
    Delete { id: String },
}

impl RecordEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            RecordEvent::Insert { .. } => EventType::Insert,
            RecordEvent::Update { .. } => EventType::Update,
            RecordEvent::Delete { .. } => EventType::Delete,
        }
    }

    /// Id of the record this event refers to
    pub fn record_id(&self) -> &str {
        match self {
            RecordEvent::Insert { record } | RecordEvent::Update { record } => &record.id,
            RecordEvent::Delete { id } => id,
        }
    }
}
