//! Real-time Change Feed
//!
//! Record change events are fanned out over a broadcast channel and streamed
//! to clients as Server-Sent Events.
//!
//! - **`broadcast`** - channel type and the publish helper used by write handlers
//! - **`subscription`** - the SSE handler

/// Event broadcasting utilities
pub mod broadcast;

/// Server-Sent Events subscription handler
pub mod subscription;

pub use broadcast::{broadcast_event, record_event_channel, RecordEventBroadcast};
pub use subscription::handle_record_subscription;
