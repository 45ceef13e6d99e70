/**
 * Record Event Broadcasting
 *
 * Fan-out of record change events to every live subscriber using
 * `tokio::sync::broadcast`. Write handlers publish after the database
 * commit; each SSE connection holds its own receiver.
 */

use crate::shared::RecordEvent;
use tokio::sync::broadcast;

/// Capacity of the change event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Broadcast channel for record change events
///
/// ```rust
/// use logitrack::backend::realtime::RecordEventBroadcast;
/// use logitrack::shared::RecordEvent;
///
/// let (tx, _) = tokio::sync::broadcast::channel::<RecordEvent>(16);
/// let broadcast: RecordEventBroadcast = tx;
/// ```
pub type RecordEventBroadcast = broadcast::Sender<RecordEvent>;

/// Create the change event channel
pub fn record_event_channel() -> RecordEventBroadcast {
    let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    tx
}

/// Broadcast a change event to all subscribers
///
/// # Returns
///
/// Number of subscribers that received the event (0 if none are connected)
pub fn broadcast_event(broadcast_tx: &RecordEventBroadcast, event: RecordEvent) -> usize {
    let event_type = event.event_type();
    match broadcast_tx.send(event) {
        Ok(subscriber_count) => {
            tracing::info!(
                "[Realtime] {} event broadcast to {} subscribers",
                event_type.as_str(),
                subscriber_count
            );
            subscriber_count
        }
        Err(_) => {
            tracing::debug!("[Realtime] No subscribers for {} event", event_type.as_str());
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_event_with_subscribers() {
        let tx = record_event_channel();
        let mut rx = tx.subscribe();

        let event = RecordEvent::Delete { id: "abc".to_string() };
        assert_eq!(broadcast_event(&tx, event.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_broadcast_event_no_subscribers() {
        let tx = record_event_channel();
        let count = broadcast_event(&tx, RecordEvent::Delete { id: "abc".to_string() });
        assert_eq!(count, 0);
    }

    #[test]
    fn test_broadcast_multiple_subscribers() {
        let tx = record_event_channel();
        let _sub1 = tx.subscribe();
        let _sub2 = tx.subscribe();
        let _sub3 = tx.subscribe();

        let count = broadcast_event(&tx, RecordEvent::Delete { id: "abc".to_string() });
        assert_eq!(count, 3);
    }
}
