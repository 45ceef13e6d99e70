/**
 * Record Change Feed
 *
 * Server-Sent Events handler for `GET /api/records/subscribe`. Every record
 * change is sent as one SSE frame named after the change kind, with the
 * JSON `RecordEvent` as data:
 *
 * ```text
 * event: insert
 * data: {"type":"insert","record":{...}}
 *
 * event: delete
 * data: {"type":"delete","id":"..."}
 * ```
 *
 * Keep-alive comments hold idle connections open. A lagging subscriber
 * skips the events it missed and keeps its connection.
 */

use crate::backend::realtime::broadcast::RecordEventBroadcast;
use crate::shared::RecordEvent;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_stream::Stream;

/// Handle a change feed subscription (GET /api/records/subscribe)
pub async fn handle_record_subscription(
    State(broadcast_tx): State<RecordEventBroadcast>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    // Subscribe before the response is returned so no write that follows
    // the response head is missed.
    let broadcast_rx = broadcast_tx.subscribe();
    tracing::info!(
        "[Realtime] Subscription active ({} subscribers)",
        broadcast_tx.receiver_count()
    );

    Sse::new(event_stream(broadcast_rx)).keep_alive(KeepAlive::default())
}

fn event_stream(
    broadcast_rx: broadcast::Receiver<RecordEvent>,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    stream::unfold(broadcast_rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => match to_sse_event(&event) {
                    Ok(sse_event) => return Some((Ok(sse_event), rx)),
                    Err(e) => {
                        tracing::error!("[Realtime] Failed to serialize event: {:?}", e);
                        continue;
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("[Realtime] Receiver lagged, skipped {} events", skipped);
                    continue;
                }
                Err(RecvError::Closed) => {
                    tracing::warn!("[Realtime] Broadcast channel closed, ending stream");
                    return None;
                }
            }
        }
    })
}

fn to_sse_event(event: &RecordEvent) -> Result<Event, serde_json::Error> {
    let data = serde_json::to_string(event)?;
    Ok(Event::default().event(event.event_type().as_str()).data(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::realtime::broadcast::{broadcast_event, record_event_channel};
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_stream_yields_broadcast_events() {
        let tx = record_event_channel();
        let stream = event_stream(tx.subscribe());
        tokio::pin!(stream);

        broadcast_event(&tx, RecordEvent::Delete { id: "gone".to_string() });

        let item = stream.next().await.unwrap();
        assert!(item.is_ok());
    }

    #[tokio::test]
    async fn test_stream_ends_when_channel_closes() {
        let tx = record_event_channel();
        let stream = event_stream(tx.subscribe());
        drop(tx);
        tokio::pin!(stream);

        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_lagged_receiver_keeps_streaming() {
        let (tx, rx) = broadcast::channel::<RecordEvent>(1);
        tx.send(RecordEvent::Delete { id: "a".to_string() }).unwrap();
        tx.send(RecordEvent::Delete { id: "b".to_string() }).unwrap();

        let stream = event_stream(rx);
        tokio::pin!(stream);
        assert!(stream.next().await.unwrap().is_ok());
    }
}
