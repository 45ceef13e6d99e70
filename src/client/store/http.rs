//! HTTP record store client
//!
//! Speaks the `logitrack-store` API:
//!
//! ```text
//! GET    /api/health
//! GET    /api/records
//! POST   /api/records
//! PATCH  /api/records/{id}
//! DELETE /api/records/{id}
//! GET    /api/records/subscribe   (text/event-stream)
//! ```
//!
//! Error responses carry a JSON body `{"error": "...", "status": N}`; 404 maps
//! to `StoreError::NotFound`, 409 to `StoreError::Conflict`, anything else to
//! `StoreError::Rejected`.
//!
//! The change feed is read from the response byte stream and split into SSE
//! frames. When the stream ends or errors, the feed task reconnects with
//! exponential backoff until the subscription is cancelled.

use super::RecordStore;
use crate::client::error::StoreError;
use crate::client::subscription::RecordSubscription;
use crate::shared::{LogisticsRecord, NewRecord, RecordEvent, RecordPatch};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_millis(1000);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpRecordStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn record_url(&self, id: &str) -> String {
        self.url(&format!("/api/records/{}", urlencoding::encode(id)))
    }

    /// Turn non-success responses into store errors
    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| if text.is_empty() { status.to_string() } else { text });

        tracing::debug!("[HttpStore] Request rejected: {} {}", status, message);
        Err(match status {
            StatusCode::NOT_FOUND => StoreError::NotFound(message),
            StatusCode::CONFLICT => StoreError::Conflict(message),
            _ => StoreError::rejected(status.as_u16(), message),
        })
    }

    async fn open_feed(client: &Client, url: &str) -> Result<Response, StoreError> {
        let response = client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        Self::check(response).await
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn probe(&self) -> Result<(), StoreError> {
        let response = self.client.get(self.url("/api/health")).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<LogisticsRecord>, StoreError> {
        let response = self.client.get(self.url("/api/records")).send().await?;
        let records = Self::check(response).await?.json().await?;
        Ok(records)
    }

    async fn create(&self, record: NewRecord) -> Result<LogisticsRecord, StoreError> {
        let response = self
            .client
            .post(self.url("/api/records"))
            .json(&record)
            .send()
            .await?;
        let created = Self::check(response).await?.json().await?;
        Ok(created)
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<LogisticsRecord, StoreError> {
        let response = self
            .client
            .patch(self.record_url(id))
            .json(&patch)
            .send()
            .await?;
        let updated = Self::check(response).await?.json().await?;
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let response = self.client.delete(self.record_url(id)).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<RecordSubscription, StoreError> {
        let url = self.url("/api/records/subscribe");
        let first = Self::open_feed(&self.client, &url).await?;
        tracing::info!("[HttpStore] Change feed established: {}", url);

        let (tx, rx) = RecordSubscription::channel();
        let client = self.client.clone();
        let task = tokio::spawn(run_feed(client, url, first, tx));
        Ok(RecordSubscription::new(rx, task))
    }
}

async fn run_feed(client: Client, url: String, first: Response, tx: mpsc::Sender<RecordEvent>) {
    let mut response = Some(first);
    let mut reconnect_delay = INITIAL_RECONNECT_DELAY;

    loop {
        let current = match response.take() {
            Some(r) => r,
            None => match HttpRecordStore::open_feed(&client, &url).await {
                Ok(r) => {
                    tracing::info!("[HttpStore] Change feed re-established");
                    reconnect_delay = INITIAL_RECONNECT_DELAY;
                    r
                }
                Err(e) => {
                    tracing::warn!("[HttpStore] Change feed reconnect failed (will retry): {}", e);
                    if tx.is_closed() {
                        return;
                    }
                    tokio::time::sleep(reconnect_delay).await;
                    reconnect_delay = std::cmp::min(reconnect_delay * 2, MAX_RECONNECT_DELAY);
                    continue;
                }
            },
        };

        let mut stream = current.bytes_stream();
        let mut parser = SseParser::default();

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!("[HttpStore] Error reading change feed: {}", e);
                    break;
                }
            };
            for event in parser.push(&chunk) {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        }

        if tx.is_closed() {
            return;
        }
        tracing::warn!("[HttpStore] Change feed closed, reconnecting in {:?}", reconnect_delay);
        tokio::time::sleep(reconnect_delay).await;
        reconnect_delay = std::cmp::min(reconnect_delay * 2, MAX_RECONNECT_DELAY);
    }
}

/// Incremental server-sent events decoder
///
/// Buffers raw bytes until a full line arrives, so a multibyte character
/// split across network chunks decodes intact. Dispatches on blank lines,
/// ignores comment lines (keep-alives) and frames whose data is not a
/// `RecordEvent`.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event_name: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RecordEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = match std::str::from_utf8(&raw[..newline]) {
                Ok(line) => line.trim_end_matches('\r').to_string(),
                Err(e) => {
                    tracing::warn!("[HttpStore] Skipping non UTF-8 feed line: {}", e);
                    continue;
                }
            };

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line.as_str(), ""),
            };
            match field {
                "event" => self.event_name = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }

        events
    }

    fn dispatch(&mut self) -> Option<RecordEvent> {
        let name = self.event_name.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");

        match serde_json::from_str::<RecordEvent>(&data) {
            Ok(event) => {
                if let Some(name) = name.filter(|n| n != event.event_type().as_str()) {
                    tracing::debug!("[HttpStore] Event name '{}' disagrees with payload type", name);
                }
                Some(event)
            }
            Err(e) => {
                tracing::warn!("[HttpStore] Ignoring undecodable feed frame: {}", e);
                None
            }
        }
    }
}
