//! Record HTTP Handlers
//!
//! CRUD endpoints for logistics records. Every successful write is published
//! on the change feed after it is committed.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sqlx::SqlitePool;

use super::db;
use crate::backend::error::BackendError;
use crate::backend::realtime::broadcast_event;
use crate::backend::server::state::AppState;
use crate::shared::{LogisticsRecord, NewRecord, RecordEvent, RecordPatch, SharedError};

/// Liveness probe (GET /api/health)
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// List records, newest first (GET /api/records)
pub async fn list_records(
    State(pool): State<SqlitePool>,
) -> Result<Json<Vec<LogisticsRecord>>, BackendError> {
    let records = db::list_records(&pool).await?;
    tracing::debug!("[Store] Listing {} records", records.len());
    Ok(Json(records))
}

/// Create a record (POST /api/records)
///
/// The store assigns an id unless the payload carries one, which is the case
/// when a client replays a record it created offline.
pub async fn create_record(
    State(state): State<AppState>,
    Json(mut payload): Json<NewRecord>,
) -> Result<(StatusCode, Json<LogisticsRecord>), BackendError> {
    let tracking_number = payload.tracking_number.trim().to_string();
    if tracking_number.is_empty() {
        return Err(SharedError::validation("trackingNumber", "tracking number cannot be blank").into());
    }
    payload.tracking_number = tracking_number;

    let id = payload
        .id
        .take()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let record = payload.into_record(id, Utc::now());

    db::insert_record(&state.pool, &record).await?;
    tracing::info!("[Store] Created {} ({})", record.id, record.tracking_number);

    broadcast_event(&state.record_events, RecordEvent::Insert { record: record.clone() });
    Ok((StatusCode::CREATED, Json(record)))
}

/// Partially update a record (PATCH /api/records/{id})
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<RecordPatch>,
) -> Result<Json<LogisticsRecord>, BackendError> {
    let record = db::update_record(&state.pool, &id, &patch).await?;
    tracing::info!("[Store] Updated {}", record.id);

    broadcast_event(&state.record_events, RecordEvent::Update { record: record.clone() });
    Ok(Json(record))
}

/// Delete a record (DELETE /api/records/{id})
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, BackendError> {
    db::delete_record(&state.pool, &id).await?;
    tracing::info!("[Store] Deleted {}", id);

    broadcast_event(&state.record_events, RecordEvent::Delete { id });
    Ok(StatusCode::NO_CONTENT)
}
