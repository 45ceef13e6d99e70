/**
 * Database Operations for Logistics Records
 *
 * SQLite persistence for the record store. Rows keep an autoincrement
 * `seq` so listings come back newest first even when timestamps tie.
 * Carrier and status are stored as their wire codes, scan events as a JSON
 * array.
 */

use crate::backend::error::BackendError;
use crate::shared::{Carrier, LogisticsRecord, RecordPatch, TrackingEvent, TrackingStatus};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

const SCHEMA: &str = include_str!("schema.sql");

const SELECT_COLUMNS: &str = "SELECT id, tracking_number, carrier, carrier_name, status, is_favorite, \
     is_delivered, last_update, created_at, updated_at, events FROM records";

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: String,
    tracking_number: String,
    carrier: String,
    carrier_name: String,
    status: String,
    is_favorite: bool,
    is_delivered: bool,
    last_update: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Option<String>,
}

impl TryFrom<RecordRow> for LogisticsRecord {
    type Error = BackendError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let carrier: Carrier = row
            .carrier
            .parse()
            .map_err(|e| BackendError::state(format!("record {}: {}", row.id, e)))?;
        let status: TrackingStatus = row
            .status
            .parse()
            .map_err(|e| BackendError::state(format!("record {}: {}", row.id, e)))?;
        let events = match row.events {
            Some(json) => Some(serde_json::from_str::<Vec<TrackingEvent>>(&json)?),
            None => None,
        };

        Ok(LogisticsRecord {
            id: row.id,
            tracking_number: row.tracking_number,
            carrier,
            carrier_name: row.carrier_name,
            status,
            is_favorite: row.is_favorite,
            is_delivered: row.is_delivered,
            last_update: row.last_update,
            created_at: row.created_at,
            updated_at: row.updated_at,
            events,
        })
    }
}

fn events_json(record: &LogisticsRecord) -> Result<Option<String>, BackendError> {
    Ok(match &record.events {
        Some(events) => Some(serde_json::to_string(events)?),
        None => None,
    })
}

/// Apply the record schema; safe to run on every start
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

pub async fn count_records(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM records")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Load all records, newest first
pub async fn list_records(pool: &SqlitePool) -> Result<Vec<LogisticsRecord>, BackendError> {
    let rows = sqlx::query_as::<_, RecordRow>(&format!("{} ORDER BY seq DESC", SELECT_COLUMNS))
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(LogisticsRecord::try_from).collect()
}

async fn fetch_record(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<LogisticsRecord>, BackendError> {
    let row = sqlx::query_as::<_, RecordRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(LogisticsRecord::try_from).transpose()
}

pub async fn get_record(pool: &SqlitePool, id: &str) -> Result<Option<LogisticsRecord>, BackendError> {
    let mut conn = pool.acquire().await?;
    fetch_record(&mut conn, id).await
}

/// Insert a new record
///
/// # Errors
/// `BackendError::Conflict` when a record with the same id exists
pub async fn insert_record(pool: &SqlitePool, record: &LogisticsRecord) -> Result<(), BackendError> {
    let result = sqlx::query(
        r#"
        INSERT INTO records (id, tracking_number, carrier, carrier_name, status, is_favorite,
                             is_delivered, last_update, created_at, updated_at, events)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.tracking_number)
    .bind(record.carrier.code())
    .bind(&record.carrier_name)
    .bind(record.status.as_str())
    .bind(record.is_favorite)
    .bind(record.is_delivered)
    .bind(record.last_update)
    .bind(record.created_at)
    .bind(record.updated_at)
    .bind(events_json(record)?)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            tracing::warn!("[Store] Duplicate record id {}", record.id);
            Err(BackendError::conflict(&record.id))
        }
        Err(e) => Err(e.into()),
    }
}

/// Apply a partial update and return the new state
///
/// # Errors
/// `BackendError::NotFound` for unknown ids
pub async fn update_record(
    pool: &SqlitePool,
    id: &str,
    patch: &RecordPatch,
) -> Result<LogisticsRecord, BackendError> {
    let mut tx = pool.begin().await?;

    let mut record = fetch_record(&mut *tx, id)
        .await?
        .ok_or_else(|| BackendError::not_found(id))?;
    record.apply_patch(patch, Utc::now());

    sqlx::query(
        r#"
        UPDATE records
        SET status = ?, is_favorite = ?, is_delivered = ?, last_update = ?, updated_at = ?, events = ?
        WHERE id = ?
        "#,
    )
    .bind(record.status.as_str())
    .bind(record.is_favorite)
    .bind(record.is_delivered)
    .bind(record.last_update)
    .bind(record.updated_at)
    .bind(events_json(&record)?)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(record)
}

/// Remove a record
///
/// # Errors
/// `BackendError::NotFound` when nothing was deleted
pub async fn delete_record(pool: &SqlitePool, id: &str) -> Result<(), BackendError> {
    let result = sqlx::query("DELETE FROM records WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(BackendError::not_found(id));
    }
    Ok(())
}
