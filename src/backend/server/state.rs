/**
 * Application State
 *
 * `AppState` holds the database pool and the change event channel. The
 * `FromRef` implementations let handlers extract just the part they need:
 *
 * ```rust,ignore
 * async fn handler(State(pool): State<SqlitePool>) { /* ... */ }
 * async fn feed(State(events): State<RecordEventBroadcast>) { /* ... */ }
 * ```
 */

use axum::extract::FromRef;
use sqlx::SqlitePool;
use crate::backend::realtime::broadcast::{record_event_channel, RecordEventBroadcast};

#[derive(Clone)]
pub struct AppState {
    /// Record database
    pub pool: SqlitePool,
    /// Change events for SSE subscribers
    pub record_events: RecordEventBroadcast,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            record_events: record_event_channel(),
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for RecordEventBroadcast {
    fn from_ref(state: &AppState) -> Self {
        state.record_events.clone()
    }
}
