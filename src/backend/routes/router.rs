/**
 * Router Configuration
 *
 * Assembles the record store routes:
 *
 * - `GET    /api/health`              - liveness probe
 * - `GET    /api/records`             - list records, newest first
 * - `POST   /api/records`             - create a record
 * - `GET    /api/records/subscribe`   - SSE change feed
 * - `PATCH  /api/records/{id}`        - partial update
 * - `DELETE /api/records/{id}`        - delete
 *
 * Unknown routes get a JSON 404. Requests are traced and CORS is open so
 * browser clients on other origins can use the store.
 */

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backend::error::not_found_fallback;
use crate::backend::realtime::handle_record_subscription;
use crate::backend::records::{create_record, delete_record, health, list_records, update_record};
use crate::backend::server::state::AppState;

/// Create the axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/records", get(list_records).post(create_record))
        .route("/api/records/subscribe", get(handle_record_subscription))
        .route("/api/records/{id}", axum::routing::patch(update_record).delete(delete_record))
        .fallback(not_found_fallback)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state)
}
