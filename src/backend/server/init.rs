/**
 * Server Initialization
 *
 * Builds the axum application:
 * 1. Connect to the record database
 * 2. Apply the schema
 * 3. Create the change event channel
 * 4. Configure routes and middleware
 */

use axum::Router;
use sqlx::SqlitePool;
use crate::backend::records::db::init_schema;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::load_database;
use crate::backend::server::state::AppState;

/// Create the application from the environment configuration
pub async fn create_app() -> Result<Router<()>, sqlx::Error> {
    tracing::info!("Initializing logitrack record store");

    let pool = load_database().await?;
    create_app_with_pool(pool).await
}

/// Create the application on an existing pool
///
/// Used by tests with an in-memory database.
pub async fn create_app_with_pool(pool: SqlitePool) -> Result<Router<()>, sqlx::Error> {
    init_schema(&pool).await?;
    let record_count = crate::backend::records::db::count_records(&pool).await?;
    tracing::info!("Record database ready ({} records)", record_count);

    let app_state = AppState::new(pool);
    let app = create_router(app_state);

    tracing::info!("Router configured");
    Ok(app)
}
