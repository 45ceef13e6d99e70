/**
 * Server Configuration
 *
 * Environment-driven settings for the record store:
 *
 * - `DATABASE_URL` - SQLite connection URL (default `sqlite:logitrack-store.db?mode=rwc`)
 * - `SERVER_PORT` - listen port (default 3000)
 *
 * Unlike optional services, the record database is required; connection
 * failures are returned to the caller.
 */

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:logitrack-store.db?mode=rwc";
pub const DEFAULT_PORT: u16 = 3000;

/// `DATABASE_URL`, or the local default
pub fn database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// `SERVER_PORT`, falling back to 3000 when unset or unparsable
pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|port| port.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Connect to the record database
///
/// Creates the database file when missing. The schema is applied by
/// [`crate::backend::records::db::init_schema`] during app creation.
pub async fn load_database() -> Result<SqlitePool, sqlx::Error> {
    let url = database_url();
    tracing::info!("Connecting to database {}", url);

    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_port_falls_back_on_garbage() {
        std::env::set_var("SERVER_PORT", "not-a-port");
        assert_eq!(server_port(), DEFAULT_PORT);
        std::env::set_var("SERVER_PORT", "8081");
        assert_eq!(server_port(), 8081);
        std::env::remove_var("SERVER_PORT");
    }

    #[test]
    #[serial]
    fn test_database_url_default() {
        std::env::remove_var("DATABASE_URL");
        assert_eq!(database_url(), DEFAULT_DATABASE_URL);
    }
}
