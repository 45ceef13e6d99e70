//! Record Storage and Handlers
//!
//! - **`db`** - SQLite persistence (`schema.sql` is applied at startup)
//! - **`handlers`** - axum handlers for `/api/records`

/// Database operations
pub mod db;

/// HTTP handlers
pub mod handlers;

pub use handlers::{create_record, delete_record, health, list_records, update_record};
