//! Record Store Server
//!
//! A reference record store for the sync client: an axum service backed by
//! SQLite that serves the record API and streams change events to
//! subscribers over Server-Sent Events.
//!
//! # Module Structure
//!
//! - **`server`** - configuration, state and application assembly
//! - **`routes`** - route table
//! - **`records`** - persistence and CRUD handlers
//! - **`realtime`** - change event broadcast and the SSE feed
//! - **`error`** - `BackendError` and its JSON response body
//!
//! Only compiled with the `ssr` feature.

pub mod server;

pub mod routes;

pub mod records;

pub mod realtime;

pub mod error;

pub use server::{create_app, create_app_with_pool, AppState};
pub use realtime::{broadcast_event, handle_record_subscription, RecordEventBroadcast};
pub use error::BackendError;
