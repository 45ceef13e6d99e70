//! logitrack - Offline-first Logistics Tracking
//!
//! A sync engine that keeps a list of tracked shipments usable while the
//! remote record store is unreachable, and reconciles with it when
//! connectivity returns.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared by the client and the record store
//!   - Logistics records, the carrier table, update payloads
//!   - Record change events
//!   - Application configuration and shared errors
//!
//! - **`client`** - The sync engine
//!   - `SyncController` with its connection state machine
//!   - Local cache (memory, JSON files or SQLite)
//!   - Record store clients (HTTP with an SSE change feed, in-process)
//!   - Outbox, optimistic updates and replay on reconnect
//!   - Share token export and import
//!
//! - **`backend`** - Reference record store (only compiled with `ssr`)
//!   - Axum server with SQLite persistence
//!   - SSE change feed
//!
//! # Feature Flags
//!
//! - **`ssr`** - builds the `backend` module and the `logitrack-store` binary
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use logitrack::client::{HttpRecordStore, LocalCache, SyncController, SyncOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(HttpRecordStore::new("http://127.0.0.1:3000"));
//! let mut controller = SyncController::new(store, LocalCache::memory(), SyncOptions::default());
//!
//! controller.init().await?;
//! controller.add("1Z999AA10123456784", "ups").await?;
//! controller.dispose().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Record Store
//!
//! ```rust,no_run
//! # #[cfg(feature = "ssr")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = logitrack::backend::server::init::create_app().await?;
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

/// Shared types and data structures
pub mod shared;

/// Offline-first sync client
pub mod client;

/// Record store server
#[cfg(feature = "ssr")]
pub mod backend;
