//! # Sync Client
//!
//! The offline-first sync engine for logistics records.
//!
//! ## Key Components
//!
//! - `sync`: the [`SyncController`] and its connection state machine
//! - `records`: the in-memory record list
//! - `local_cache`: durable slot storage (memory, JSON files or SQLite)
//! - `store`: record store clients (HTTP and in-process)
//! - `subscription`: live change feed and event application
//! - `offline`: outbox, optimistic updates and replay
//! - `export`: share tokens
//! - `config`: file and environment configuration
//! - `error`: store, cache and controller errors

pub mod config;
pub mod error;
pub mod export;
pub mod local_cache;
pub mod offline;
pub mod records;
pub mod store;
pub mod subscription;
pub mod sync;

pub use config::Config;
pub use error::{CacheError, StoreError, SyncError};
pub use local_cache::LocalCache;
pub use records::RecordList;
pub use store::{HttpRecordStore, MemoryRecordStore, RecordStore};
pub use subscription::RecordSubscription;
pub use sync::{ConnectionState, NetworkMonitor, NetworkStatus, Notification, SyncController, SyncOptions, SyncStatus};
