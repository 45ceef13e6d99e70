//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the sync client and the record store server. These types are used for
//! serialization in the local cache, in share tokens and over HTTP.
//!
//! # Overview
//!
//! The shared module provides platform-agnostic types that can be used
//! in both server and client code. All types are designed for serialization
//! and transmission over HTTP.

/// Logistics records, carriers and update payloads
pub mod record;

/// Record change events
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use record::{Carrier, LogisticsRecord, NewRecord, RecordPatch, TrackingEvent, TrackingStatus};
pub use event::{EventType, RecordEvent};
pub use error::SharedError;
pub use config::{AppConfig, AppConfigBuilder, CacheBackendKind, ConfigError, ReconcileStrategy};
