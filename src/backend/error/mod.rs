//! Backend Error Module
//!
//! Error types for the record store handlers.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports
//! ├── types.rs      - Error type definitions
//! └── conversion.rs - IntoResponse and the JSON error body
//! ```
//!
//! # Error Types
//!
//! - `HandlerError` - explicit status code and message
//! - `NotFound` / `Conflict` - record addressing failures
//! - `StateError` - undecodable stored rows
//! - `DatabaseError` - sqlx failures
//! - `SharedError` / `SerializationError` - validation and JSON failures

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::BackendError;
pub use conversion::not_found_fallback;
