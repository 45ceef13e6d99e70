//! Server Setup
//!
//! - **`config`** - environment settings and the database pool
//! - **`state`** - `AppState` and its `FromRef` extractors
//! - **`init`** - application assembly

/// Server configuration
pub mod config;

/// Application state
pub mod state;

/// Application assembly
pub mod init;

pub use init::{create_app, create_app_with_pool};
pub use state::AppState;
