//! Route Configuration
//!
//! - **`router`** - route table and middleware

/// Main router creation
pub mod router;

pub use router::create_router;
