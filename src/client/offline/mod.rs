//! # Offline Support
//!
//! Everything that lets the record list keep changing while the store is out
//! of reach.
//!
//! ## Key Components
//!
//! - `optimistic.rs`: undo information for changes applied before the store answers
//! - `queue.rs`: the outbox of unconfirmed mutations
//! - `reconciliation.rs`: ordered outbox replay on reconnect

pub mod optimistic;
pub mod queue;
pub mod reconciliation;

pub use optimistic::{OptimisticManager, OptimisticUpdate, Undo};
pub use queue::{Operation, Outbox, PendingMutation};
pub use reconciliation::{DroppedMutation, ReconciliationManager, ReplayReport};
