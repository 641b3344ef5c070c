//! Parking Database Layer
//!
//! This crate provides the storage implementations for the parking backend:
//!
//! - PostgreSQL connection pool and embedded migrations
//! - `PgParkingStore`: transactional store with row locking and partial
//!   unique indexes
//! - `InMemoryParkingStore`: serialized in-memory store with the same
//!   uniqueness guarantees, used by tests

pub mod memory;
pub mod pool;
pub mod repositories;

pub use memory::{InMemoryParkingStore, MemoryTx};
pub use pool::{create_pool, run_migrations};
pub use repositories::{PgParkingStore, PgParkingTx};

// Re-export for convenience
pub use parking_core::{AppError, AppResult};
