//! Seat counter store with atomic conditional updates.
//!
//! The seat allocation for a flight is the one resource mutated by many
//! concurrent booking executions, so every mutation goes through a single
//! atomically-checked conditional update. No caller ever holds a lock across
//! workflow steps; the conditional write is the sole concurrency-control
//! primitive and is what prevents overselling when bookings race.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{SeatStoreError, TransientKind};
pub use memory::InMemorySeatStore;
pub use postgres::PostgresSeatStore;
pub use store::{SeatPrecondition, SeatStore};

/// Convenience type alias for seat store results.
pub type Result<T> = std::result::Result<T, SeatStoreError>;
