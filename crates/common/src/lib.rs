//! Shared identifier and value types used across the booking workflow crates.

mod types;

pub use types::{BookingId, CustomerId, ExecutionId, FlightId, Money};
