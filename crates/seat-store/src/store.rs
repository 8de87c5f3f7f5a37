//! Seat store trait and conditional-update types.

use async_trait::async_trait;
use common::FlightId;

use crate::Result;

/// Precondition guarding a conditional seat adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatPrecondition {
    /// Apply only while `seat_allocation > 0`.
    SeatsAvailable,
}

/// Trait for the seat counter store.
///
/// The table is a symbolic reference resolved by the implementation; the
/// workflow carries table names in its execution context rather than binding
/// to a concrete store at definition time.
#[async_trait]
pub trait SeatStore: Send + Sync {
    /// Atomically adjusts a flight's seat allocation by `delta`, subject to
    /// an optional precondition checked in the same operation.
    ///
    /// Returns the allocation after the adjustment. Fails with
    /// [`SeatStoreError::ConditionalCheckFailed`] when the precondition does
    /// not hold; the row is left untouched in that case.
    ///
    /// [`SeatStoreError::ConditionalCheckFailed`]: crate::SeatStoreError::ConditionalCheckFailed
    async fn adjust_seats(
        &self,
        table: &str,
        flight_id: &FlightId,
        delta: i64,
        precondition: Option<SeatPrecondition>,
    ) -> Result<i64>;

    /// Returns the current seat allocation for a flight.
    async fn seat_allocation(&self, table: &str, flight_id: &FlightId) -> Result<i64>;

    /// Creates or replaces a flight row with the given allocation.
    async fn put_flight(&self, table: &str, flight_id: &FlightId, seats: i64) -> Result<()>;
}
