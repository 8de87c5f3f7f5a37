//! Seat store error types.

use common::FlightId;
use thiserror::Error;

/// Transient infrastructure failure kinds a data store can surface.
///
/// These are broadly retryable by callers; they say nothing about the
/// business state of the row being updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    /// The store is temporarily unavailable.
    ServiceUnavailable,
    /// The caller is being throttled.
    Throttling,
    /// The account-level request limit was exceeded.
    RequestLimitExceeded,
    /// The table's provisioned throughput was exceeded.
    ProvisionedThroughputExceeded,
}

impl std::fmt::Display for TransientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransientKind::ServiceUnavailable => "ServiceUnavailable",
            TransientKind::Throttling => "Throttling",
            TransientKind::RequestLimitExceeded => "RequestLimitExceeded",
            TransientKind::ProvisionedThroughputExceeded => "ProvisionedThroughputExceeded",
        };
        write!(f, "{name}")
    }
}

/// Errors that can occur during seat store operations.
#[derive(Debug, Error)]
pub enum SeatStoreError {
    /// The conditional update's precondition did not hold (e.g., no seats
    /// left). This is a business outcome, not an infrastructure fault.
    #[error("Conditional check failed for flight {flight_id}")]
    ConditionalCheckFailed { flight_id: FlightId },

    /// No row exists for the flight in the given table.
    #[error("Flight not found: {flight_id}")]
    FlightNotFound { flight_id: FlightId },

    /// A transient infrastructure failure; safe to retry.
    #[error("Transient store failure: {kind}")]
    Transient { kind: TransientKind },

    /// The symbolic table reference does not name a valid table.
    #[error("Invalid table reference: {0}")]
    InvalidTable(String),

    /// Underlying database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl SeatStoreError {
    /// Returns the transient kind if this is a transient failure.
    pub fn transient_kind(&self) -> Option<TransientKind> {
        match self {
            SeatStoreError::Transient { kind } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kind_display_matches_symbolic_names() {
        assert_eq!(
            TransientKind::ProvisionedThroughputExceeded.to_string(),
            "ProvisionedThroughputExceeded"
        );
        assert_eq!(TransientKind::Throttling.to_string(), "Throttling");
    }

    #[test]
    fn transient_kind_accessor() {
        let err = SeatStoreError::Transient {
            kind: TransientKind::ServiceUnavailable,
        };
        assert_eq!(err.transient_kind(), Some(TransientKind::ServiceUnavailable));

        let err = SeatStoreError::FlightNotFound {
            flight_id: FlightId::new("FL-1"),
        };
        assert_eq!(err.transient_kind(), None);
    }
}
