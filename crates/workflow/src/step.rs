//! Booking workflow step identifiers.

use serde::{Deserialize, Serialize};

/// A step of the booking workflow.
///
/// The forward chain runs ReserveFlightSeat through NotifyBookingSucceeded;
/// the remaining steps form the compensation chain walked after a terminal
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStep {
    /// Conditionally decrement the flight's seat counter.
    ReserveFlightSeat,
    /// Create the booking record.
    ReserveBooking,
    /// Charge the customer.
    CollectPayment,
    /// Finalize the booking and obtain its reference.
    ConfirmBooking,
    /// Publish the success notification.
    NotifyBookingSucceeded,
    /// Undo a collected payment.
    RefundPayment,
    /// Undo a reserved booking record.
    CancelBooking,
    /// Return the reserved seat to the counter.
    ReleaseFlightSeat,
    /// Publish the failure notification.
    NotifyBookingFailed,
}

impl BookingStep {
    /// All steps, forward chain first.
    pub const ALL: [BookingStep; 9] = [
        BookingStep::ReserveFlightSeat,
        BookingStep::ReserveBooking,
        BookingStep::CollectPayment,
        BookingStep::ConfirmBooking,
        BookingStep::NotifyBookingSucceeded,
        BookingStep::RefundPayment,
        BookingStep::CancelBooking,
        BookingStep::ReleaseFlightSeat,
        BookingStep::NotifyBookingFailed,
    ];

    /// The first step of every execution.
    pub const INITIAL: BookingStep = BookingStep::ReserveFlightSeat;

    /// Returns true for steps on the compensation chain.
    pub fn is_compensation(&self) -> bool {
        matches!(
            self,
            BookingStep::RefundPayment
                | BookingStep::CancelBooking
                | BookingStep::ReleaseFlightSeat
                | BookingStep::NotifyBookingFailed
        )
    }

    /// Returns the step name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStep::ReserveFlightSeat => "ReserveFlightSeat",
            BookingStep::ReserveBooking => "ReserveBooking",
            BookingStep::CollectPayment => "CollectPayment",
            BookingStep::ConfirmBooking => "ConfirmBooking",
            BookingStep::NotifyBookingSucceeded => "NotifyBookingSucceeded",
            BookingStep::RefundPayment => "RefundPayment",
            BookingStep::CancelBooking => "CancelBooking",
            BookingStep::ReleaseFlightSeat => "ReleaseFlightSeat",
            BookingStep::NotifyBookingFailed => "NotifyBookingFailed",
        }
    }
}

impl std::fmt::Display for BookingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_lists_every_step_once() {
        let mut seen = std::collections::HashSet::new();
        for step in BookingStep::ALL {
            assert!(seen.insert(step));
        }
        assert_eq!(seen.len(), 9);
    }

    #[test]
    fn compensation_steps() {
        assert!(BookingStep::RefundPayment.is_compensation());
        assert!(BookingStep::CancelBooking.is_compensation());
        assert!(BookingStep::ReleaseFlightSeat.is_compensation());
        assert!(BookingStep::NotifyBookingFailed.is_compensation());

        assert!(!BookingStep::ReserveFlightSeat.is_compensation());
        assert!(!BookingStep::CollectPayment.is_compensation());
        assert!(!BookingStep::NotifyBookingSucceeded.is_compensation());
    }

    #[test]
    fn display_matches_symbolic_names() {
        assert_eq!(
            BookingStep::ReserveFlightSeat.to_string(),
            "ReserveFlightSeat"
        );
        assert_eq!(BookingStep::CollectPayment.to_string(), "CollectPayment");
    }
}
