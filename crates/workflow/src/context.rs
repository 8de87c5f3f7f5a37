//! Per-execution context threaded through the workflow.

use common::{BookingId, CustomerId, ExecutionId, FlightId, Money};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::StepFailure;
use crate::services::PaymentReceipt;
use crate::step::BookingStep;

/// A booking request as admitted at the workflow boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    /// The outbound flight to book a seat on.
    pub outbound_flight_id: FlightId,
    /// The customer making the booking.
    pub customer_id: CustomerId,
    /// Opaque payment token supplied by the payment frontend.
    pub payment_token: String,
    /// Amount to charge.
    pub amount: Money,
}

/// Raised when a step tries to overwrite an already-set output field.
///
/// Forward side-effect fields are write-once: once set they may only be
/// consumed by the compensation step that undoes them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Context field '{field}' is already set")]
pub struct ContextViolation {
    /// The field that was about to be overwritten.
    pub field: &'static str,
}

/// The mutable document flowing through one booking execution.
///
/// Request fields are fixed at admission; output fields accumulate as steps
/// succeed and are write-once. Error fields record the most recent terminal
/// failure per resource (the full sequence lives in the execution history).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    execution_id: ExecutionId,
    request: BookingRequest,
    flight_table: String,
    booking_table: String,

    seat_reserved: bool,
    booking_id: Option<BookingId>,
    payment_receipt: Option<PaymentReceipt>,
    booking_reference: Option<String>,
    notification_id: Option<String>,

    flight_error: Option<StepFailure>,
    booking_error: Option<StepFailure>,
    payment_error: Option<StepFailure>,
}

impl ExecutionContext {
    /// Creates a fresh context for an admitted booking request.
    pub fn new(
        execution_id: ExecutionId,
        request: BookingRequest,
        flight_table: impl Into<String>,
        booking_table: impl Into<String>,
    ) -> Self {
        Self {
            execution_id,
            request,
            flight_table: flight_table.into(),
            booking_table: booking_table.into(),
            seat_reserved: false,
            booking_id: None,
            payment_receipt: None,
            booking_reference: None,
            notification_id: None,
            flight_error: None,
            booking_error: None,
            payment_error: None,
        }
    }

    // -- Request accessors --

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    pub fn outbound_flight_id(&self) -> &FlightId {
        &self.request.outbound_flight_id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.request.customer_id
    }

    pub fn payment_token(&self) -> &str {
        &self.request.payment_token
    }

    pub fn amount(&self) -> Money {
        self.request.amount
    }

    /// Symbolic flight-table reference resolved by the seat store.
    pub fn flight_table(&self) -> &str {
        &self.flight_table
    }

    /// Symbolic booking-table reference resolved by the booking service.
    pub fn booking_table(&self) -> &str {
        &self.booking_table
    }

    // -- Output fields (write-once) --

    /// Records that the seat decrement committed.
    pub fn mark_seat_reserved(&mut self) -> Result<(), ContextViolation> {
        if self.seat_reserved {
            return Err(ContextViolation {
                field: "seat_reserved",
            });
        }
        self.seat_reserved = true;
        Ok(())
    }

    /// Consumes the seat reservation after the release compensation commits.
    pub fn mark_seat_released(&mut self) {
        self.seat_reserved = false;
    }

    pub fn seat_reserved(&self) -> bool {
        self.seat_reserved
    }

    pub fn set_booking_id(&mut self, id: BookingId) -> Result<(), ContextViolation> {
        if self.booking_id.is_some() {
            return Err(ContextViolation {
                field: "booking_id",
            });
        }
        self.booking_id = Some(id);
        Ok(())
    }

    pub fn booking_id(&self) -> Option<BookingId> {
        self.booking_id
    }

    pub fn set_payment_receipt(&mut self, receipt: PaymentReceipt) -> Result<(), ContextViolation> {
        if self.payment_receipt.is_some() {
            return Err(ContextViolation {
                field: "payment_receipt",
            });
        }
        self.payment_receipt = Some(receipt);
        Ok(())
    }

    pub fn payment_receipt(&self) -> Option<&PaymentReceipt> {
        self.payment_receipt.as_ref()
    }

    pub fn set_booking_reference(&mut self, reference: String) -> Result<(), ContextViolation> {
        if self.booking_reference.is_some() {
            return Err(ContextViolation {
                field: "booking_reference",
            });
        }
        self.booking_reference = Some(reference);
        Ok(())
    }

    pub fn booking_reference(&self) -> Option<&str> {
        self.booking_reference.as_deref()
    }

    pub fn set_notification_id(&mut self, id: String) -> Result<(), ContextViolation> {
        if self.notification_id.is_some() {
            return Err(ContextViolation {
                field: "notification_id",
            });
        }
        self.notification_id = Some(id);
        Ok(())
    }

    pub fn notification_id(&self) -> Option<&str> {
        self.notification_id.as_deref()
    }

    // -- Error fields --

    /// Records a step's terminal failure in the error field declared for
    /// that step's resource. Unlike output fields these may be written more
    /// than once: a failing unwind can stack failures, and the most recent
    /// one wins here.
    pub fn record_failure(&mut self, step: BookingStep, failure: StepFailure) {
        let slot = match step {
            BookingStep::ReserveFlightSeat | BookingStep::ReleaseFlightSeat => {
                &mut self.flight_error
            }
            BookingStep::CollectPayment | BookingStep::RefundPayment => &mut self.payment_error,
            BookingStep::ReserveBooking
            | BookingStep::ConfirmBooking
            | BookingStep::CancelBooking
            | BookingStep::NotifyBookingSucceeded
            | BookingStep::NotifyBookingFailed => &mut self.booking_error,
        };
        *slot = Some(failure);
    }

    pub fn flight_error(&self) -> Option<&StepFailure> {
        self.flight_error.as_ref()
    }

    pub fn booking_error(&self) -> Option<&StepFailure> {
        self.booking_error.as_ref()
    }

    pub fn payment_error(&self) -> Option<&StepFailure> {
        self.payment_error.as_ref()
    }

    /// Returns true if any error field is set.
    pub fn has_errors(&self) -> bool {
        self.flight_error.is_some() || self.booking_error.is_some() || self.payment_error.is_some()
    }

    /// Summarizes the accumulated error fields for the failure notification
    /// and the terminal event.
    pub fn failure_summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(err) = &self.flight_error {
            parts.push(format!("flight: {err}"));
        }
        if let Some(err) = &self.booking_error {
            parts.push(format!("booking: {err}"));
        }
        if let Some(err) = &self.payment_error {
            parts.push(format!("payment: {err}"));
        }
        if parts.is_empty() {
            "unknown failure".to_string()
        } else {
            parts.join("; ")
        }
    }
}
