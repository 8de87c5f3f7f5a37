//! Workflow error taxonomy.

use seat_store::SeatStoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::ContextViolation;

/// Closed set of symbolic failure classes a step can raise.
///
/// Retry policies match on these classes rather than on error strings:
/// transient infrastructure failures are retried broadly, business-rule
/// violations only where a task's policy names them, and anything else falls
/// straight through to compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// The backing service is temporarily unavailable.
    ServiceUnavailable,
    /// The caller is being throttled.
    Throttling,
    /// Account-level request limit exceeded.
    RequestLimitExceeded,
    /// Table-level provisioned throughput exceeded.
    ProvisionedThroughputExceeded,
    /// The step's attempt timed out.
    Timeout,
    /// A conditional update's precondition did not hold (no seats left).
    ConditionalCheckFailed,
    /// The booking record could not be reserved.
    BookingReservation,
    /// The booking record could not be confirmed.
    BookingConfirmation,
    /// The booking record could not be cancelled.
    BookingCancellation,
    /// The customer notification could not be published.
    BookingNotification,
    /// The payment could not be collected or refunded.
    PaymentProcessing,
    /// An unclassified failure; never retried.
    Internal,
}

impl ErrorClass {
    /// Returns true for broadly-retryable infrastructure failures.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorClass::ServiceUnavailable
                | ErrorClass::Throttling
                | ErrorClass::RequestLimitExceeded
                | ErrorClass::ProvisionedThroughputExceeded
                | ErrorClass::Timeout
        )
    }

    /// Returns the class name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::ServiceUnavailable => "ServiceUnavailable",
            ErrorClass::Throttling => "Throttling",
            ErrorClass::RequestLimitExceeded => "RequestLimitExceeded",
            ErrorClass::ProvisionedThroughputExceeded => "ProvisionedThroughputExceeded",
            ErrorClass::Timeout => "Timeout",
            ErrorClass::ConditionalCheckFailed => "ConditionalCheckFailed",
            ErrorClass::BookingReservation => "BookingReservation",
            ErrorClass::BookingConfirmation => "BookingConfirmation",
            ErrorClass::BookingCancellation => "BookingCancellation",
            ErrorClass::BookingNotification => "BookingNotification",
            ErrorClass::PaymentProcessing => "PaymentProcessing",
            ErrorClass::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A step's failure: its symbolic class plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{class}: {message}")]
pub struct StepFailure {
    /// Symbolic failure class, matched against the step's retry policy.
    pub class: ErrorClass,
    /// Human-readable description for logs and the failure notification.
    pub message: String,
}

impl StepFailure {
    /// Creates a new step failure.
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }
}

impl From<SeatStoreError> for StepFailure {
    fn from(err: SeatStoreError) -> Self {
        use seat_store::TransientKind;
        let class = match &err {
            SeatStoreError::ConditionalCheckFailed { .. } => ErrorClass::ConditionalCheckFailed,
            SeatStoreError::Transient { kind } => match kind {
                TransientKind::ServiceUnavailable => ErrorClass::ServiceUnavailable,
                TransientKind::Throttling => ErrorClass::Throttling,
                TransientKind::RequestLimitExceeded => ErrorClass::RequestLimitExceeded,
                TransientKind::ProvisionedThroughputExceeded => {
                    ErrorClass::ProvisionedThroughputExceeded
                }
            },
            // A transient database fault on the store connection.
            SeatStoreError::Database(_) => ErrorClass::ServiceUnavailable,
            // Unknown flight or bad table reference: not retryable, not a
            // precondition outcome.
            SeatStoreError::FlightNotFound { .. } | SeatStoreError::InvalidTable(_) => {
                ErrorClass::Internal
            }
        };
        StepFailure::new(class, err.to_string())
    }
}

impl From<ContextViolation> for StepFailure {
    fn from(err: ContextViolation) -> Self {
        StepFailure::new(ErrorClass::Internal, err.to_string())
    }
}

/// Errors surfaced to the engine's caller.
///
/// Step failures never appear here; they are converted into compensation
/// transitions and a terminal `Failed` outcome. Only request admission and
/// definition construction can fail outright.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The booking request was rejected before any step ran.
    #[error("Invalid booking request: {0}")]
    InvalidRequest(String),

    /// The workflow definition is malformed.
    #[error("Invalid workflow definition: {0}")]
    Definition(#[from] crate::definition::DefinitionError),
}
