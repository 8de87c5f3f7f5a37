//! Execution history events.
//!
//! The engine emits one event per observable transition; the collected
//! history is the execution's audit trail and can be replayed into an
//! [`ExecutionRecord`](crate::record::ExecutionRecord).

use chrono::{DateTime, Utc};
use common::{CustomerId, ExecutionId, FlightId};
use serde::{Deserialize, Serialize};

use crate::error::ErrorClass;
use crate::step::BookingStep;

/// Events emitted during one workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WorkflowEvent {
    /// Execution admitted and started.
    ExecutionStarted(ExecutionStartedData),

    /// A forward step started its first attempt.
    StepStarted(StepData),

    /// An attempt failed and a retry was scheduled.
    StepRetried(StepRetriedData),

    /// A forward step completed successfully.
    StepCompleted(StepData),

    /// A forward step failed terminally.
    StepFailed(StepFailedData),

    /// Compensation started after a forward step's terminal failure.
    CompensationStarted(CompensationData),

    /// A compensation step completed successfully.
    CompensationStepCompleted(StepData),

    /// A compensation step failed terminally (recorded, unwind continues).
    CompensationStepFailed(StepFailedData),

    /// Execution reached the confirmed terminal state.
    ExecutionConfirmed(ExecutionConfirmedData),

    /// Execution reached the failed terminal state.
    ExecutionFailed(ExecutionFailedData),
}

impl WorkflowEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            WorkflowEvent::ExecutionStarted(_) => "ExecutionStarted",
            WorkflowEvent::StepStarted(_) => "StepStarted",
            WorkflowEvent::StepRetried(_) => "StepRetried",
            WorkflowEvent::StepCompleted(_) => "StepCompleted",
            WorkflowEvent::StepFailed(_) => "StepFailed",
            WorkflowEvent::CompensationStarted(_) => "CompensationStarted",
            WorkflowEvent::CompensationStepCompleted(_) => "CompensationStepCompleted",
            WorkflowEvent::CompensationStepFailed(_) => "CompensationStepFailed",
            WorkflowEvent::ExecutionConfirmed(_) => "ExecutionConfirmed",
            WorkflowEvent::ExecutionFailed(_) => "ExecutionFailed",
        }
    }
}

/// Data for ExecutionStarted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStartedData {
    /// The execution's ID.
    pub execution_id: ExecutionId,
    /// The flight being booked.
    pub outbound_flight_id: FlightId,
    /// The customer booking it.
    pub customer_id: CustomerId,
    /// When the execution started.
    pub started_at: DateTime<Utc>,
}

/// Data for step started/completed events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepData {
    /// The step.
    pub step: BookingStep,
}

/// Data for StepRetried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRetriedData {
    /// The step being retried.
    pub step: BookingStep,
    /// Class of the failed attempt.
    pub class: ErrorClass,
    /// 1-based retry number.
    pub retry: u32,
    /// Backoff waited before this retry, in milliseconds.
    pub delay_ms: u64,
}

/// Data for StepFailed / CompensationStepFailed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailedData {
    /// The step that failed.
    pub step: BookingStep,
    /// Class of the terminal failure.
    pub class: ErrorClass,
    /// Failure message.
    pub error: String,
}

/// Data for CompensationStarted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationData {
    /// The forward step whose terminal failure triggered compensation.
    pub from_step: BookingStep,
}

/// Data for ExecutionConfirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfirmedData {
    /// The confirmed booking reference.
    pub booking_reference: String,
    /// When the execution confirmed.
    pub confirmed_at: DateTime<Utc>,
}

/// Data for ExecutionFailed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionFailedData {
    /// Summary of the accumulated error fields.
    pub reason: String,
    /// When the execution failed.
    pub failed_at: DateTime<Utc>,
}

// Convenience constructors
impl WorkflowEvent {
    /// Creates an ExecutionStarted event.
    pub fn execution_started(
        execution_id: ExecutionId,
        outbound_flight_id: FlightId,
        customer_id: CustomerId,
    ) -> Self {
        WorkflowEvent::ExecutionStarted(ExecutionStartedData {
            execution_id,
            outbound_flight_id,
            customer_id,
            started_at: Utc::now(),
        })
    }

    /// Creates a StepStarted event.
    pub fn step_started(step: BookingStep) -> Self {
        WorkflowEvent::StepStarted(StepData { step })
    }

    /// Creates a StepRetried event.
    pub fn step_retried(step: BookingStep, class: ErrorClass, retry: u32, delay_ms: u64) -> Self {
        WorkflowEvent::StepRetried(StepRetriedData {
            step,
            class,
            retry,
            delay_ms,
        })
    }

    /// Creates a StepCompleted event.
    pub fn step_completed(step: BookingStep) -> Self {
        WorkflowEvent::StepCompleted(StepData { step })
    }

    /// Creates a StepFailed event.
    pub fn step_failed(step: BookingStep, class: ErrorClass, error: impl Into<String>) -> Self {
        WorkflowEvent::StepFailed(StepFailedData {
            step,
            class,
            error: error.into(),
        })
    }

    /// Creates a CompensationStarted event.
    pub fn compensation_started(from_step: BookingStep) -> Self {
        WorkflowEvent::CompensationStarted(CompensationData { from_step })
    }

    /// Creates a CompensationStepCompleted event.
    pub fn compensation_step_completed(step: BookingStep) -> Self {
        WorkflowEvent::CompensationStepCompleted(StepData { step })
    }

    /// Creates a CompensationStepFailed event.
    pub fn compensation_step_failed(
        step: BookingStep,
        class: ErrorClass,
        error: impl Into<String>,
    ) -> Self {
        WorkflowEvent::CompensationStepFailed(StepFailedData {
            step,
            class,
            error: error.into(),
        })
    }

    /// Creates an ExecutionConfirmed event.
    pub fn execution_confirmed(booking_reference: impl Into<String>) -> Self {
        WorkflowEvent::ExecutionConfirmed(ExecutionConfirmedData {
            booking_reference: booking_reference.into(),
            confirmed_at: Utc::now(),
        })
    }

    /// Creates an ExecutionFailed event.
    pub fn execution_failed(reason: impl Into<String>) -> Self {
        WorkflowEvent::ExecutionFailed(ExecutionFailedData {
            reason: reason.into(),
            failed_at: Utc::now(),
        })
    }
}
