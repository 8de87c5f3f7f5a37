//! Replayable execution record.

use common::{CustomerId, ExecutionId, FlightId};
use serde::{Deserialize, Serialize};

use crate::events::WorkflowEvent;
use crate::state::ExecutionState;
use crate::step::BookingStep;

/// A queryable view of one execution, rebuilt by replaying its event
/// history. Used for status endpoints and for asserting orderings in tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionRecord {
    execution_id: Option<ExecutionId>,
    outbound_flight_id: Option<FlightId>,
    customer_id: Option<CustomerId>,
    state: ExecutionState,
    completed_steps: Vec<BookingStep>,
    compensated_steps: Vec<BookingStep>,
    retries: u32,
    booking_reference: Option<String>,
    failure_reason: Option<String>,
}

impl ExecutionRecord {
    /// Rebuilds a record from an event history.
    pub fn replay<'a>(events: impl IntoIterator<Item = &'a WorkflowEvent>) -> Self {
        let mut record = Self::default();
        for event in events {
            record.apply(event);
        }
        record
    }

    /// Applies one event.
    pub fn apply(&mut self, event: &WorkflowEvent) {
        match event {
            WorkflowEvent::ExecutionStarted(data) => {
                self.execution_id = Some(data.execution_id);
                self.outbound_flight_id = Some(data.outbound_flight_id.clone());
                self.customer_id = Some(data.customer_id);
                self.state = ExecutionState::Running;
            }
            WorkflowEvent::StepStarted(_) => {}
            WorkflowEvent::StepRetried(_) => {
                self.retries += 1;
            }
            WorkflowEvent::StepCompleted(data) => {
                self.completed_steps.push(data.step);
            }
            WorkflowEvent::StepFailed(data) => {
                self.failure_reason = Some(data.error.clone());
            }
            WorkflowEvent::CompensationStarted(_) => {
                self.state = ExecutionState::Compensating;
            }
            WorkflowEvent::CompensationStepCompleted(data) => {
                self.compensated_steps.push(data.step);
            }
            WorkflowEvent::CompensationStepFailed(_) => {
                // Recorded in the history; the unwind itself continues.
            }
            WorkflowEvent::ExecutionConfirmed(data) => {
                self.state = ExecutionState::Confirmed;
                self.booking_reference = Some(data.booking_reference.clone());
            }
            WorkflowEvent::ExecutionFailed(data) => {
                self.state = ExecutionState::Failed;
                self.failure_reason = Some(data.reason.clone());
            }
        }
    }

    pub fn execution_id(&self) -> Option<ExecutionId> {
        self.execution_id
    }

    pub fn outbound_flight_id(&self) -> Option<&FlightId> {
        self.outbound_flight_id.as_ref()
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Forward steps that completed, in order.
    pub fn completed_steps(&self) -> &[BookingStep] {
        &self.completed_steps
    }

    /// Compensation steps that completed, in unwind order.
    pub fn compensated_steps(&self) -> &[BookingStep] {
        &self.compensated_steps
    }

    /// Total retries scheduled across all steps.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn booking_reference(&self) -> Option<&str> {
        self.booking_reference.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}
