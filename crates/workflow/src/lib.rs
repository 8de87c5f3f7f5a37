//! Saga orchestrator for the airline booking workflow.
//!
//! One booking runs as one execution of a fixed directed graph of steps:
//!
//! 1. Reserve a flight seat (conditional decrement of the seat counter)
//! 2. Reserve a booking record
//! 3. Collect payment
//! 4. Confirm the booking
//! 5. Notify the customer of success
//!
//! When a step fails terminally (retries exhausted or a non-retryable error
//! class observed), the engine switches permanently to that step's
//! compensation entry point and unwinds committed effects in reverse
//! dependency order: refund payment, cancel the booking, release the seat,
//! notify the customer of failure.

pub mod context;
pub mod definition;
pub mod engine;
pub mod error;
pub mod events;
pub mod record;
pub mod retry;
pub mod services;
pub mod state;
pub mod step;

pub use context::{BookingRequest, ExecutionContext};
pub use definition::{DefinitionError, StepEntry, Transition, WorkflowDefinition};
pub use engine::{EngineConfig, ExecutionResult, WorkflowEngine};
pub use error::{ErrorClass, StepFailure, WorkflowError};
pub use events::WorkflowEvent;
pub use record::ExecutionRecord;
pub use retry::{RetryOn, RetryPolicy};
pub use services::{
    BookingNotification, BookingService, BookingStatus, InMemoryBookingService,
    InMemoryNotificationService, InMemoryPaymentService, NotificationService, PaymentReceipt,
    PaymentService,
};
pub use state::ExecutionState;
pub use step::BookingStep;
