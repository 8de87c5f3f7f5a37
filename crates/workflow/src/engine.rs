//! Workflow engine: interprets the booking definition for one execution.

use std::time::Duration;

use common::ExecutionId;
use seat_store::{SeatPrecondition, SeatStore};

use crate::context::{BookingRequest, ExecutionContext};
use crate::definition::{StepEntry, Transition, WorkflowDefinition};
use crate::error::{ErrorClass, StepFailure, WorkflowError};
use crate::events::WorkflowEvent;
use crate::services::{BookingNotification, BookingService, NotificationService, PaymentService};
use crate::state::ExecutionState;
use crate::step::BookingStep;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Symbolic flight-table reference placed into each execution context.
    pub flight_table: String,
    /// Symbolic booking-table reference placed into each execution context.
    pub booking_table: String,
    /// Attempt timeout for remote invocation tasks. Seat tasks carry their
    /// own tighter timeout in the workflow definition.
    pub remote_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flight_table: "flights".to_string(),
            booking_table: "bookings".to_string(),
            remote_timeout: Duration::from_secs(30),
        }
    }
}

/// The terminal outcome of one execution.
///
/// The caller only ever sees a terminal state: a confirmed booking with its
/// reference, or a failed booking with the accumulated error fields. Step
/// failures never escape as faults.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The execution's ID.
    pub execution_id: ExecutionId,
    /// `Confirmed` or `Failed`.
    pub state: ExecutionState,
    /// The final execution context.
    pub context: ExecutionContext,
    /// The full event history of the execution.
    pub history: Vec<WorkflowEvent>,
}

impl ExecutionResult {
    /// Returns true if the booking confirmed.
    pub fn is_confirmed(&self) -> bool {
        self.state == ExecutionState::Confirmed
    }

    /// Returns the booking reference for a confirmed booking.
    pub fn booking_reference(&self) -> Option<&str> {
        self.context.booking_reference()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Forward,
    Unwind,
}

/// Orchestrates booking workflow executions.
///
/// Each call to [`execute`](Self::execute) runs one booking independently;
/// concurrent executions share nothing but the underlying stores, and the
/// seat counter's conditional update is the only cross-execution
/// serialization point.
pub struct WorkflowEngine<S, B, P, N>
where
    S: SeatStore,
    B: BookingService,
    P: PaymentService,
    N: NotificationService,
{
    definition: WorkflowDefinition,
    config: EngineConfig,
    seats: S,
    bookings: B,
    payments: P,
    notifications: N,
}

impl<S, B, P, N> WorkflowEngine<S, B, P, N>
where
    S: SeatStore,
    B: BookingService,
    P: PaymentService,
    N: NotificationService,
{
    /// Creates an engine with the standard booking definition and default
    /// configuration.
    pub fn new(seats: S, bookings: B, payments: P, notifications: N) -> Self {
        Self::with_config(EngineConfig::default(), seats, bookings, payments, notifications)
    }

    /// Creates an engine with explicit configuration.
    pub fn with_config(
        config: EngineConfig,
        seats: S,
        bookings: B,
        payments: P,
        notifications: N,
    ) -> Self {
        Self {
            definition: WorkflowDefinition::booking(),
            config,
            seats,
            bookings,
            payments,
            notifications,
        }
    }

    /// Runs one booking request to its terminal state.
    ///
    /// Returns `Err` only for requests rejected at admission; every step
    /// failure is absorbed into the compensation chain and a terminal
    /// `Failed` result.
    #[tracing::instrument(skip(self, request), fields(workflow = "Booking", flight = %request.outbound_flight_id))]
    pub async fn execute(&self, request: BookingRequest) -> Result<ExecutionResult, WorkflowError> {
        if !request.amount.is_positive() {
            return Err(WorkflowError::InvalidRequest(
                "amount must be positive".to_string(),
            ));
        }
        if request.payment_token.is_empty() {
            return Err(WorkflowError::InvalidRequest(
                "payment token is required".to_string(),
            ));
        }

        metrics::counter!("booking_executions_total").increment(1);
        let started = std::time::Instant::now();

        let execution_id = ExecutionId::new();
        let mut ctx = ExecutionContext::new(
            execution_id,
            request,
            &self.config.flight_table,
            &self.config.booking_table,
        );
        let mut history = vec![WorkflowEvent::execution_started(
            execution_id,
            ctx.outbound_flight_id().clone(),
            ctx.customer_id(),
        )];

        let mut phase = Phase::Forward;
        let mut current = Transition::Step(BookingStep::INITIAL);

        loop {
            let step = match current {
                Transition::Confirmed => {
                    let reference = ctx.booking_reference().unwrap_or("").to_string();
                    history.push(WorkflowEvent::execution_confirmed(reference));
                    metrics::counter!("booking_confirmed").increment(1);
                    metrics::histogram!("booking_execution_duration_seconds")
                        .record(started.elapsed().as_secs_f64());
                    tracing::info!(%execution_id, "booking confirmed");
                    return Ok(ExecutionResult {
                        execution_id,
                        state: ExecutionState::Confirmed,
                        context: ctx,
                        history,
                    });
                }
                Transition::Failed => {
                    let reason = ctx.failure_summary();
                    history.push(WorkflowEvent::execution_failed(reason.clone()));
                    metrics::counter!("booking_failed").increment(1);
                    metrics::histogram!("booking_execution_duration_seconds")
                        .record(started.elapsed().as_secs_f64());
                    tracing::warn!(%execution_id, %reason, "booking failed");
                    return Ok(ExecutionResult {
                        execution_id,
                        state: ExecutionState::Failed,
                        context: ctx,
                        history,
                    });
                }
                Transition::Step(step) => step,
            };

            let entry = *self.definition.entry(step)?;
            if phase == Phase::Forward {
                tracing::info!(step = %step, "workflow step started");
                history.push(WorkflowEvent::step_started(step));
            }

            match self.run_step(step, &entry, &mut ctx, &mut history).await {
                Ok(()) => {
                    match phase {
                        Phase::Forward => history.push(WorkflowEvent::step_completed(step)),
                        Phase::Unwind => {
                            history.push(WorkflowEvent::compensation_step_completed(step))
                        }
                    }
                    current = entry.on_success;
                }
                Err(failure) => {
                    ctx.record_failure(step, failure.clone());
                    match phase {
                        Phase::Forward => {
                            tracing::warn!(
                                step = %step,
                                class = %failure.class,
                                error = %failure.message,
                                "step failed terminally, compensating"
                            );
                            history.push(WorkflowEvent::step_failed(
                                step,
                                failure.class,
                                failure.message,
                            ));
                            if matches!(entry.on_failure, Transition::Step(_)) {
                                history.push(WorkflowEvent::compensation_started(step));
                            }
                            phase = Phase::Unwind;
                            current = entry.on_failure;
                        }
                        Phase::Unwind => {
                            // Best-effort compensation: record the failure
                            // and keep walking the unwind chain.
                            tracing::warn!(
                                step = %step,
                                class = %failure.class,
                                error = %failure.message,
                                "compensation step failed, continuing unwind"
                            );
                            history.push(WorkflowEvent::compensation_step_failed(
                                step,
                                failure.class,
                                failure.message,
                            ));
                            current = entry.on_success;
                        }
                    }
                }
            }
        }
    }

    /// Runs one step with its retry policy and attempt timeout.
    async fn run_step(
        &self,
        step: BookingStep,
        entry: &StepEntry,
        ctx: &mut ExecutionContext,
        history: &mut Vec<WorkflowEvent>,
    ) -> Result<(), StepFailure> {
        let timeout = entry.timeout.unwrap_or(self.config.remote_timeout);
        let mut failures = 0u32;
        loop {
            let attempt = tokio::time::timeout(timeout, self.invoke(step, ctx)).await;
            let failure = match attempt {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(failure)) => failure,
                Err(_) => StepFailure::new(
                    ErrorClass::Timeout,
                    format!("{step} timed out after {}ms", timeout.as_millis()),
                ),
            };

            failures += 1;
            match entry.retry.next_delay(failure.class, failures) {
                Some(delay) => {
                    metrics::counter!("booking_step_retries_total").increment(1);
                    tracing::warn!(
                        step = %step,
                        class = %failure.class,
                        retry = failures,
                        delay_ms = delay.as_millis() as u64,
                        "step attempt failed, retrying"
                    );
                    history.push(WorkflowEvent::step_retried(
                        step,
                        failure.class,
                        failures,
                        delay.as_millis() as u64,
                    ));
                    tokio::time::sleep(delay).await;
                }
                None => return Err(failure),
            }
        }
    }

    /// Invokes one step against its collaborator and records its declared
    /// output field.
    async fn invoke(&self, step: BookingStep, ctx: &mut ExecutionContext) -> Result<(), StepFailure> {
        match step {
            BookingStep::ReserveFlightSeat => {
                self.seats
                    .adjust_seats(
                        ctx.flight_table(),
                        ctx.outbound_flight_id(),
                        -1,
                        Some(SeatPrecondition::SeatsAvailable),
                    )
                    .await?;
                ctx.mark_seat_reserved()?;
            }
            BookingStep::ReleaseFlightSeat => {
                // Only a committed reservation is released; the release is
                // unconditional so it is always permitted.
                if ctx.seat_reserved() {
                    self.seats
                        .adjust_seats(ctx.flight_table(), ctx.outbound_flight_id(), 1, None)
                        .await?;
                    ctx.mark_seat_released();
                }
            }
            BookingStep::ReserveBooking => {
                let booking_id = self
                    .bookings
                    .reserve(
                        ctx.booking_table(),
                        ctx.outbound_flight_id(),
                        ctx.customer_id(),
                    )
                    .await?;
                ctx.set_booking_id(booking_id)?;
            }
            BookingStep::ConfirmBooking => {
                let booking_id = ctx.booking_id().ok_or_else(|| {
                    StepFailure::new(ErrorClass::Internal, "booking id not set before confirm")
                })?;
                let reference = self.bookings.confirm(ctx.booking_table(), booking_id).await?;
                ctx.set_booking_reference(reference)?;
            }
            BookingStep::CancelBooking => {
                // Nothing to cancel if the reserve step never committed.
                if let Some(booking_id) = ctx.booking_id() {
                    self.bookings.cancel(ctx.booking_table(), booking_id).await?;
                }
            }
            BookingStep::CollectPayment => {
                let receipt = self
                    .payments
                    .collect(ctx.customer_id(), ctx.payment_token(), ctx.amount())
                    .await?;
                ctx.set_payment_receipt(receipt)?;
            }
            BookingStep::RefundPayment => {
                if let Some(receipt) = ctx.payment_receipt() {
                    self.payments.refund(receipt).await?;
                }
            }
            BookingStep::NotifyBookingSucceeded => {
                let reference = ctx.booking_reference().ok_or_else(|| {
                    StepFailure::new(ErrorClass::Internal, "booking reference not set")
                })?;
                let notification = BookingNotification::Success {
                    customer_id: ctx.customer_id(),
                    booking_reference: reference.to_string(),
                };
                let id = self.notifications.publish(notification).await?;
                ctx.set_notification_id(id)?;
            }
            BookingStep::NotifyBookingFailed => {
                let notification = BookingNotification::Failure {
                    customer_id: ctx.customer_id(),
                    reason: ctx.failure_summary(),
                };
                let id = self.notifications.publish(notification).await?;
                ctx.set_notification_id(id)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        InMemoryBookingService, InMemoryNotificationService, InMemoryPaymentService,
    };
    use common::{CustomerId, FlightId, Money};
    use seat_store::{InMemorySeatStore, TransientKind};

    type TestEngine = WorkflowEngine<
        InMemorySeatStore,
        InMemoryBookingService,
        InMemoryPaymentService,
        InMemoryNotificationService,
    >;

    struct Harness {
        engine: TestEngine,
        seats: InMemorySeatStore,
        bookings: InMemoryBookingService,
        payments: InMemoryPaymentService,
        notifications: InMemoryNotificationService,
    }

    const FLIGHT_TABLE: &str = "flights";
    const BOOKING_TABLE: &str = "bookings";

    async fn setup(seat_count: i64) -> Harness {
        let seats = InMemorySeatStore::new();
        seats
            .put_flight(FLIGHT_TABLE, &flight(), seat_count)
            .await
            .unwrap();
        let bookings = InMemoryBookingService::new();
        let payments = InMemoryPaymentService::new();
        let notifications = InMemoryNotificationService::new();

        let engine = WorkflowEngine::new(
            seats.clone(),
            bookings.clone(),
            payments.clone(),
            notifications.clone(),
        );

        Harness {
            engine,
            seats,
            bookings,
            payments,
            notifications,
        }
    }

    fn flight() -> FlightId {
        FlightId::new("FL-0001")
    }

    fn request() -> BookingRequest {
        BookingRequest {
            outbound_flight_id: flight(),
            customer_id: CustomerId::new(),
            payment_token: "tok_visa".to_string(),
            amount: Money::from_cents(25000),
        }
    }

    #[tokio::test]
    async fn happy_path_confirms_booking() {
        let h = setup(3).await;
        let result = h.engine.execute(request()).await.unwrap();

        assert!(result.is_confirmed());
        assert_eq!(result.booking_reference(), Some("BK-000001"));
        assert!(result.context.notification_id().is_some());
        assert!(!result.context.has_errors());

        assert_eq!(
            h.seats.seat_allocation(FLIGHT_TABLE, &flight()).await.unwrap(),
            2
        );
        assert_eq!(h.bookings.active_count(BOOKING_TABLE), 1);
        assert_eq!(h.payments.captured_count(), 1);
        assert_eq!(h.notifications.success_count(), 1);
        assert_eq!(h.notifications.failure_count(), 0);
    }

    #[tokio::test]
    async fn no_seats_fails_immediately_without_retry() {
        let h = setup(0).await;
        let result = h.engine.execute(request()).await.unwrap();

        assert!(!result.is_confirmed());
        assert_eq!(result.context.flight_error().unwrap().class, ErrorClass::ConditionalCheckFailed);
        // One invocation only: conditional-check failures are not retried.
        assert_eq!(h.seats.adjust_call_count().await, 1);
        assert_eq!(
            h.seats.seat_allocation(FLIGHT_TABLE, &flight()).await.unwrap(),
            0
        );
        // Nothing downstream ran; only the failure notification.
        assert_eq!(h.bookings.active_count(BOOKING_TABLE), 0);
        assert_eq!(h.payments.captured_count(), 0);
        assert_eq!(h.notifications.failure_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_seat_errors_are_retried() {
        let h = setup(2).await;
        h.seats.fail_times(TransientKind::Throttling, 2).await;

        let result = h.engine.execute(request()).await.unwrap();
        assert!(result.is_confirmed());
        // 2 failed attempts + 1 success for the reserve step.
        assert_eq!(h.seats.adjust_call_count().await, 3);

        let record = crate::record::ExecutionRecord::replay(&result.history);
        assert_eq!(record.retries(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn payment_retry_bound_is_three_invocations() {
        let h = setup(2).await;
        h.payments.fail_collect_times(
            StepFailure::new(ErrorClass::PaymentProcessing, "declined"),
            10,
        );

        let result = h.engine.execute(request()).await.unwrap();
        assert!(!result.is_confirmed());
        // maxAttempts=2: 1 initial + 2 retries.
        assert_eq!(h.payments.collect_call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn payment_failure_unwinds_booking_and_seat() {
        let h = setup(5).await;
        h.payments.fail_collect_times(
            StepFailure::new(ErrorClass::PaymentProcessing, "declined"),
            3,
        );

        let result = h.engine.execute(request()).await.unwrap();
        assert!(!result.is_confirmed());
        assert_eq!(result.context.payment_error().unwrap().class, ErrorClass::PaymentProcessing);

        // Seat restored, booking cancelled, one failure notification.
        assert_eq!(
            h.seats.seat_allocation(FLIGHT_TABLE, &flight()).await.unwrap(),
            5
        );
        assert_eq!(h.bookings.active_count(BOOKING_TABLE), 0);
        assert_eq!(h.notifications.failure_count(), 1);
        assert_eq!(h.notifications.success_count(), 0);
    }

    #[tokio::test]
    async fn booking_reservation_failure_is_not_retried_for_other_classes() {
        let h = setup(2).await;
        // An error class outside the step's policy falls straight through.
        h.bookings.fail_reserve_times(
            StepFailure::new(ErrorClass::Internal, "schema mismatch"),
            1,
        );

        let result = h.engine.execute(request()).await.unwrap();
        assert!(!result.is_confirmed());
        assert_eq!(h.bookings.reserve_call_count(), 1);
        // Seat restored by the unwind.
        assert_eq!(
            h.seats.seat_allocation(FLIGHT_TABLE, &flight()).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn invalid_amount_is_rejected_at_admission() {
        let h = setup(1).await;
        let mut req = request();
        req.amount = Money::zero();

        let err = h.engine.execute(req).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidRequest(_)));
        // No step ran.
        assert_eq!(h.seats.adjust_call_count().await, 0);
    }

    #[tokio::test]
    async fn concurrent_race_for_last_seat() {
        let h = setup(1).await;

        let a = h.engine.execute(request());
        let b = h.engine.execute(request());
        let (ra, rb) = tokio::join!(a, b);
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        assert_ne!(ra.is_confirmed(), rb.is_confirmed());
        assert_eq!(
            h.seats.seat_allocation(FLIGHT_TABLE, &flight()).await.unwrap(),
            0
        );
        assert_eq!(h.notifications.success_count(), 1);
        assert_eq!(h.notifications.failure_count(), 1);

        let loser = if ra.is_confirmed() { &rb } else { &ra };
        assert_eq!(
            loser.context.flight_error().unwrap().class,
            ErrorClass::ConditionalCheckFailed
        );
    }
}
