//! Booking submission, status, and flight seat endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CustomerId, ExecutionId, FlightId, Money};
use seat_store::SeatStore;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use workflow::{
    BookingRequest, ExecutionRecord, InMemoryBookingService, InMemoryNotificationService,
    InMemoryPaymentService, WorkflowEngine, WorkflowEvent,
};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: SeatStore + Clone> {
    pub engine: WorkflowEngine<
        S,
        InMemoryBookingService,
        InMemoryPaymentService,
        InMemoryNotificationService,
    >,
    pub seats: S,
    pub flight_table: String,
    /// Event histories of completed executions, keyed by execution ID.
    pub histories: RwLock<HashMap<ExecutionId, Vec<WorkflowEvent>>>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub outbound_flight_id: String,
    pub customer_id: Option<String>,
    pub payment_token: String,
    pub amount_cents: i64,
}

#[derive(Deserialize)]
pub struct PutFlightRequest {
    pub seat_allocation: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct BookingOutcomeResponse {
    pub execution_id: String,
    pub state: String,
    pub booking_reference: Option<String>,
    pub failure_reason: Option<String>,
}

#[derive(Serialize)]
pub struct BookingStatusResponse {
    pub execution_id: String,
    pub outbound_flight_id: Option<String>,
    pub customer_id: Option<String>,
    pub state: String,
    pub completed_steps: Vec<String>,
    pub compensated_steps: Vec<String>,
    pub retries: u32,
    pub booking_reference: Option<String>,
    pub failure_reason: Option<String>,
}

#[derive(Serialize)]
pub struct FlightSeatsResponse {
    pub flight_id: String,
    pub seat_allocation: i64,
}

// -- Handlers --

/// POST /bookings — run one booking to its terminal state.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: SeatStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingOutcomeResponse>), ApiError> {
    let customer_id = if let Some(ref id_str) = req.customer_id {
        let uuid = uuid::Uuid::parse_str(id_str)
            .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))?;
        CustomerId::from_uuid(uuid)
    } else {
        CustomerId::new()
    };

    let request = BookingRequest {
        outbound_flight_id: FlightId::new(req.outbound_flight_id.as_str()),
        customer_id,
        payment_token: req.payment_token,
        amount: Money::from_cents(req.amount_cents),
    };

    let result = state.engine.execute(request).await?;

    let response = BookingOutcomeResponse {
        execution_id: result.execution_id.to_string(),
        state: result.state.to_string(),
        booking_reference: result.booking_reference().map(String::from),
        failure_reason: if result.is_confirmed() {
            None
        } else {
            Some(result.context.failure_summary())
        },
    };
    let status = if result.is_confirmed() {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    };

    state
        .histories
        .write()
        .await
        .insert(result.execution_id, result.history);

    Ok((status, Json(response)))
}

/// GET /bookings/:id — replay an execution's history into a status view.
#[tracing::instrument(skip(state))]
pub async fn get<S: SeatStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<BookingStatusResponse>, ApiError> {
    let execution_id = parse_execution_id(&id)?;

    let histories = state.histories.read().await;
    let history = histories
        .get(&execution_id)
        .ok_or_else(|| ApiError::NotFound(format!("Booking execution {id} not found")))?;
    let record = ExecutionRecord::replay(history);

    Ok(Json(BookingStatusResponse {
        execution_id: execution_id.to_string(),
        outbound_flight_id: record.outbound_flight_id().map(|f| f.to_string()),
        customer_id: record.customer_id().map(|c| c.to_string()),
        state: record.state().to_string(),
        completed_steps: record
            .completed_steps()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        compensated_steps: record
            .compensated_steps()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        retries: record.retries(),
        booking_reference: record.booking_reference().map(String::from),
        failure_reason: record.failure_reason().map(String::from),
    }))
}

/// GET /bookings/:id/events — raw event history of an execution.
#[tracing::instrument(skip(state))]
pub async fn events<S: SeatStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<WorkflowEvent>>, ApiError> {
    let execution_id = parse_execution_id(&id)?;

    let histories = state.histories.read().await;
    let history = histories
        .get(&execution_id)
        .ok_or_else(|| ApiError::NotFound(format!("Booking execution {id} not found")))?;

    Ok(Json(history.clone()))
}

/// PUT /flights/:id — create or replace a flight's seat allocation.
#[tracing::instrument(skip(state, req))]
pub async fn put_flight<S: SeatStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<PutFlightRequest>,
) -> Result<(StatusCode, Json<FlightSeatsResponse>), ApiError> {
    if req.seat_allocation < 0 {
        return Err(ApiError::BadRequest(
            "seat_allocation must be non-negative".to_string(),
        ));
    }

    let flight_id = FlightId::new(id.as_str());
    state
        .seats
        .put_flight(&state.flight_table, &flight_id, req.seat_allocation)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(FlightSeatsResponse {
            flight_id: id,
            seat_allocation: req.seat_allocation,
        }),
    ))
}

/// GET /flights/:id/seats — current seat allocation for a flight.
#[tracing::instrument(skip(state))]
pub async fn flight_seats<S: SeatStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<FlightSeatsResponse>, ApiError> {
    let flight_id = FlightId::new(id.as_str());
    let seat_allocation = state
        .seats
        .seat_allocation(&state.flight_table, &flight_id)
        .await?;

    Ok(Json(FlightSeatsResponse {
        flight_id: id,
        seat_allocation,
    }))
}

fn parse_execution_id(id: &str) -> Result<ExecutionId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(ExecutionId::from(uuid))
}
