//! HTTP API server with observability for the booking workflow.
//!
//! Provides REST endpoints for submitting bookings, inspecting execution
//! histories, and managing flight seat allocations, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use seat_store::SeatStore;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use workflow::WorkflowEngine;
use workflow::services::{
    InMemoryBookingService, InMemoryNotificationService, InMemoryPaymentService,
};

use config::Config;
use routes::bookings::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: SeatStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/bookings", post(routes::bookings::create::<S>))
        .route("/bookings/{id}", get(routes::bookings::get::<S>))
        .route("/bookings/{id}/events", get(routes::bookings::events::<S>))
        .route("/flights/{id}", put(routes::bookings::put_flight::<S>))
        .route("/flights/{id}/seats", get(routes::bookings::flight_seats::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state around a seat store, wiring the
/// engine to in-memory booking, payment, and notification services.
pub fn create_default_state<S: SeatStore + Clone + 'static>(
    seats: S,
    config: &Config,
) -> Arc<AppState<S>> {
    let engine = WorkflowEngine::with_config(
        config.engine_config(),
        seats.clone(),
        InMemoryBookingService::new(),
        InMemoryPaymentService::new(),
        InMemoryNotificationService::new(),
    );

    Arc::new(AppState {
        engine,
        seats,
        flight_table: config.flight_table.clone(),
        histories: RwLock::new(HashMap::new()),
    })
}
