//! Integration tests for the API server.

use std::sync::Arc;
use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use seat_store::InMemorySeatStore;
use tower::ServiceExt;

use api::config::Config;
use api::routes::bookings::AppState;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, Arc<AppState<InMemorySeatStore>>) {
    let seats = InMemorySeatStore::new();
    let state = api::create_default_state(seats, &Config::default());
    let metrics_handle = get_metrics_handle();
    let app = api::create_app(state.clone(), metrics_handle);
    (app, state)
}

async fn put_flight(app: &axum::Router, flight_id: &str, seat_allocation: i64) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/flights/{flight_id}"))
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "seat_allocation": seat_allocation }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn post_booking(app: &axum::Router, flight_id: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/bookings")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "outbound_flight_id": flight_id,
                        "payment_token": "tok_visa",
                        "amount_cents": 25000
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_booking_confirms_and_decrements_seat() {
    let (app, _) = setup();
    put_flight(&app, "FL-3001", 3).await;

    let (status, json) = post_booking(&app, "FL-3001").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["state"], "Confirmed");
    assert!(json["booking_reference"].as_str().is_some());
    assert!(json["failure_reason"].is_null());

    let (status, json) = get_json(&app, "/flights/FL-3001/seats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["seat_allocation"], 2);
}

#[tokio::test]
async fn test_booking_with_no_seats_fails_and_compensates() {
    let (app, _) = setup();
    put_flight(&app, "FL-3002", 0).await;

    let (status, json) = post_booking(&app, "FL-3002").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["state"], "Failed");
    assert!(json["booking_reference"].is_null());
    let reason = json["failure_reason"].as_str().unwrap();
    assert!(reason.contains("ConditionalCheckFailed"));

    // The counter stays exact.
    let (_, json) = get_json(&app, "/flights/FL-3002/seats").await;
    assert_eq!(json["seat_allocation"], 0);
}

#[tokio::test]
async fn test_booking_status_replays_the_history() {
    let (app, _) = setup();
    put_flight(&app, "FL-3003", 1).await;

    let (_, created) = post_booking(&app, "FL-3003").await;
    let execution_id = created["execution_id"].as_str().unwrap();

    let (status, json) = get_json(&app, &format!("/bookings/{execution_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "Confirmed");
    assert_eq!(
        json["completed_steps"],
        serde_json::json!([
            "ReserveFlightSeat",
            "ReserveBooking",
            "CollectPayment",
            "ConfirmBooking",
            "NotifyBookingSucceeded"
        ])
    );
    assert_eq!(json["compensated_steps"], serde_json::json!([]));
    assert_eq!(json["booking_reference"], created["booking_reference"]);
}

#[tokio::test]
async fn test_events_endpoint_returns_full_history() {
    let (app, _) = setup();
    put_flight(&app, "FL-3004", 1).await;

    let (_, created) = post_booking(&app, "FL-3004").await;
    let execution_id = created["execution_id"].as_str().unwrap();

    let (status, json) = get_json(&app, &format!("/bookings/{execution_id}/events")).await;
    assert_eq!(status, StatusCode::OK);
    let events = json.as_array().unwrap();
    assert_eq!(events.first().unwrap()["type"], "ExecutionStarted");
    assert_eq!(events.last().unwrap()["type"], "ExecutionConfirmed");
}

#[tokio::test]
async fn test_unknown_booking_returns_not_found() {
    let (app, _) = setup();

    let (status, _) = get_json(
        &app,
        "/bookings/00000000-0000-0000-0000-000000000000",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_booking_id_is_bad_request() {
    let (app, _) = setup();

    let (status, _) = get_json(&app, "/bookings/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_flight_returns_not_found() {
    let (app, _) = setup();

    let (status, _) = get_json(&app, "/flights/FL-MISSING/seats").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_zero_amount_booking_is_rejected() {
    let (app, _) = setup();
    put_flight(&app, "FL-3005", 1).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/bookings")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "outbound_flight_id": "FL-3005",
                        "payment_token": "tok_visa",
                        "amount_cents": 0
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing ran; the seat is untouched.
    let (_, json) = get_json(&app, "/flights/FL-3005/seats").await;
    assert_eq!(json["seat_allocation"], 1);
}

#[tokio::test]
async fn test_negative_seat_allocation_is_rejected() {
    let (app, _) = setup();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/flights/FL-3006")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "seat_allocation": -1 }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let (app, _) = setup();
    put_flight(&app, "FL-3007", 1).await;
    let _ = post_booking(&app, "FL-3007").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
