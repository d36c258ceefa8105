//! HTTP gateway (Axum) in front of the request broker.
//!
//! This module is primarily used by the `editgate` server binary.

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use handler::{result_handler, score_handler, submit_handler};
pub use state::HandlerState;

/// Response header naming what the gateway did with the request.
pub const EDITGATE_STATUS_HEADER: &str = "X-Editgate-Status";
pub const EDITGATE_STATUS_HEALTHY: &str = "healthy";
pub const EDITGATE_STATUS_READY: &str = "ready";
pub const EDITGATE_STATUS_SCORED: &str = "scored";
pub const EDITGATE_STATUS_ACCEPTED: &str = "accepted";

pub fn create_router_with_state(state: HandlerState) -> Router {
    Router::new()
        .route("/", post(score_handler))
        .route("/v1/requests", post(submit_handler))
        .route("/v1/requests/{id}", get(result_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct ReadyResponse {
    pub status: String,
    pub consumer: String,
    pub queue_depth: usize,
    pub pending: usize,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        EDITGATE_STATUS_HEADER,
        HeaderValue::from_static(EDITGATE_STATUS_HEALTHY),
    );

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse {
            status: "ok".to_string(),
        }),
    )
        .into_response()
}

#[tracing::instrument(skip(state))]
pub async fn ready_handler(State(state): State<HandlerState>) -> Response {
    let is_ready = state.broker.is_running();

    let (status_code, status_msg) = if is_ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        EDITGATE_STATUS_HEADER,
        HeaderValue::from_static(if is_ready { EDITGATE_STATUS_READY } else { "error" }),
    );

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg.to_string(),
            consumer: if is_ready { "running" } else { "stopped" }.to_string(),
            queue_depth: state.broker.queue_depth(),
            pending: state.broker.pending_len(),
        }),
    )
        .into_response()
}
