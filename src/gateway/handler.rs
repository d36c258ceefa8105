use std::time::Duration;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{EDITGATE_STATUS_ACCEPTED, EDITGATE_STATUS_HEADER, EDITGATE_STATUS_SCORED};
use crate::broker::{BrokerOutcome, ScoreRequest};
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::reward::RewardPayload;

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub request_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct PollParams {
    /// How long to wait for the result. Missing means do not wait.
    pub timeout_ms: Option<u64>,
}

/// `POST /`: enqueue, wait for the scorer, return one payload per item.
#[instrument(skip(state, body), fields(request_id = tracing::field::Empty))]
pub async fn score_handler(
    State(state): State<HandlerState>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let request = parse_request(&body)?;
    let id = state.broker.submit(request)?;
    tracing::Span::current().record("request_id", tracing::field::display(id));

    let outcome = state.broker.poll(id, state.request_timeout).await?;
    outcome_response(outcome)
}

/// `POST /v1/requests`: enqueue only, answer with the request id.
#[instrument(skip(state, body))]
pub async fn submit_handler(
    State(state): State<HandlerState>,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let request = parse_request(&body)?;
    let request_id = state.broker.submit(request)?;
    info!(%request_id, "Request accepted");

    Ok(with_status(
        StatusCode::ACCEPTED,
        EDITGATE_STATUS_ACCEPTED,
        Json(SubmitResponse { request_id }),
    ))
}

/// `GET /v1/requests/{id}`: take the outcome of an earlier submission.
#[instrument(skip(state))]
pub async fn result_handler(
    State(state): State<HandlerState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PollParams>,
) -> Result<Response, GatewayError> {
    let wait = params
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(Duration::ZERO)
        .min(state.request_timeout);

    let outcome = state.broker.poll(id, wait).await?;
    outcome_response(outcome)
}

fn parse_request(body: &[u8]) -> Result<ScoreRequest, GatewayError> {
    let request: ScoreRequest = serde_json::from_slice(body)
        .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
    debug!(items = request.len(), "Parsed scoring request");
    Ok(request)
}

fn outcome_response(outcome: BrokerOutcome) -> Result<Response, GatewayError> {
    match outcome {
        BrokerOutcome::Completed(payloads) => Ok(scored_response(payloads)),
        BrokerOutcome::Failed(reason) => Err(GatewayError::ScoringFailed(reason)),
    }
}

fn scored_response(payloads: Vec<RewardPayload>) -> Response {
    with_status(StatusCode::OK, EDITGATE_STATUS_SCORED, Json(payloads))
}

fn with_status(status: StatusCode, editgate_status: &'static str, body: impl IntoResponse) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        EDITGATE_STATUS_HEADER,
        HeaderValue::from_static(editgate_status),
    );
    (status, headers, body).into_response()
}
