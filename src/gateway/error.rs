use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::EDITGATE_STATUS_HEADER;
use crate::broker::{BrokerError, PollError};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to parse request data: {0}")]
    InvalidRequest(String),

    #[error("Request timed out")]
    Timeout,

    #[error("unknown request: {0}")]
    UnknownRequest(String),

    /// Carries the broker's failure message unchanged.
    #[error("{0}")]
    ScoringFailed(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<BrokerError> for GatewayError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            BrokerError::Closed => Self::Unavailable(err.to_string()),
            BrokerError::Poll(poll) => poll.into(),
        }
    }
}

impl From<PollError> for GatewayError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Timeout { .. } => Self::Timeout,
            PollError::UnknownRequest(id) => Self::UnknownRequest(id.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, editgate_status) = match &self {
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            GatewayError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            GatewayError::UnknownRequest(_) => (StatusCode::NOT_FOUND, "unknown_request"),
            GatewayError::ScoringFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "scoring_error"),
            GatewayError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            GatewayError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            EDITGATE_STATUS_HEADER,
            HeaderValue::from_static(editgate_status),
        );

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}
