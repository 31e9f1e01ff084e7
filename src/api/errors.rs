//! API error mapping.
//!
//! Structured error responses with HTTP status codes and request tracking.

use crate::errors::RingError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error code (RING_FULL, CONFLICT, ...)
    pub code: String,
    /// Human-readable message with ring id and expected-vs-actual context
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub inner: RingError,
    pub request_id: String,
}

impl From<RingError> for ApiError {
    fn from(inner: RingError) -> Self {
        Self {
            inner,
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

fn classify(err: &RingError) -> (StatusCode, &'static str) {
    match err {
        RingError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, "INVALID_PARAMETER"),
        RingError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        RingError::RingFull { .. } => (StatusCode::CONFLICT, "RING_FULL"),
        RingError::RingClosed { .. } => (StatusCode::CONFLICT, "RING_CLOSED"),
        RingError::AlreadyJoined { .. } => (StatusCode::CONFLICT, "ALREADY_JOINED"),
        RingError::PaymentRejected { .. } => (StatusCode::PAYMENT_REQUIRED, "PAYMENT_REJECTED"),
        RingError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
        RingError::Unauthorized { .. } => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
        RingError::InsufficientParticipants { .. } => {
            (StatusCode::CONFLICT, "INSUFFICIENT_PARTICIPANTS")
        }
        RingError::InvalidState { .. } => (StatusCode::CONFLICT, "INVALID_STATE"),
        RingError::Consistency(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONSISTENCY_ERROR"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = classify(&self.inner);
        let body = ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: code.to_string(),
                message: self.inner.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
