// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boundary error mapping.
//!
//! Internals speak the taxonomy; HTTP speaks status codes. Internal
//! errors carry a correlation id for operators and a generic message for
//! users.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sc_admission::AdmissionError;
use sc_core::ErrorKind;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: ErrorKind,
    pub message: String,
    /// Field that failed validation, when applicable.
    pub field: Option<&'static str>,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { status, kind, message: message.into(), field: None }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorKind::Authorization, "authentication required")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ErrorKind::Authorization, message)
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorKind::Validation, format!("{what} not found"))
    }

    pub fn rate_limited() -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, ErrorKind::Capacity, "rate limit exceeded")
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> Self {
        let correlation = uuid::Uuid::new_v4();
        tracing::error!(%correlation, error = %error, "internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Internal,
            format!("internal error (ref {correlation})"),
        )
    }
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        let kind = err.kind();
        match err {
            AdmissionError::SubscriptionRequired => {
                Self::new(StatusCode::PAYMENT_REQUIRED, kind, "active subscription required")
            }
            AdmissionError::Forbidden(message) => Self::new(StatusCode::FORBIDDEN, kind, message),
            AdmissionError::CapacityExceeded { .. } => {
                Self::new(StatusCode::CONFLICT, kind, err.to_string())
            }
            AdmissionError::CreditsExhausted { .. } => {
                Self::new(StatusCode::TOO_MANY_REQUESTS, kind, err.to_string())
            }
            AdmissionError::Validation { field, message } => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                kind,
                message,
                field: Some(field),
            },
            other => Self::internal(other),
        }
    }
}

impl From<sc_store::StoreError> for ApiError {
    fn from(err: sc_store::StoreError) -> Self {
        Self::internal(err)
    }
}

impl From<sc_queue::QueueError> for ApiError {
    fn from(err: sc_queue::QueueError) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "kind": self.kind,
                "message": self.message,
                "field": self.field,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
