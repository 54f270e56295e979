// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of errors onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courier_core::CourierError;
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// A handler failure.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Courier(CourierError),
}

impl From<CourierError> for ApiError {
    fn from(e: CourierError) -> Self {
        Self::Courier(e)
    }
}

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Courier(CourierError::MalformedPayload(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Courier(e) => match e {
                CourierError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
                CourierError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
                CourierError::UnknownMessage { .. } => StatusCode::NOT_FOUND,
                CourierError::Storage { .. } | CourierError::Cache { .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                CourierError::SendFailed { .. } | CourierError::Downstream { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                CourierError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                CourierError::Config(_) | CourierError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            Self::NotFound(what) => format!("{what} not found"),
            // Store internals stay in the logs.
            Self::Courier(CourierError::Storage { source }) => {
                tracing::error!(error = %source, "storage failure");
                "storage unavailable".to_string()
            }
            Self::Courier(e) => {
                if status.is_server_error() {
                    tracing::warn!(status = status.as_u16(), error = %e, "request failed");
                }
                e.to_string()
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
