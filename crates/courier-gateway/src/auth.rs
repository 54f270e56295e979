// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer token middleware for the `/api/v1` routes.
//!
//! With no token configured the API is open; the server logs a warning about
//! it once at startup.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use courier_core::CourierError;

use crate::error::ApiError;

/// API authentication configuration.
#[derive(Clone, Default)]
pub struct ApiAuth {
    /// Expected bearer token. `None` leaves the API open.
    pub bearer_token: Option<String>,
}

impl ApiAuth {
    pub fn new(bearer_token: Option<String>) -> Self {
        Self {
            bearer_token: bearer_token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.bearer_token.is_none()
    }
}

impl std::fmt::Debug for ApiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiAuth")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

pub async fn bearer_middleware(
    State(auth): State<ApiAuth>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = auth.bearer_token.as_deref() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => next.run(request).await,
        Some(_) => {
            tracing::debug!(path = %request.uri().path(), "bearer token mismatch");
            ApiError::from(CourierError::AuthenticationFailed("invalid bearer token".into()))
                .into_response()
        }
        None => ApiError::from(CourierError::AuthenticationFailed(
            "missing bearer token".into(),
        ))
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_leaves_api_open() {
        assert!(ApiAuth::new(None).is_open());
        assert!(ApiAuth::new(Some("  ".into())).is_open());
        assert!(!ApiAuth::new(Some("secret-token".into())).is_open());
    }

    #[test]
    fn debug_redacts_token() {
        let auth = ApiAuth::new(Some("secret-token".into()));
        let debug_output = format!("{auth:?}");
        assert!(!debug_output.contains("secret-token"));
        assert!(debug_output.contains("[redacted]"));
    }
}
