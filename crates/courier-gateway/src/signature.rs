// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification middleware.
//!
//! The signature covers the URL the provider called, so behind a proxy the
//! externally visible base URL has to be configured for verification to
//! succeed.

use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{header::HOST, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use courier_config::SignatureScheme;
use courier_config::model::WebhookConfig;
use courier_twilio::{SIGNATURE_HEADER, verify_signature};
use tracing::warn;

use crate::error::ApiError;

/// Largest webhook body read for verification.
pub const MAX_WEBHOOK_BODY: usize = 256 * 1024;

/// Webhook verification settings.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Option<String>,
    scheme: SignatureScheme,
    public_base_url: Option<String>,
    verify_token: Option<String>,
}

impl WebhookVerifier {
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self {
            secret: config.effective_secret().map(str::to_string),
            scheme: config.signature_scheme,
            public_base_url: config
                .public_base_url
                .as_deref()
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            verify_token: config.verify_token.clone().filter(|t| !t.is_empty()),
        }
    }

    /// Development mode: no secret, nothing verified.
    pub fn is_disabled(&self) -> bool {
        self.secret.is_none()
    }

    pub fn verify_token(&self) -> Option<&str> {
        self.verify_token.as_deref()
    }

    /// The URL the provider signed.
    pub fn signed_url(&self, parts: &Parts) -> String {
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        if let Some(base) = &self.public_base_url {
            return format!("{base}{path_and_query}");
        }
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let host = header(HOST.as_str()).unwrap_or_else(|| "localhost".into());
        let scheme = header("x-forwarded-proto").unwrap_or_else(|| "http".into());
        format!("{scheme}://{host}{path_and_query}")
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .field("scheme", &self.scheme)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

fn webhook_kind(path: &str) -> &'static str {
    if path.ends_with("/status") {
        "status"
    } else {
        "message"
    }
}

/// Rejects webhook requests whose signature does not verify.
///
/// Runs before the body is parsed; the body is buffered and handed on
/// unchanged.
pub async fn verify_webhook(
    State(verifier): State<Arc<WebhookVerifier>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(secret) = verifier.secret.as_deref() else {
        warn!(
            path = %request.uri().path(),
            "webhook secret not configured, skipping signature verification"
        );
        return next.run(request).await;
    };

    let (parts, body) = request.into_parts();
    let kind = webhook_kind(parts.uri.path());
    let bytes = match to_bytes(body, MAX_WEBHOOK_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            courier_prometheus::record_webhook(kind, "malformed");
            return ApiError::malformed(format!("unreadable body: {e}")).into_response();
        }
    };

    let provided = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let url = verifier.signed_url(&parts);

    if let Err(e) = verify_signature(verifier.scheme, secret, &url, &bytes, provided) {
        courier_prometheus::record_webhook(kind, "unauthorized");
        warn!(url = %url, error = %e, "webhook signature rejected");
        return ApiError::from(e).into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes)))
        .await
}
