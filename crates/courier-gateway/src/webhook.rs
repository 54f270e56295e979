// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider webhook handlers.
//!
//! Both POST endpoints accept either payload variant and route by variant;
//! the path only labels metrics. Signature checks have already run.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courier_engine::WebhookPayload;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Query of the subscription challenge.
#[derive(Debug, Default, Deserialize)]
pub struct ChallengeQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
}

/// GET /webhooks/whatsapp/verify
///
/// Echoes `hub.challenge` when `hub.mode` is `subscribe` (and, if a verify
/// token is configured, `hub.verify_token` matches it).
pub async fn verify_challenge(
    State(state): State<GatewayState>,
    Query(query): Query<ChallengeQuery>,
) -> Response {
    let token_ok = match state.webhook.verify_token() {
        Some(expected) => query.verify_token.as_deref() == Some(expected),
        None => true,
    };
    match (query.mode.as_deref(), query.challenge) {
        (Some("subscribe"), Some(challenge)) if !challenge.is_empty() && token_ok => {
            info!("webhook verification succeeded");
            (StatusCode::OK, challenge).into_response()
        }
        _ => {
            warn!(
                mode = query.mode.as_deref().unwrap_or(""),
                token_ok, "webhook verification failed"
            );
            StatusCode::BAD_REQUEST.into_response()
        }
    }
}

/// POST /webhooks/whatsapp/messages
pub async fn post_message(State(state): State<GatewayState>, body: Bytes) -> Response {
    receive(&state, "message", &body).await
}

/// POST /webhooks/whatsapp/status
pub async fn post_status(State(state): State<GatewayState>, body: Bytes) -> Response {
    receive(&state, "status", &body).await
}

async fn receive(state: &GatewayState, endpoint: &'static str, body: &[u8]) -> Response {
    let payload = match WebhookPayload::from_form(body) {
        Ok(payload) => payload,
        Err(e) => {
            courier_prometheus::record_webhook(endpoint, "malformed");
            warn!(endpoint, error = %e, "rejecting malformed webhook");
            return ApiError::from(e).into_response();
        }
    };
    if payload.kind() != endpoint {
        debug!(
            endpoint,
            kind = payload.kind(),
            provider_id = %payload.provider_id(),
            "webhook delivered to the other endpoint"
        );
    }

    match state.ingestor.ingest(&payload).await {
        Ok(outcome) => {
            debug!(provider_id = %payload.provider_id(), outcome = outcome.label(), "webhook processed");
            StatusCode::OK.into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_query_uses_dotted_names() {
        let query: ChallengeQuery = parse_query(
            "hub.mode=subscribe&hub.challenge=1158201444&hub.verify_token=tok",
        );
        assert_eq!(query.mode.as_deref(), Some("subscribe"));
        assert_eq!(query.challenge.as_deref(), Some("1158201444"));
        assert_eq!(query.verify_token.as_deref(), Some("tok"));
    }

    fn parse_query(raw: &str) -> ChallengeQuery {
        let uri: axum::http::Uri = format!("/verify?{raw}").parse().unwrap();
        Query::<ChallengeQuery>::try_from_uri(&uri).unwrap().0
    }
}
