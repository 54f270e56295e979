// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue},
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use courier_core::{BlobStore, CourierError};
use courier_engine::{Ingestor, OutboundSender};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{ApiAuth, bearer_middleware};
use crate::health::{self, HealthState};
use crate::signature::{WebhookVerifier, verify_webhook};
use crate::{handlers, webhook};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub ingestor: Ingestor,
    pub sender: OutboundSender,
    pub blobs: Arc<dyn BlobStore>,
    pub webhook: Arc<WebhookVerifier>,
    pub auth: ApiAuth,
    pub health: HealthState,
    pub max_upload_bytes: usize,
}

/// Bind address of the gateway.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    (
        "strict-transport-security",
        "max-age=31536000; includeSubDomains",
    ),
];

/// Builds the full route table.
///
/// - `GET /health`, `GET /ready`, `GET /metrics` (public)
/// - `GET /webhooks/whatsapp/verify` (public)
/// - `POST /webhooks/whatsapp/{messages,status}` (signature-verified)
/// - `/api/v1/*` (bearer token, when configured)
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::get_health))
        .route("/ready", get(health::get_ready))
        .route("/metrics", get(health::get_metrics))
        .route("/webhooks/whatsapp/verify", get(webhook::verify_challenge))
        .with_state(state.clone());

    let webhook_routes = Router::new()
        .route("/webhooks/whatsapp/messages", post(webhook::post_message))
        .route("/webhooks/whatsapp/status", post(webhook::post_status))
        .route_layer(axum_middleware::from_fn_with_state(
            state.webhook.clone(),
            verify_webhook,
        ))
        .with_state(state.clone());

    let upload_routes = Router::new()
        .route("/api/v1/media/upload", post(handlers::upload_media))
        // Multipart framing on top of the file itself.
        .layer(DefaultBodyLimit::max(state.max_upload_bytes + 64 * 1024));

    let api_routes = Router::new()
        .route("/api/v1/messages", get(handlers::list_messages))
        .route("/api/v1/messages/send", post(handlers::send_message))
        .route("/api/v1/messages/{id}", get(handlers::get_message))
        .route("/api/v1/messages/{id}/refresh", post(handlers::refresh_message))
        .route("/api/v1/sessions/{id}", get(handlers::get_session))
        .route("/api/v1/media", delete(handlers::delete_media))
        .merge(upload_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            bearer_middleware,
        ))
        .with_state(state);

    let mut app = Router::new()
        .merge(public_routes)
        .merge(webhook_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());
    for (name, value) in SECURITY_HEADERS {
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }
    app
}

/// Serve the gateway until `shutdown` is cancelled, then drain open
/// connections.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), CourierError> {
    if state.auth.is_open() {
        tracing::warn!("api.bearer_token is not set -- /api/v1 is unauthenticated");
    }
    if state.webhook.is_disabled() {
        tracing::warn!("webhook.secret is not set -- webhook signatures are not verified");
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CourierError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| CourierError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
