// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unauthenticated liveness, readiness and metrics endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use courier_core::{CourierError, HealthStatus, PluginAdapter};
use serde::Serialize;

use crate::server::GatewayState;

const SERVICE: &str = "courier";
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl HealthState {
    pub fn new(prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>) -> Self {
        Self {
            start_time: Instant::now(),
            prometheus_render,
        }
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub timestamp: String,
}

/// One dependency check in a readiness response.
#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Response body for GET /ready.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub checks: BTreeMap<&'static str, CheckResult>,
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        timestamp: courier_core::model::format_timestamp(&chrono::Utc::now()),
    })
}

async fn check<A: PluginAdapter + ?Sized>(adapter: &A) -> (bool, CheckResult) {
    let result = match tokio::time::timeout(CHECK_TIMEOUT, adapter.health_check()).await {
        Ok(result) => result,
        Err(_) => Err(CourierError::Timeout {
            duration: CHECK_TIMEOUT,
        }),
    };
    match result {
        Ok(status) => {
            let detail = match &status {
                HealthStatus::Healthy => None,
                HealthStatus::Degraded(d) | HealthStatus::Unhealthy(d) => Some(d.clone()),
            };
            (
                status.is_ready(),
                CheckResult {
                    status: status.label(),
                    detail,
                },
            )
        }
        Err(e) => {
            tracing::error!(adapter = adapter.name(), error = %e, "health check failed");
            (
                false,
                CheckResult {
                    status: "unhealthy",
                    detail: Some(e.to_string()),
                },
            )
        }
    }
}

/// GET /ready
///
/// 503 when the store or the cache is unhealthy.
pub async fn get_ready(State(state): State<GatewayState>) -> Response {
    let repository = state.ingestor.repository();
    let (store_ready, store) = check(repository.store().as_ref()).await;
    let (cache_ready, cache) = check(repository.cache().as_ref()).await;

    let ready = store_ready && cache_ready;
    let body = ReadyResponse {
        status: if ready { "ready" } else { "not ready" },
        service: SERVICE,
        version: env!("CARGO_PKG_VERSION"),
        checks: BTreeMap::from([("store", store), ("cache", cache)]),
    };
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(body)).into_response()
}

/// GET /metrics
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics not enabled").into_response(),
    }
}
