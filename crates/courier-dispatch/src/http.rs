// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON-over-HTTP clients for the orchestration and media-analysis services.

use std::time::Duration;

use async_trait::async_trait;
use courier_config::model::DownstreamConfig;
use courier_core::{
    ChatRequest, ChatResponse, CourierError, MediaAnalysisRequest, MediaAnalyzer, Relay,
};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, info};

const CHAT_PROCESS_PATH: &str = "/api/v1/chat/process";

fn build_client(timeout: Duration) -> Result<reqwest::Client, CourierError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("courier/", env!("CARGO_PKG_VERSION"))),
    );
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| CourierError::Internal(format!("failed to build HTTP client: {e}")))
}

/// Maps a transport failure so that timeouts stay distinguishable.
fn transport_error(service: &str, timeout: Duration, e: reqwest::Error) -> CourierError {
    if e.is_timeout() {
        CourierError::Timeout { duration: timeout }
    } else {
        CourierError::Downstream {
            service: service.to_string(),
            status: None,
            message: e.to_string(),
        }
    }
}

async fn ensure_success(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, CourierError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CourierError::Downstream {
        service: service.to_string(),
        status: Some(status.as_u16()),
        message: format!("returned {status}: {body}"),
    })
}

/// Relays inbound messages to `{orchestrator_url}/api/v1/chat/process`.
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpRelay {
    pub const SERVICE: &'static str = "orchestrator";

    pub fn new(config: &DownstreamConfig) -> Result<Self, CourierError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(Self {
            client: build_client(timeout)?,
            url: format!(
                "{}{CHAT_PROCESS_PATH}",
                config.orchestrator_url.trim_end_matches('/')
            ),
            timeout,
        })
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn relay(&self, request: &ChatRequest) -> Result<ChatResponse, CourierError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(Self::SERVICE, self.timeout, e))?;
        let response = ensure_success(Self::SERVICE, response).await?;
        let status = response.status().as_u16();

        let chat: ChatResponse = response.json().await.map_err(|e| CourierError::Downstream {
            service: Self::SERVICE.into(),
            status: Some(status),
            message: format!("failed to decode response: {e}"),
        })?;

        info!(
            message_id = %request.message_id,
            response_id = %chat.response_id,
            should_reply = chat.should_reply,
            next_action = chat.next_action.as_deref().unwrap_or(""),
            "orchestrator processed message"
        );
        Ok(chat)
    }
}

/// Submits media to `{ai_processing_url}` at the endpoint for its kind.
#[derive(Debug, Clone)]
pub struct HttpMediaAnalyzer {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpMediaAnalyzer {
    pub const SERVICE: &'static str = "media-analysis";

    pub fn new(config: &DownstreamConfig) -> Result<Self, CourierError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Ok(Self {
            client: build_client(timeout)?,
            base_url: config.ai_processing_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl MediaAnalyzer for HttpMediaAnalyzer {
    async fn analyze(&self, request: &MediaAnalysisRequest) -> Result<(), CourierError> {
        let url = format!("{}{}", self.base_url, request.kind.endpoint());
        debug!(message_id = %request.message_id, url = %url, "submitting media for analysis");

        let response = self
            .client
            .post(&url)
            .json(&request.to_json())
            .send()
            .await
            .map_err(|e| transport_error(Self::SERVICE, self.timeout, e))?;
        ensure_success(Self::SERVICE, response).await?;

        info!(message_id = %request.message_id, kind = %request.kind, "media submitted for analysis");
        Ok(())
    }
}
