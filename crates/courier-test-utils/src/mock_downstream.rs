// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock orchestrator and media analyzer.

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::{
    ChatRequest, ChatResponse, CourierError, MediaAnalysisRequest, MediaAnalyzer, Relay,
};

fn unavailable(service: &str) -> CourierError {
    CourierError::Downstream {
        service: service.to_string(),
        status: Some(503),
        message: "mock unavailable".into(),
    }
}

#[derive(Default)]
struct RelayState {
    requests: Vec<ChatRequest>,
    /// Number of calls, counting failures.
    calls: u32,
    failures_left: u32,
}

/// Records relayed requests and answers with a fixed response.
///
/// The first `n` calls after [`MockRelay::fail_next`] fail with a transient
/// error, which lets tests observe retries.
#[derive(Default)]
pub struct MockRelay {
    state: Mutex<RelayState>,
    response: ChatResponse,
}

impl MockRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(response: ChatResponse) -> Self {
        Self {
            state: Mutex::default(),
            response,
        }
    }

    pub async fn fail_next(&self, n: u32) {
        self.state.lock().await.failures_left = n;
    }

    /// Successfully relayed requests.
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.state.lock().await.requests.clone()
    }

    pub async fn calls(&self) -> u32 {
        self.state.lock().await.calls
    }
}

#[async_trait]
impl Relay for MockRelay {
    async fn relay(&self, request: &ChatRequest) -> Result<ChatResponse, CourierError> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(unavailable("orchestrator"));
        }
        state.requests.push(request.clone());
        Ok(self.response.clone())
    }
}

/// Records media analysis submissions.
#[derive(Default)]
pub struct MockAnalyzer {
    requests: Mutex<Vec<MediaAnalysisRequest>>,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn requests(&self) -> Vec<MediaAnalysisRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl MediaAnalyzer for MockAnalyzer {
    async fn analyze(&self, request: &MediaAnalysisRequest) -> Result<(), CourierError> {
        self.requests.lock().await.push(request.clone());
        Ok(())
    }
}
