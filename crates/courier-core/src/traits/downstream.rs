// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Downstream collaborator traits used by the fan-out dispatcher.

use async_trait::async_trait;

use crate::downstream::{ChatRequest, ChatResponse, MediaAnalysisRequest};
use crate::error::CourierError;
use crate::model::Message;

/// Forwards inbound messages to the orchestration service.
#[async_trait]
pub trait Relay: Send + Sync + 'static {
    async fn relay(&self, request: &ChatRequest) -> Result<ChatResponse, CourierError>;
}

/// Submits media to the analyzer matching its kind.
#[async_trait]
pub trait MediaAnalyzer: Send + Sync + 'static {
    async fn analyze(&self, request: &MediaAnalysisRequest) -> Result<(), CourierError>;
}

/// Receives the orchestrator's answer for a relayed message.
///
/// Acting on `should_reply` is the handler's business.
#[async_trait]
pub trait ReplyHandler: Send + Sync + 'static {
    async fn handle(&self, message: &Message, response: ChatResponse)
    -> Result<(), CourierError>;
}
