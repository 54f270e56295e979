// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default reply handler.

use async_trait::async_trait;
use courier_core::{ChatResponse, CourierError, Message, ReplyHandler};
use tracing::info;

/// Records the orchestrator's answer in the log and does nothing else.
///
/// Sending the reply, when `should_reply` is set, belongs to whoever
/// installs a different handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingReplyHandler;

#[async_trait]
impl ReplyHandler for LoggingReplyHandler {
    async fn handle(&self, message: &Message, response: ChatResponse) -> Result<(), CourierError> {
        info!(
            message_id = %message.id,
            response_id = %response.response_id,
            should_reply = response.should_reply,
            next_action = response.next_action.as_deref().unwrap_or(""),
            content_len = response.content.len(),
            "orchestrator response received"
        );
        Ok(())
    }
}
