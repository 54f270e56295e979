// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out of one recorded inbound message to its downstream consumers.

use std::sync::Arc;

use courier_core::{
    ChatRequest, CourierError, MediaAnalysisRequest, MediaAnalyzer, Message, Relay, ReplyHandler,
};
use tracing::{debug, warn};

use crate::dispatcher::Dispatcher;

/// Submits the media task and the relay task for an inbound message.
///
/// The two tasks are independent submissions: one being rejected or failing
/// has no effect on the other.
#[derive(Clone)]
pub struct FanOut {
    dispatcher: Dispatcher,
    relay: Arc<dyn Relay>,
    analyzer: Arc<dyn MediaAnalyzer>,
    replies: Arc<dyn ReplyHandler>,
}

impl FanOut {
    pub fn new(
        dispatcher: Dispatcher,
        relay: Arc<dyn Relay>,
        analyzer: Arc<dyn MediaAnalyzer>,
        replies: Arc<dyn ReplyHandler>,
    ) -> Self {
        Self {
            dispatcher,
            relay,
            analyzer,
            replies,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Hands `message` to the downstream consumers. Returns how many tasks
    /// were accepted.
    pub fn dispatch_inbound(&self, message: &Message) -> usize {
        let mut accepted = 0;

        match MediaAnalysisRequest::for_message(message) {
            Some(request) => {
                let analyzer = Arc::clone(&self.analyzer);
                let request = Arc::new(request);
                let submitted = self.dispatcher.submit("media", move || {
                    let analyzer = Arc::clone(&analyzer);
                    let request = Arc::clone(&request);
                    async move { analyzer.analyze(&request).await }
                });
                match submitted {
                    Ok(()) => accepted += 1,
                    Err(e) => warn!(message_id = %message.id, error = %e, "media task not submitted"),
                }
            }
            None if message.media_url.is_some() => {
                debug!(
                    message_id = %message.id,
                    media_type = message.media_type.as_deref().unwrap_or(""),
                    "no analyzer for media type, skipping"
                );
            }
            None => {}
        }

        let relay = Arc::clone(&self.relay);
        let replies = Arc::clone(&self.replies);
        let record = Arc::new(message.clone());
        let request = Arc::new(ChatRequest::from(message));
        let submitted = self.dispatcher.submit("relay", move || {
            let relay = Arc::clone(&relay);
            let replies = Arc::clone(&replies);
            let record = Arc::clone(&record);
            let request = Arc::clone(&request);
            async move {
                let response = relay.relay(&request).await?;
                // Handler failures must not re-run the relay.
                replies
                    .handle(&record, response)
                    .await
                    .map_err(|e| CourierError::Internal(format!("reply handler failed: {e}")))
            }
        });
        match submitted {
            Ok(()) => accepted += 1,
            Err(e) => warn!(message_id = %message.id, error = %e, "relay task not submitted"),
        }

        accepted
    }
}
