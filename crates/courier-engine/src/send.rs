// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound send path.
//!
//! The provider call comes first. A local record exists only for sends the
//! provider accepted, and failing to write that record does not turn an
//! accepted send into an error: the message exists at the provider either way.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use courier_core::model::format_timestamp;
use courier_core::{
    CourierError, Direction, Message, MessageStatus, MessageType, Messenger, OutboundContent,
    OutboundRequest, StatusOutcome, UpsertMode, phone_number, whatsapp_address,
};

use crate::repository::MessageRepository;

/// Body of `POST /api/v1/messages/send`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendRequest {
    pub to: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "type")]
    pub message_type: Option<MessageType>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    /// Provider template (content) id.
    #[serde(default, alias = "template_id")]
    pub template: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SendRequest {
    /// Pick what to send: template, then media, then text.
    pub fn outbound_content(&self) -> Result<OutboundContent, CourierError> {
        if let Some(template_id) = non_empty(&self.template) {
            return Ok(OutboundContent::Template {
                template_id: template_id.to_string(),
                variables: self.variables.clone(),
            });
        }

        if let Some(media_url) = non_empty(&self.media_url) {
            return Ok(OutboundContent::Media {
                body: Some(self.content.clone()).filter(|c| !c.is_empty()),
                media_url: media_url.to_string(),
                media_type: non_empty(&self.media_type).map(str::to_string),
            });
        }

        if let Some(t) = self.message_type.filter(|t| t.is_media()) {
            return Err(CourierError::MalformedPayload(format!(
                "media_url is required for {t} messages"
            )));
        }
        if non_empty(&self.media_type).is_some() {
            return Err(CourierError::MalformedPayload(
                "media_type given without media_url".into(),
            ));
        }
        if self.content.trim().is_empty() {
            return Err(CourierError::MalformedPayload(
                "content is required for text messages".into(),
            ));
        }
        Ok(OutboundContent::Text {
            body: self.content.clone(),
        })
    }
}

/// Response of a successful send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendResponse {
    pub id: String,
    #[serde(rename = "twilio_sid")]
    pub provider_id: String,
    pub status: MessageStatus,
    pub created_at: String,
    /// False when the provider accepted the send but the local write failed.
    #[serde(skip)]
    pub recorded: bool,
}

/// Sends through the provider and records what it accepted.
#[derive(Clone)]
pub struct OutboundSender {
    messenger: Arc<dyn Messenger>,
    repository: MessageRepository,
}

impl OutboundSender {
    pub fn new(messenger: Arc<dyn Messenger>, repository: MessageRepository) -> Self {
        Self {
            messenger,
            repository,
        }
    }

    pub async fn send(&self, request: &SendRequest) -> Result<SendResponse, CourierError> {
        if request.to.trim().is_empty() {
            return Err(CourierError::MalformedPayload("missing destination".into()));
        }
        let content = request.outbound_content()?;
        let to = whatsapp_address(&request.to);

        let outbound = OutboundRequest {
            to: to.clone(),
            content,
        };
        let receipt = match self.messenger.send(&outbound).await {
            Ok(receipt) => receipt,
            Err(e) => {
                courier_prometheus::record_send("failed");
                warn!(to = %to, error = %e, "provider rejected send");
                return Err(e);
            }
        };

        let mut message = Message::new(
            Direction::Outbound,
            receipt.provider_id.clone(),
            self.messenger.sender_address(),
            to,
        );
        message.status = receipt.local_status();
        message.content = outbound.content.body().to_string();
        message.message_type = outbound.content.message_type(request.message_type);
        if let OutboundContent::Media {
            media_url,
            media_type,
            ..
        } = &outbound.content
        {
            message.media_url = Some(media_url.clone());
            message.media_type = media_type.clone();
        }
        message.session_id = non_empty(&request.session_id).map(str::to_string);

        match self
            .repository
            .get_user_by_phone(phone_number(&message.to))
            .await
        {
            Ok(user) => message.user_id = user.map(|u| u.id),
            Err(e) => warn!(to = %message.to, error = %e, "user lookup failed"),
        }

        let (message, recorded) = match self
            .repository
            .record(&message, UpsertMode::Acknowledge)
            .await
        {
            Ok(outcome) => (outcome.into_message(), true),
            Err(e) => {
                warn!(
                    provider_id = %message.provider_id,
                    error = %e,
                    "send accepted by provider but not recorded locally"
                );
                (message, false)
            }
        };

        courier_prometheus::record_send(if recorded { "sent" } else { "unrecorded" });
        info!(
            message_id = %message.id,
            provider_id = %message.provider_id,
            message_type = %message.message_type,
            status = %message.status,
            "message sent"
        );

        Ok(SendResponse {
            id: message.id,
            provider_id: message.provider_id,
            status: message.status,
            created_at: format_timestamp(&message.created_at),
            recorded,
        })
    }

    /// Ask the provider for the current status of a stored message and
    /// reconcile it. `None` when no message has `id`.
    pub async fn refresh_status(&self, id: &str) -> Result<Option<StatusOutcome>, CourierError> {
        let Some(message) = self.repository.get(id).await? else {
            return Ok(None);
        };
        let update = self.messenger.fetch_status(&message.provider_id).await?;
        let outcome = self.repository.apply_status(&update).await?;
        info!(
            message_id = %id,
            provider_id = %message.provider_id,
            outcome = outcome.label(),
            "status refreshed from provider"
        );
        Ok(Some(outcome))
    }
}
