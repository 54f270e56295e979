// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound messaging provider trait.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::CourierError;
use crate::model::{MessageType, StatusUpdate};
use crate::status::MessageStatus;
use crate::traits::adapter::PluginAdapter;

/// What to send.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundContent {
    Text {
        body: String,
    },
    Media {
        body: Option<String>,
        media_url: String,
        media_type: Option<String>,
    },
    /// A pre-approved provider template with substitution variables.
    Template {
        template_id: String,
        variables: BTreeMap<String, String>,
    },
}

impl OutboundContent {
    /// Text recorded locally for the message.
    pub fn body(&self) -> &str {
        match self {
            Self::Text { body } => body,
            Self::Media { body, .. } => body.as_deref().unwrap_or(""),
            Self::Template { .. } => "",
        }
    }

    /// Message type recorded locally, given the type the caller asked for.
    pub fn message_type(&self, requested: Option<MessageType>) -> MessageType {
        match (self, requested) {
            (_, Some(t)) => t,
            (Self::Media { media_type, .. }, None) => media_type
                .as_deref()
                .map(MessageType::from_content_type)
                .unwrap_or(MessageType::Document),
            _ => MessageType::Text,
        }
    }
}

/// A send request with an already normalized destination.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub to: String,
    pub content: OutboundContent,
}

/// The provider's acknowledgment of an accepted send.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReceipt {
    pub provider_id: String,
    /// Status string exactly as the provider returned it.
    pub raw_status: String,
}

impl ProviderReceipt {
    /// Status recorded locally for an accepted send.
    ///
    /// The provider typically answers `queued`; locally an accepted send is
    /// `sent` unless the provider already reports something further along.
    pub fn local_status(&self) -> MessageStatus {
        let reported = MessageStatus::from_provider(&self.raw_status);
        if reported.rank() > MessageStatus::Sent.rank() {
            reported
        } else {
            MessageStatus::Sent
        }
    }
}

/// The upstream messaging provider.
#[async_trait]
pub trait Messenger: PluginAdapter {
    /// Address messages are sent from.
    fn sender_address(&self) -> &str;

    /// Issue a send. Rejections surface as [`CourierError::SendFailed`].
    async fn send(&self, request: &OutboundRequest) -> Result<ProviderReceipt, CourierError>;

    /// Fetch the provider's current status for a message.
    async fn fetch_status(&self, provider_id: &str) -> Result<StatusUpdate, CourierError>;
}
