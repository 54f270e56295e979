// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire contracts with the downstream collaborators.
//!
//! The orchestrator receives a [`ChatRequest`] per inbound message and answers
//! with a [`ChatResponse`]. Media analyzers receive a [`MediaAnalysisRequest`]
//! posted to the endpoint matching its [`MediaKind`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::model::{Direction, Message, MessageType};

/// Channel name reported to collaborators.
pub const PLATFORM: &str = "whatsapp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatContext {
    pub platform: String,
    #[serde(rename = "twilio_sid")]
    pub provider_id: String,
    pub direction: Direction,
}

/// Request posted to the orchestrator's processing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message_id: String,
    pub user_phone: String,
    pub content: String,
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub context: ChatContext,
}

impl From<&Message> for ChatRequest {
    fn from(message: &Message) -> Self {
        Self {
            message_id: message.id.clone(),
            user_phone: message.from.clone(),
            content: message.content.clone(),
            message_type: message.message_type,
            media_url: message.media_url.clone(),
            media_type: message.media_type.clone(),
            timestamp: message.timestamp,
            context: ChatContext {
                platform: PLATFORM.to_string(),
                provider_id: message.provider_id.clone(),
                direction: message.direction,
            },
        }
    }
}

/// The orchestrator's answer. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub response_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub should_reply: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

/// Media classes with a dedicated analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    /// Classify a content-type. Unknown types have no analyzer.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match MessageType::from_content_type(content_type) {
            MessageType::Image => Some(Self::Image),
            MessageType::Video => Some(Self::Video),
            MessageType::Audio => Some(Self::Audio),
            MessageType::Document => Some(Self::Document),
            _ => None,
        }
    }

    /// Analyzer endpoint path relative to the AI processing base URL.
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Image => "/api/v1/images/analyze",
            Self::Video => "/api/v1/videos/analyze",
            Self::Audio => "/api/v1/audio/transcribe",
            Self::Document => "/api/v1/documents/analyze",
        }
    }

    /// Name of the URL field in the analyzer request body.
    pub fn url_field(self) -> &'static str {
        match self {
            Self::Image => "image_url",
            Self::Video => "video_url",
            Self::Audio => "audio_url",
            Self::Document => "document_url",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaContext {
    pub platform: String,
    pub timestamp: DateTime<Utc>,
}

/// Request posted to a media analyzer. The URL field name depends on the kind,
/// see [`MediaAnalysisRequest::to_json`].
#[derive(Debug, Clone, PartialEq)]
pub struct MediaAnalysisRequest {
    pub kind: MediaKind,
    pub message_id: String,
    pub media_url: String,
    pub user_phone: String,
    pub context: MediaContext,
}

impl MediaAnalysisRequest {
    /// Build a request for a media-bearing message. `None` when the message
    /// has no media or its content-type has no analyzer.
    pub fn for_message(message: &Message) -> Option<Self> {
        let media_url = message.media_url.as_ref()?;
        let kind = MediaKind::from_content_type(message.media_type.as_deref().unwrap_or(""))?;
        Some(Self {
            kind,
            message_id: message.id.clone(),
            media_url: media_url.clone(),
            user_phone: message.from.clone(),
            context: MediaContext {
                platform: PLATFORM.to_string(),
                timestamp: message.timestamp,
            },
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert("message_id".into(), self.message_id.clone().into());
        body.insert(self.kind.url_field().into(), self.media_url.clone().into());
        body.insert("user_phone".into(), self.user_phone.clone().into());
        body.insert(
            "context".into(),
            serde_json::to_value(&self.context).unwrap_or(serde_json::Value::Null),
        );
        serde_json::Value::Object(body)
    }
}
