// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical message model shared by every component.
//!
//! These types are independent of the provider's wire format. Conversion from
//! webhook payloads lives in `courier-engine`; conversion to and from SQL rows
//! lives in `courier-storage`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CourierError;
use crate::status::MessageStatus;

/// Direction of a message relative to this service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Kind of content a message carries.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Document,
    Audio,
    Video,
    Location,
    Contact,
}

impl MessageType {
    /// Derive the message type from a media content-type by prefix.
    ///
    /// `image/*`, `video/*` and `audio/*` map to their kinds, any
    /// `application/*` (PDF included) is a document, everything else is text.
    pub fn from_content_type(content_type: &str) -> Self {
        let ct = content_type.trim().to_ascii_lowercase();
        if ct.starts_with("image/") {
            Self::Image
        } else if ct.starts_with("video/") {
            Self::Video
        } else if ct.starts_with("audio/") {
            Self::Audio
        } else if ct.starts_with("application/") {
            Self::Document
        } else {
            Self::Text
        }
    }

    /// Whether the type requires a media reference when sending.
    pub fn is_media(self) -> bool {
        matches!(
            self,
            Self::Image | Self::Document | Self::Audio | Self::Video
        )
    }
}

/// Canonical record of one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Internally generated id, immutable after creation.
    pub id: String,
    /// The provider's message identifier. Unique across all records.
    pub provider_id: String,
    pub from: String,
    pub to: String,
    pub direction: Direction,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub status: MessageStatus,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Event time reported by the provider.
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Message {
    /// Create a new record with a fresh internal id.
    ///
    /// Type defaults to `text`, status to `pending`, and all timestamps to now.
    pub fn new(
        direction: Direction,
        provider_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            provider_id: provider_id.into(),
            from: from.into(),
            to: to.into(),
            direction,
            message_type: MessageType::Text,
            status: MessageStatus::Pending,
            content: String::new(),
            media_url: None,
            media_type: None,
            timestamp: now,
            created_at: now,
            updated_at: now,
            user_id: None,
            session_id: None,
            error_code: None,
            error_message: None,
        }
    }

    /// Reject records that cannot be persisted.
    pub fn validate(&self) -> Result<(), CourierError> {
        if self.provider_id.trim().is_empty() {
            return Err(CourierError::MalformedPayload(
                "missing provider message identifier".into(),
            ));
        }
        if self.id.trim().is_empty() {
            return Err(CourierError::MalformedPayload("missing internal id".into()));
        }
        let counterpart = match self.direction {
            Direction::Inbound => &self.from,
            Direction::Outbound => &self.to,
        };
        if counterpart.trim().is_empty() {
            return Err(CourierError::MalformedPayload(format!(
                "{} message has no counterpart address",
                self.direction
            )));
        }
        Ok(())
    }

    /// The participant on the far side of the conversation.
    pub fn participant(&self) -> &str {
        match self.direction {
            Direction::Inbound => &self.from,
            Direction::Outbound => &self.to,
        }
    }
}

/// One incoming status callback. Never persisted on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub provider_id: String,
    /// Canonical status mapped from `raw_status`.
    pub status: MessageStatus,
    /// Status string exactly as the provider reported it.
    pub raw_status: String,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StatusUpdate {
    /// Build an update from the provider's vocabulary. Blank error fields become `None`.
    pub fn from_provider(
        provider_id: impl Into<String>,
        raw_status: impl Into<String>,
        error_code: Option<String>,
        error_message: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let raw_status = raw_status.into();
        Self {
            provider_id: provider_id.into(),
            status: MessageStatus::from_provider(&raw_status),
            raw_status,
            error_code: error_code.filter(|c| !c.trim().is_empty()),
            error_message: error_message.filter(|m| !m.trim().is_empty()),
            timestamp,
        }
    }
}

/// A phone-number-identified participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub phone_number: String,
    /// Provider-specific identifier (WhatsApp id).
    pub provider_user_id: Option<String>,
    pub profile_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields observed on an inbound message, used to upsert a [`User`].
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub phone_number: String,
    pub provider_user_id: Option<String>,
    pub profile_name: Option<String>,
}

/// Lifecycle of a chat session. Managed by the orchestrator, not by this service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Ended,
}

/// A conversational context grouping messages for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub status: SessionStatus,
    pub context: Option<serde_json::Value>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Current UTC time truncated to millisecond precision.
///
/// Stored timestamps use millisecond precision, so records built in memory
/// compare equal to the same records read back from the store.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Format a timestamp the way it is persisted: `YYYY-MM-DDTHH:MM:SS.mmmZ`.
///
/// Fixed width keeps lexical order equal to chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp, normalizing to UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_mapping_by_prefix() {
        assert_eq!(MessageType::from_content_type("image/jpeg"), MessageType::Image);
        assert_eq!(MessageType::from_content_type("video/mp4"), MessageType::Video);
        assert_eq!(MessageType::from_content_type("audio/ogg"), MessageType::Audio);
        assert_eq!(
            MessageType::from_content_type("application/pdf"),
            MessageType::Document
        );
        assert_eq!(
            MessageType::from_content_type("application/vnd.ms-excel"),
            MessageType::Document
        );
        assert_eq!(MessageType::from_content_type("text/vcard"), MessageType::Text);
        assert_eq!(MessageType::from_content_type(""), MessageType::Text);
    }

    #[test]
    fn new_message_has_defaults() {
        let msg = Message::new(Direction::Inbound, "SM1", "whatsapp:+1", "whatsapp:+2");
        assert_eq!(msg.message_type, MessageType::Text);
        assert_eq!(msg.status, MessageStatus::Pending);
        assert!(!msg.id.is_empty());
        assert_eq!(msg.created_at, msg.updated_at);
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_provider_id() {
        let msg = Message::new(Direction::Inbound, "  ", "whatsapp:+1", "whatsapp:+2");
        assert!(matches!(
            msg.validate(),
            Err(CourierError::MalformedPayload(_))
        ));
    }

    #[test]
    fn validate_rejects_missing_counterpart() {
        let msg = Message::new(Direction::Outbound, "SM1", "whatsapp:+1", "");
        assert!(msg.validate().is_err());
    }

    #[test]
    fn message_serializes_type_field() {
        let mut msg = Message::new(Direction::Inbound, "SM1", "a", "b");
        msg.message_type = MessageType::Image;
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["direction"], "inbound");
        assert_eq!(json["status"], "pending");
        assert!(json.get("media_url").is_none());
    }

    #[test]
    fn status_update_drops_blank_error_fields() {
        let update = StatusUpdate::from_provider(
            "SM1",
            "delivered",
            Some(String::new()),
            Some("   ".into()),
            Utc::now(),
        );
        assert_eq!(update.status, MessageStatus::Delivered);
        assert!(update.error_code.is_none());
        assert!(update.error_message.is_none());
    }

    #[test]
    fn timestamps_are_fixed_width_and_round_trip() {
        let ts = parse_timestamp("2026-03-01T12:00:00+02:00").unwrap();
        let formatted = format_timestamp(&ts);
        assert_eq!(formatted, "2026-03-01T10:00:00.000Z");
        assert_eq!(parse_timestamp(&formatted), Some(ts));
        assert!(parse_timestamp("yesterday").is_none());
    }
}
