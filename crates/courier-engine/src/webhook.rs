// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider webhook payloads.
//!
//! The provider posts one form shape for both new messages and status
//! callbacks. [`WebhookPayload::from_form`] is the single validating parse
//! step that decides which one a delivery is; nothing downstream sees the
//! raw form.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use courier_core::model::{now_millis, parse_timestamp};
use courier_core::{
    CourierError, Direction, Message, MessageStatus, MessageType, StatusUpdate, UserProfile,
    phone_number, whatsapp_address,
};

/// Raw form fields. Every field is optional on the wire; unknown ones are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WebhookForm {
    message_sid: Option<String>,
    sms_message_sid: Option<String>,
    sms_sid: Option<String>,
    from: Option<String>,
    to: Option<String>,
    body: Option<String>,
    num_media: Option<String>,
    sms_status: Option<String>,
    message_status: Option<String>,
    error_code: Option<String>,
    error_message: Option<String>,
    profile_name: Option<String>,
    wa_id: Option<String>,
    latitude: Option<String>,
    longitude: Option<String>,
    timestamp: Option<String>,
}

/// The provider never attaches more than this many items to one message.
const MAX_MEDIA: usize = 10;

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Indexed `MediaUrlN`/`MediaContentTypeN` pairs, in index order, capped at
/// the advertised media count.
fn media_items(pairs: &[(String, String)], count: usize) -> Vec<MediaRef> {
    let field = |name: String| {
        pairs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.trim().to_string())
    };
    (0..count)
        .filter_map(|i| {
            let url = field(format!("MediaUrl{i}")).filter(|u| !u.is_empty())?;
            Some(MediaRef {
                url,
                content_type: field(format!("MediaContentType{i}")).unwrap_or_default(),
            })
        })
        .collect()
}

/// Event time reported by the provider, or now when absent or malformed.
fn event_time(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(parse_timestamp)
        .and_then(|ts| DateTime::from_timestamp_millis(ts.timestamp_millis()))
        .unwrap_or_else(now_millis)
}

/// Media attached to an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRef {
    pub url: String,
    pub content_type: String,
}

/// A shared location.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub latitude: String,
    pub longitude: String,
}

/// A message the provider received on our behalf.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessagePayload {
    pub provider_id: String,
    pub from: String,
    pub to: String,
    pub body: String,
    /// Attachments in provider order. The stored record carries the first.
    pub media: Vec<MediaRef>,
    pub location: Option<Location>,
    pub profile_name: Option<String>,
    pub provider_user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl NewMessagePayload {
    /// Canonical record for this delivery. Inbound messages are already
    /// received, so they start out `delivered`.
    pub fn to_message(&self) -> Message {
        let mut message = Message::new(
            Direction::Inbound,
            self.provider_id.clone(),
            self.from.clone(),
            self.to.clone(),
        );
        message.status = MessageStatus::Delivered;
        message.timestamp = self.timestamp;
        message.content = self.body.clone();

        if let Some(media) = self.media.first() {
            message.message_type = MessageType::from_content_type(&media.content_type);
            message.media_url = Some(media.url.clone());
            message.media_type = Some(media.content_type.clone()).filter(|ct| !ct.is_empty());
        } else if let Some(location) = &self.location {
            message.message_type = MessageType::Location;
            if message.content.is_empty() {
                message.content = format!("{},{}", location.latitude, location.longitude);
            }
        }
        message
    }

    /// The sender as a user registry entry.
    pub fn sender_profile(&self) -> UserProfile {
        UserProfile {
            phone_number: phone_number(&self.from).to_string(),
            provider_user_id: self.provider_user_id.clone(),
            profile_name: self.profile_name.clone(),
        }
    }
}

/// A delivery status callback.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPayload {
    pub provider_id: String,
    pub raw_status: String,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StatusPayload {
    pub fn to_update(&self) -> StatusUpdate {
        StatusUpdate::from_provider(
            self.provider_id.clone(),
            self.raw_status.clone(),
            self.error_code.clone(),
            self.error_message.clone(),
            self.timestamp,
        )
    }
}

/// One validated webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookPayload {
    NewMessage(NewMessagePayload),
    Status(StatusPayload),
}

impl WebhookPayload {
    /// Parse a form-encoded webhook body.
    ///
    /// A delivery is a status callback when it carries a status and neither a
    /// body nor a media count; `received` is the status of a new message.
    pub fn from_form(body: &[u8]) -> Result<Self, CourierError> {
        let form: WebhookForm = serde_urlencoded::from_bytes(body)
            .map_err(|e| CourierError::MalformedPayload(format!("invalid form body: {e}")))?;
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
            .map_err(|e| CourierError::MalformedPayload(format!("invalid form body: {e}")))?;

        let provider_id = present(form.message_sid)
            .or_else(|| present(form.sms_message_sid))
            .or_else(|| present(form.sms_sid))
            .ok_or_else(|| CourierError::MalformedPayload("missing MessageSid".into()))?;

        let status = present(form.message_status).or_else(|| present(form.sms_status));
        let body_text = form.body;
        let is_status = match &status {
            Some(s) => {
                !s.eq_ignore_ascii_case("received")
                    && body_text.is_none()
                    && form.num_media.is_none()
            }
            None => false,
        };

        let timestamp = event_time(form.timestamp.as_deref());

        if is_status {
            return Ok(Self::Status(StatusPayload {
                provider_id,
                raw_status: status.unwrap_or_default(),
                error_code: present(form.error_code),
                error_message: present(form.error_message),
                timestamp,
            }));
        }

        let from = present(form.from)
            .map(|f| whatsapp_address(&f))
            .ok_or_else(|| CourierError::MalformedPayload("missing From".into()))?;
        let num_media = form
            .num_media
            .as_deref()
            .and_then(|n| n.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let media = media_items(&pairs, num_media.min(MAX_MEDIA));
        let location = match (present(form.latitude), present(form.longitude)) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
            }),
            _ => None,
        };

        Ok(Self::NewMessage(NewMessagePayload {
            provider_id,
            from,
            to: present(form.to)
                .map(|t| whatsapp_address(&t))
                .unwrap_or_default(),
            body: body_text.unwrap_or_default(),
            media,
            location,
            profile_name: present(form.profile_name),
            provider_user_id: present(form.wa_id),
            timestamp,
        }))
    }

    /// Metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewMessage(_) => "message",
            Self::Status(_) => "status",
        }
    }

    pub fn provider_id(&self) -> &str {
        match self {
            Self::NewMessage(p) => &p.provider_id,
            Self::Status(p) => &p.provider_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> WebhookPayload {
        WebhookPayload::from_form(body.as_bytes()).unwrap()
    }

    fn new_message(body: &str) -> NewMessagePayload {
        match parse(body) {
            WebhookPayload::NewMessage(p) => p,
            other => panic!("expected new message, got {other:?}"),
        }
    }

    #[test]
    fn text_message_becomes_delivered_inbound_text() {
        let payload = new_message("MessageSid=SM1&From=%2B551199990000&Body=oi&NumMedia=0");
        let message = payload.to_message();

        assert_eq!(message.provider_id, "SM1");
        assert_eq!(message.direction, Direction::Inbound);
        assert_eq!(message.message_type, MessageType::Text);
        assert_eq!(message.status, MessageStatus::Delivered);
        assert_eq!(message.content, "oi");
        assert_eq!(message.from, "whatsapp:+551199990000");
    }

    #[test]
    fn bare_addresses_are_normalized() {
        let payload = new_message("MessageSid=SM1&From=%2B55+11+9999-0000&To=%2B14155238886&Body=oi");
        assert_eq!(payload.from, "whatsapp:+551199990000");
        assert_eq!(payload.to, "whatsapp:+14155238886");
        assert_eq!(payload.sender_profile().phone_number, "+551199990000");

        let payload = new_message("MessageSid=SM2&From=whatsapp%3A%2B1555&Body=oi");
        assert_eq!(payload.from, "whatsapp:+1555");
        assert_eq!(payload.to, "");
    }

    #[test]
    fn every_media_item_is_kept_and_the_first_is_stored() {
        let payload = new_message(
            "MessageSid=SM10&From=whatsapp%3A%2B1555&NumMedia=2\
             &MediaUrl0=https%3A%2F%2Fm.example%2F0&MediaContentType0=image%2Fpng\
             &MediaUrl1=https%3A%2F%2Fm.example%2F1&MediaContentType1=application%2Fpdf\
             &MediaUrl2=https%3A%2F%2Fm.example%2Fignored",
        );
        assert_eq!(
            payload.media,
            vec![
                MediaRef {
                    url: "https://m.example/0".into(),
                    content_type: "image/png".into(),
                },
                MediaRef {
                    url: "https://m.example/1".into(),
                    content_type: "application/pdf".into(),
                },
            ]
        );

        let message = payload.to_message();
        assert_eq!(message.message_type, MessageType::Image);
        assert_eq!(message.media_url.as_deref(), Some("https://m.example/0"));
    }

    #[test]
    fn media_type_follows_content_type() {
        let cases = [
            ("image%2Fjpeg", MessageType::Image),
            ("application%2Fpdf", MessageType::Document),
            ("text%2Fx-unknown", MessageType::Text),
        ];
        for (ct, expected) in cases {
            let body = format!(
                "MessageSid=SM2&From=whatsapp%3A%2B1555&NumMedia=1&MediaUrl0=https%3A%2F%2Fm.example%2F1&MediaContentType0={ct}"
            );
            let message = new_message(&body).to_message();
            assert_eq!(message.message_type, expected, "content type {ct}");
            assert_eq!(message.media_url.as_deref(), Some("https://m.example/1"));
        }
    }

    #[test]
    fn media_url_ignored_without_media_count() {
        let message = new_message(
            "MessageSid=SM3&From=whatsapp%3A%2B1555&Body=x&NumMedia=0&MediaUrl0=https%3A%2F%2Fm.example%2F1",
        )
        .to_message();
        assert!(message.media_url.is_none());
        assert_eq!(message.message_type, MessageType::Text);
    }

    #[test]
    fn location_without_body_gets_coordinates_as_content() {
        let message = new_message(
            "MessageSid=SM4&From=whatsapp%3A%2B1555&NumMedia=0&Latitude=-23.55&Longitude=-46.63",
        )
        .to_message();
        assert_eq!(message.message_type, MessageType::Location);
        assert_eq!(message.content, "-23.55,-46.63");
    }

    #[test]
    fn status_callback_is_recognized() {
        match parse("MessageSid=SM1&SmsStatus=delivered&MessageStatus=delivered") {
            WebhookPayload::Status(p) => {
                assert_eq!(p.provider_id, "SM1");
                assert_eq!(p.to_update().status, MessageStatus::Delivered);
                assert!(p.error_code.is_none());
            }
            other => panic!("expected status, got {other:?}"),
        }
    }

    #[test]
    fn error_code_forces_failed() {
        match parse("MessageSid=SM1&MessageStatus=sent&ErrorCode=30008&ErrorMessage=Unknown+error") {
            WebhookPayload::Status(p) => {
                let update = p.to_update();
                assert_eq!(update.error_code.as_deref(), Some("30008"));
                assert_eq!(update.error_message.as_deref(), Some("Unknown error"));
            }
            other => panic!("expected status, got {other:?}"),
        }
    }

    #[test]
    fn received_status_is_a_new_message() {
        let payload = new_message("MessageSid=SM5&From=whatsapp%3A%2B1555&SmsStatus=received&Body=hi");
        assert_eq!(payload.body, "hi");
    }

    #[test]
    fn profile_fields_feed_user_registry() {
        let payload = new_message(
            "MessageSid=SM6&From=whatsapp%3A%2B15551234567&Body=hi&ProfileName=Ada&WaId=15551234567",
        );
        let profile = payload.sender_profile();
        assert_eq!(profile.phone_number, "+15551234567");
        assert_eq!(profile.profile_name.as_deref(), Some("Ada"));
        assert_eq!(profile.provider_user_id.as_deref(), Some("15551234567"));
    }

    #[test]
    fn timestamp_is_parsed_or_defaulted() {
        let payload = new_message(
            "MessageSid=SM7&From=%2B1555&Body=x&Timestamp=2024-05-01T10%3A00%3A00Z",
        );
        assert_eq!(payload.timestamp.to_rfc3339(), "2024-05-01T10:00:00+00:00");

        let before = now_millis();
        let payload = new_message("MessageSid=SM8&From=%2B1555&Body=x&Timestamp=yesterday");
        assert!(payload.timestamp >= before);
    }

    #[test]
    fn missing_identifiers_are_malformed() {
        assert!(matches!(
            WebhookPayload::from_form(b"From=%2B1555&Body=hi"),
            Err(CourierError::MalformedPayload(_))
        ));
        assert!(matches!(
            WebhookPayload::from_form(b"MessageSid=SM1&Body=hi"),
            Err(CourierError::MalformedPayload(_))
        ));
    }

    #[test]
    fn sms_sid_is_accepted_as_identifier() {
        assert_eq!(parse("SmsSid=SM9&SmsStatus=read").provider_id(), "SM9");
    }
}
