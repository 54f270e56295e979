// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Twilio Messages resource.

use serde::Deserialize;

/// The subset of a Message resource Courier reads.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResource {
    pub sid: String,
    pub status: String,
    /// Numeric error code, `null` unless the message failed.
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// RFC 2822 timestamp, e.g. `Thu, 30 Jul 2015 20:12:31 +0000`.
    #[serde(default)]
    pub date_updated: Option<String>,
}

/// Error body returned with 4xx/5xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
    #[serde(default)]
    pub more_info: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_resource_tolerates_null_errors() {
        let json = r#"{
            "sid": "SM123",
            "status": "queued",
            "error_code": null,
            "error_message": null,
            "date_updated": "Thu, 30 Jul 2015 20:12:31 +0000",
            "num_segments": "1"
        }"#;
        let resource: MessageResource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.sid, "SM123");
        assert!(resource.error_code.is_none());
    }

    #[test]
    fn api_error_parses() {
        let json = r#"{"code": 21211, "message": "Invalid 'To' Phone Number", "more_info": "https://www.twilio.com/docs/errors/21211", "status": 400}"#;
        let err: ApiError = serde_json::from_str(json).unwrap();
        assert_eq!(err.code, Some(21211));
        assert!(err.message.contains("Invalid"));
    }
}
