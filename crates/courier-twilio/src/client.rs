// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Twilio Programmable Messaging API.
//!
//! Sends are form-encoded POSTs to the account's `Messages.json` resource
//! authenticated with HTTP basic auth (account SID, auth token).

use std::time::Duration;

use async_trait::async_trait;
use courier_config::model::ProviderConfig;
use courier_core::{
    AdapterType, CourierError, HealthStatus, Messenger, OutboundContent, OutboundRequest,
    PluginAdapter, ProviderReceipt, StatusUpdate,
};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tracing::{debug, info, warn};

use crate::types::{ApiError, MessageResource};

const API_VERSION: &str = "2010-04-01";
const PROVIDER: &str = "twilio";

/// Twilio-backed [`Messenger`].
#[derive(Debug, Clone)]
pub struct TwilioMessenger {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from: String,
    base_url: String,
    timeout: Duration,
}

impl TwilioMessenger {
    /// Builds a client from provider configuration.
    ///
    /// Both `account_sid` and `auth_token` must be set.
    pub fn new(config: &ProviderConfig) -> Result<Self, CourierError> {
        let account_sid = config
            .account_sid
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CourierError::Config("provider.account_sid is not set".into()))?;
        let auth_token = config
            .auth_token
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CourierError::Config("provider.auth_token is not set".into()))?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CourierError::SendFailed {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            account_sid,
            auth_token,
            from: config.whatsapp_from.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Overrides the API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{API_VERSION}/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }

    fn message_url(&self, provider_id: &str) -> String {
        format!(
            "{}/{API_VERSION}/Accounts/{}/Messages/{provider_id}.json",
            self.base_url, self.account_sid
        )
    }

    /// Form parameters for a send, in the order Twilio documents them.
    fn form_params(
        &self,
        request: &OutboundRequest,
    ) -> Result<Vec<(&'static str, String)>, CourierError> {
        let mut params = vec![("To", request.to.clone()), ("From", self.from.clone())];
        match &request.content {
            OutboundContent::Text { body } => params.push(("Body", body.clone())),
            OutboundContent::Media {
                body, media_url, ..
            } => {
                if let Some(body) = body.as_deref().filter(|b| !b.is_empty()) {
                    params.push(("Body", body.to_string()));
                }
                params.push(("MediaUrl", media_url.clone()));
            }
            OutboundContent::Template {
                template_id,
                variables,
            } => {
                params.push(("ContentSid", template_id.clone()));
                if !variables.is_empty() {
                    let encoded = serde_json::to_string(variables).map_err(|e| {
                        CourierError::MalformedPayload(format!("template variables: {e}"))
                    })?;
                    params.push(("ContentVariables", encoded));
                }
            }
        }
        Ok(params)
    }

    fn transport_error(&self, e: reqwest::Error) -> CourierError {
        if e.is_timeout() {
            return CourierError::Timeout {
                duration: self.timeout,
            };
        }
        CourierError::SendFailed {
            message: format!("HTTP request failed: {e}"),
            status: None,
            source: Some(Box::new(e)),
        }
    }
}

/// Human-readable description of a Twilio error response body.
fn describe_error(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(api_err) => match api_err.code {
            Some(code) => format!("twilio returned {status}: {} (code {code})", api_err.message),
            None => format!("twilio returned {status}: {}", api_err.message),
        },
        Err(_) => format!("twilio returned {status}: {body}"),
    }
}

fn parse_rfc2822(raw: Option<&str>) -> chrono::DateTime<chrono::Utc> {
    raw.and_then(|s| chrono::DateTime::parse_from_rfc2822(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(courier_core::model::now_millis)
}

#[async_trait]
impl PluginAdapter for TwilioMessenger {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messenger
    }

    async fn health_check(&self) -> Result<HealthStatus, CourierError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CourierError> {
        Ok(())
    }
}

#[async_trait]
impl Messenger for TwilioMessenger {
    fn sender_address(&self) -> &str {
        &self.from
    }

    async fn send(&self, request: &OutboundRequest) -> Result<ProviderReceipt, CourierError> {
        let params = self.form_params(request)?;
        let body = serde_urlencoded::to_string(&params)
            .map_err(|e| CourierError::MalformedPayload(format!("form encoding failed: {e}")))?;

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        debug!(status = %status, to = %request.to, "twilio send response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = describe_error(status, &body);
            warn!(status = %status, error = %message, "twilio rejected send");
            return Err(CourierError::SendFailed {
                message,
                status: Some(status.as_u16()),
                source: None,
            });
        }

        let resource: MessageResource =
            response.json().await.map_err(|e| CourierError::SendFailed {
                message: format!("failed to parse twilio response: {e}"),
                status: Some(status.as_u16()),
                source: Some(Box::new(e)),
            })?;

        info!(
            provider_id = %resource.sid,
            status = %resource.status,
            "whatsapp message accepted by twilio"
        );
        Ok(ProviderReceipt {
            provider_id: resource.sid,
            raw_status: resource.status,
        })
    }

    async fn fetch_status(&self, provider_id: &str) -> Result<StatusUpdate, CourierError> {
        let response = self
            .client
            .get(self.message_url(provider_id))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CourierError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    CourierError::Downstream {
                        service: PROVIDER.into(),
                        status: None,
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CourierError::UnknownMessage {
                provider_id: provider_id.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CourierError::Downstream {
                service: PROVIDER.into(),
                status: Some(status.as_u16()),
                message: describe_error(status, &body),
            });
        }

        let resource: MessageResource =
            response.json().await.map_err(|e| CourierError::Downstream {
                service: PROVIDER.into(),
                status: Some(status.as_u16()),
                message: format!("failed to parse message resource: {e}"),
            })?;

        debug!(
            provider_id = %resource.sid,
            status = %resource.status,
            "fetched message status"
        );
        let timestamp = parse_rfc2822(resource.date_updated.as_deref());
        Ok(StatusUpdate::from_provider(
            resource.sid,
            resource.status,
            resource.error_code.map(|c| c.to_string()),
            resource.error_message,
            timestamp,
        ))
    }
}
