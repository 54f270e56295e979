// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging provider for deterministic testing.
//!
//! `MockMessenger` accepts every send (unless told to reject), hands out
//! sequential provider ids and records what it was asked to send.

use async_trait::async_trait;
use tokio::sync::Mutex;

use courier_core::model::now_millis;
use courier_core::{
    AdapterType, CourierError, HealthStatus, Messenger, OutboundRequest, PluginAdapter,
    ProviderReceipt, StatusUpdate,
};

pub const MOCK_SENDER: &str = "whatsapp:+14155238886";

#[derive(Default)]
struct State {
    sent: Vec<OutboundRequest>,
    reject_with: Option<u16>,
    remote_status: Option<String>,
}

/// A provider that never leaves the process.
#[derive(Default)]
pub struct MockMessenger {
    state: Mutex<State>,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every following send with the given provider HTTP status.
    pub async fn reject_sends(&self, status: u16) {
        self.state.lock().await.reject_with = Some(status);
    }

    /// Status reported by `fetch_status` from now on.
    pub async fn set_remote_status(&self, raw: &str) {
        self.state.lock().await.remote_status = Some(raw.to_string());
    }

    /// Everything accepted so far, in order.
    pub async fn sent(&self) -> Vec<OutboundRequest> {
        self.state.lock().await.sent.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockMessenger {
    fn name(&self) -> &str {
        "mock-messenger"
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
impl Messenger for MockMessenger {
    fn sender_address(&self) -> &str {
        MOCK_SENDER
    }

    async fn send(&self, request: &OutboundRequest) -> Result<ProviderReceipt, CourierError> {
        let mut state = self.state.lock().await;
        if let Some(status) = state.reject_with {
            return Err(CourierError::SendFailed {
                message: format!("mock provider rejected send ({status})"),
                status: Some(status),
                source: None,
            });
        }
        state.sent.push(request.clone());
        Ok(ProviderReceipt {
            provider_id: format!("SMmock{:04}", state.sent.len()),
            raw_status: "queued".into(),
        })
    }

    async fn fetch_status(&self, provider_id: &str) -> Result<StatusUpdate, CourierError> {
        let raw = self
            .state
            .lock()
            .await
            .remote_status
            .clone()
            .unwrap_or_else(|| "sent".into());
        Ok(StatusUpdate::from_provider(
            provider_id,
            raw,
            None,
            None,
            now_millis(),
        ))
    }
}
