// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing of validated webhook payloads.
//!
//! Signature verification and parsing happen before a payload gets here.
//! A store write failure is returned to the caller so the provider retries;
//! everything after the write (cache, user registry, fan-out) is best-effort.

use courier_core::{CourierError, StatusOutcome, UpsertMode, UpsertOutcome};
use courier_dispatch::FanOut;
use tracing::{debug, info, warn};

use crate::repository::MessageRepository;
use crate::webhook::{NewMessagePayload, WebhookPayload};

/// What ingesting one delivery did.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// A new message was recorded and handed to the dispatcher.
    Created { message_id: String, dispatched: usize },
    /// The provider id was already recorded; nothing changed.
    Duplicate { message_id: String },
    /// A status callback was reconciled.
    Status(StatusOutcome),
}

impl IngestOutcome {
    /// Metrics label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Duplicate { .. } => "duplicate",
            Self::Status(outcome) => outcome.label(),
        }
    }
}

/// Routes webhook payloads into the store and the fan-out.
#[derive(Clone)]
pub struct Ingestor {
    repository: MessageRepository,
    fan_out: FanOut,
}

impl Ingestor {
    pub fn new(repository: MessageRepository, fan_out: FanOut) -> Self {
        Self {
            repository,
            fan_out,
        }
    }

    pub fn repository(&self) -> &MessageRepository {
        &self.repository
    }

    pub async fn ingest(&self, payload: &WebhookPayload) -> Result<IngestOutcome, CourierError> {
        let kind = payload.kind();
        let result = match payload {
            WebhookPayload::NewMessage(p) => self.ingest_message(p).await,
            WebhookPayload::Status(p) => self
                .repository
                .apply_status(&p.to_update())
                .await
                .map(IngestOutcome::Status),
        };
        match &result {
            Ok(outcome) => courier_prometheus::record_webhook(kind, outcome.label()),
            Err(_) => courier_prometheus::record_webhook(kind, "store_failed"),
        }
        result
    }

    async fn ingest_message(
        &self,
        payload: &NewMessagePayload,
    ) -> Result<IngestOutcome, CourierError> {
        let mut message = payload.to_message();

        // The user registry never holds up message persistence.
        match self.repository.upsert_user(&payload.sender_profile()).await {
            Ok(user) => message.user_id = Some(user.id),
            Err(e) => warn!(
                provider_id = %payload.provider_id,
                error = %e,
                "user upsert failed, storing message without user"
            ),
        }

        let outcome = self
            .repository
            .record(&message, UpsertMode::Create)
            .await
            .inspect_err(|e| {
                warn!(provider_id = %payload.provider_id, error = %e, "failed to persist inbound message");
            })?;

        match outcome {
            UpsertOutcome::Inserted(stored) => {
                let dispatched = self.fan_out.dispatch_inbound(&stored);
                info!(
                    message_id = %stored.id,
                    provider_id = %stored.provider_id,
                    message_type = %stored.message_type,
                    dispatched,
                    "inbound message recorded"
                );
                Ok(IngestOutcome::Created {
                    message_id: stored.id,
                    dispatched,
                })
            }
            UpsertOutcome::Existing(stored) | UpsertOutcome::Merged(stored) => {
                debug!(
                    message_id = %stored.id,
                    provider_id = %stored.provider_id,
                    "duplicate delivery acknowledged"
                );
                Ok(IngestOutcome::Duplicate {
                    message_id: stored.id,
                })
            }
        }
    }
}
