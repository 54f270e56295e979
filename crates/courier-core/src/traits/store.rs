// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable store trait: the system of record for messages and users.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::model::{ChatSession, Message, StatusUpdate, User, UserProfile};
use crate::status::{IgnoreReason, MessageStatus};
use crate::traits::adapter::PluginAdapter;

/// Caller intent for [`MessageStore::upsert_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertMode {
    /// First sight of a message. An existing row for the same provider id is
    /// returned untouched.
    Create,
    /// Record the provider's acknowledgment of a send. An existing row for the
    /// same provider id is merged, keeping the furthest status.
    Acknowledge,
}

/// Result of an upsert.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// A new row was written.
    Inserted(Message),
    /// A row already existed and was left as is.
    Existing(Message),
    /// A row already existed and was updated.
    Merged(Message),
}

impl UpsertOutcome {
    /// The record as persisted.
    pub fn message(&self) -> &Message {
        match self {
            Self::Inserted(m) | Self::Existing(m) | Self::Merged(m) => m,
        }
    }

    pub fn into_message(self) -> Message {
        match self {
            Self::Inserted(m) | Self::Existing(m) | Self::Merged(m) => m,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Result of applying a status update.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusOutcome {
    /// The row changed. `id` is the internal id, used for cache invalidation.
    Applied {
        id: String,
        previous: MessageStatus,
        current: MessageStatus,
    },
    /// The row exists but reconciliation kept the current status.
    Ignored {
        id: String,
        current: MessageStatus,
        reason: IgnoreReason,
    },
    /// No row exists for the provider id.
    UnknownMessage,
}

impl StatusOutcome {
    /// Internal id of the affected record, if any.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::Applied { id, .. } | Self::Ignored { id, .. } => Some(id),
            Self::UnknownMessage => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::Ignored {
                reason: IgnoreReason::Terminal,
                ..
            } => "ignored_terminal",
            Self::Ignored {
                reason: IgnoreReason::Stale,
                ..
            } => "ignored_stale",
            Self::Ignored {
                reason: IgnoreReason::Duplicate,
                ..
            } => "ignored_duplicate",
            Self::UnknownMessage => "unknown_message",
        }
    }
}

/// Persistence backend for messages, users and sessions.
///
/// `apply_status` must serialize concurrent updates for the same provider id
/// so that the reconciliation rules, not arrival order, decide the result.
#[async_trait]
pub trait MessageStore: PluginAdapter {
    /// Opens the backend and applies migrations.
    async fn initialize(&self) -> Result<(), CourierError>;

    /// Flushes pending writes and releases connections.
    async fn close(&self) -> Result<(), CourierError>;

    /// Insert or merge a message keyed by provider id.
    async fn upsert_message(
        &self,
        message: &Message,
        mode: UpsertMode,
    ) -> Result<UpsertOutcome, CourierError>;

    /// Reconcile and persist a status update as one atomic step.
    async fn apply_status(&self, update: &StatusUpdate) -> Result<StatusOutcome, CourierError>;

    async fn get_message(&self, id: &str) -> Result<Option<Message>, CourierError>;

    async fn get_message_by_provider_id(
        &self,
        provider_id: &str,
    ) -> Result<Option<Message>, CourierError>;

    /// Messages sent to or from `address`, newest event first.
    async fn list_by_participant(
        &self,
        address: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, CourierError>;

    /// Most recent messages, newest event first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<Message>, CourierError>;

    /// Create the user on first sight, refresh profile fields when they change.
    async fn upsert_user(&self, profile: &UserProfile) -> Result<User, CourierError>;

    async fn get_user_by_phone(&self, phone_number: &str) -> Result<Option<User>, CourierError>;

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, CourierError>;
}
