// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery status lifecycle and reconciliation rules.
//!
//! Statuses advance `pending -> sent -> delivered -> read`. A reported
//! `failed` is accepted from `pending` or `sent` only; a non-empty error code
//! forces `failed` from any non-terminal state. `read` and `failed` are
//! terminal.
//! Reconciliation is a pure function of the persisted status and the reported
//! one, so replaying a callback or receiving callbacks out of order always
//! converges on the same stored value.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Canonical lifecycle state of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    /// Position on the forward path. `failed` sits outside the ordering and
    /// is handled explicitly by [`reconcile`].
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Sent => 1,
            Self::Delivered => 2,
            Self::Read => 3,
            Self::Failed => u8::MAX,
        }
    }

    /// Terminal statuses are never overwritten.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Read | Self::Failed)
    }

    /// Map the provider's status vocabulary onto the canonical lifecycle.
    ///
    /// Matching is case-insensitive. Unrecognized values map to `pending` so
    /// that an unexpected status string never fails the update.
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" | "accepted" | "sending" | "scheduled" => Self::Pending,
            "sent" => Self::Sent,
            "delivered" => Self::Delivered,
            "read" => Self::Read,
            "failed" | "undelivered" | "canceled" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// Why a reported status was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The persisted status is already terminal.
    Terminal,
    /// The reported status is ordinally behind the persisted one.
    Stale,
    /// The reported status equals the persisted one.
    Duplicate,
}

/// Outcome of reconciling one reported status against the persisted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Persist the contained status.
    Apply(MessageStatus),
    /// Leave the record untouched.
    Ignore(IgnoreReason),
}

/// Decide the status to persist given the current and reported statuses.
///
/// A non-empty `error_code` forces `failed` regardless of ordering. Without
/// one, a reported `failed` only lands on a message that has not been
/// delivered yet.
pub fn reconcile(
    current: MessageStatus,
    reported: MessageStatus,
    error_code: Option<&str>,
) -> Transition {
    if current.is_terminal() {
        return Transition::Ignore(IgnoreReason::Terminal);
    }

    if error_code.is_some_and(|code| !code.trim().is_empty()) {
        return Transition::Apply(MessageStatus::Failed);
    }

    if reported == MessageStatus::Failed {
        return if current.rank() <= MessageStatus::Sent.rank() {
            Transition::Apply(MessageStatus::Failed)
        } else {
            Transition::Ignore(IgnoreReason::Stale)
        };
    }

    match reported.rank().cmp(&current.rank()) {
        std::cmp::Ordering::Greater => Transition::Apply(reported),
        std::cmp::Ordering::Equal => Transition::Ignore(IgnoreReason::Duplicate),
        std::cmp::Ordering::Less => Transition::Ignore(IgnoreReason::Stale),
    }
}
