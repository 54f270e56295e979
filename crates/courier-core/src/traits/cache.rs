// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-through message cache contract.
//!
//! The cache is never a source of truth. Entries are keyed by internal message
//! id and also indexed by provider id so that status callbacks, which only know
//! the provider id, can invalidate the right entry.
//!
//! A miss hands out a [`FillToken`]. Filling with a token that predates an
//! invalidation of the same id is rejected, which keeps a slow reader from
//! re-inserting a record that a concurrent status update already replaced.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::model::Message;
use crate::traits::adapter::PluginAdapter;

/// Generation observed at lookup time, required to fill after a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillToken(pub u64);

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Message),
    Miss(FillToken),
}

#[async_trait]
pub trait MessageCache: PluginAdapter {
    /// Look up a message by internal id.
    async fn lookup(&self, id: &str) -> Result<CacheLookup, CourierError>;

    /// Populate after a miss. Returns `false` when the entry was invalidated
    /// since `token` was issued and the fill was dropped.
    async fn fill(&self, message: &Message, token: FillToken) -> Result<bool, CourierError>;

    /// Write-through of a freshly persisted message.
    async fn put(&self, message: &Message) -> Result<(), CourierError>;

    /// Drop the entry for an internal id.
    async fn invalidate(&self, id: &str) -> Result<(), CourierError>;

    /// Drop the entry indexed under a provider id. Returns whether one existed.
    async fn invalidate_provider_id(&self, provider_id: &str) -> Result<bool, CourierError>;
}
