// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Stateful backends extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` so they can be held as `Arc<dyn Trait>`.

pub mod adapter;
pub mod blob;
pub mod cache;
pub mod downstream;
pub mod messenger;
pub mod store;

pub use adapter::PluginAdapter;
pub use blob::{BlobStore, StoredBlob};
pub use cache::{CacheLookup, FillToken, MessageCache};
pub use downstream::{MediaAnalyzer, Relay, ReplyHandler};
pub use messenger::{Messenger, OutboundContent, OutboundRequest, ProviderReceipt};
pub use store::{MessageStore, StatusOutcome, UpsertMode, UpsertOutcome};
