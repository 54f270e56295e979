// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier message relay.
//!
//! This crate provides the canonical message model, the status reconciliation
//! rules, the error type, and the adapter traits that every backend
//! (store, cache, blob store, messenger, downstream collaborators) implements.

pub mod address;
pub mod downstream;
pub mod error;
pub mod model;
pub mod status;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use address::{phone_number, whatsapp_address};
pub use downstream::{ChatRequest, ChatResponse, MediaAnalysisRequest, MediaKind};
pub use error::CourierError;
pub use model::{
    ChatSession, Direction, Message, MessageType, SessionStatus, StatusUpdate, User, UserProfile,
};
pub use status::{IgnoreReason, MessageStatus, Transition, reconcile};
pub use types::{AdapterType, HealthStatus};

// Re-export all adapter traits at crate root.
pub use traits::{
    BlobStore, CacheLookup, FillToken, MediaAnalyzer, MessageCache, MessageStore, Messenger,
    OutboundContent, OutboundRequest, PluginAdapter, ProviderReceipt, Relay, ReplyHandler,
    StatusOutcome, StoredBlob, UpsertMode, UpsertOutcome,
};
