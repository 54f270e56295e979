// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message lifecycle engine.
//!
//! * [`webhook`] turns a provider form post into a typed payload.
//! * [`repository`] keeps the cache coherent with the durable store.
//! * [`ingest`] routes payloads into the store and hands new messages to
//!   the fan-out dispatcher.
//! * [`send`] issues outbound messages and records the provider's answer.

pub mod ingest;
pub mod repository;
pub mod send;
pub mod webhook;

pub use ingest::{IngestOutcome, Ingestor};
pub use repository::MessageRepository;
pub use send::{OutboundSender, SendRequest, SendResponse};
pub use webhook::{NewMessagePayload, StatusPayload, WebhookPayload};
