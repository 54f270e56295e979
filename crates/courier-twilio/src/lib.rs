// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio WhatsApp provider for Courier.
//!
//! [`TwilioMessenger`] talks to the Programmable Messaging REST API for
//! sends and status lookups. The [`signature`] module verifies inbound
//! webhook signatures.

pub mod client;
pub mod signature;
pub mod types;

pub use client::TwilioMessenger;
pub use signature::{SIGNATURE_HEADER, verify_signature};
