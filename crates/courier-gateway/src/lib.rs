// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Courier message relay.
//!
//! Serves the provider-facing webhooks, the internal `/api/v1` REST API and
//! the health, readiness and metrics endpoints. All behavior lives in
//! `courier-engine`; this crate only maps HTTP onto it.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod health;
pub mod server;
pub mod signature;
pub mod webhook;

pub use auth::ApiAuth;
pub use error::{ApiError, ErrorResponse};
pub use health::HealthState;
pub use server::{GatewayState, ServerConfig, router, start_server};
pub use signature::WebhookVerifier;
