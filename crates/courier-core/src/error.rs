// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Courier message relay.

use thiserror::Error;

/// The primary error type used across all Courier adapter traits and core operations.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable store errors (connection, query failure, constraint violation).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Cache backend errors. Never fatal to a request.
    #[error("cache unavailable: {message}")]
    Cache { message: String },

    /// Webhook signature missing or invalid.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Webhook or API payload could not be parsed or validated.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Status update for a provider message id that was never recorded.
    #[error("unknown message: {provider_id}")]
    UnknownMessage { provider_id: String },

    /// The provider rejected an outbound send.
    #[error("send failed: {message}")]
    SendFailed {
        message: String,
        /// HTTP status returned by the provider, if the request got that far.
        status: Option<u16>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A downstream collaborator (orchestrator, media analyzer) failed.
    #[error("downstream {service} unavailable: {message}")]
    Downstream {
        service: String,
        status: Option<u16>,
        message: String,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Wraps any error as a storage failure.
    pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(e),
        }
    }

    /// Whether retrying the same operation later may succeed.
    ///
    /// Network failures, timeouts, 429 and 5xx responses are transient.
    /// Other 4xx responses and local validation failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Storage { .. } | Self::Cache { .. } => true,
            Self::Downstream { status, .. } | Self::SendFailed { status, .. } => match status {
                None => true,
                Some(code) => *code == 429 || *code >= 500,
            },
            _ => false,
        }
    }
}
