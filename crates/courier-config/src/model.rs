// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Courier.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Courier configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Durable store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Message cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Messaging provider credentials and endpoint.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Inbound webhook verification settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Downstream collaborator endpoints.
    #[serde(default)]
    pub downstream: DownstreamConfig,

    /// Fan-out dispatcher limits and retry policy.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Media upload storage.
    #[serde(default)]
    pub media: MediaConfig,

    /// Management API settings.
    #[serde(default)]
    pub api: ApiConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    data_path("courier.db")
}

fn default_true() -> bool {
    true
}

/// Message cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Time-to-live for cached messages in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Entry count above which new fills are skipped until expiry frees room.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,

    /// How often expired entries are swept, in seconds.
    #[serde(default = "default_cache_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
            cleanup_interval_secs: default_cache_cleanup_interval_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    86_400
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_cache_cleanup_interval_secs() -> u64 {
    60
}

/// Messaging provider configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default)]
    pub account_sid: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    /// Sender address for outbound messages.
    #[serde(default = "default_whatsapp_from")]
    pub whatsapp_from: String,

    #[serde(default = "default_provider_api_base_url")]
    pub api_base_url: String,

    /// Timeout for provider API calls in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("whatsapp_from", &self.whatsapp_from)
            .field("api_base_url", &self.api_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            whatsapp_from: default_whatsapp_from(),
            api_base_url: default_provider_api_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_whatsapp_from() -> String {
    "whatsapp:+14155238886".to_string()
}

fn default_provider_api_base_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Webhook signature scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureScheme {
    /// Base64 HMAC-SHA1 over the URL and sorted form parameters.
    #[default]
    Twilio,
    /// Hex HMAC-SHA256 over the URL and raw body.
    HmacSha256,
}

/// Inbound webhook configuration.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Shared signing secret. Unset means development mode with verification skipped.
    #[serde(default)]
    pub secret: Option<String>,

    #[serde(default)]
    pub signature_scheme: SignatureScheme,

    /// Externally visible base URL used to rebuild the signed URL behind proxies.
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// When set, the GET challenge also requires a matching `hub.verify_token`.
    #[serde(default)]
    pub verify_token: Option<String>,
}

impl WebhookConfig {
    /// The configured secret, treating blank values as unset.
    pub fn effective_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.trim().is_empty())
    }
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("signature_scheme", &self.signature_scheme)
            .field("public_base_url", &self.public_base_url)
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Downstream collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DownstreamConfig {
    /// Base URL of the chat orchestration service.
    #[serde(default = "default_orchestrator_url")]
    pub orchestrator_url: String,

    /// Base URL of the media analysis service.
    #[serde(default = "default_ai_processing_url")]
    pub ai_processing_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            orchestrator_url: default_orchestrator_url(),
            ai_processing_url: default_ai_processing_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_orchestrator_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_ai_processing_url() -> String {
    "http://localhost:8082".to_string()
}

/// Fan-out dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Maximum number of downstream tasks running at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Maximum number of accepted but unfinished tasks. Beyond this, submissions are rejected.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Attempts per task, including the first. `1` disables retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// How long shutdown waits for in-flight tasks.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            queue_capacity: default_queue_capacity(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_max_concurrency() -> usize {
    16
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_drain_timeout_secs() -> u64 {
    10
}

/// Media upload storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Directory uploaded media is written to.
    #[serde(default = "default_media_root_dir")]
    pub root_dir: String,

    /// Public URL prefix under which `root_dir` is served.
    #[serde(default = "default_media_public_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root_dir: default_media_root_dir(),
            public_base_url: default_media_public_base_url(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_media_root_dir() -> String {
    data_path("media")
}

fn default_media_public_base_url() -> String {
    "http://localhost:8080/media".to_string()
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

/// Management API configuration.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Bearer token required on `/api/v1/*`. Unset leaves the API open.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Resolve `name` under the XDG data directory, falling back to the working directory.
fn data_path(name: &str) -> String {
    dirs::data_dir()
        .map(|d| d.join("courier").join(name).display().to_string())
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CourierConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.cache.ttl_secs, 86_400);
        assert_eq!(config.dispatch.max_attempts, 3);
        assert_eq!(config.media.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(config.webhook.signature_scheme, SignatureScheme::Twilio);
        assert!(config.storage.database_path.ends_with("courier.db"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = CourierConfig::default();
        config.provider.auth_token = Some("tok-123".into());
        config.webhook.secret = Some("shh".into());
        config.api.bearer_token = Some("bearer-abc".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("tok-123"));
        assert!(!debug.contains("shh"));
        assert!(!debug.contains("bearer-abc"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn blank_secret_is_development_mode() {
        let webhook = WebhookConfig {
            secret: Some("   ".into()),
            ..Default::default()
        };
        assert!(webhook.effective_secret().is_none());
    }

    #[test]
    fn signature_scheme_parses_kebab_case() {
        let webhook: WebhookConfig =
            toml::from_str("signature_scheme = \"hmac-sha256\"").unwrap();
        assert_eq!(webhook.signature_scheme, SignatureScheme::HmacSha256);
    }
}
