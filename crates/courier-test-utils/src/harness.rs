// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full service with mock collaborators, a temp
//! SQLite database and the in-process cache, and exposes the gateway router
//! so tests can drive it with plain HTTP requests.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, header},
};

use courier_cache::MemoryCache;
use courier_config::SignatureScheme;
use courier_config::model::{CacheConfig, StorageConfig, WebhookConfig};
use courier_core::{CourierError, MessageStore};
use courier_dispatch::{Dispatcher, FanOut, LoggingReplyHandler, RetryPolicy};
use courier_engine::{Ingestor, MessageRepository, OutboundSender};
use courier_gateway::{ApiAuth, GatewayState, HealthState, WebhookVerifier};
use courier_storage::SqliteStore;
use courier_twilio::SIGNATURE_HEADER;
use courier_twilio::signature::{hmac_sha256_signature, twilio_signature};

use crate::mock_blob::MemoryBlobStore;
use crate::mock_downstream::{MockAnalyzer, MockRelay};
use crate::mock_messenger::MockMessenger;

/// Host the harness pretends to be served at.
pub const TEST_HOST: &str = "courier.test";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    webhook: WebhookConfig,
    bearer_token: Option<String>,
    max_attempts: u32,
    max_upload_bytes: usize,
    store_available: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            webhook: WebhookConfig::default(),
            bearer_token: None,
            max_attempts: 1,
            max_upload_bytes: 1024 * 1024,
            store_available: true,
        }
    }

    /// Leave the store unopened so every store call fails.
    pub fn with_unavailable_store(mut self) -> Self {
        self.store_available = false;
        self
    }

    /// Require signed webhooks.
    pub fn with_webhook_secret(mut self, secret: &str, scheme: SignatureScheme) -> Self {
        self.webhook.secret = Some(secret.to_string());
        self.webhook.signature_scheme = scheme;
        self
    }

    pub fn with_verify_token(mut self, token: &str) -> Self {
        self.webhook.verify_token = Some(token.to_string());
        self
    }

    pub fn with_bearer_token(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.to_string());
        self
    }

    /// Retry transient dispatcher failures up to `max_attempts` times.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, CourierError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| CourierError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let store = Arc::new(SqliteStore::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        }));
        if self.store_available {
            store.initialize().await?;
        }
        let cache = Arc::new(MemoryCache::new(&CacheConfig::default()));

        let messenger = Arc::new(MockMessenger::new());
        let relay = Arc::new(MockRelay::new());
        let analyzer = Arc::new(MockAnalyzer::new());
        let blobs = Arc::new(MemoryBlobStore::new());

        let dispatcher = Dispatcher::with_policy(
            4,
            64,
            RetryPolicy {
                max_attempts: self.max_attempts,
                initial_backoff: Duration::from_millis(5),
                max_backoff: Duration::from_millis(20),
            },
        );
        let repository = MessageRepository::new(store.clone(), cache.clone());
        let fan_out = FanOut::new(
            dispatcher.clone(),
            relay.clone(),
            analyzer.clone(),
            Arc::new(LoggingReplyHandler),
        );

        let state = GatewayState {
            ingestor: Ingestor::new(repository.clone(), fan_out),
            sender: OutboundSender::new(messenger.clone(), repository),
            blobs: blobs.clone(),
            webhook: Arc::new(WebhookVerifier::from_config(&self.webhook)),
            auth: ApiAuth::new(self.bearer_token),
            health: HealthState::new(Some(Arc::new(|| {
                "# TYPE courier_webhooks_total counter\n".to_string()
            }))),
            max_upload_bytes: self.max_upload_bytes,
        };

        Ok(TestHarness {
            store,
            cache,
            messenger,
            relay,
            analyzer,
            blobs,
            dispatcher,
            webhook: self.webhook,
            state,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete service instance with mock collaborators.
pub struct TestHarness {
    pub store: Arc<SqliteStore>,
    pub cache: Arc<MemoryCache>,
    pub messenger: Arc<MockMessenger>,
    pub relay: Arc<MockRelay>,
    pub analyzer: Arc<MockAnalyzer>,
    pub blobs: Arc<MemoryBlobStore>,
    pub dispatcher: Dispatcher,
    webhook: WebhookConfig,
    state: GatewayState,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// A fresh router over the shared state.
    pub fn router(&self) -> Router {
        courier_gateway::router(self.state.clone())
    }

    /// Wait for every dispatched task to finish.
    pub async fn drain(&self) -> bool {
        self.dispatcher.drain(Duration::from_secs(5)).await
    }

    /// Signature the provider would send for `body` posted to `path`.
    ///
    /// `None` when no webhook secret is configured.
    pub fn sign(&self, path: &str, body: &str) -> Option<String> {
        let secret = self.webhook.effective_secret()?;
        let url = format!("http://{TEST_HOST}{path}");
        let signature = match self.webhook.signature_scheme {
            SignatureScheme::Twilio => {
                let params: Vec<(String, String)> = serde_urlencoded::from_str(body).ok()?;
                twilio_signature(secret, &url, &params)
            }
            SignatureScheme::HmacSha256 => hmac_sha256_signature(secret, &url, body.as_bytes()),
        };
        signature.ok()
    }

    /// A form-encoded webhook POST, signed when a secret is configured.
    pub fn webhook_request(&self, path: &str, params: &[(&str, &str)]) -> Request<Body> {
        let body = serde_urlencoded::to_string(params).unwrap_or_default();
        let mut builder = Request::post(path)
            .header(header::HOST, TEST_HOST)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(signature) = self.sign(path, &body) {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        builder
            .body(Body::from(body))
            .unwrap_or_else(|_| Request::new(Body::empty()))
    }

    /// Number of stored messages, newest first up to 200.
    pub async fn message_count(&self) -> usize {
        self.store
            .list_recent(200)
            .await
            .map(|messages| messages.len())
            .unwrap_or(0)
    }
}
