// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier serve` command implementation.
//!
//! Opens the SQLite store, starts the cache sweeper, wires the provider
//! client and downstream clients into the dispatcher, and serves the gateway
//! until SIGINT/SIGTERM. On shutdown the server drains open connections,
//! then the dispatcher gets `dispatch.drain_timeout_secs` to finish
//! in-flight tasks before the store is closed.

use std::sync::Arc;
use std::time::Duration;

use courier_cache::MemoryCache;
use courier_config::CourierConfig;
use courier_core::{CourierError, MessageStore, PluginAdapter};
use courier_dispatch::{Dispatcher, FanOut, HttpMediaAnalyzer, HttpRelay, LoggingReplyHandler};
use courier_engine::{Ingestor, MessageRepository, OutboundSender};
use courier_gateway::{
    ApiAuth, GatewayState, HealthState, ServerConfig, WebhookVerifier, start_server,
};
use courier_prometheus::PrometheusAdapter;
use courier_storage::{FsBlobStore, SqliteStore};
use courier_twilio::TwilioMessenger;
use tracing::{info, warn};

use crate::shutdown;

/// Renders the metrics exposition text on demand.
pub type MetricsRender = Arc<dyn Fn() -> String + Send + Sync>;

/// Everything `serve` owns for the lifetime of the process.
pub struct Services {
    pub state: GatewayState,
    pub store: Arc<SqliteStore>,
    pub cache: Arc<MemoryCache>,
    pub dispatcher: Dispatcher,
}

/// Build the service graph from configuration.
///
/// The store is initialized (migrations applied) before anything else so a
/// bad database path fails startup.
pub async fn assemble(
    config: &CourierConfig,
    metrics: Option<MetricsRender>,
) -> Result<Services, CourierError> {
    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    info!(path = %config.storage.database_path, "storage initialized");

    let cache = Arc::new(MemoryCache::new(&config.cache));
    cache.spawn_cleanup();

    let messenger = Arc::new(TwilioMessenger::new(&config.provider)?);
    let relay = Arc::new(HttpRelay::new(&config.downstream)?);
    let analyzer = Arc::new(HttpMediaAnalyzer::new(&config.downstream)?);

    let dispatcher = Dispatcher::new(&config.dispatch);
    let fan_out = FanOut::new(
        dispatcher.clone(),
        relay,
        analyzer,
        Arc::new(LoggingReplyHandler),
    );
    let repository = MessageRepository::new(store.clone(), cache.clone());

    let state = GatewayState {
        ingestor: Ingestor::new(repository.clone(), fan_out),
        sender: OutboundSender::new(messenger, repository),
        blobs: Arc::new(FsBlobStore::new(&config.media)),
        webhook: Arc::new(WebhookVerifier::from_config(&config.webhook)),
        auth: ApiAuth::new(config.api.bearer_token.clone()),
        health: HealthState::new(metrics),
        max_upload_bytes: config.media.max_upload_bytes,
    };

    Ok(Services {
        state,
        store,
        cache,
        dispatcher,
    })
}

/// Runs the `courier serve` command.
pub async fn run_serve(config: CourierConfig) -> Result<(), CourierError> {
    init_tracing(&config.server.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "starting courier serve");

    let metrics: Option<MetricsRender> = match PrometheusAdapter::new() {
        Ok(adapter) => {
            let render: MetricsRender = Arc::new(move || adapter.render());
            Some(render)
        }
        Err(e) => {
            warn!(error = %e, "metrics disabled");
            None
        }
    };

    let services = assemble(&config, metrics).await?;
    let cancel = shutdown::install_signal_handler();

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let served = start_server(&server_config, services.state, cancel.clone()).await;
    // A bind failure returns before any signal; make sure background tasks stop too.
    cancel.cancel();

    let drain_timeout = Duration::from_secs(config.dispatch.drain_timeout_secs);
    if !services.dispatcher.drain(drain_timeout).await {
        warn!(
            in_flight = services.dispatcher.in_flight(),
            "dispatcher did not drain before timeout, abandoning in-flight tasks"
        );
    }

    if let Err(e) = services.cache.shutdown().await {
        warn!(error = %e, "cache shutdown failed");
    }
    if let Err(e) = services.store.close().await {
        warn!(error = %e, "storage close failed");
    }

    served?;
    info!("courier serve shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("courier={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
