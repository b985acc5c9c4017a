//! Stream Status Relay
//!
//! Single-binary Rust service that:
//! 1. Exchanges the Twitch app credentials for an app access token (cached)
//! 2. Asks Helix which of the configured streamers are live
//! 3. Serves the result to browsers as `GET /stream-status`, CORS open

mod config;
mod metrics;
mod status;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::sync::Arc;
use std::time::Duration;
use stream_presence::StatusAggregator;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twitch_auth::TokenCache;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::Config;

/// How long in-flight requests get to finish after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Plain-text body for `GET /`
const LIVENESS_MESSAGE: &str = "stream status relay is online";

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    aggregator: Arc<StatusAggregator>,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// Every origin may read the status (the page embedding it is served from
/// elsewhere). A concurrency limit caps simultaneous requests at
/// `max_connections`.
fn build_router(state: AppState, max_connections: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route(status::STATUS_ROUTE, get(stream_status_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting stream-status-relay");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    match &config_path {
        Some(path) => info!(path = %path.display(), "loading configuration"),
        None => info!("no config file given, using environment and defaults"),
    }

    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;

    info!(
        listen_addr = %config.listen_addr,
        identity_url = %config.identity_url,
        streams_url = %config.streams_url,
        timeout_secs = config.timeout.as_secs(),
        streamers = ?config.streamers,
        "configuration loaded"
    );

    let client = reqwest::Client::new();
    let tokens = Arc::new(TokenCache::new(
        client.clone(),
        config.identity_url.clone(),
        config.client_id.clone(),
        config.client_secret.clone(),
        config.timeout,
    ));
    let aggregator = Arc::new(StatusAggregator::new(
        tokens,
        client,
        config.streams_url.clone(),
        config.streamers.clone(),
        config.timeout,
    ));

    let app_state = AppState {
        aggregator,
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.max_connections);

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.listen_addr))?;

    info!(addr = %config.listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires: notify the
    // server to drain, then race the drain against DRAIN_TIMEOUT.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Liveness: the process is up and serving HTTP.
async fn root_handler() -> &'static str {
    LIVENESS_MESSAGE
}

/// Presence map for the configured streamers.
async fn stream_status_handler(State(state): State<AppState>) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    status::stream_status(&state.aggregator, request_id).await
}

/// Prometheus metrics endpoint: text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
