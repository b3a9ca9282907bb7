//! # HTTP Server
//!
//! HTTP server for metrics, health checks, and provider diagnostics.
//!
//! Provides endpoints:
//! - `/metrics` - Prometheus metrics in text format
//! - `/healthz` - Liveness probe (always returns 200)
//! - `/readyz` - Readiness probe (200 once configuration has been loaded)
//! - `/config/keys` - Loaded configuration keys, status and last error (never values)
//!
//! The server runs on port 5000 by default (configurable via `METRICS_PORT`).

use crate::observability::metrics;
use crate::provider::ConfigurationProvider;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Shared state for the HTTP handlers
#[derive(Debug, Clone)]
pub struct ServerState {
    pub provider: Arc<ConfigurationProvider>,
}

/// Body of `/config/keys`
#[derive(Debug, Serialize)]
pub struct KeysReport {
    pub status: String,
    pub generation: u64,
    pub keys: Vec<String>,
    pub last_error: Option<String>,
}

impl KeysReport {
    #[must_use]
    pub fn from_provider(provider: &ConfigurationProvider) -> Self {
        let data = provider.data();
        Self {
            status: provider.status().to_string(),
            generation: provider.generation(),
            keys: data.keys().map(ToString::to_string).collect(),
            last_error: provider.last_error().map(|failure| failure.message),
        }
    }
}

/// Build the router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route("/config/keys", get(keys_handler))
        .with_state(state)
}

/// Serve until `shutdown` is cancelled
pub async fn start_server(
    port: u16,
    state: ServerState,
    shutdown: CancellationToken,
) -> Result<(), anyhow::Error> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = metrics::gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
}

async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

async fn readyz_handler(State(state): State<ServerState>) -> impl IntoResponse {
    if state.provider.status().is_loaded() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn keys_handler(State(state): State<ServerState>) -> Json<KeysReport> {
    Json(KeysReport::from_provider(&state.provider))
}
