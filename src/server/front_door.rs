//! WebSocket front door, liveness probe and metrics endpoints
//!
//! Every request path except the reserved ones is treated as a matchmaking
//! WebSocket. The reserved paths are answered before any upgrade happens, so
//! probes never reach the registry.

use crate::metrics::{MatchOutcome, MetricsCollector};
use crate::registry::ConnectionRegistry;
use crate::server::socket::handle_socket;
use anyhow::{Context, Result};
use axum::{
    extract::{State, WebSocketUpgrade},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Reserved liveness path
pub const HEALTH_PATH: &str = "/healthz";

/// Shared state for the front door handlers
#[derive(Clone)]
pub struct FrontDoorState {
    pub registry: Arc<ConnectionRegistry>,
    pub metrics: Arc<MetricsCollector>,
    pub started_at: Instant,
}

/// Accepts client connections and registers them for matchmaking
pub struct FrontDoor {
    address: String,
    state: FrontDoorState,
    shutdown_tx: broadcast::Sender<()>,
}

impl FrontDoor {
    pub fn new(
        address: impl Into<String>,
        registry: Arc<ConnectionRegistry>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            address: address.into(),
            state: FrontDoorState {
                registry,
                metrics,
                started_at: Instant::now(),
            },
            shutdown_tx,
        }
    }

    /// Bind the listening socket
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(&self.address)
            .await
            .with_context(|| format!("Failed to bind front door to {}", self.address))
    }

    /// Serve connections on `listener` until `stop` is called
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr()?;
        info!("Front door listening on ws://{}", local);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Front door shutdown signal received");
            })
            .await?;

        info!("Front door stopped");
        Ok(())
    }

    /// Create the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route(HEALTH_PATH, get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/stats", get(stats_handler))
            .fallback(websocket_handler)
            .with_state(self.state.clone())
    }

    /// Stop accepting connections
    pub fn stop(&self) {
        if self.shutdown_tx.send(()).is_err() {
            warn!("Front door was not serving when stop was requested");
        }
    }
}

/// Upgrade and hand the socket to its own task
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<FrontDoorState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Liveness probe
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<FrontDoorState>) -> Response {
    debug!("Metrics endpoint requested");
    state.metrics.update_uptime(state.started_at.elapsed());

    match state.metrics.encode_text() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics",
            )
                .into_response()
        }
    }
}

/// Matchmaking statistics for humans
async fn stats_handler(State(state): State<FrontDoorState>) -> impl IntoResponse {
    let metrics = &state.metrics;

    Json(json!({
        "service": "pair-room",
        "version": crate::VERSION,
        "waiting": state.registry.len(),
        "connections_active": metrics.matches().connections_active.get(),
        "matches_allocated": metrics.match_count(MatchOutcome::Allocated),
        "claims_failed": metrics.match_count(MatchOutcome::Unavailable),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "timestamp": chrono::Utc::now(),
    }))
}
