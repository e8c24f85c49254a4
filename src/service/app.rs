//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the registry, the
//! front door and the matchmaker together and owns their background tasks.

use crate::config::AppConfig;
use crate::fleet::{FleetAuthenticator, FleetClaimer};
use crate::matchmaker::{Matchmaker, MatchmakerConfig};
use crate::metrics::MetricsCollector;
use crate::registry::ConnectionRegistry;
use crate::server::FrontDoor;
use crate::utils::duration_ms;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Fleet login error: {message}")]
    Login { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Front door error: {message}")]
    Server { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Log in to the fleet allocator; the service must not accept clients without it
pub async fn login(authenticator: &dyn FleetAuthenticator) -> Result<(), ServiceError> {
    let start_time = Instant::now();

    authenticator
        .login()
        .await
        .map_err(|e| ServiceError::Login {
            message: e.to_string(),
        })?;

    info!(
        "Fleet login completed in {:.2}ms",
        duration_ms(start_time.elapsed())
    );
    Ok(())
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Connections waiting for a match
    registry: Arc<ConnectionRegistry>,

    /// Metrics shared by the front door and the matchmaker
    metrics: Arc<MetricsCollector>,

    /// Pairing scheduler
    matchmaker: Arc<Matchmaker>,

    /// WebSocket front door
    front_door: Arc<FrontDoor>,

    /// Stop flag observed by the matchmaker between passes
    shutdown_tx: watch::Sender<bool>,

    /// Background task handles
    matchmaker_task: Option<JoinHandle<()>>,
    server_task: Option<JoinHandle<()>>,

    /// Address the front door actually bound to
    local_addr: Option<SocketAddr>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig, claimer: Arc<dyn FleetClaimer>) -> Result<Self, ServiceError> {
        info!("Initializing pair-room matchmaking service");
        info!(
            "Configuration: service={}, listen={}, claim_key={}, region={}",
            config.service.name,
            config.listen_address(),
            config.fleet.claim_key,
            config.fleet.region
        );

        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let registry = Arc::new(ConnectionRegistry::new());

        let matchmaker = Arc::new(Matchmaker::new(
            registry.clone(),
            claimer,
            metrics.clone(),
            MatchmakerConfig::from_app_config(&config),
        ));

        let front_door = Arc::new(FrontDoor::new(
            config.listen_address(),
            registry.clone(),
            metrics.clone(),
        ));

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            registry,
            metrics,
            matchmaker,
            front_door,
            shutdown_tx,
            matchmaker_task: None,
            server_task: None,
            local_addr: None,
        })
    }

    /// Bind the front door and start the matchmaker
    pub async fn start(&mut self) -> Result<SocketAddr, ServiceError> {
        info!("Starting pair-room matchmaking service");

        let listener = self
            .front_door
            .bind()
            .await
            .map_err(|e| ServiceError::Server {
                message: e.to_string(),
            })?;
        let local_addr = listener.local_addr().map_err(|e| ServiceError::Server {
            message: format!("Failed to read bound address: {}", e),
        })?;

        let server_task = {
            let front_door = self.front_door.clone();
            tokio::spawn(async move {
                if let Err(e) = front_door.serve(listener).await {
                    error!("Front door failed: {}", e);
                }
            })
        };

        let matchmaker_task = {
            let matchmaker = self.matchmaker.clone();
            let shutdown_rx = self.shutdown_tx.subscribe();
            tokio::spawn(async move {
                matchmaker.run(shutdown_rx).await;
            })
        };

        self.server_task = Some(server_task);
        self.matchmaker_task = Some(matchmaker_task);
        self.local_addr = Some(local_addr);

        info!("✅ Pair-room matchmaking service started on {}", local_addr);
        Ok(local_addr)
    }

    /// Perform graceful shutdown.
    ///
    /// The matchmaker finishes whatever cycle it is in before the front door
    /// stops accepting connections.
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of pair-room service");
        let shutdown_timeout = self.config.shutdown_timeout();

        // Receivers may all be gone if start was never called
        let _ = self.shutdown_tx.send(true);

        if let Some(task) = self.matchmaker_task.take() {
            Self::join_task("matchmaker", task, shutdown_timeout).await?;
        }

        self.front_door.stop();
        if let Some(task) = self.server_task.take() {
            Self::join_task("front door", task, shutdown_timeout).await?;
        }

        info!(
            "Final statistics: {} connections still waiting, {} matches allocated",
            self.registry.len(),
            self.metrics
                .match_count(crate::metrics::MatchOutcome::Allocated)
        );
        info!("✅ Pair-room service shutdown completed");
        Ok(())
    }

    async fn join_task(
        name: &str,
        mut task: JoinHandle<()>,
        limit: Duration,
    ) -> Result<(), ServiceError> {
        match tokio::time::timeout(limit, &mut task).await {
            Ok(Ok(())) => {
                info!("✅ {} stopped", name);
                Ok(())
            }
            Ok(Err(e)) => Err(ServiceError::BackgroundTask {
                message: format!("{} task failed: {}", name, e),
            }),
            Err(_) => {
                warn!("⚠️  {} did not stop within {:?}, aborting", name, limit);
                task.abort();
                Ok(())
            }
        }
    }

    /// Check if service is running
    pub fn is_running(&self) -> bool {
        self.matchmaker_task.is_some() && !*self.shutdown_tx.borrow()
    }

    /// Get the connection registry
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        self.registry.clone()
    }

    /// Get the metrics collector
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Address the front door is listening on, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}
