//! Matchmaking scheduler
//!
//! A single long-lived task that repeatedly takes the first two waiting
//! connections, claims a game server for them, hands them its address and
//! closes their matchmaking sockets. Claims are made one at a time.

use crate::config::AppConfig;
use crate::fleet::{ClaimError, FleetClaimer};
use crate::metrics::{MatchOutcome, MetricsCollector};
use crate::registry::{notify, ClientConnection, ConnectionRegistry};
use crate::types::{ClaimRequest, MatchRecord, Notice};
use crate::utils::{current_timestamp, duration_ms};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Number of connections in one match
pub const PAIR_SIZE: usize = 2;

/// Scheduler settings
#[derive(Debug, Clone)]
pub struct MatchmakerConfig {
    pub claim_key: String,
    pub region: String,
    pub session_id: String,
    /// Port handed to clients from the allocation's port map
    pub port_name: String,
    /// Sleep between pairing passes
    pub idle_interval: Duration,
    /// Delay between delivering the address and closing the pair
    pub flush_delay: Duration,
}

impl Default for MatchmakerConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

impl MatchmakerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            claim_key: config.fleet.claim_key.clone(),
            region: config.fleet.region.clone(),
            session_id: config.fleet.session_id.clone(),
            port_name: config.fleet.port_name.clone(),
            idle_interval: config.idle_interval(),
            flush_delay: config.flush_delay(),
        }
    }

    fn claim_request(&self) -> ClaimRequest {
        ClaimRequest::single(&self.claim_key, &self.region, &self.session_id)
    }
}

/// What a single scheduling tick did
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// Fewer than two connections were waiting
    Idle,
    /// A pair was handed a server and closed
    Matched(MatchRecord),
    /// A pair was selected but the fleet had no server for it
    NoServer,
}

/// The matchmaking scheduler
pub struct Matchmaker {
    registry: Arc<ConnectionRegistry>,
    claimer: Arc<dyn FleetClaimer>,
    metrics: Arc<MetricsCollector>,
    config: MatchmakerConfig,
}

impl Matchmaker {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        claimer: Arc<dyn FleetClaimer>,
        metrics: Arc<MetricsCollector>,
        config: MatchmakerConfig,
    ) -> Self {
        Self {
            registry,
            claimer,
            metrics,
            config,
        }
    }

    /// Run one claim-notify-close cycle for the first waiting pair.
    ///
    /// "Match found" always reaches the pair before the claim is issued, and
    /// the address or the failure notice always precedes any close.
    pub async fn tick(&self) -> TickOutcome {
        let pair = self.registry.snapshot(PAIR_SIZE);
        if pair.len() < PAIR_SIZE {
            return TickOutcome::Idle;
        }

        let ids: Vec<_> = pair.iter().map(|c| c.id()).collect();
        info!("Match found for connections {} and {}", ids[0], ids[1]);

        notify(&pair, &Notice::MatchFound);

        let timer = self.metrics.start_timer();
        let claimed = self.claim_address().await;
        let claim_duration = timer.stop();

        match claimed {
            Ok(address) => {
                info!(
                    "Server {} claimed for {} and {} in {:.2}ms",
                    address,
                    ids[0],
                    ids[1],
                    duration_ms(claim_duration)
                );
                self.metrics
                    .record_match(MatchOutcome::Allocated, claim_duration);

                notify(&pair, &Notice::ServerReady(address.clone()));
                self.close_pair(&pair).await;

                TickOutcome::Matched(MatchRecord {
                    connections: ids,
                    address,
                    matched_at: current_timestamp(),
                })
            }
            Err(e) => {
                warn!(
                    "No server for {} and {} after {:.2}ms: {}",
                    ids[0],
                    ids[1],
                    duration_ms(claim_duration),
                    e
                );
                self.metrics
                    .record_match(MatchOutcome::Unavailable, claim_duration);

                notify(&pair, &Notice::NoServerAvailable);
                TickOutcome::NoServer
            }
        }
    }

    async fn claim_address(&self) -> Result<String, ClaimError> {
        let allocation = self.claimer.claim(&self.config.claim_request()).await?;
        debug!("Fleet returned allocation {:?}", allocation);

        allocation
            .host_port(&self.config.port_name)
            .ok_or_else(|| ClaimError::MissingPort {
                ip: allocation.ip.clone(),
                port_name: self.config.port_name.clone(),
            })
    }

    async fn close_pair(&self, pair: &[Arc<ClientConnection>]) {
        // Close frames queue behind the address on each writer; the delay
        // gives the writers time to push both onto the wire.
        if !self.config.flush_delay.is_zero() {
            sleep(self.config.flush_delay).await;
        }

        for connection in pair {
            if !connection.close() {
                debug!("Connection {} was already closed", connection.id());
            }
        }
    }

    /// Pair connections until fewer than two remain or a claim fails.
    ///
    /// Returns the number of matches made.
    pub async fn run_pass(&self) -> usize {
        let mut matched = 0;

        loop {
            match self.tick().await {
                TickOutcome::Matched(_) => matched += 1,
                TickOutcome::NoServer => break,
                TickOutcome::Idle => break,
            }
        }

        if matched > 0 {
            debug!("Pairing pass made {} matches", matched);
        }
        matched
    }

    /// Run until `shutdown` turns true.
    ///
    /// The flag is only looked at between passes, so a cycle in progress
    /// always runs to completion.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Matchmaker started - claim key: '{}', region: '{}', idle interval: {:?}",
            self.config.claim_key, self.config.region, self.config.idle_interval
        );

        while !*shutdown.borrow() {
            self.run_pass().await;

            tokio::select! {
                _ = sleep(self.config.idle_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped, stopping matchmaker");
                        break;
                    }
                }
            }
        }

        info!("Matchmaker stopped");
    }
}
