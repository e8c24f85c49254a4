//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the pair-room matchmaking
//! service using Prometheus metrics.

use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How a match cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Allocated,
    Unavailable,
}

impl MatchOutcome {
    fn label(self) -> &'static str {
        match self {
            MatchOutcome::Allocated => "allocated",
            MatchOutcome::Unavailable => "unavailable",
        }
    }
}

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Connection and match metrics
    match_metrics: MatchMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,
}

/// Connection and match metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Connections currently attached to the front door
    pub connections_active: IntGauge,

    /// Connections accepted since start
    pub connections_total: IntCounter,

    /// Match cycles by outcome
    pub matches_total: IntCounterVec,

    /// Time spent waiting on the fleet allocator
    pub claim_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            match_metrics,
        })
    }

    /// Get match metrics
    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    /// Record a client connection being accepted
    pub fn record_connection_opened(&self) {
        self.match_metrics.connections_total.inc();
        self.match_metrics.connections_active.inc();
    }

    /// Record a client connection going away
    pub fn record_connection_closed(&self) {
        self.match_metrics.connections_active.dec();
    }

    /// Record a finished match cycle and how long the claim took
    pub fn record_match(&self, outcome: MatchOutcome, claim_duration: Duration) {
        self.match_metrics
            .matches_total
            .with_label_values(&[outcome.label()])
            .inc();
        self.match_metrics
            .claim_duration
            .observe(claim_duration.as_secs_f64());
    }

    /// Number of match cycles that ended with the given outcome
    pub fn match_count(&self, outcome: MatchOutcome) -> u64 {
        self.match_metrics
            .matches_total
            .with_label_values(&[outcome.label()])
            .get()
    }

    /// Update service uptime
    pub fn update_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }

    /// Encode every registered metric in the Prometheus text format
    pub fn encode_text(&self) -> Result<String> {
        let encoder = prometheus::TextEncoder::new();
        encoder
            .encode_to_string(&self.registry.gather())
            .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("pair_room_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        Ok(Self { uptime_seconds })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let connections_active = IntGauge::new(
            "pair_room_connections_active",
            "Client connections currently open",
        )?;
        registry.register(Box::new(connections_active.clone()))?;

        let connections_total = IntCounter::new(
            "pair_room_connections_total",
            "Client connections accepted",
        )?;
        registry.register(Box::new(connections_total.clone()))?;

        let matches_total = IntCounterVec::new(
            Opts::new("pair_room_matches_total", "Match cycles by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(matches_total.clone()))?;

        let claim_duration = Histogram::with_opts(
            HistogramOpts::new(
                "pair_room_claim_duration_seconds",
                "Fleet claim call duration",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;
        registry.register(Box::new(claim_duration.clone()))?;

        Ok(Self {
            connections_active,
            connections_total,
            matches_total,
            claim_duration,
        })
    }
}
