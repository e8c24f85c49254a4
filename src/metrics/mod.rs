//! Metrics and monitoring for the pair-room matchmaking service
//!
//! This module provides Prometheus metrics collection for connections, match
//! cycles, and fleet claim latency.

pub mod collector;

pub use collector::{MatchMetrics, MatchOutcome, MetricsCollector, MetricsTimer, ServiceMetrics};
