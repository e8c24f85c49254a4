//! Pairing of waiting connections
//!
//! The scheduler in this module drives every match through claim, notify and
//! close, strictly one pair at a time and in registration order.

pub mod scheduler;

// Re-export commonly used types
pub use scheduler::{Matchmaker, MatchmakerConfig, TickOutcome, PAIR_SIZE};
