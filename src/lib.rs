//! Pair Room - Matchmaking microservice for two-player games
//!
//! This crate accepts WebSocket clients, pairs them two at a time, claims a
//! dedicated game server for each pair from a fleet allocator, and hands both
//! players the server's address before closing their matchmaking sockets.

pub mod config;
pub mod error;
pub mod fleet;
pub mod matchmaker;
pub mod metrics;
pub mod registry;
pub mod server;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use fleet::{FleetAuthenticator, FleetClaimer, HttpFleetClient, StaticFleetClaimer};
pub use matchmaker::{Matchmaker, MatchmakerConfig};
pub use registry::{ClientConnection, ConnectionRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
