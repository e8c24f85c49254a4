//! Live connection tracking for the matchmaking service
//!
//! This module holds the connection handle shared between the front door and
//! the matchmaker, the registry of connections waiting for a match, and the
//! helper used to push notices to a group of them.

pub mod connection;
pub mod membership;
pub mod notify;

// Re-export commonly used types
pub use connection::{ClientConnection, ConnectionError, Outbound};
pub use membership::ConnectionRegistry;
pub use notify::notify;
