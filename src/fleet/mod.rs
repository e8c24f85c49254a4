//! Fleet allocator integration
//!
//! The matchmaker asks the fleet for a dedicated game server per match. This
//! module defines that seam and its HTTP implementation.

pub mod claimer;
pub mod client;

// Re-export commonly used types
pub use claimer::{ClaimError, FleetAuthenticator, FleetClaimer, StaticFleetClaimer};
pub use client::HttpFleetClient;
