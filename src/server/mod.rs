//! Inbound transport for the matchmaking service
//!
//! Accepts WebSocket clients, registers them with the connection registry and
//! answers liveness, metrics and stats requests on reserved paths.

pub mod front_door;
mod socket;

pub use front_door::{FrontDoor, FrontDoorState, HEALTH_PATH};
