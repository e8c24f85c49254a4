//! Common types used throughout the matchmaking service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Process-local identifier for a client connection
pub type ConnectionId = Uuid;

/// Text sent to both clients when a pair has been selected
pub const MATCH_FOUND_NOTICE: &str = "Match found! Requesting server...";

/// Text sent to both clients when the allocator had nothing to give
pub const NO_SERVER_NOTICE: &str = "No server available. Waiting...";

/// Notices delivered to waiting clients over their matchmaking socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    MatchFound,
    NoServerAvailable,
    ServerReady(String),
}

impl Notice {
    /// Wire text for this notice
    pub fn as_text(&self) -> &str {
        match self {
            Notice::MatchFound => MATCH_FOUND_NOTICE,
            Notice::NoServerAvailable => NO_SERVER_NOTICE,
            Notice::ServerReady(address) => address,
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

/// Body of a fleet claim request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub claim_keys: Vec<String>,
    pub regions: Vec<String>,
    pub session_id: String,
}

impl ClaimRequest {
    /// Build a request for a single claim key and region
    pub fn single(claim_key: &str, region: &str, session_id: &str) -> Self {
        Self {
            claim_keys: vec![claim_key.to_string()],
            regions: vec![region.to_string()],
            session_id: session_id.to_string(),
        }
    }
}

/// A dedicated server handed out by the fleet allocator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAllocation {
    pub ip: String,
    #[serde(default)]
    pub ports: HashMap<String, u16>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub server_id: Option<String>,
    #[serde(default)]
    pub fleet_id: Option<String>,
}

impl ServerAllocation {
    /// Allocation with a single named port
    pub fn new(ip: impl Into<String>, port_name: &str, port: u16) -> Self {
        let mut ports = HashMap::new();
        ports.insert(port_name.to_string(), port);
        Self {
            ip: ip.into(),
            ports,
            region: None,
            server_id: None,
            fleet_id: None,
        }
    }

    /// Format the allocation as `host:port` for the named port
    pub fn host_port(&self, port_name: &str) -> Option<String> {
        self.ports
            .get(port_name)
            .map(|port| format!("{}:{}", self.ip, port))
    }
}

/// Result of one completed match cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub connections: Vec<ConnectionId>,
    pub address: String,
    pub matched_at: DateTime<Utc>,
}
