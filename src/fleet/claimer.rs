//! Fleet allocator interfaces
//!
//! The matchmaker only ever sees these traits. The HTTP client in
//! `fleet::client` is the production implementation; `StaticFleetClaimer`
//! serves fixed or scripted allocations for local runs and tests.

use crate::types::{ClaimRequest, ServerAllocation};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Errors returned by the fleet allocator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("No server available: {reason}")]
    Unavailable { reason: String },

    #[error("Allocation {ip} has no port named '{port_name}'")]
    MissingPort { ip: String, port_name: String },

    #[error("Not authorized: {message}")]
    Unauthorized { message: String },

    #[error("Allocator returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Allocator request failed: {message}")]
    Transport { message: String },

    #[error("Invalid allocator response: {message}")]
    InvalidResponse { message: String },
}

/// Claims a ready game server from the fleet
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FleetClaimer: Send + Sync {
    /// Claim one server matching the request's keys and regions
    async fn claim(&self, request: &ClaimRequest) -> Result<ServerAllocation, ClaimError>;
}

/// One-time login against the allocator, required before claiming
#[async_trait]
pub trait FleetAuthenticator: Send + Sync {
    async fn login(&self) -> Result<(), ClaimError>;
}

/// Claimer that hands out scripted allocations without talking to a fleet
#[derive(Debug, Default)]
pub struct StaticFleetClaimer {
    script: Mutex<VecDeque<Result<ServerAllocation, ClaimError>>>,
    fallback: Option<ServerAllocation>,
    requests: Mutex<Vec<ClaimRequest>>,
}

impl StaticFleetClaimer {
    /// Every claim succeeds with the same allocation
    pub fn always(allocation: ServerAllocation) -> Self {
        Self {
            fallback: Some(allocation),
            ..Self::default()
        }
    }

    /// Every claim fails as unavailable
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Claims return `outcomes` in order, then fail as unavailable
    pub fn scripted(outcomes: Vec<Result<ServerAllocation, ClaimError>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    /// Number of claims received so far
    pub fn claim_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Every request received so far (for testing)
    pub fn requests(&self) -> Vec<ClaimRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl FleetClaimer for StaticFleetClaimer {
    async fn claim(&self, request: &ClaimRequest) -> Result<ServerAllocation, ClaimError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let outcome = match (scripted, &self.fallback) {
            (Some(outcome), _) => outcome,
            (None, Some(allocation)) => Ok(allocation.clone()),
            (None, None) => Err(ClaimError::Unavailable {
                reason: "static claimer has no allocation".to_string(),
            }),
        };

        debug!("Static claim for {:?}: {:?}", request.claim_keys, outcome);
        outcome
    }
}

#[async_trait]
impl FleetAuthenticator for StaticFleetClaimer {
    async fn login(&self) -> Result<(), ClaimError> {
        Ok(())
    }
}
