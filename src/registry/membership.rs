//! Connection registry
//!
//! Tracks the set of live connections eligible for pairing. Membership is kept
//! in registration order so the matchmaker can always take "the first N".

use crate::registry::connection::ClientConnection;
use crate::types::ConnectionId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

#[derive(Debug, Default)]
struct RegistryInner {
    /// Members keyed by registration sequence
    members: BTreeMap<u64, Arc<ClientConnection>>,
    /// Connection id to registration sequence
    index: HashMap<ConnectionId, u64>,
    next_seq: u64,
}

/// Thread-safe set of live client connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. Returns `false` if it was already registered.
    pub fn register(&self, connection: Arc<ClientConnection>) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = connection.id();

        if inner.index.contains_key(&id) {
            return false;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.index.insert(id, seq);
        inner.members.insert(seq, connection);

        debug!(
            "Registered connection {} ({} registered)",
            id,
            inner.members.len()
        );
        true
    }

    /// Remove a connection. Returns `false` if it was not registered.
    pub fn deregister(&self, connection_id: ConnectionId) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        match inner.index.remove(&connection_id) {
            Some(seq) => {
                inner.members.remove(&seq);
                debug!(
                    "Deregistered connection {} ({} registered)",
                    connection_id,
                    inner.members.len()
                );
                true
            }
            None => false,
        }
    }

    /// First `n` open members in registration order.
    ///
    /// Connections already closed by the server but not yet deregistered by
    /// their owning task are skipped.
    pub fn snapshot(&self, n: usize) -> Vec<Arc<ClientConnection>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);

        inner
            .members
            .values()
            .filter(|connection| connection.is_open())
            .take(n)
            .cloned()
            .collect()
    }

    /// Number of open members
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .members
            .values()
            .filter(|connection| connection.is_open())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the connection is currently registered
    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.index.contains_key(&connection_id)
    }

    /// Ids of every member, open or not, in registration order
    pub fn ids(&self) -> Vec<ConnectionId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.members.values().map(|c| c.id()).collect()
    }
}
