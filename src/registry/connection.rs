//! Handle to a single client connection
//!
//! The socket itself is owned by the front door task that accepted it. Everyone
//! else (the registry, the matchmaker) holds an `Arc<ClientConnection>` and talks
//! to the socket through an ordered outbound queue, so a close queued after a
//! text frame is only written once that frame has been handed to the transport.

use crate::types::ConnectionId;
use crate::utils::{current_timestamp, generate_connection_id};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised when talking to a connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Connection {connection_id} is closed")]
    Closed { connection_id: ConnectionId },
}

/// Frames queued for the connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// Shared handle to a client connection
#[derive(Debug)]
pub struct ClientConnection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Outbound>,
    closed: AtomicBool,
    connected_at: DateTime<Utc>,
}

impl ClientConnection {
    /// Wrap the sending half of a writer queue
    pub fn new(outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id: generate_connection_id(),
            outbound,
            closed: AtomicBool::new(false),
            connected_at: current_timestamp(),
        }
    }

    /// Create a connection handle together with the receiving end of its queue
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self::new(tx)), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Whether the connection still accepts outbound frames
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.outbound.is_closed()
    }

    /// Queue a text frame without waiting for the receiver
    pub fn send(&self, text: &str) -> Result<(), ConnectionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConnectionError::Closed {
                connection_id: self.id,
            });
        }

        self.outbound
            .send(Outbound::Text(text.to_string()))
            .map_err(|_| ConnectionError::Closed {
                connection_id: self.id,
            })
    }

    /// Close the connection from the server side.
    ///
    /// Returns `true` if this call initiated the close. Closing an already
    /// closed connection does nothing.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }

        // Writer may already be gone if the client hung up first.
        let _ = self.outbound.send(Outbound::Close);
        true
    }

    /// Record that the transport went away without a server-side close
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl PartialEq for ClientConnection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClientConnection {}
