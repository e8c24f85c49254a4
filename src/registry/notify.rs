//! Best-effort delivery of notices to a group of connections

use crate::registry::connection::ClientConnection;
use crate::types::Notice;
use std::sync::Arc;
use tracing::debug;

/// Send `notice` to every connection in `connections`.
///
/// A connection that is already closed is skipped; it never stops delivery to
/// the rest. Returns how many connections accepted the frame.
pub fn notify(connections: &[Arc<ClientConnection>], notice: &Notice) -> usize {
    let mut delivered = 0;

    for connection in connections {
        match connection.send(notice.as_text()) {
            Ok(()) => delivered += 1,
            Err(e) => debug!("Skipping notice '{}': {}", notice, e),
        }
    }

    delivered
}
