//! Per-connection WebSocket task
//!
//! Each accepted socket is registered for matchmaking, pumped until either side
//! closes it, and deregistered on the way out no matter how it ended.

use crate::registry::{ClientConnection, Outbound};
use crate::server::front_door::FrontDoorState;
use crate::utils::current_timestamp;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;
use tracing::debug;

/// How long to wait for the client's reply after we send a close frame
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, PartialEq, Eq)]
enum WriterExit {
    /// We sent a close frame
    ServerClosed,
    /// Every handle to the connection was dropped
    QueueClosed,
    /// The transport refused a frame
    TransportError,
}

/// Drive one client connection from upgrade to deregistration
pub(crate) async fn handle_socket(socket: WebSocket, state: FrontDoorState) {
    let (connection, mut outbound) = ClientConnection::channel();
    let id = connection.id();

    state.registry.register(connection.clone());
    state.metrics.record_connection_opened();
    debug!("Client {} connected", id);

    let (mut sink, mut stream) = socket.split();

    let reader = read_until_close(&mut stream);
    tokio::pin!(reader);

    tokio::select! {
        exit = write_frames(&mut sink, &mut outbound) => {
            debug!("Writer for {} finished: {:?}", id, exit);
            if exit == WriterExit::ServerClosed
                && timeout(CLOSE_HANDSHAKE_TIMEOUT, &mut reader).await.is_err()
            {
                debug!("Client {} did not answer the close frame", id);
            }
        }
        _ = &mut reader => {
            debug!("Client {} hung up", id);
        }
    }

    connection.mark_closed();
    state.registry.deregister(id);
    state.metrics.record_connection_closed();
    debug!(
        "Client {} disconnected after {}s",
        id,
        (current_timestamp() - connection.connected_at()).num_seconds()
    );
}

async fn write_frames(
    sink: &mut SplitSink<WebSocket, Message>,
    outbound: &mut UnboundedReceiver<Outbound>,
) -> WriterExit {
    while let Some(frame) = outbound.recv().await {
        match frame {
            Outbound::Text(text) => {
                // send() flushes, so the frame is on the wire before the next one
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    debug!("Failed to write text frame: {}", e);
                    return WriterExit::TransportError;
                }
            }
            Outbound::Close => {
                if let Err(e) = sink.send(Message::Close(None)).await {
                    debug!("Failed to write close frame: {}", e);
                    return WriterExit::TransportError;
                }
                return WriterExit::ServerClosed;
            }
        }
    }

    WriterExit::QueueClosed
}

async fn read_until_close(stream: &mut SplitStream<WebSocket>) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Close(_)) => return,
            // Clients have nothing to say while they wait for a match
            Ok(_) => {}
            Err(e) => {
                debug!("Transport error while reading: {}", e);
                return;
            }
        }
    }
}
