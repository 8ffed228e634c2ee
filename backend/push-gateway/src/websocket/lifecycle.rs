/// Per-connection lifecycle loop
///
/// One task per admitted connection. The task owns the socket: it writes queued events,
/// reads and discards client frames, and on any exit deregisters before closing.
use actix_ws::{CloseReason, Message, MessageStream, ProtocolError, Session};
use futures_util::StreamExt;
use tokio::sync::mpsc::UnboundedReceiver;

use super::messages::InboundFrame;
use super::registry::{ConnectionId, ConnectionRegistry};
use crate::models::Identity;

/// Registration owned by a running connection
///
/// `release` deregisters on the normal path. If the task is dropped first (worker shutdown,
/// panic) the entry is removed from a spawned task instead.
pub struct LiveConnection {
    registry: ConnectionRegistry,
    identity: Identity,
    connection_id: ConnectionId,
    released: bool,
}

impl LiveConnection {
    pub fn new(registry: ConnectionRegistry, identity: Identity, connection_id: ConnectionId) -> Self {
        Self {
            registry,
            identity,
            connection_id,
            released: false,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Deregister this connection from the registry
    pub async fn release(mut self) {
        self.released = true;
        self.registry
            .remove_connection(&self.identity, self.connection_id)
            .await;
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let registry = self.registry.clone();
        let identity = self.identity.clone();
        let connection_id = self.connection_id;
        runtime.spawn(async move {
            registry.remove_connection(&identity, connection_id).await;
        });
    }
}

/// Why the loop stopped
#[derive(Debug)]
pub enum ConnectionEnd {
    /// Client sent a close frame
    ClientClosed(Option<CloseReason>),
    /// Inbound stream finished without a close frame
    StreamEnded,
    /// Transport-level protocol violation
    Protocol(ProtocolError),
    /// Client frame did not decode as an event envelope
    MalformedFrame(serde_json::Error),
    /// Socket refused a write
    WriteFailed,
}

/// Serve an admitted connection until its transport ends
///
/// Every exit path runs the same teardown: deregister, then close.
pub async fn run(
    connection: LiveConnection,
    mut session: Session,
    mut inbound: MessageStream,
    mut outbound: UnboundedReceiver<String>,
) {
    let mut outbound_open = true;

    let end = loop {
        tokio::select! {
            frame = inbound.next() => match frame {
                Some(Ok(message)) => {
                    if let Some(end) = handle_inbound(connection.identity(), &mut session, message).await {
                        break end;
                    }
                }
                Some(Err(e)) => break ConnectionEnd::Protocol(e),
                None => break ConnectionEnd::StreamEnded,
            },
            queued = outbound.recv(), if outbound_open => match queued {
                Some(text) => {
                    if session.text(text).await.is_err() {
                        break ConnectionEnd::WriteFailed;
                    }
                }
                // Replaced in the registry; keep serving reads until the client leaves
                None => outbound_open = false,
            },
        }
    };

    let identity = connection.identity().clone();
    let connection_id = connection.connection_id();
    match &end {
        ConnectionEnd::ClientClosed(_) | ConnectionEnd::StreamEnded => {
            tracing::info!(user_id = %identity, connection_id = %connection_id, "WebSocket user disconnected");
        }
        other => {
            tracing::warn!(
                user_id = %identity,
                connection_id = %connection_id,
                reason = ?other,
                "WebSocket connection ended with error"
            );
        }
    }

    connection.release().await;
    drop(outbound);

    let close_reason = match end {
        ConnectionEnd::ClientClosed(reason) => reason,
        _ => None,
    };
    if let Err(e) = session.close(close_reason).await {
        tracing::debug!(user_id = %identity, error = ?e, "WebSocket session already closed");
    }
}

async fn handle_inbound(
    identity: &Identity,
    session: &mut Session,
    message: Message,
) -> Option<ConnectionEnd> {
    match message {
        Message::Text(text) => log_frame(identity, text.as_bytes()),
        Message::Binary(bytes) => log_frame(identity, &bytes),
        Message::Ping(bytes) => session
            .pong(&bytes)
            .await
            .err()
            .map(|_| ConnectionEnd::WriteFailed),
        Message::Close(reason) => Some(ConnectionEnd::ClientClosed(reason)),
        // Pong, continuation and nop frames carry nothing to act on
        _ => None,
    }
}

fn log_frame(identity: &Identity, raw: &[u8]) -> Option<ConnectionEnd> {
    match InboundFrame::parse(raw) {
        Ok(frame) => {
            tracing::debug!(
                user_id = %identity,
                event_type = frame.kind.as_deref().unwrap_or("-"),
                "WebSocket received message"
            );
            None
        }
        Err(e) => Some(ConnectionEnd::MalformedFrame(e)),
    }
}
