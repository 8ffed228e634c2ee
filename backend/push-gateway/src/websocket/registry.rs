/// WebSocket Connection Registry
///
/// Maps an authenticated identity to the single live connection that receives its events.
/// Supports:
/// - Registration with replace-not-merge semantics per identity
/// - Targeted delivery to one identity
/// - Broadcast to every registered identity
/// - Deregistration guarded by connection id so stale teardowns cannot evict a newer entry
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::Event;
use crate::error::DeliveryError;
use crate::metrics;
use crate::models::Identity;

/// Unique identifier for one admitted WebSocket connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Writable side of a live connection
///
/// Serialized events are queued to the connection's lifecycle task, which owns the socket.
/// Once that task ends the queue is closed and every send fails with `Closed`.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    /// Create a handle plus the receiver its lifecycle task drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = Self {
            id: ConnectionId::new(),
            sender,
        };
        (handle, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn send(&self, text: String) -> Result<(), ()> {
        self.sender.send(text).map_err(|_| ())
    }
}

/// Outcome of a broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Handles a write was attempted on
    pub attempted: usize,
    /// Writes that were accepted
    pub delivered: usize,
}

impl BroadcastReport {
    pub fn failed(&self) -> usize {
        self.attempted - self.delivered
    }
}

/// Process-scoped registry of live connections
///
/// Created once at startup and shared by cloning. All access goes through a single
/// reader/writer lock: lookups and broadcasts read, add/remove write.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    // identity -> the one connection currently addressed for it
    inner: Arc<RwLock<HashMap<Identity, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` as the connection for `identity`
    ///
    /// Replaces any existing entry. The replaced handle is not closed here; its own
    /// lifecycle task keeps running until the transport ends.
    pub async fn add(&self, identity: Identity, handle: ConnectionHandle) {
        let connection_id = handle.id();
        let mut guard = self.inner.write().await;
        let replaced = guard.insert(identity.clone(), handle);
        metrics::set_active_connections(guard.len());

        match replaced {
            Some(previous) => tracing::debug!(
                user_id = %identity,
                connection_id = %connection_id,
                replaced_connection_id = %previous.id(),
                "Replaced existing connection"
            ),
            None => tracing::debug!(
                user_id = %identity,
                connection_id = %connection_id,
                total_connections = guard.len(),
                "Registered connection"
            ),
        }
    }

    /// Remove whatever connection is registered for `identity`
    ///
    /// Returns whether an entry was removed.
    pub async fn remove(&self, identity: &Identity) -> bool {
        let mut guard = self.inner.write().await;
        let removed = guard.remove(identity).is_some();
        metrics::set_active_connections(guard.len());
        removed
    }

    /// Remove the entry for `identity` only if it still belongs to `connection_id`
    pub async fn remove_connection(&self, identity: &Identity, connection_id: ConnectionId) -> bool {
        let mut guard = self.inner.write().await;

        let owned = guard
            .get(identity)
            .is_some_and(|handle| handle.id() == connection_id);
        if owned {
            guard.remove(identity);
            metrics::set_active_connections(guard.len());
            tracing::debug!(
                user_id = %identity,
                connection_id = %connection_id,
                remaining = guard.len(),
                "Deregistered connection"
            );
        } else {
            tracing::debug!(
                user_id = %identity,
                connection_id = %connection_id,
                "Connection already replaced, leaving registry entry in place"
            );
        }

        owned
    }

    /// Serialize `event` and write it to the connection registered for `identity`
    pub async fn send_to_user(&self, identity: &Identity, event: &Event) -> Result<(), DeliveryError> {
        let result = self.deliver(identity, event).await;
        metrics::record_delivery(match &result {
            Ok(()) => "delivered",
            Err(e) => e.outcome(),
        });
        result
    }

    async fn deliver(&self, identity: &Identity, event: &Event) -> Result<(), DeliveryError> {
        let text = event
            .to_json()
            .map_err(|e| DeliveryError::Serialization(e.to_string()))?;

        let guard = self.inner.read().await;
        let handle = guard
            .get(identity)
            .ok_or_else(|| DeliveryError::NoRecipient(identity.clone()))?;

        handle
            .send(text)
            .map_err(|()| DeliveryError::Closed(identity.clone()))
    }

    /// Write `event` to every registered connection
    ///
    /// A failed write on one handle never stops delivery to the rest.
    pub async fn broadcast(&self, event: &Event) -> BroadcastReport {
        let text = match event.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, event_type = event.kind(), "Failed to serialize broadcast");
                metrics::record_delivery("serialization");
                return BroadcastReport::default();
            }
        };

        let guard = self.inner.read().await;
        let mut report = BroadcastReport::default();

        for (identity, handle) in guard.iter() {
            report.attempted += 1;
            match handle.send(text.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    metrics::record_delivery("delivered");
                }
                Err(()) => {
                    metrics::record_delivery("closed");
                    tracing::debug!(user_id = %identity, "Broadcast skipped closed connection");
                }
            }
        }

        report
    }

    /// Whether `identity` currently has a registered connection
    pub async fn is_connected(&self, identity: &Identity) -> bool {
        self.inner.read().await.contains_key(identity)
    }

    /// Connection id registered for `identity`, if any
    pub async fn connection_id(&self, identity: &Identity) -> Option<ConnectionId> {
        self.inner.read().await.get(identity).map(ConnectionHandle::id)
    }

    /// Number of registered identities
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// List of all connected identities
    pub async fn connected_identities(&self) -> Vec<Identity> {
        self.inner.read().await.keys().cloned().collect()
    }
}
