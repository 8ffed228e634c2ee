/// Event dispatcher
///
/// The one interface the rest of the system uses to push events to connected users.
/// Delivery never blocks or fails the caller: offline users and closed connections are
/// logged and dropped.
use crate::error::DeliveryError;
use crate::models::{CommentPayload, Identity, LikePayload};
use crate::websocket::{BroadcastReport, ConnectionRegistry, Event};

#[derive(Clone)]
pub struct EventDispatcher {
    registry: ConnectionRegistry,
}

impl EventDispatcher {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Deliver `event` to whatever connection is registered for `identity` right now
    pub async fn send_to_user(&self, identity: &Identity, event: &Event) -> Result<(), DeliveryError> {
        self.registry.send_to_user(identity, event).await
    }

    /// Deliver `event` to every registered connection
    pub async fn broadcast(&self, event: &Event) -> BroadcastReport {
        self.registry.broadcast(event).await
    }

    /// Spawn delivery to one identity without waiting for it
    pub fn dispatch_to_user(&self, identity: Identity, event: Event) {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            match registry.send_to_user(&identity, &event).await {
                Ok(()) => {
                    tracing::debug!(user_id = %identity, event_type = event.kind(), "Event delivered");
                }
                Err(e) if e.is_benign() => {
                    tracing::debug!(user_id = %identity, event_type = event.kind(), "Recipient offline, event dropped");
                }
                Err(e) => {
                    tracing::warn!(user_id = %identity, event_type = event.kind(), error = %e, "Event delivery failed");
                }
            }
        });
    }

    /// Spawn a broadcast without waiting for it
    pub fn dispatch_broadcast(&self, event: Event) {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            let report = registry.broadcast(&event).await;
            tracing::debug!(
                event_type = event.kind(),
                attempted = report.attempted,
                delivered = report.delivered,
                "Broadcast finished"
            );
        });
    }

    /// Tell the post owner someone liked their post
    pub fn notify_post_liked(&self, owner: Identity, like: LikePayload) {
        self.dispatch_to_user(owner, Event::new_like(like));
    }

    /// Tell the post owner someone commented on their post
    pub fn notify_post_commented(&self, owner: Identity, comment: CommentPayload) {
        self.dispatch_to_user(owner, Event::new_comment(comment));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::ConnectionHandle;
    use chrono::Utc;
    use std::time::Duration;
    use tokio::time::timeout;

    fn like(post_id: i64) -> LikePayload {
        LikePayload {
            id: 10,
            user_id: 5,
            post_id,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_notify_post_liked_reaches_owner() {
        let registry = ConnectionRegistry::new();
        let dispatcher = EventDispatcher::new(registry.clone());
        let (handle, mut rx) = ConnectionHandle::new();
        registry.add(Identity::new("42"), handle).await;

        dispatcher.notify_post_liked(Identity::new("42"), like(7));

        let text = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "new_like");
        assert_eq!(value["payload"]["post_id"], 7);
    }

    #[tokio::test]
    async fn test_notify_post_commented_reaches_owner() {
        let registry = ConnectionRegistry::new();
        let dispatcher = EventDispatcher::new(registry.clone());
        let (handle, mut rx) = ConnectionHandle::new();
        registry.add(Identity::new("42"), handle).await;

        dispatcher.notify_post_commented(
            Identity::new("42"),
            CommentPayload {
                id: 1,
                post_id: 7,
                user_id: 5,
                text: "first".to_string(),
                created_at: Utc::now(),
            },
        );

        let text = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(Event::from_json(&text).unwrap(), Event::NewComment(_)));
    }

    #[tokio::test]
    async fn test_offline_owner_is_not_an_error() {
        let dispatcher = EventDispatcher::new(ConnectionRegistry::new());

        // Returns immediately and the spawned delivery just logs
        dispatcher.notify_post_liked(Identity::new("offline"), like(1));

        let result = dispatcher
            .send_to_user(&Identity::new("offline"), &Event::new_like(like(1)))
            .await;
        assert!(result.unwrap_err().is_benign());
    }

    #[tokio::test]
    async fn test_dispatch_broadcast() {
        let registry = ConnectionRegistry::new();
        let dispatcher = EventDispatcher::new(registry.clone());
        let mut receivers = vec![];
        for i in 0..3i64 {
            let (handle, rx) = ConnectionHandle::new();
            registry.add(Identity::from(i), handle).await;
            receivers.push(rx);
        }

        dispatcher.dispatch_broadcast(Event::new_like(like(3)));

        for mut rx in receivers {
            let received = timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
            assert!(received.is_some());
        }
    }
}
