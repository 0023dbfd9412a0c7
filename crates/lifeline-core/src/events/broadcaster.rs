//! Event broadcaster for the dispatch event bus.
//!
//! The `EventBroadcaster` is the seam between the registries (which mutate
//! state and publish) and the fan-out router (which subscribes and
//! delivers). It uses tokio's broadcast channel for multi-producer,
//! multi-consumer messaging, so a slow subscriber can never stall a state
//! transition.

use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::DispatchEvent;

/// Default buffer size for the broadcast channel.
/// Events beyond this limit will cause older events to be dropped for slow receivers.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Broadcaster for dispatch events.
///
/// Thread-safe; cloning is cheap and all clones share the same channel.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<DispatchEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster with default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new broadcaster with custom buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new broadcaster wrapped in an Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Send an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event;
    /// 0 if there are no active subscribers.
    pub fn send(&self, event: DispatchEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    /// Subscribe to events.
    ///
    /// Events sent before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers.
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertStatus, EmergencyAlert, Priority};
    use crate::geo::Coordinate;
    use time::OffsetDateTime;

    fn sample_alert() -> EmergencyAlert {
        EmergencyAlert {
            id: "alert-1".into(),
            reporter_id: "user-1".into(),
            coordinate: Coordinate::new(0.0, 0.0),
            description: "test".into(),
            priority: Priority::Low,
            status: AlertStatus::Active,
            assigned_resource_id: None,
            created_at: OffsetDateTime::now_utc(),
            resolved_at: None,
        }
    }

    #[test]
    fn test_broadcaster_creation() {
        let broadcaster = EventBroadcaster::new();
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert!(!broadcaster.has_subscribers());
    }

    #[test]
    fn test_broadcaster_no_subscribers() {
        let broadcaster = EventBroadcaster::new();
        let count = broadcaster.send(DispatchEvent::alert_created(sample_alert()));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_broadcaster_send_receive() {
        let broadcaster = EventBroadcaster::new();
        let mut receiver = broadcaster.subscribe();

        broadcaster.send(DispatchEvent::alert_created(sample_alert()));

        let event = receiver.recv().await.unwrap();
        match event {
            DispatchEvent::AlertCreated { alert } => assert_eq!(alert.id, "alert-1"),
            other => panic!("expected AlertCreated, got {}", other.name()),
        }
    }

    #[tokio::test]
    async fn test_broadcaster_multiple_subscribers() {
        let broadcaster = EventBroadcaster::new();
        let mut receiver1 = broadcaster.subscribe();
        let mut receiver2 = broadcaster.subscribe();

        assert_eq!(broadcaster.subscriber_count(), 2);

        let count = broadcaster.send(DispatchEvent::alert_updated(sample_alert()));
        assert_eq!(count, 2);

        assert!(matches!(
            receiver1.recv().await.unwrap(),
            DispatchEvent::AlertUpdated { .. }
        ));
        assert!(matches!(
            receiver2.recv().await.unwrap(),
            DispatchEvent::AlertUpdated { .. }
        ));
    }

    #[test]
    fn test_broadcaster_shared() {
        let broadcaster = EventBroadcaster::new_shared();
        let broadcaster2 = broadcaster.clone();

        let _receiver = broadcaster.subscribe();
        assert_eq!(broadcaster2.subscriber_count(), 1);
    }
}
