use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Well-known message kinds published by workers.
pub mod kinds {
    /// A worker claimed a task.
    pub const TASK_CLAIMED: &str = "task_claimed";
    /// A worker completed a task.
    pub const TASK_COMPLETED: &str = "task_completed";
    /// A worker's capability call failed.
    pub const TASK_FAILED: &str = "task_failed";
}

/// An ephemeral coordination message exchanged between workers.
///
/// Messages are created by a worker, fanned out to current subscribers, and
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    /// Message kind; see [`kinds`] for the well-known values.
    pub kind: String,
    /// Agent id of the publisher.
    pub sender: String,
    /// Arbitrary JSON payload.
    pub payload: serde_json::Value,
    /// UTC timestamp of publication.
    pub timestamp: DateTime<Utc>,
}

impl BusMessage {
    /// Creates a message with the given kind, sender, and payload.
    pub fn new(
        kind: impl Into<String>,
        sender: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind: kind.into(),
            sender: sender.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Claim announcement for the given task.
    pub fn task_claimed(sender: impl Into<String>, task_id: Uuid) -> Self {
        Self::new(
            kinds::TASK_CLAIMED,
            sender,
            serde_json::json!({ "task_id": task_id }),
        )
    }

    /// Completion announcement for the given task.
    pub fn task_completed(sender: impl Into<String>, task_id: Uuid) -> Self {
        Self::new(
            kinds::TASK_COMPLETED,
            sender,
            serde_json::json!({ "task_id": task_id }),
        )
    }

    /// Failure announcement for the given task.
    pub fn task_failed(sender: impl Into<String>, task_id: Uuid, error: &str) -> Self {
        Self::new(
            kinds::TASK_FAILED,
            sender,
            serde_json::json!({ "task_id": task_id, "error": error }),
        )
    }
}

/// Monotonic counter view over all traffic the bus has seen.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BusStatistics {
    /// Total messages published since the bus was created.
    pub total_messages: u64,
    /// Message counts keyed by kind.
    pub by_kind: HashMap<String, u64>,
}

/// Best-effort, non-durable pub/sub channel for inter-worker coordination.
///
/// A subscriber registered after a message was published never sees it, and a
/// subscriber that lags beyond the channel capacity loses the oldest
/// messages. Ordering is preserved per publisher.
pub struct MessageBus {
    tx: broadcast::Sender<BusMessage>,
    stats: RwLock<BusStatistics>,
}

impl MessageBus {
    /// Default broadcast channel capacity.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a bus with the given channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            stats: RwLock::new(BusStatistics::default()),
        }
    }

    /// Fans a message out to all current subscribers.
    ///
    /// Publishing with zero subscribers is not an error; the counters still
    /// advance. Returns the number of subscribers the message reached.
    pub fn publish(&self, message: BusMessage) -> usize {
        {
            let mut stats = self.stats.write();
            stats.total_messages += 1;
            *stats.by_kind.entry(message.kind.clone()).or_insert(0) += 1;
        }

        match self.tx.send(message) {
            Ok(receivers) => receivers,
            // No live subscribers; delivery is best-effort.
            Err(_) => 0,
        }
    }

    /// Registers a subscriber. Only messages published after this call are
    /// delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Monotonic statistics over everything published so far.
    pub fn statistics(&self) -> BusStatistics {
        self.stats.read().clone()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let bus = MessageBus::new();
        let reached = bus.publish(BusMessage::task_claimed("backend", Uuid::new_v4()));
        assert_eq!(reached, 0);
        assert_eq!(bus.statistics().total_messages, 1);
    }

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let bus = MessageBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let reached = bus.publish(BusMessage::task_completed("qa", Uuid::new_v4()));
        assert_eq!(reached, 2);

        assert_eq!(rx1.recv().await.unwrap().kind, kinds::TASK_COMPLETED);
        assert_eq!(rx2.recv().await.unwrap().kind, kinds::TASK_COMPLETED);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_traffic() {
        let bus = MessageBus::new();
        bus.publish(BusMessage::task_claimed("backend", Uuid::new_v4()));

        let mut rx = bus.subscribe();
        bus.publish(BusMessage::task_completed("backend", Uuid::new_v4()));

        // Only the message published after subscribing is delivered.
        assert_eq!(rx.recv().await.unwrap().kind, kinds::TASK_COMPLETED);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publisher_order_preserved() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe();

        for i in 0..5 {
            bus.publish(BusMessage::new(
                "status_update",
                "devops",
                serde_json::json!({ "step": i }),
            ));
        }

        for i in 0..5 {
            let msg = rx.recv().await.unwrap();
            assert_eq!(msg.payload["step"], i);
        }
    }

    #[test]
    fn test_statistics_by_kind() {
        let bus = MessageBus::new();
        let id = Uuid::new_v4();
        bus.publish(BusMessage::task_claimed("backend", id));
        bus.publish(BusMessage::task_claimed("qa", id));
        bus.publish(BusMessage::task_failed("qa", id, "boom"));

        let stats = bus.statistics();
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.by_kind.get(kinds::TASK_CLAIMED), Some(&2));
        assert_eq!(stats.by_kind.get(kinds::TASK_FAILED), Some(&1));
        assert_eq!(stats.by_kind.get(kinds::TASK_COMPLETED), None);
    }
}
