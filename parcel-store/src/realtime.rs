use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::broadcast;

/// In-process real-time channel keyed by user identity.
///
/// Delivery is at-least-once from the consumer's point of view: a slow
/// subscriber can lag and re-subscribe, and nothing here deduplicates or
/// orders messages. Consumers (the tracker pipeline) are built to tolerate
/// duplicates and reordering rather than rely on this hub preventing them.
pub struct RealtimeHub {
    channels: Mutex<HashMap<String, broadcast::Sender<Value>>>,
    capacity: usize,
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    pub fn subscribe(&self, user_id: &str) -> broadcast::Receiver<Value> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publishes a message to a user's channel. Returns how many live
    /// subscribers it reached; zero is not an error.
    pub fn publish(&self, user_id: &str, message: Value) -> usize {
        let channels = self.channels.lock().unwrap();
        match channels.get(user_id) {
            Some(tx) => tx.send(message).unwrap_or(0),
            None => {
                tracing::debug!(user_id, "no live subscribers for user");
                0
            }
        }
    }

    pub fn subscriber_count(&self, user_id: &str) -> usize {
        self.channels
            .lock()
            .unwrap()
            .get(user_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drops channels nobody listens to anymore.
    pub fn sweep(&self) {
        self.channels
            .lock()
            .unwrap()
            .retain(|_, tx| tx.receiver_count() > 0);
    }
}
