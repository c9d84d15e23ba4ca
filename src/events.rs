//! Change notifications from the feed to its consumer.
//!
//! The worker coalesces notifications to one per queue-drain cycle, so
//! subscriber volume is bounded by drains, not by resolved rows.

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Event delivered on the feed's notification stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedEvent {
    /// Rows or cached contact data changed; re-read the feed.
    DataChanged,
}

/// Fan-out of feed events to any number of subscribers.
///
/// Senders for dropped receivers are pruned on the next emit.
#[derive(Default)]
pub struct ChangeListeners {
    senders: Mutex<Vec<UnboundedSender<FeedEvent>>>,
}

impl ChangeListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> UnboundedReceiver<FeedEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().push(tx);
        rx
    }

    /// Deliver an event to every live subscriber.
    pub fn emit(&self, event: FeedEvent) {
        let mut senders = self.senders.lock();
        senders.retain(|tx| tx.send(event).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_receives_events() {
        let listeners = ChangeListeners::new();
        let mut rx1 = listeners.subscribe();
        let mut rx2 = listeners.subscribe();

        listeners.emit(FeedEvent::DataChanged);

        assert_eq!(rx1.recv().await, Some(FeedEvent::DataChanged));
        assert_eq!(rx2.recv().await, Some(FeedEvent::DataChanged));
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let listeners = ChangeListeners::new();
        let rx = listeners.subscribe();
        drop(rx);

        listeners.emit(FeedEvent::DataChanged);
        assert!(listeners.senders.lock().is_empty());
    }
}
