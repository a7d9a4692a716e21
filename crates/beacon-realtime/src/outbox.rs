//! Transactional outbox for deferred (post-commit) publishing.
//!
//! Deferring an event means subscribers are only notified about state that
//! actually committed. The outbox is owned by exactly one unit of work — it is
//! `&mut` state, never shared across transactions, so append and flush need no
//! locking. The surrounding transaction manager wires in exactly one flush
//! point after commit and discards on rollback.

use tracing::debug;

use beacon_core::Envelope;

use crate::publisher::Publisher;

/// Ordered, deduplicated buffer of envelopes awaiting commit.
#[derive(Debug, Default)]
pub struct RealtimeOutbox {
    entries: Vec<Envelope>,
}

impl RealtimeOutbox {
    /// Create an empty outbox for a new unit of work.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an envelope for post-commit publishing.
    ///
    /// An identical `(event, message, room)` triple already queued in this
    /// unit of work is not re-added; insertion order of first occurrences is
    /// preserved. Returns whether the envelope was actually queued.
    pub fn append(&mut self, envelope: Envelope) -> bool {
        if self.entries.contains(&envelope) {
            debug!(event = %envelope.event, room = %envelope.room, "duplicate deferred envelope skipped");
            return false;
        }
        self.entries.push(envelope);
        true
    }

    /// Publish every buffered envelope in insertion order, then clear.
    ///
    /// Called exactly once by the transaction manager after a successful
    /// commit. Individual publish failures are swallowed by the publisher;
    /// the buffer is cleared unconditionally.
    pub async fn flush(&mut self, publisher: &Publisher) {
        let entries = std::mem::take(&mut self.entries);
        let flushed = entries.len();
        for envelope in &entries {
            publisher.emit(envelope).await;
        }
        if flushed > 0 {
            debug!(flushed, "flushed realtime outbox");
        }
    }

    /// Drop all buffered envelopes unpublished (rollback path).
    pub fn discard(&mut self) {
        self.entries.clear();
    }

    /// Buffered envelopes, in insertion order.
    pub fn entries(&self) -> &[Envelope] {
        &self.entries
    }

    /// Number of buffered envelopes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use beacon_core::Message;
    use serde_json::json;

    use crate::broker::MemoryBroker;

    fn env(event: &str, room: &str, key: &str) -> Envelope {
        let mut message = Message::new();
        message.insert(key.to_string(), json!(true));
        Envelope::new(event, message, room)
    }

    #[test]
    fn test_append_dedups_identical_triples() {
        let mut outbox = RealtimeOutbox::new();
        assert!(outbox.append(env("e1", "r1", "a")));
        assert!(!outbox.append(env("e1", "r1", "a")));
        assert_eq!(outbox.len(), 1);

        // Different message is a different triple
        assert!(outbox.append(env("e1", "r1", "b")));
        assert_eq!(outbox.len(), 2);
    }

    #[tokio::test]
    async fn test_flush_publishes_in_insertion_order_and_clears() {
        let broker = Arc::new(MemoryBroker::new());
        let publisher = Publisher::new(broker.clone());

        let mut outbox = RealtimeOutbox::new();
        outbox.append(env("first", "r", "a"));
        outbox.append(env("second", "r", "b"));
        outbox.append(env("third", "r", "c"));

        outbox.flush(&publisher).await;
        assert!(outbox.is_empty());

        let events: Vec<String> = broker
            .published()
            .iter()
            .map(|(_, payload)| {
                serde_json::from_str::<serde_json::Value>(payload).unwrap()["event"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(events, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_discard_publishes_nothing() {
        let broker = Arc::new(MemoryBroker::new());
        let publisher = Publisher::new(broker.clone());

        let mut outbox = RealtimeOutbox::new();
        outbox.append(env("e1", "r", "a"));
        outbox.discard();
        assert!(outbox.is_empty());

        outbox.flush(&publisher).await;
        assert_eq!(broker.published_count(), 0);
    }

    #[tokio::test]
    async fn test_flush_clears_even_when_broker_down() {
        let broker = Arc::new(MemoryBroker::new());
        broker.set_down(true);
        let publisher = Publisher::new(broker.clone());

        let mut outbox = RealtimeOutbox::new();
        outbox.append(env("e1", "r", "a"));
        outbox.flush(&publisher).await;

        // Entries must not leak into a subsequent transaction
        assert!(outbox.is_empty());
        assert_eq!(broker.published_count(), 0);
    }
}
