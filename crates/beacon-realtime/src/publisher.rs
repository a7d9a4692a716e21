//! Broker publisher — the single emit point for envelopes.
//!
//! Publishing is best-effort, at-most-once: a broker outage never aborts the
//! business transaction that triggered the event. Failures are logged at WARN
//! and swallowed here, at the publish boundary, so no caller has to handle
//! them.

use std::sync::Arc;

use tracing::{debug, warn};

use beacon_core::defaults::EVENTS_CHANNEL;
use beacon_core::Envelope;

use crate::broker::EventBroker;

/// Publishes envelopes on the well-known events channel.
#[derive(Clone)]
pub struct Publisher {
    broker: Arc<dyn EventBroker>,
    channel: String,
}

impl Publisher {
    /// Create a publisher emitting on the default `"events"` channel.
    pub fn new(broker: Arc<dyn EventBroker>) -> Self {
        Self {
            broker,
            channel: EVENTS_CHANNEL.to_string(),
        }
    }

    /// Override the broker channel (subscribers must agree on the name).
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// The channel envelopes are published on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Shared handle to the underlying broker.
    pub fn broker(&self) -> Arc<dyn EventBroker> {
        Arc::clone(&self.broker)
    }

    /// Emit one envelope. Never fails: serialization or broker errors are
    /// logged and discarded.
    pub async fn emit(&self, envelope: &Envelope) {
        let payload = match envelope.to_wire() {
            Ok(p) => p,
            Err(e) => {
                warn!(
                    event = %envelope.event,
                    room = %envelope.room,
                    error = %e,
                    "dropping unserializable envelope"
                );
                return;
            }
        };

        match self.broker.publish(&self.channel, &payload).await {
            Ok(()) => {
                debug!(event = %envelope.event, room = %envelope.room, "published envelope");
            }
            Err(e) => {
                warn!(
                    event = %envelope.event,
                    room = %envelope.room,
                    error = %e,
                    "broker unavailable, realtime event dropped"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::Message;
    use serde_json::Value as JsonValue;

    use crate::broker::MemoryBroker;

    #[tokio::test]
    async fn test_emit_publishes_wire_json_on_events_channel() {
        let broker = Arc::new(MemoryBroker::new());
        let publisher = Publisher::new(broker.clone());

        let env = Envelope::new("global", Message::new(), "site1:all");
        publisher.emit(&env).await;

        let published = broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "events");

        let parsed: JsonValue = serde_json::from_str(&published[0].1).unwrap();
        assert_eq!(parsed["event"], "global");
        assert_eq!(parsed["room"], "site1:all");
    }

    #[tokio::test]
    async fn test_emit_swallows_broker_outage() {
        let broker = Arc::new(MemoryBroker::new());
        broker.set_down(true);
        let publisher = Publisher::new(broker.clone());

        // Must not panic or propagate
        publisher
            .emit(&Envelope::new("global", Message::new(), "site1:all"))
            .await;
        assert_eq!(broker.published_count(), 0);
    }

    #[tokio::test]
    async fn test_custom_channel() {
        let broker = Arc::new(MemoryBroker::new());
        let publisher = Publisher::new(broker.clone()).with_channel("events-test");
        assert_eq!(publisher.channel(), "events-test");

        publisher
            .emit(&Envelope::new("global", Message::new(), "site1:all"))
            .await;
        assert_eq!(broker.published()[0].0, "events-test");
    }
}
