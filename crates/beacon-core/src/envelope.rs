//! Event envelope — the unit of publication.
//!
//! Every realtime notification crosses the broker as one JSON object:
//!
//! ```text
//! {"event": "list_update", "message": {"doctype": "Note"}, "room": "site1:doctype:Note"}
//! ```
//!
//! Subscribers (e.g. a websocket gateway) parse exactly this shape off the
//! `"events"` channel. The `room` field is always resolved before an envelope
//! reaches the publish boundary — it is never null on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;

/// Flat JSON object carried as an envelope's message body.
pub type Message = serde_json::Map<String, JsonValue>;

/// The `{event, message, room}` triple published to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name handled by the client (e.g. `"task_progress"`, `"msgprint"`).
    pub event: String,
    /// JSON message body. Task-addressed envelopes always carry a `task_id` key.
    pub message: Message,
    /// Resolved room the envelope is addressed to.
    pub room: String,
}

impl Envelope {
    /// Create an envelope from its three parts.
    pub fn new(event: impl Into<String>, message: Message, room: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            message,
            room: room.into(),
        }
    }

    /// Serialize to the canonical wire JSON.
    pub fn to_wire(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
