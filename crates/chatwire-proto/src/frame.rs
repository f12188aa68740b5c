//! Frame type and control events.
//!
//! A `Frame` is one discrete unit exchanged with the broker. Outbound frames
//! carry `{event, data?}`; inbound frames additionally carry the channel
//! they were published on. Some brokers deliver `data` as a JSON-encoded
//! string rather than an object, so [`Frame::materialize`] performs the
//! second decode and guarantees handlers always see a structured value.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ProtocolError;

/// Prefix shared by broker control events.
pub const CONTROL_PREFIX: &str = "pusher:";

/// Control event establishing a channel subscription.
pub const EVENT_SUBSCRIBE: &str = "pusher:subscribe";

/// Control event tearing down a channel subscription.
pub const EVENT_UNSUBSCRIBE: &str = "pusher:unsubscribe";

/// Keepalive request. Carries a client timestamp for latency sampling.
pub const EVENT_PING: &str = "ping";

/// Keepalive response echoing the ping timestamp.
pub const EVENT_PONG: &str = "pong";

/// Domain event announcing a newly created chat message.
pub const EVENT_MESSAGE_CREATED: &str = "message.created";

/// Channel name for a conversation: `chat.<conversation_id>`.
#[must_use]
pub fn conversation_channel(conversation_id: u64) -> String {
    format!("chat.{conversation_id}")
}

/// Parse a conversation id back out of a `chat.<id>` channel name.
///
/// Returns `None` for channels outside the conversation namespace.
#[must_use]
pub fn conversation_from_channel(channel: &str) -> Option<u64> {
    channel.strip_prefix("chat.")?.parse().ok()
}

/// One discrete unit exchanged over the transport.
///
/// Pure data holder. Construction helpers exist for the control events the
/// client emits; everything else arrives from the wire via [`Frame::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Event name (`pusher:subscribe`, `ping`, `message.created`, ...).
    pub event: String,

    /// Event payload. Inbound frames may deliver this as a JSON-encoded
    /// string; see [`Frame::materialize`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Channel the frame was published on. Absent on control frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Broker or client timestamp in unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl Frame {
    /// Build a subscribe control frame for a channel.
    #[must_use]
    pub fn subscribe(channel: &str) -> Self {
        Self {
            event: EVENT_SUBSCRIBE.to_string(),
            data: Some(json!({ "channel": channel })),
            channel: None,
            timestamp: None,
        }
    }

    /// Build an unsubscribe control frame for a channel.
    #[must_use]
    pub fn unsubscribe(channel: &str) -> Self {
        Self {
            event: EVENT_UNSUBSCRIBE.to_string(),
            data: Some(json!({ "channel": channel })),
            channel: None,
            timestamp: None,
        }
    }

    /// Build a keepalive ping stamped with the client clock.
    #[must_use]
    pub fn ping(now_ms: u64) -> Self {
        Self { event: EVENT_PING.to_string(), data: None, channel: None, timestamp: Some(now_ms) }
    }

    /// True for broker control frames (`pusher:*` namespace).
    #[must_use]
    pub fn is_control(&self) -> bool {
        self.event.starts_with(CONTROL_PREFIX)
    }

    /// Encode to the JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Json` if serialization fails. In practice
    /// this cannot happen for the field types used here.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the JSON wire form.
    ///
    /// Does NOT perform the second decode of string-encoded `data`; callers
    /// that need structured data follow up with [`Frame::materialize`].
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Json` if the text is not a valid frame object.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Materialized `data` value.
    ///
    /// If `data` is itself a JSON-encoded string, decodes it a second time
    /// so the result is always a structured value. A string that does not
    /// parse as JSON is an error: the broker never delivers bare prose.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::MissingField` if the frame has no data.
    /// - `ProtocolError::DoubleDecode` if the inner decode fails.
    pub fn materialize(&self) -> Result<Value, ProtocolError> {
        let data = self.data.as_ref().ok_or(ProtocolError::MissingField { field: "data" })?;

        match data {
            Value::String(inner) => serde_json::from_str(inner)
                .map_err(|e| ProtocolError::DoubleDecode(e.to_string())),
            other => Ok(other.clone()),
        }
    }
}
