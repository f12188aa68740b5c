//! Chat message type and the inbound validation contract.
//!
//! Inbound domain payloads are validated against a minimal required-field
//! contract (id, conversation id, sender id, body, timestamp) before they
//! reach any consumer. Payloads failing the contract are rejected here and
//! dropped by the router; they never propagate as errors to the UI.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// Delivery state of a message in the client's merged view.
///
/// `Optimistic` entries are local sends displayed before server
/// confirmation; the merge layer supersedes them once the confirmed
/// counterpart arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryState {
    /// Locally created, not yet confirmed by the server.
    Optimistic,
    /// Present on the server (pulled or pushed).
    #[default]
    Confirmed,
}

/// Reference to an attached media object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Location of the media object.
    pub url: String,
    /// MIME type when the server reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A chat message in a conversation's merged set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique id within the conversation's merged set.
    pub id: u64,
    /// Conversation this message belongs to.
    pub conversation_id: u64,
    /// Author's user id.
    pub sender_id: u64,
    /// Message text.
    pub body: String,
    /// Attached media, possibly empty.
    #[serde(default)]
    pub media_refs: Vec<MediaRef>,
    /// Creation time in unix milliseconds.
    pub created_at: u64,
    /// Client-side delivery state. Never serialized; decoded messages are
    /// always `Confirmed`.
    #[serde(skip)]
    pub delivery_state: DeliveryState,
}

impl ChatMessage {
    /// Build an optimistic local entry for an in-flight send.
    #[must_use]
    pub fn optimistic(id: u64, conversation_id: u64, sender_id: u64, body: String, now_ms: u64) -> Self {
        Self {
            id,
            conversation_id,
            sender_id,
            body,
            media_refs: Vec::new(),
            created_at: now_ms,
            delivery_state: DeliveryState::Optimistic,
        }
    }

    /// Validate and extract a message from a materialized frame payload.
    ///
    /// This is the required-field contract for inbound domain events. Each
    /// field is checked explicitly so the resulting error names the first
    /// missing or malformed field.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::MissingField` / `ProtocolError::InvalidField` when
    ///   the payload violates the contract.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let id = require_u64(value, "id")?;
        let conversation_id = require_u64(value, "conversation_id")?;
        let sender_id = require_u64(value, "sender_id")?;
        let body = require_str(value, "body")?.to_string();
        let created_at = require_u64(value, "created_at")?;

        let media_refs = match value.get("media_refs") {
            None | Some(Value::Null) => Vec::new(),
            Some(refs) => serde_json::from_value(refs.clone()).map_err(|e| {
                ProtocolError::InvalidField { field: "media_refs", reason: e.to_string() }
            })?,
        };

        Ok(Self {
            id,
            conversation_id,
            sender_id,
            body,
            media_refs,
            created_at,
            delivery_state: DeliveryState::Confirmed,
        })
    }

    /// True if the payload has the shape of a conversation message.
    ///
    /// Cheap pre-check used by the router to decide between the message
    /// path and the generic passthrough without committing to validation.
    #[must_use]
    pub fn matches_shape(value: &Value) -> bool {
        value.get("id").is_some()
            && value.get("conversation_id").is_some()
            && value.get("body").is_some()
    }
}

fn require_u64(value: &Value, field: &'static str) -> Result<u64, ProtocolError> {
    let raw = value.get(field).ok_or(ProtocolError::MissingField { field })?;
    raw.as_u64().ok_or_else(|| ProtocolError::InvalidField {
        field,
        reason: format!("expected unsigned integer, got {raw}"),
    })
}

fn require_str<'a>(value: &'a Value, field: &'static str) -> Result<&'a str, ProtocolError> {
    let raw = value.get(field).ok_or(ProtocolError::MissingField { field })?;
    raw.as_str().ok_or_else(|| ProtocolError::InvalidField {
        field,
        reason: format!("expected string, got {raw}"),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn valid_payload() -> Value {
        json!({
            "id": 12,
            "conversation_id": 5,
            "sender_id": 99,
            "body": "hello",
            "created_at": 1_700_000_000_000u64,
        })
    }

    #[test]
    fn valid_payload_passes_contract() {
        let msg = ChatMessage::from_value(&valid_payload()).unwrap();
        assert_eq!(msg.id, 12);
        assert_eq!(msg.conversation_id, 5);
        assert_eq!(msg.delivery_state, DeliveryState::Confirmed);
        assert!(msg.media_refs.is_empty());
    }

    #[test]
    fn missing_field_names_the_field() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("sender_id");

        let err = ChatMessage::from_value(&payload).unwrap_err();
        assert_eq!(err, ProtocolError::MissingField { field: "sender_id" });
    }

    #[test]
    fn wrong_type_is_invalid_not_missing() {
        let mut payload = valid_payload();
        payload["id"] = json!("twelve");

        let err = ChatMessage::from_value(&payload).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidField { field: "id", .. }));
    }

    #[test]
    fn null_media_refs_treated_as_empty() {
        let mut payload = valid_payload();
        payload["media_refs"] = Value::Null;

        let msg = ChatMessage::from_value(&payload).unwrap();
        assert!(msg.media_refs.is_empty());
    }

    #[test]
    fn media_refs_decoded_when_present() {
        let mut payload = valid_payload();
        payload["media_refs"] = json!([{ "url": "https://cdn/x.png", "mime_type": "image/png" }]);

        let msg = ChatMessage::from_value(&payload).unwrap();
        assert_eq!(msg.media_refs.len(), 1);
        assert_eq!(msg.media_refs[0].url, "https://cdn/x.png");
    }

    #[test]
    fn decoded_messages_are_confirmed() {
        let msg: ChatMessage = serde_json::from_value(valid_payload()).unwrap();
        assert_eq!(msg.delivery_state, DeliveryState::Confirmed);
    }

    #[test]
    fn shape_check_is_permissive() {
        assert!(ChatMessage::matches_shape(&valid_payload()));
        assert!(!ChatMessage::matches_shape(&json!({ "event": "typing" })));
    }
}
