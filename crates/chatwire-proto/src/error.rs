//! Error types for wire decoding and validation.
//!
//! Strongly-typed errors for the two failure layers: structural JSON
//! problems (a frame that is not valid JSON at all) and contract problems
//! (a frame that parses but is missing required domain fields).

use thiserror::Error;

/// Errors that can occur while decoding or validating wire data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame or payload is not valid JSON.
    #[error("malformed JSON: {0}")]
    Json(String),

    /// Frame `data` was a string but its second decode failed.
    #[error("double-encoded data failed second decode: {0}")]
    DoubleDecode(String),

    /// Required field missing from a domain payload.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the absent field.
        field: &'static str,
    },

    /// Field present but with an unusable type or value.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
