//! Error types for the delivery layer core.
//!
//! Transport failures never throw into consumers: they drive state
//! transitions and rate-limited notices instead. The errors here cover only
//! misuse of the state machines themselves.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors from connection state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Invalid state transition attempted.
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when the error occurred.
        state: ConnectionState,
        /// Operation that was attempted.
        operation: String,
    },
}
