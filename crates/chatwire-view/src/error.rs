//! Error types surfaced to the rendering layer.
//!
//! Pull failures are surfaced as retryable errors with an explicit retry
//! affordance; send failures carry the rolled-back draft so the composer
//! can restore the user's text instead of silently discarding it.

use thiserror::Error;

/// A history page fetch failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The first page failed: nothing to show. Blocking, with retry.
    #[error("initial history load failed for conversation {conversation_id}: {reason}")]
    Initial {
        /// Conversation whose history could not load.
        conversation_id: u64,
        /// Transport-level cause.
        reason: String,
    },

    /// An older page failed: existing history stays usable. Retryable.
    #[error("failed to load older page {page} for conversation {conversation_id}: {reason}")]
    OlderPage {
        /// Conversation whose history could not extend.
        conversation_id: u64,
        /// 1-based page that failed.
        page: u32,
        /// Transport-level cause.
        reason: String,
    },
}

impl FetchError {
    /// True when the failure leaves nothing to display.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Initial { .. })
    }
}

/// An outbound message send failed after the optimistic insert.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The server rejected or never received the send. The cache has been
    /// rolled back; `draft` holds the user's text for composer restoration.
    #[error("message send failed: {reason}")]
    Rejected {
        /// Transport or server cause.
        reason: String,
        /// Body of the rolled-back optimistic message.
        draft: String,
    },
}
