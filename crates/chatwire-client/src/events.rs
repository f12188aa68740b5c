//! Session commands and events.

use chatwire_core::{ConnectionNotice, ConnectionState, HealthSample};
use chatwire_proto::{ChatMessage, Frame};

/// Commands the application feeds into the session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Add a conversation channel to the desired subscription set.
    Subscribe {
        /// Conversation to follow.
        conversation_id: u64,
    },

    /// Remove a conversation channel from the desired set.
    Unsubscribe {
        /// Conversation to stop following.
        conversation_id: u64,
    },

    /// Set or clear the conversation whose messages route as domain events.
    SetActiveConversation(Option<u64>),

    /// Send a raw frame on the open socket. Dropped with a warning while
    /// disconnected.
    SendFrame(Frame),

    /// Drop the socket and reconnect immediately, resetting the retry
    /// record. The manual recovery path after the session gave up.
    ForceReconnect,

    /// Tear the session down permanently.
    Shutdown,
}

/// Events the session fans out to subscribers.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// Connection state changed.
    Connection(ConnectionState),

    /// Rate-limited user-facing notice.
    Notice(ConnectionNotice),

    /// Validated message for the active conversation; merge into the cache.
    Message(ChatMessage),

    /// Unrecognized or other-conversation frame, unmodified.
    Frame(Frame),

    /// The debounced reconciliation pull is due: refetch page 1.
    ReconcileDue {
        /// Conversation to reconcile.
        conversation_id: u64,
    },

    /// Periodic health snapshot.
    Health(HealthSample),
}
