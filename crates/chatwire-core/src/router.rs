//! Inbound event router.
//!
//! Decodes and validates inbound frames, dispatches conversation messages
//! toward the message cache, and passes everything else through unmodified.
//! Invalid domain payloads are logged and dropped; they never raise to the
//! caller.
//!
//! After routing a domain message the router arms a debounced
//! reconciliation pull: the deadline is pushed on every arrival and fires
//! once a quiet window elapses, so a burst of pushes coalesces into a
//! single correcting fetch instead of one pull per frame.

use std::{ops::Sub, time::Duration};

use chatwire_proto::{
    ChatMessage, EVENT_MESSAGE_CREATED, EVENT_PONG, Frame, conversation_from_channel,
};

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Quiet window after the last routed message before a reconciliation
    /// pull fires.
    pub reconcile_quiet_window: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { reconcile_quiet_window: Duration::from_millis(750) }
    }
}

/// Where a routed frame ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Valid message for the active conversation; merge into the cache.
    Message(ChatMessage),
    /// Broker control traffic (`pusher:*`, pong). Handled by the session.
    Control(Frame),
    /// Anything else, unmodified, for the generic consumer.
    Passthrough(Frame),
    /// Malformed domain payload; logged and swallowed.
    Dropped,
}

/// Inbound frame router for one active conversation.
#[derive(Debug, Clone)]
pub struct EventRouter<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    config: RouterConfig,
    active_conversation: Option<u64>,
    last_message_at: Option<I>,
}

impl<I> EventRouter<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a router with no active conversation.
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        Self { config, active_conversation: None, last_message_at: None }
    }

    /// Set or clear the active conversation. Clears any pending
    /// reconciliation deadline: it belonged to the previous conversation.
    pub fn set_active_conversation(&mut self, conversation_id: Option<u64>) {
        self.active_conversation = conversation_id;
        self.last_message_at = None;
    }

    /// Currently active conversation.
    #[must_use]
    pub fn active_conversation(&self) -> Option<u64> {
        self.active_conversation
    }

    /// Route one inbound frame.
    pub fn route(&mut self, frame: Frame, now: I) -> RouteOutcome {
        if frame.is_control() || frame.event == EVENT_PONG {
            return RouteOutcome::Control(frame);
        }

        // Channel-targeted frame for some other conversation: not ours to
        // interpret, hand it to the generic consumer untouched.
        let frame_conversation = frame.channel.as_deref().and_then(conversation_from_channel);
        if frame_conversation.is_some() && frame_conversation != self.active_conversation {
            return RouteOutcome::Passthrough(frame);
        }

        let Ok(data) = frame.materialize() else {
            // No data or double-decode failure on a non-message frame is
            // consumer business, not a contract violation.
            return RouteOutcome::Passthrough(frame);
        };

        // message.created commits to validation; other events only take the
        // message path when the payload carries the message shape
        if frame.event != EVENT_MESSAGE_CREATED && !ChatMessage::matches_shape(&data) {
            return RouteOutcome::Passthrough(frame);
        }

        let message = match ChatMessage::from_value(&data) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(event = %frame.event, %err, "dropping invalid message payload");
                return RouteOutcome::Dropped;
            },
        };

        if self.active_conversation != Some(message.conversation_id) {
            return RouteOutcome::Passthrough(frame);
        }

        self.last_message_at = Some(now);
        tracing::debug!(id = message.id, conversation = message.conversation_id, "routed message");
        RouteOutcome::Message(message)
    }

    /// Periodic maintenance: returns `true` when the debounced
    /// reconciliation pull is due. The deadline clears on firing.
    pub fn tick(&mut self, now: I) -> bool {
        let due = self
            .last_message_at
            .is_some_and(|last| now - last >= self.config.reconcile_quiet_window);
        if due {
            self.last_message_at = None;
        }
        due
    }
}
