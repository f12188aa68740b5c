//! Channel subscription multiplexer.
//!
//! Tracks the desired per-conversation subscription set and reconciles the
//! server-side set against it. The desired set is authoritative: on every
//! successful connect the multiplexer re-sends a subscribe frame for each
//! desired channel, which is what makes subscriptions survive reconnects.
//!
//! Subscription failures are best-effort: the broker does not ack
//! subscriptions, so `subscribed_on_server` reflects frames sent, and a
//! broken subscription heals on the next resync.

use std::collections::BTreeSet;

use chatwire_proto::Frame;

/// Desired-set subscription multiplexer.
#[derive(Debug, Clone, Default)]
pub struct ChannelMux {
    desired: BTreeSet<String>,
    subscribed: BTreeSet<String>,
}

impl ChannelMux {
    /// Empty multiplexer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The authoritative desired channel set.
    #[must_use]
    pub fn desired(&self) -> &BTreeSet<String> {
        &self.desired
    }

    /// Channels believed subscribed on the server.
    #[must_use]
    pub fn subscribed(&self) -> &BTreeSet<String> {
        &self.subscribed
    }

    /// Add a channel to the desired set.
    ///
    /// Returns the subscribe frame to send when connected. While
    /// disconnected only the local set changes; the wire effect is deferred
    /// to the next connect's resync.
    pub fn add(&mut self, name: impl Into<String>, connected: bool) -> Option<Frame> {
        let name = name.into();
        let inserted = self.desired.insert(name.clone());

        if connected && inserted {
            self.subscribed.insert(name.clone());
            tracing::debug!(channel = %name, "subscribing");
            return Some(Frame::subscribe(&name));
        }
        None
    }

    /// Remove a channel from the desired set.
    ///
    /// Returns the unsubscribe frame to send when connected.
    pub fn remove(&mut self, name: &str, connected: bool) -> Option<Frame> {
        let removed = self.desired.remove(name);
        let was_subscribed = self.subscribed.remove(name);

        if connected && removed && was_subscribed {
            tracing::debug!(channel = %name, "unsubscribing");
            return Some(Frame::unsubscribe(name));
        }
        None
    }

    /// Resync after a successful (re)connect.
    ///
    /// Emits a subscribe frame for every desired channel and marks them all
    /// subscribed. Called on every connect, first or otherwise.
    pub fn resync(&mut self) -> Vec<Frame> {
        self.subscribed = self.desired.clone();
        tracing::debug!(channels = self.desired.len(), "resyncing subscriptions");
        self.desired.iter().map(|name| Frame::subscribe(name)).collect()
    }

    /// Record a disconnect: the server no longer holds any subscriptions.
    pub fn mark_disconnected(&mut self) {
        self.subscribed.clear();
    }

    /// True once the server set matches the desired set.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.desired == self.subscribed
    }
}

#[cfg(test)]
mod tests {
    use chatwire_proto::{EVENT_SUBSCRIBE, EVENT_UNSUBSCRIBE, conversation_channel};

    use super::*;

    /// Scenario: on connect with desired = {chat.5}, exactly one subscribe
    /// frame for chat.5 is sent.
    #[test]
    fn resync_sends_one_subscribe_per_desired_channel() {
        let mut mux = ChannelMux::new();
        mux.add(conversation_channel(5), false);

        let frames = mux.resync();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, EVENT_SUBSCRIBE);
        assert_eq!(frames[0].data.as_ref().unwrap()["channel"], "chat.5");
        assert!(mux.converged());
    }

    #[test]
    fn add_while_connected_sends_immediately() {
        let mut mux = ChannelMux::new();
        let frame = mux.add("chat.1", true);
        assert_eq!(frame.unwrap().event, EVENT_SUBSCRIBE);
        assert!(mux.converged());
    }

    #[test]
    fn add_while_disconnected_defers_to_resync() {
        let mut mux = ChannelMux::new();
        assert!(mux.add("chat.1", false).is_none());
        assert!(!mux.converged());

        let frames = mux.resync();
        assert_eq!(frames.len(), 1);
        assert!(mux.converged());
    }

    #[test]
    fn duplicate_add_sends_nothing() {
        let mut mux = ChannelMux::new();
        mux.add("chat.1", true);
        assert!(mux.add("chat.1", true).is_none());
    }

    #[test]
    fn remove_while_connected_unsubscribes() {
        let mut mux = ChannelMux::new();
        mux.add("chat.1", true);

        let frame = mux.remove("chat.1", true);
        assert_eq!(frame.unwrap().event, EVENT_UNSUBSCRIBE);
        assert!(mux.desired().is_empty());
        assert!(mux.converged());
    }

    #[test]
    fn remove_while_disconnected_only_touches_local_set() {
        let mut mux = ChannelMux::new();
        mux.add("chat.1", false);
        assert!(mux.remove("chat.1", false).is_none());
        assert!(mux.resync().is_empty());
    }

    #[test]
    fn disconnect_clears_server_set() {
        let mut mux = ChannelMux::new();
        mux.add("chat.1", true);
        mux.mark_disconnected();

        assert!(!mux.converged());
        assert_eq!(mux.resync().len(), 1);
        assert!(mux.converged());
    }
}
