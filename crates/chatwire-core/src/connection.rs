//! Connection lifecycle state machine.
//!
//! Owns the socket lifecycle and the reconnect/backoff policy. Uses the
//! action pattern: events go in, actions for the driver come out. No I/O
//! and no timers live here; the driver executes `OpenSocket`,
//! `ScheduleReconnect` and the rest against the real world.
//!
//! # State machine
//!
//! ```text
//! ┌────────────┐  SocketOpened  ┌───────────┐  SocketClosed  ┌──────────────┐
//! │ Connecting │───────────────>│ Connected │───────────────>│ Disconnected │
//! └────────────┘                └───────────┘                └──────────────┘
//!       ↑                                                          │
//!       └────────────── ReconnectElapsed (after backoff) ──────────┘
//! ```
//!
//! Terminal at Disconnected only after the configured maximum attempts or an
//! explicit [`ConnectionManager::close`]. A reconnect timer completing after
//! teardown is a no-op: the torn-down flag is checked before acting.

use std::{ops::Sub, time::Duration};

use chatwire_proto::Frame;

use crate::{
    backoff::{BackoffPolicy, BackoffState},
    error::ConnectionError,
    notify::ConnectionNotice,
};

/// Connection state visible to consumers (tri-state indicator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket open in progress.
    Connecting,
    /// Socket open and usable.
    Connected,
    /// No socket. Terminal once retries are exhausted or after `close()`.
    Disconnected,
}

/// Connection configuration.
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfig {
    /// Reconnect policy.
    pub backoff: BackoffPolicy,
}

/// Events fed into the connection state machine by the driver.
#[derive(Debug, Clone)]
pub enum ConnectionEvent<I> {
    /// The transport reported a successful open.
    SocketOpened {
        /// Time of the open.
        now: I,
    },
    /// The transport closed or errored. Both drive the same transition.
    SocketClosed {
        /// Time of the close.
        now: I,
    },
    /// A previously scheduled reconnect delay elapsed.
    ReconnectElapsed,
}

/// Actions returned by the connection state machine for the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionAction {
    /// Open a socket to this URL.
    OpenSocket {
        /// Broker URL.
        url: String,
    },
    /// Send this frame on the open socket.
    SendFrame(Frame),
    /// Close the socket if one is open.
    CloseSocket,
    /// Arm the reconnect timer.
    ScheduleReconnect {
        /// Backoff delay before the next attempt.
        delay: Duration,
    },
    /// Publish a state transition to consumers.
    EmitState(ConnectionState),
    /// Offer a user-facing notice (rate-limited downstream).
    Notify(ConnectionNotice),
}

/// Connection lifecycle state machine.
///
/// Generic over `Instant` to run under real or virtual time.
#[derive(Debug, Clone)]
pub struct ConnectionManager<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    state: ConnectionState,
    config: ConnectionConfig,
    backoff: BackoffState,
    url: String,
    connected_at: Option<I>,
    reconnect_pending: bool,
    torn_down: bool,
}

impl<I> ConnectionManager<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a manager in the Disconnected state.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            config,
            backoff: BackoffState::new(),
            url: String::new(),
            connected_at: None,
            reconnect_pending: false,
            torn_down: false,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current retry record (attempt counter and stability penalty).
    #[must_use]
    pub fn backoff(&self) -> BackoffState {
        self.backoff
    }

    /// Whether `close()` has been called.
    #[must_use]
    pub fn torn_down(&self) -> bool {
        self.torn_down
    }

    /// Begin connecting to the broker.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if already connecting/connected or
    ///   torn down.
    pub fn open(&mut self, url: impl Into<String>) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.torn_down || self.state != ConnectionState::Disconnected {
            return Err(ConnectionError::InvalidState {
                state: self.state,
                operation: "open".to_string(),
            });
        }

        self.url = url.into();
        self.state = ConnectionState::Connecting;

        Ok(vec![
            ConnectionAction::EmitState(ConnectionState::Connecting),
            ConnectionAction::OpenSocket { url: self.url.clone() },
        ])
    }

    /// Send a frame.
    ///
    /// No-op with a warning when not Connected. There is no outbound queue:
    /// a dropped send while disconnected is explicit behavior, not a bug.
    pub fn send(&self, frame: Frame) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Connected {
            tracing::warn!(event = %frame.event, state = ?self.state, "dropping send while not connected");
            return Vec::new();
        }
        vec![ConnectionAction::SendFrame(frame)]
    }

    /// Process a lifecycle event from the driver.
    pub fn handle(&mut self, event: ConnectionEvent<I>) -> Vec<ConnectionAction> {
        if self.torn_down {
            return Vec::new();
        }

        match event {
            ConnectionEvent::SocketOpened { now } => self.on_opened(now),
            ConnectionEvent::SocketClosed { now } => self.on_closed(now),
            ConnectionEvent::ReconnectElapsed => self.on_reconnect_elapsed(),
        }
    }

    fn on_opened(&mut self, now: I) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Connecting {
            return Vec::new();
        }

        let was_retry = self.backoff.attempt > 0;
        self.backoff.record_open();
        self.connected_at = Some(now);
        self.state = ConnectionState::Connected;
        tracing::info!(url = %self.url, "connected");

        let mut actions = vec![ConnectionAction::EmitState(ConnectionState::Connected)];
        if was_retry {
            actions.push(ConnectionAction::Notify(ConnectionNotice::Restored));
        }
        actions
    }

    fn on_closed(&mut self, now: I) -> Vec<ConnectionAction> {
        if self.state == ConnectionState::Disconnected {
            return Vec::new();
        }

        let uptime = self.connected_at.take().map(|since| now - since);
        self.backoff.record_close(uptime, &self.config.backoff);
        self.state = ConnectionState::Disconnected;

        if self.backoff.exhausted(&self.config.backoff) {
            tracing::warn!(attempts = self.backoff.attempt, "reconnect attempts exhausted");
            return vec![
                ConnectionAction::EmitState(ConnectionState::Disconnected),
                ConnectionAction::Notify(ConnectionNotice::GaveUp),
            ];
        }

        let delay = self.backoff.delay(&self.config.backoff);
        self.reconnect_pending = true;
        tracing::info!(
            ?uptime,
            ?delay,
            attempt = self.backoff.attempt,
            consecutive_failures = self.backoff.consecutive_failures,
            "disconnected, reconnect scheduled"
        );

        vec![
            ConnectionAction::EmitState(ConnectionState::Disconnected),
            ConnectionAction::Notify(ConnectionNotice::Lost),
            ConnectionAction::ScheduleReconnect { delay },
        ]
    }

    fn on_reconnect_elapsed(&mut self) -> Vec<ConnectionAction> {
        // Timer raced a teardown or a force_reconnect that already fired.
        if !self.reconnect_pending || self.state != ConnectionState::Disconnected {
            return Vec::new();
        }

        self.reconnect_pending = false;
        self.state = ConnectionState::Connecting;

        vec![
            ConnectionAction::EmitState(ConnectionState::Connecting),
            ConnectionAction::OpenSocket { url: self.url.clone() },
        ]
    }

    /// Tear down permanently: cancels retries, closes the socket.
    ///
    /// Any reconnect timer still in flight becomes a no-op.
    pub fn close(&mut self) -> Vec<ConnectionAction> {
        if self.torn_down {
            return Vec::new();
        }

        self.torn_down = true;
        self.reconnect_pending = false;
        self.connected_at = None;
        self.state = ConnectionState::Disconnected;

        vec![
            ConnectionAction::CloseSocket,
            ConnectionAction::EmitState(ConnectionState::Disconnected),
        ]
    }

    /// Drop the current socket and reconnect immediately, resetting the
    /// retry record.
    pub fn force_reconnect(&mut self) -> Vec<ConnectionAction> {
        if self.torn_down {
            return Vec::new();
        }

        self.backoff.reset();
        self.reconnect_pending = false;
        self.connected_at = None;
        self.state = ConnectionState::Connecting;

        vec![
            ConnectionAction::CloseSocket,
            ConnectionAction::EmitState(ConnectionState::Connecting),
            ConnectionAction::OpenSocket { url: self.url.clone() },
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn manager() -> ConnectionManager<Instant> {
        ConnectionManager::new(ConnectionConfig::default())
    }

    fn opened(mgr: &mut ConnectionManager<Instant>, now: Instant) {
        let actions = mgr.handle(ConnectionEvent::SocketOpened { now });
        assert!(actions.contains(&ConnectionAction::EmitState(ConnectionState::Connected)));
    }

    #[test]
    fn open_emits_connecting_and_socket() {
        let mut mgr = manager();
        let actions = mgr.open("wss://broker.example/app").unwrap();

        assert_eq!(mgr.state(), ConnectionState::Connecting);
        assert!(
            actions
                .iter()
                .any(|a| matches!(a, ConnectionAction::OpenSocket { url } if url == "wss://broker.example/app"))
        );
    }

    #[test]
    fn open_twice_is_invalid() {
        let mut mgr = manager();
        mgr.open("wss://broker").unwrap();
        assert!(matches!(
            mgr.open("wss://broker"),
            Err(ConnectionError::InvalidState { .. })
        ));
    }

    #[test]
    fn send_while_disconnected_is_a_warned_noop() {
        let mgr = manager();
        let actions = mgr.send(Frame::ping(0));
        assert!(actions.is_empty());
    }

    #[test]
    fn send_while_connected_forwards_frame() {
        let mut mgr = manager();
        let t0 = Instant::now();
        mgr.open("wss://broker").unwrap();
        opened(&mut mgr, t0);

        let actions = mgr.send(Frame::ping(0));
        assert!(matches!(actions.as_slice(), [ConnectionAction::SendFrame(_)]));
    }

    #[test]
    fn close_schedules_reconnect_with_backoff() {
        let mut mgr = manager();
        let t0 = Instant::now();
        mgr.open("wss://broker").unwrap();
        opened(&mut mgr, t0);

        let actions = mgr.handle(ConnectionEvent::SocketClosed { now: t0 + Duration::from_secs(2) });
        assert_eq!(mgr.state(), ConnectionState::Disconnected);
        assert!(
            actions
                .iter()
                .any(|a| matches!(a, ConnectionAction::ScheduleReconnect { delay } if *delay > Duration::ZERO))
        );
    }

    #[test]
    fn reconnect_timer_reopens_socket() {
        let mut mgr = manager();
        let t0 = Instant::now();
        mgr.open("wss://broker").unwrap();
        opened(&mut mgr, t0);
        mgr.handle(ConnectionEvent::SocketClosed { now: t0 + Duration::from_secs(2) });

        let actions = mgr.handle(ConnectionEvent::ReconnectElapsed);
        assert_eq!(mgr.state(), ConnectionState::Connecting);
        assert!(actions.iter().any(|a| matches!(a, ConnectionAction::OpenSocket { .. })));
    }

    #[test]
    fn reconnect_after_teardown_is_noop() {
        let mut mgr = manager();
        let t0 = Instant::now();
        mgr.open("wss://broker").unwrap();
        opened(&mut mgr, t0);
        mgr.handle(ConnectionEvent::SocketClosed { now: t0 + Duration::from_secs(2) });

        // Teardown races the pending reconnect timer
        mgr.close();
        let actions = mgr.handle(ConnectionEvent::ReconnectElapsed);
        assert!(actions.is_empty());
        assert_eq!(mgr.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let config = ConnectionConfig {
            backoff: BackoffPolicy { max_attempts: 2, ..BackoffPolicy::default() },
        };
        let mut mgr: ConnectionManager<Instant> = ConnectionManager::new(config);
        let t0 = Instant::now();
        mgr.open("wss://broker").unwrap();

        // Attempts 1 and 2 fail before ever connecting
        for _ in 0..2 {
            let actions = mgr.handle(ConnectionEvent::SocketClosed { now: t0 });
            assert!(actions.iter().any(|a| matches!(a, ConnectionAction::ScheduleReconnect { .. })));
            mgr.handle(ConnectionEvent::ReconnectElapsed);
        }

        // Third failure exceeds max_attempts
        let actions = mgr.handle(ConnectionEvent::SocketClosed { now: t0 });
        assert!(actions.contains(&ConnectionAction::Notify(ConnectionNotice::GaveUp)));
        assert!(!actions.iter().any(|a| matches!(a, ConnectionAction::ScheduleReconnect { .. })));
    }

    #[test]
    fn force_reconnect_resets_retry_record() {
        let mut mgr = manager();
        let t0 = Instant::now();
        mgr.open("wss://broker").unwrap();
        opened(&mut mgr, t0);
        mgr.handle(ConnectionEvent::SocketClosed { now: t0 + Duration::from_secs(2) });
        assert!(mgr.backoff().attempt > 0);

        let actions = mgr.force_reconnect();
        assert_eq!(mgr.backoff(), BackoffState::new());
        assert_eq!(mgr.state(), ConnectionState::Connecting);
        assert!(actions.iter().any(|a| matches!(a, ConnectionAction::OpenSocket { .. })));

        // The stale reconnect timer from before the force is now a no-op
        assert!(mgr.handle(ConnectionEvent::ReconnectElapsed).is_empty());
    }

    #[test]
    fn reconnected_open_notifies_restored() {
        let mut mgr = manager();
        let t0 = Instant::now();
        mgr.open("wss://broker").unwrap();
        opened(&mut mgr, t0);
        mgr.handle(ConnectionEvent::SocketClosed { now: t0 + Duration::from_secs(2) });
        mgr.handle(ConnectionEvent::ReconnectElapsed);

        let actions = mgr.handle(ConnectionEvent::SocketOpened { now: t0 + Duration::from_secs(5) });
        assert!(actions.contains(&ConnectionAction::Notify(ConnectionNotice::Restored)));
    }
}
