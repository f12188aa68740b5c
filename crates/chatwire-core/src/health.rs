//! Connection health monitor.
//!
//! Sends a keepalive ping on a fixed interval while Connected, classifies
//! connection stability, and keeps observational counters. Latency is
//! measured best-effort from the ping/pong round trip and never drives
//! transport decisions.

use std::{ops::Sub, time::Duration};

use chatwire_proto::Frame;

/// Health monitor configuration.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Interval between keepalive pings while Connected.
    pub keepalive_interval: Duration,
    /// Minimum uptime before the connection counts as healthy. Should match
    /// the backoff policy's stability threshold.
    pub stability_threshold: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: Duration::from_secs(25),
            stability_threshold: Duration::from_secs(10),
        }
    }
}

/// Point-in-time health snapshot for consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSample {
    /// Connected and past the stability threshold.
    pub is_healthy: bool,
    /// Last measured round-trip latency. `None` until a pong arrives.
    pub latency_ms: Option<u64>,
    /// Uptime of the current connection, zero when disconnected.
    pub uptime_ms: u64,
    /// Healthy connections dropped so far.
    pub reconnect_count: u32,
    /// Rapid-failure count from the backoff record.
    pub consecutive_failures: u32,
    /// Frames sent on the socket.
    pub messages_sent: u64,
    /// Frames received from the socket.
    pub messages_received: u64,
}

/// Keepalive and stability tracking for one logical connection.
#[derive(Debug, Clone)]
pub struct HealthMonitor<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    config: HealthConfig,
    connected_since: Option<I>,
    last_ping: Option<I>,
    awaiting_pong: Option<I>,
    latency: Option<Duration>,
    reconnect_count: u32,
    messages_sent: u64,
    messages_received: u64,
}

impl<I> HealthMonitor<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a monitor with the given configuration.
    #[must_use]
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            connected_since: None,
            last_ping: None,
            awaiting_pong: None,
            latency: None,
            reconnect_count: 0,
            messages_sent: 0,
            messages_received: 0,
        }
    }

    /// Record a successful connect.
    pub fn on_connected(&mut self, now: I) {
        self.connected_since = Some(now);
        self.last_ping = None;
        self.awaiting_pong = None;
    }

    /// Record a disconnect.
    ///
    /// `reconnect_count` increments only when a previously healthy
    /// connection drops; blips during initial setup are not counted.
    pub fn on_disconnected(&mut self, now: I) {
        if self.is_healthy(now) {
            self.reconnect_count = self.reconnect_count.saturating_add(1);
        }
        self.connected_since = None;
        self.awaiting_pong = None;
    }

    /// Periodic maintenance: returns a keepalive ping when due.
    ///
    /// `connected` gates emission; the keepalive only runs while Connected.
    /// `now_ms` is the wall clock stamped into the ping for latency
    /// measurement on the echo.
    pub fn tick(&mut self, now: I, now_ms: u64, connected: bool) -> Option<Frame> {
        if !connected || self.connected_since.is_none() {
            return None;
        }

        let due = match self.last_ping {
            None => true,
            Some(last) => now - last >= self.config.keepalive_interval,
        };
        if !due {
            return None;
        }

        self.last_ping = Some(now);
        self.awaiting_pong = Some(now);
        Some(Frame::ping(now_ms))
    }

    /// Record a pong echo; updates the latency sample.
    pub fn on_pong(&mut self, now: I) {
        if let Some(sent) = self.awaiting_pong.take() {
            self.latency = Some(now - sent);
        }
    }

    /// Count one outbound frame.
    pub fn record_sent(&mut self) {
        self.messages_sent = self.messages_sent.saturating_add(1);
    }

    /// Count one inbound frame.
    pub fn record_received(&mut self) {
        self.messages_received = self.messages_received.saturating_add(1);
    }

    /// Connected and past the stability threshold.
    #[must_use]
    pub fn is_healthy(&self, now: I) -> bool {
        self.connected_since
            .is_some_and(|since| now - since > self.config.stability_threshold)
    }

    /// Snapshot the current health for consumers.
    ///
    /// `consecutive_failures` comes from the connection manager's backoff
    /// record; the monitor does not duplicate that bookkeeping.
    #[must_use]
    pub fn sample(&self, now: I, consecutive_failures: u32) -> HealthSample {
        let uptime = self.connected_since.map_or(Duration::ZERO, |since| now - since);
        HealthSample {
            is_healthy: self.is_healthy(now),
            latency_ms: self.latency.map(|d| d.as_millis() as u64),
            uptime_ms: uptime.as_millis() as u64,
            reconnect_count: self.reconnect_count,
            consecutive_failures,
            messages_sent: self.messages_sent,
            messages_received: self.messages_received,
        }
    }
}
