//! Reconnect backoff policy.
//!
//! All retry state lives in one explicit record, [`BackoffState`], threaded
//! through the connection manager. The delay formula:
//!
//! ```text
//! delay = min(base * multiplier^(attempt-1) + penalty_step * consecutive_failures, max_delay)
//! ```
//!
//! `consecutive_failures` is the stability penalty: it increments when a
//! connection dies before `stability_threshold` of uptime and resets to zero
//! when a connection outlives it. The attempt counter resets on every
//! successful open, so across a flapping server the exponential term keeps
//! restarting while the penalty term keeps growing.

use std::time::Duration;

/// Tunable parameters for the reconnect policy.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first reconnect attempt.
    pub base: Duration,
    /// Exponential growth factor per attempt.
    pub multiplier: f64,
    /// Upper bound on any computed delay.
    pub max_delay: Duration,
    /// Additional delay per accumulated consecutive failure.
    pub penalty_step: Duration,
    /// Minimum uptime after which a disconnect is not a rapid failure.
    pub stability_threshold: Duration,
    /// Reconnect attempts before giving up. Zero disables reconnection.
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            penalty_step: Duration::from_secs(2),
            stability_threshold: Duration::from_secs(10),
            max_attempts: 6,
        }
    }
}

/// Mutable retry state threaded through the reconnection path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackoffState {
    /// Reconnect attempts since the last successful open (1-based while a
    /// reconnect is pending).
    pub attempt: u32,
    /// Rapid-failure count across connections; survives successful opens.
    pub consecutive_failures: u32,
}

impl BackoffState {
    /// Fresh state with no recorded history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful open. Resets the attempt counter only; the
    /// stability penalty is settled at close time once uptime is known.
    pub fn record_open(&mut self) {
        self.attempt = 0;
    }

    /// Record a connection ending with the given uptime (`None` when the
    /// attempt never reached Connected).
    ///
    /// Classifies the connection against the stability threshold and bumps
    /// the attempt counter for the upcoming retry.
    pub fn record_close(&mut self, uptime: Option<Duration>, policy: &BackoffPolicy) {
        match uptime {
            Some(up) if up > policy.stability_threshold => self.consecutive_failures = 0,
            _ => self.consecutive_failures = self.consecutive_failures.saturating_add(1),
        }
        self.attempt = self.attempt.saturating_add(1);
    }

    /// Whether the policy allows another attempt.
    #[must_use]
    pub fn exhausted(&self, policy: &BackoffPolicy) -> bool {
        self.attempt > policy.max_attempts
    }

    /// Delay before the current attempt.
    ///
    /// Non-decreasing in both `attempt` and `consecutive_failures`, capped
    /// at `max_delay`.
    #[must_use]
    pub fn delay(&self, policy: &BackoffPolicy) -> Duration {
        let exponent = self.attempt.saturating_sub(1);
        let exponential = policy.base.as_millis() as f64 * policy.multiplier.powi(exponent as i32);
        let penalty =
            policy.penalty_step.as_millis() as u64 * u64::from(self.consecutive_failures);

        let total = (exponential as u64).saturating_add(penalty);
        Duration::from_millis(total).min(policy.max_delay)
    }

    /// Reset everything, as for `force_reconnect`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::default()
    }

    #[test]
    fn first_attempt_uses_base_delay() {
        let mut state = BackoffState::new();
        state.record_close(None, &policy());

        assert_eq!(state.attempt, 1);
        // base 1s + one failure penalty 2s
        assert_eq!(state.delay(&policy()), Duration::from_secs(3));
    }

    #[test]
    fn delay_grows_exponentially_without_penalty() {
        let p = BackoffPolicy { penalty_step: Duration::ZERO, ..policy() };
        let mut state = BackoffState::new();

        let mut delays = Vec::new();
        for _ in 0..4 {
            state.record_close(None, &p);
            delays.push(state.delay(&p));
        }

        assert_eq!(delays, vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(8),
        ]);
    }

    #[test]
    fn delay_capped_at_max() {
        let mut state = BackoffState::new();
        for _ in 0..32 {
            state.record_close(None, &policy());
        }
        assert_eq!(state.delay(&policy()), policy().max_delay);
    }

    #[test]
    fn stable_uptime_resets_penalty() {
        let mut state = BackoffState::new();
        state.record_close(Some(Duration::from_secs(2)), &policy());
        state.record_close(Some(Duration::from_secs(2)), &policy());
        assert_eq!(state.consecutive_failures, 2);

        state.record_close(Some(Duration::from_secs(11)), &policy());
        assert_eq!(state.consecutive_failures, 0);
    }

    #[test]
    fn uptime_exactly_at_threshold_still_counts_as_failure() {
        let mut state = BackoffState::new();
        state.record_close(Some(policy().stability_threshold), &policy());
        assert_eq!(state.consecutive_failures, 1);
    }

    #[test]
    fn successful_open_resets_attempt_but_not_penalty() {
        let mut state = BackoffState::new();
        state.record_close(Some(Duration::from_secs(2)), &policy());
        state.record_close(Some(Duration::from_secs(2)), &policy());

        state.record_open();
        assert_eq!(state.attempt, 0);
        assert_eq!(state.consecutive_failures, 2);
    }

    /// Three consecutive connections each lasting 2s (below the 10s
    /// threshold): the fourth reconnect delay is strictly greater than the
    /// second due to accumulated penalty, even though the attempt counter
    /// resets on every successful open.
    #[test]
    fn short_lived_connections_accumulate_penalty() {
        let p = policy();
        let mut state = BackoffState::new();
        let short = Some(Duration::from_secs(2));

        let mut delays = Vec::new();
        for _ in 0..4 {
            state.record_open();
            state.record_close(short, &p);
            delays.push(state.delay(&p));
        }

        assert!(delays[3] > delays[1], "expected {:?} > {:?}", delays[3], delays[1]);
        assert!(delays.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn exhaustion_respects_max_attempts() {
        let p = BackoffPolicy { max_attempts: 2, ..policy() };
        let mut state = BackoffState::new();

        state.record_close(None, &p);
        assert!(!state.exhausted(&p));
        state.record_close(None, &p);
        assert!(!state.exhausted(&p));
        state.record_close(None, &p);
        assert!(state.exhausted(&p));
    }
}
