//! Rate-limited user-facing connection notices.
//!
//! Transport failures never throw into the UI layer; they transition state
//! and optionally surface through here, capped at one notice per cooldown
//! window so a flapping connection cannot produce a notification storm.

use std::{ops::Sub, time::Duration};

/// User-facing connection notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionNotice {
    /// Connection lost; reconnecting in the background.
    Lost,
    /// Connection restored after one or more retries.
    Restored,
    /// Retries exhausted; manual reconnect required.
    GaveUp,
}

/// One-notice-per-cooldown gate.
#[derive(Debug, Clone)]
pub struct Notifier<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    cooldown: Duration,
    last_emitted: Option<I>,
}

impl<I> Notifier<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a notifier with the given cooldown window.
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown, last_emitted: None }
    }

    /// Offer a notice; returns it when outside the cooldown window.
    ///
    /// `GaveUp` always passes: the terminal state must reach the user even
    /// mid-window.
    pub fn offer(&mut self, notice: ConnectionNotice, now: I) -> Option<ConnectionNotice> {
        let suppressed = notice != ConnectionNotice::GaveUp
            && self.last_emitted.is_some_and(|last| now - last < self.cooldown);

        if suppressed {
            tracing::debug!(?notice, "notice suppressed by cooldown");
            return None;
        }

        self.last_emitted = Some(now);
        Some(notice)
    }
}
