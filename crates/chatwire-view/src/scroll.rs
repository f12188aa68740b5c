//! Scroll-driven pagination and position preservation.
//!
//! The controller consumes [`ViewportMetrics`] snapshots and decides when an
//! upward scroll near the top should fetch an older page. Guards keep one
//! slow network round-trip from stacking requests: in-flight loads, a
//! minimum interval between triggers, and a cap on consecutive triggers
//! that only a departure from the top zone resets.
//!
//! Time is an input, never read from a clock, following the same shape as
//! the delivery-core state machines.

use std::ops::Sub;
use std::time::Duration;

use crate::metrics::ViewportMetrics;

/// Pagination trigger tuning.
#[derive(Debug, Clone)]
pub struct ScrollConfig {
    /// Distance from the top below which upward scrolls trigger a fetch.
    pub top_threshold: f64,
    /// Distance from the bottom within which new messages auto-scroll.
    pub bottom_threshold: f64,
    /// Minimum spacing between two pagination triggers.
    pub min_trigger_interval: Duration,
    /// Triggers allowed without leaving the top zone in between.
    pub max_consecutive_triggers: u32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            top_threshold: 150.0,
            bottom_threshold: 300.0,
            min_trigger_interval: Duration::from_secs(1),
            max_consecutive_triggers: 3,
        }
    }
}

/// Decides when scrolling should fetch older history.
///
/// Generic over the instant type so tests can drive it with synthetic time.
#[derive(Debug, Clone)]
pub struct ScrollController<I> {
    config: ScrollConfig,
    last_offset: Option<f64>,
    last_trigger_at: Option<I>,
    consecutive_triggers: u32,
}

impl<I> ScrollController<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Controller with the given tuning.
    #[must_use]
    pub fn new(config: ScrollConfig) -> Self {
        Self { config, last_offset: None, last_trigger_at: None, consecutive_triggers: 0 }
    }

    /// Process one scroll event.
    ///
    /// Returns `true` when an older-page fetch should start now. `loading`
    /// is whether a fetch is already in flight; `has_more` whether older
    /// pages exist at all.
    pub fn on_scroll(
        &mut self,
        metrics: &ViewportMetrics,
        now: I,
        loading: bool,
        has_more: bool,
    ) -> bool {
        let upward = self
            .last_offset
            .is_some_and(|previous| metrics.scroll_offset < previous);
        self.last_offset = Some(metrics.scroll_offset);

        let in_top_zone = metrics.distance_from_top() <= self.config.top_threshold;
        if !in_top_zone {
            // Leaving the zone re-arms the consecutive-trigger cap
            self.consecutive_triggers = 0;
            return false;
        }

        if !upward || loading || !has_more {
            return false;
        }
        if self.consecutive_triggers >= self.config.max_consecutive_triggers {
            return false;
        }
        if let Some(last) = self.last_trigger_at
            && now - last < self.config.min_trigger_interval
        {
            return false;
        }

        self.last_trigger_at = Some(now);
        self.consecutive_triggers += 1;
        tracing::debug!(
            trigger = self.consecutive_triggers,
            offset = metrics.scroll_offset,
            "older-page fetch triggered by scroll"
        );
        true
    }

    /// Whether a newly arrived message should auto-scroll the view.
    ///
    /// Only when the user is already near the bottom; reading old history
    /// must never be yanked away. `own_send` forces the scroll: the user's
    /// own message always comes into view regardless of position.
    #[must_use]
    pub fn should_autoscroll(&self, metrics: &ViewportMetrics, own_send: bool) -> bool {
        own_send || metrics.distance_from_bottom() <= self.config.bottom_threshold
    }

    /// Forget per-conversation state, as on conversation switch.
    pub fn reset(&mut self) {
        self.last_offset = None;
        self.last_trigger_at = None;
        self.consecutive_triggers = 0;
    }
}

impl<I> Default for ScrollController<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    fn default() -> Self {
        Self::new(ScrollConfig::default())
    }
}

/// Scroll offset that keeps the same content on screen after rows were
/// prepended above it.
///
/// The viewport stays anchored by adding the height the prepend introduced:
/// `offset_before + (height_after - height_before)`.
#[must_use]
pub fn restore_offset(offset_before: f64, height_before: f64, height_after: f64) -> f64 {
    offset_before + (height_after - height_before)
}
