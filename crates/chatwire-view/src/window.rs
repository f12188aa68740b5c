//! Index-range virtualization for long message lists.
//!
//! Computes which slice of a list needs real rendering for a given scroll
//! position, plus the spacer heights standing in for everything outside the
//! slice. Short lists skip virtualization entirely: the bookkeeping costs
//! more than it saves below a threshold.

use crate::metrics::ViewportMetrics;

/// Virtualization tuning.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Estimated row height used to map offsets to indices.
    pub row_height: f64,
    /// Extra rows materialized on each side of the visible range.
    pub overscan: usize,
    /// Window edges within this many rows of a list end snap to the end.
    pub edge_buffer: usize,
    /// Lists shorter than this render in full, no windowing.
    pub disable_below: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { row_height: 48.0, overscan: 6, edge_buffer: 3, disable_below: 50 }
    }
}

/// One render plan: which indices to materialize and what to pad with.
///
/// The first and last `edge_buffer` rows are retained in every plan via
/// `head` and `tail`, so list-end anchors stay rendered however far the
/// scrolled `range` is from them. The spacers stand in for the gap between
/// the retained edges and the range.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowPlan {
    /// Half-open index range around the viewport to render for real.
    pub range: std::ops::Range<usize>,
    /// Always-retained rows at the top of the list. Empty when `range`
    /// already covers them.
    pub head: std::ops::Range<usize>,
    /// Always-retained rows at the bottom of the list. Empty when `range`
    /// already covers them.
    pub tail: std::ops::Range<usize>,
    /// Spacer height standing in for rows between `head` and `range`.
    pub spacer_above: f64,
    /// Spacer height standing in for rows between `range` and `tail`.
    pub spacer_below: f64,
    /// True when the whole list renders and spacers are zero.
    pub disabled: bool,
}

/// Maps scroll geometry to a [`WindowPlan`].
#[derive(Debug, Clone, Default)]
pub struct VirtualWindow {
    config: WindowConfig,
}

impl VirtualWindow {
    /// Window with the given tuning.
    #[must_use]
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    /// Replace the row height estimate with a measured average.
    pub fn set_row_height(&mut self, measured: f64) {
        if measured.is_finite() && measured > 0.0 {
            self.config.row_height = measured;
        }
    }

    /// Compute the render plan for `total` rows at the given scroll position.
    #[must_use]
    pub fn plan(&self, total: usize, metrics: &ViewportMetrics) -> WindowPlan {
        if total < self.config.disable_below {
            return WindowPlan {
                range: 0..total,
                head: 0..0,
                tail: total..total,
                spacer_above: 0.0,
                spacer_below: 0.0,
                disabled: true,
            };
        }

        let row = self.config.row_height;
        let first_visible = (metrics.scroll_offset.max(0.0) / row).floor() as usize;
        let visible_rows = (metrics.viewport_height / row).ceil() as usize;

        let mut start = first_visible.saturating_sub(self.config.overscan).min(total);
        let mut end = first_visible
            .saturating_add(visible_rows)
            .saturating_add(self.config.overscan)
            .min(total);

        // Snap near-edge windows to the list ends so boundary rows never
        // pop in and out while scrolling near them.
        if start <= self.config.edge_buffer {
            start = 0;
        }
        if end + self.config.edge_buffer >= total {
            end = total;
        }

        // Edge rows stay materialized in every plan
        let head = 0..self.config.edge_buffer.min(start);
        let tail = end.max(total.saturating_sub(self.config.edge_buffer))..total;

        WindowPlan {
            range: start..end,
            spacer_above: (start - head.end) as f64 * row,
            spacer_below: (tail.start - end) as f64 * row,
            head,
            tail,
            disabled: false,
        }
    }
}
