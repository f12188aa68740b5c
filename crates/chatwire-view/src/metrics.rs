//! Plain-number viewport geometry.

/// Snapshot of scroll geometry reported by the rendering layer.
///
/// All values are in the same length unit (pixels, typically).
/// `scroll_offset` is the distance from the top of the content to the top
/// of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    /// Distance scrolled from the top of the content.
    pub scroll_offset: f64,
    /// Total height of the rendered content.
    pub content_height: f64,
    /// Height of the visible viewport.
    pub viewport_height: f64,
}

impl ViewportMetrics {
    /// Distance between the top of the content and the viewport top.
    #[must_use]
    pub fn distance_from_top(&self) -> f64 {
        self.scroll_offset
    }

    /// Distance between the viewport bottom and the bottom of the content.
    #[must_use]
    pub fn distance_from_bottom(&self) -> f64 {
        (self.content_height - self.viewport_height - self.scroll_offset).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances_are_complementary() {
        let m = ViewportMetrics {
            scroll_offset: 100.0,
            content_height: 1000.0,
            viewport_height: 400.0,
        };
        assert!((m.distance_from_top() - 100.0).abs() < f64::EPSILON);
        assert!((m.distance_from_bottom() - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bottom_distance_clamps_at_zero() {
        let m = ViewportMetrics {
            scroll_offset: 700.0,
            content_height: 1000.0,
            viewport_height: 400.0,
        };
        assert!(m.distance_from_bottom().abs() < f64::EPSILON);
    }
}
