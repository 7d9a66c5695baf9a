//! Viewport state: scroll position, size and the derived row windows.

use super::Paging;
use crate::types::ViewRange;

/// Vertical scroll direction of the last scroll event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollDirection {
    Backward,
    #[default]
    Still,
    Forward,
}

impl ScrollDirection {
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Self::Forward
        } else if delta < 0.0 {
            Self::Backward
        } else {
            Self::Still
        }
    }
}

/// Viewport state - the visible area of the canvas
#[derive(Debug, Clone)]
pub struct Viewport {
    /// Platform (real-space) vertical scroll position
    pub scroll_top: f64,
    pub scroll_left: f64,
    pub prev_scroll_top: f64,
    pub prev_scroll_left: f64,
    /// Scroll position at the time of the last render
    pub last_rendered_scroll_top: f64,
    pub last_rendered_scroll_left: f64,
    /// Viewport width in pixels
    pub width: f64,
    /// Viewport height in pixels
    pub height: f64,
    pub direction: ScrollDirection,
    pub has_v_scroll: bool,
    pub has_h_scroll: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            scroll_top: 0.0,
            scroll_left: 0.0,
            prev_scroll_top: 0.0,
            prev_scroll_left: 0.0,
            last_rendered_scroll_top: 0.0,
            last_rendered_scroll_left: 0.0,
            width,
            height,
            direction: ScrollDirection::Still,
            has_v_scroll: false,
            has_h_scroll: false,
        }
    }

    /// Number of rows that are at least partly visible.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn visible_row_count(&self, row_height: f64) -> usize {
        if row_height <= 0.0 || self.height <= 0.0 {
            return 0;
        }
        (self.height / row_height).ceil() as usize
    }

    /// Rows and pixels strictly inside the viewport.
    ///
    /// `row_count` includes the pending-insert row; the window never extends past it.
    pub fn visible_range(&self, paging: &Paging, row_height: f64, row_count: usize) -> ViewRange {
        let last_row = row_count.saturating_sub(1);
        let top = paging.row_at(self.scroll_top, row_height).min(last_row);
        let bottom = (paging.row_at(self.scroll_top + self.height, row_height) + 1).min(last_row);
        ViewRange {
            top,
            bottom,
            left_px: self.scroll_left,
            right_px: self.scroll_left + self.width,
        }
    }

    /// Visible range expanded by the render buffer.
    ///
    /// `min_buffer` rows are added on both sides; in the direction of travel a
    /// full viewport of rows is added instead. Horizontally one viewport width
    /// is added on each side, clamped to the canvas.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rendered_range(
        &self,
        paging: &Paging,
        row_height: f64,
        row_count: usize,
        min_buffer: usize,
        canvas_width: f64,
    ) -> ViewRange {
        let range = self.visible_range(paging, row_height, row_count);
        let buffer = if row_height > 0.0 {
            (self.height / row_height).round().max(0.0) as usize
        } else {
            0
        };
        let (before, after) = match self.direction {
            ScrollDirection::Backward => (buffer, min_buffer),
            ScrollDirection::Forward => (min_buffer, buffer),
            ScrollDirection::Still => (min_buffer, min_buffer),
        };
        let last_row = row_count.saturating_sub(1);
        ViewRange {
            top: range.top.saturating_sub(before),
            bottom: (range.bottom + after).min(last_row),
            left_px: (range.left_px - self.width).max(0.0),
            right_px: (range.right_px + self.width).min(canvas_width).max(0.0),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn paging_for(rows: usize) -> Paging {
        let mut paging = Paging::default();
        paging.recompute(rows as f64 * 25.0, 1_000_000.0);
        paging
    }

    #[test]
    fn test_visible_range_at_top() {
        let viewport = Viewport::new(400.0, 100.0);
        let range = viewport.visible_range(&paging_for(1000), 25.0, 1000);
        assert_eq!(range.top, 0);
        assert_eq!(range.bottom, 5);
        assert_eq!(range.right_px, 400.0);
    }

    #[test]
    fn test_visible_range_clamped_to_rows() {
        let viewport = Viewport::new(400.0, 100.0);
        let range = viewport.visible_range(&paging_for(2), 25.0, 2);
        assert_eq!(range.top, 0);
        assert_eq!(range.bottom, 1);
    }

    #[test]
    fn test_rendered_range_buffers_in_direction() {
        let mut viewport = Viewport::new(400.0, 100.0);
        viewport.scroll_top = 2500.0;
        let paging = paging_for(1000);

        viewport.direction = ScrollDirection::Forward;
        let r = viewport.rendered_range(&paging, 25.0, 1000, 3, 1200.0);
        assert_eq!(r.top, 97);
        assert_eq!(r.bottom, 109);

        viewport.direction = ScrollDirection::Backward;
        let r = viewport.rendered_range(&paging, 25.0, 1000, 3, 1200.0);
        assert_eq!(r.top, 96);
        assert_eq!(r.bottom, 108);
        assert_eq!(r.left_px, 0.0);
        assert_eq!(r.right_px, 800.0);
    }

    #[test]
    fn test_visible_row_count() {
        let viewport = Viewport::new(400.0, 110.0);
        assert_eq!(viewport.visible_row_count(25.0), 5);
    }
}
