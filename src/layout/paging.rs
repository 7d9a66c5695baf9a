//! Virtual scroll paging.
//!
//! Platforms cap the height of a scrollable element. When the logical content
//! height `th` exceeds that ceiling, the real scroll extent is fixed at the
//! ceiling `h` and split into `n` pages of height `ph = h / 100`. Each page
//! shifts rows by `offset = round(page * cj)` where the jumpiness coefficient
//! `cj = (th - h) / (n - 1)`, so that
//!
//! ```text
//! logical position = scroll_top + offset
//! ```
//!
//! holds at every point. Below the ceiling there is a single page and the
//! offset is always zero.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    /// Logical content height
    pub virtual_height: f64,
    /// Height of the real scrollable extent
    pub real_height: f64,
    pub page_height: f64,
    pub page_count: usize,
    /// Jumpiness coefficient
    pub jumpiness: f64,
    pub page: usize,
    pub offset: f64,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            virtual_height: 0.0,
            real_height: 0.0,
            page_height: 0.0,
            page_count: 1,
            jumpiness: 0.0,
            page: 0,
            offset: 0.0,
        }
    }
}

/// Where a `scroll_to` landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTarget {
    /// Value to apply to the platform scroll position
    pub scroll_top: f64,
    pub offset_changed: bool,
}

impl Paging {
    /// Recompute paging for a new logical content height.
    ///
    /// The current page is kept when still in range; callers re-apply the
    /// scroll position afterwards.
    pub fn recompute(&mut self, virtual_height: f64, ceiling: f64) {
        self.virtual_height = virtual_height.max(0.0);
        // A ceiling that could not be measured leaves the content unpaged.
        if self.virtual_height < ceiling || ceiling <= 0.0 {
            self.real_height = self.virtual_height;
            self.page_height = self.virtual_height;
            self.page_count = 1;
            self.jumpiness = 0.0;
        } else {
            self.real_height = ceiling;
            self.page_height = ceiling / 100.0;
            self.page_count = page_count(self.virtual_height, self.page_height).max(1);
            self.jumpiness = if self.page_count > 1 {
                (self.virtual_height - self.real_height) / (self.page_count - 1) as f64
            } else {
                0.0
            };
        }
        if self.page >= self.page_count {
            self.page = self.page_count.saturating_sub(1);
        }
        self.offset = (self.page as f64 * self.jumpiness).round();
        tracing::debug!(
            th = self.virtual_height,
            h = self.real_height,
            ph = self.page_height,
            n = self.page_count,
            cj = self.jumpiness,
            "paging recomputed"
        );
    }

    pub fn is_paged(&self) -> bool {
        self.page_count > 1
    }

    pub fn reset(&mut self) {
        self.page = 0;
        self.offset = 0.0;
    }

    /// Largest logical scroll position for a viewport of `viewport_height`.
    pub fn max_scroll(&self, viewport_height: f64) -> f64 {
        (self.virtual_height - viewport_height).max(0.0)
    }

    /// Move to logical position `y`, clamped to `[0, max_scroll + extra]`.
    pub fn scroll_to(&mut self, y: f64, viewport_height: f64, extra: f64) -> ScrollTarget {
        let y = y.min(self.max_scroll(viewport_height) + extra).max(0.0);
        let old_offset = self.offset;
        self.page = self.page_for(y);
        self.offset = (self.page as f64 * self.jumpiness).round();
        ScrollTarget {
            scroll_top: y - self.offset,
            offset_changed: (old_offset - self.offset).abs() > f64::EPSILON,
        }
    }

    /// Re-derive the page from a raw platform scroll position after a jump
    /// larger than the viewport. Returns whether the offset changed.
    pub fn jump_to(&mut self, scroll_top: f64, viewport_height: f64) -> bool {
        let old_offset = self.offset;
        let span = self.real_height - viewport_height;
        self.page = if span.abs() < f64::EPSILON || self.page_height <= 0.0 {
            0
        } else {
            let logical = scroll_top * ((self.virtual_height - viewport_height) / span);
            self.page_for(logical)
        };
        self.offset = (self.page as f64 * self.jumpiness).round();
        (old_offset - self.offset).abs() > f64::EPSILON
    }

    fn page_for(&self, y: f64) -> usize {
        if !self.is_paged() || self.page_height <= 0.0 {
            return 0;
        }
        page_count(y, self.page_height).min(self.page_count.saturating_sub(1))
    }

    /// Pixel top of `row` in the real (offset-adjusted) coordinate space.
    pub fn row_top(&self, row: usize, row_height: f64) -> f64 {
        row_height * row as f64 - self.offset
    }

    /// Row at real-space position `y`.
    pub fn row_at(&self, y: f64, row_height: f64) -> usize {
        floor_index((y + self.offset) / row_height)
    }
}

fn page_count(height: f64, page_height: f64) -> usize {
    floor_index(height / page_height)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_index(value: f64) -> usize {
    if value.is_finite() && value > 0.0 {
        value.floor() as usize
    } else {
        0
    }
}
