//! Column geometry: pixel boundaries, resize distribution and autosizing.

use crate::types::Column;

/// Leeway used when one side of a resize has no bound at all.
const UNBOUNDED_LEEWAY: f64 = 100_000.0;

/// Pre-computed left/right pixel boundaries of every column.
#[derive(Debug, Clone, Default)]
pub struct ColumnBounds {
    left: Vec<f64>,
    right: Vec<f64>,
}

impl ColumnBounds {
    pub fn compute(columns: &[Column]) -> Self {
        let mut left = Vec::with_capacity(columns.len());
        let mut right = Vec::with_capacity(columns.len());
        let mut x = 0.0;
        for column in columns {
            left.push(x);
            x += column.width;
            right.push(x);
        }
        Self { left, right }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn left(&self, cell: usize) -> Option<f64> {
        self.left.get(cell).copied()
    }

    pub fn right(&self, cell: usize) -> Option<f64> {
        self.right.get(cell).copied()
    }

    /// Right edge of a cell that spans `colspan` columns, clamped to the last column.
    pub fn span_right(&self, cell: usize, colspan: usize) -> f64 {
        let last = (cell + colspan.max(1) - 1).min(self.right.len().saturating_sub(1));
        self.right(last).unwrap_or(0.0)
    }

    /// `(left, right)` of every column, in order.
    pub fn edges(&self) -> Vec<(f64, f64)> {
        self.left.iter().copied().zip(self.right.iter().copied()).collect()
    }

    /// Sum of all column widths
    pub fn total_width(&self) -> f64 {
        self.right.last().copied().unwrap_or(0.0)
    }

    /// Column containing the horizontal canvas position `x`.
    pub fn column_at_x(&self, x: f64) -> Option<usize> {
        if x < 0.0 || x >= self.total_width() {
            return None;
        }
        match self
            .left
            .binary_search_by(|pos| pos.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal))
        {
            Ok(i) => Some(i),
            Err(i) => Some(i.saturating_sub(1)),
        }
    }
}

/// How a resize distributes the opposite delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Only columns at or left of the dragged one change; total width changes.
    Free,
    /// Columns right of the dragged one absorb the opposite delta; total width is kept.
    FitToContainer,
}

fn effective_min(column: &Column, absolute_min: f64) -> f64 {
    column.min_width.max(absolute_min)
}

/// Total amount the given columns can shrink and grow, `None` meaning unbounded growth.
fn leeways<'a>(columns: impl Iterator<Item = &'a Column>, absolute_min: f64) -> (f64, Option<f64>) {
    let mut shrink = 0.0;
    let mut stretch = Some(0.0);
    for column in columns.filter(|c| c.resizable) {
        stretch = match (stretch, column.max_width) {
            (Some(s), Some(max)) => Some(s + (max - column.width)),
            _ => None,
        };
        shrink += column.width - effective_min(column, absolute_min);
    }
    (shrink, stretch)
}

/// Resize column `index` by `delta` pixels.
///
/// The request is first clamped to what the columns on both sides can absorb.
/// Shrinking takes pixels from `index` leftward, never going below a column's
/// minimum; growing fills `index` leftward up to each `max_width`. In
/// [`ResizeMode::FitToContainer`] the opposite delta is spread over the columns
/// right of `index`. Returns the delta that was actually applied.
pub fn resize_column(
    columns: &mut [Column],
    index: usize,
    delta: f64,
    mode: ResizeMode,
    absolute_min: f64,
) -> f64 {
    if index >= columns.len() || !delta.is_finite() || delta.abs() < f64::EPSILON {
        return 0.0;
    }
    let fit = mode == ResizeMode::FitToContainer;

    let (shrink_left, stretch_left) = leeways(columns.iter().take(index + 1), absolute_min);
    let (shrink_right, stretch_right) = if fit {
        let (shrink, stretch) = leeways(columns.iter().skip(index + 1), absolute_min);
        (Some(shrink), stretch)
    } else {
        (None, None)
    };
    let max_delta = shrink_right
        .unwrap_or(UNBOUNDED_LEEWAY)
        .min(stretch_left.unwrap_or(UNBOUNDED_LEEWAY));
    let min_delta = -shrink_left.min(stretch_right.unwrap_or(UNBOUNDED_LEEWAY));
    let d = delta.clamp(min_delta.min(0.0), max_delta.max(0.0));

    let (left, right) = columns.split_at_mut(index + 1);
    if d < 0.0 {
        shrink_leftward(left, d, absolute_min);
        if fit {
            grow_rightward(right, -d);
        }
    } else {
        grow_leftward(left, d);
        if fit {
            shrink_rightward(right, -d, absolute_min);
        }
    }
    d
}

fn shrink_leftward(columns: &mut [Column], mut x: f64, absolute_min: f64) {
    for column in columns.iter_mut().rev().filter(|c| c.resizable) {
        let min = effective_min(column, absolute_min);
        if x < 0.0 && column.width + x < min {
            x += column.width - min;
            column.width = min;
        } else {
            column.width += x;
            x = 0.0;
        }
    }
}

fn grow_leftward(columns: &mut [Column], mut x: f64) {
    for column in columns.iter_mut().rev().filter(|c| c.resizable) {
        match column.max_width {
            Some(max) if x > 0.0 && max - column.width < x => {
                x -= max - column.width;
                column.width = max;
            }
            _ => {
                column.width += x;
                x = 0.0;
            }
        }
    }
}

fn grow_rightward(columns: &mut [Column], mut x: f64) {
    for column in columns.iter_mut().filter(|c| c.resizable) {
        match column.max_width {
            Some(max) if x > 0.0 && max - column.width < x => {
                x -= max - column.width;
                column.width = max;
            }
            _ => {
                column.width += x;
                x = 0.0;
            }
        }
    }
}

fn shrink_rightward(columns: &mut [Column], mut x: f64, absolute_min: f64) {
    for column in columns.iter_mut().filter(|c| c.resizable) {
        let min = effective_min(column, absolute_min);
        if x < 0.0 && column.width + x < min {
            x += column.width - min;
            column.width = min;
        } else {
            column.width += x;
            x = 0.0;
        }
    }
}

/// Fit column widths into `available` pixels.
///
/// Shrinks proportionally to each column's leeway above its minimum, then grows
/// proportionally to current width, bounded by `max_width`. Both loops stop
/// when a pass makes no progress and never run more than `columns + 1` passes,
/// so the result may be off by a pixel or so. Returns `true` when a column
/// flagged `rerender_on_resize` changed width.
pub fn autosize(columns: &mut [Column], available: f64, absolute_min: f64) -> bool {
    let mut widths: Vec<f64> = columns.iter().map(|c| c.width).collect();
    let mut total: f64 = widths.iter().sum();
    let mut shrink_leeway: f64 = columns
        .iter()
        .filter(|c| c.resizable)
        .map(|c| c.width - effective_min(c, absolute_min))
        .sum();
    let max_passes = columns.len() + 1;

    let mut prev_total = total;
    let mut passes = 0;
    while total > available && shrink_leeway > 0.0 && passes < max_passes {
        passes += 1;
        let proportion = (total - available) / shrink_leeway;
        for (column, width) in columns.iter().zip(widths.iter_mut()) {
            if total <= available {
                break;
            }
            if !column.resizable || *width <= column.min_width || *width <= absolute_min {
                continue;
            }
            let room = *width - effective_min(column, absolute_min);
            let mut cut = (proportion * room).floor();
            if cut <= 0.0 {
                cut = 1.0;
            }
            let cut = cut.min(room);
            total -= cut;
            shrink_leeway -= cut;
            *width -= cut;
        }
        if prev_total <= total {
            break;
        }
        prev_total = total;
    }

    prev_total = total;
    passes = 0;
    while total < available && total > 0.0 && passes < max_passes {
        passes += 1;
        let proportion = available / total;
        for (column, width) in columns.iter().zip(widths.iter_mut()) {
            if total >= available {
                break;
            }
            let at_max = column.max_width.is_some_and(|max| max <= *width);
            let grow = if !column.resizable || at_max {
                0.0
            } else {
                let wanted = (proportion * *width).floor() - *width;
                let cap = column
                    .max_width
                    .map(|max| max - *width)
                    .filter(|room| *room > 0.0)
                    .unwrap_or(1_000_000.0);
                let grow = wanted.min(cap);
                if grow <= 0.0 {
                    1.0
                } else {
                    grow
                }
            };
            total += grow;
            if total <= available {
                *width += grow;
            }
        }
        if prev_total >= total {
            break;
        }
        prev_total = total;
    }

    let mut rerender = false;
    for (column, width) in columns.iter_mut().zip(widths) {
        if column.rerender_on_resize && (column.width - width).abs() > f64::EPSILON {
            rerender = true;
        }
        column.width = width;
    }
    rerender
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    fn cols(widths: &[f64]) -> Vec<Column> {
        widths
            .iter()
            .enumerate()
            .map(|(i, w)| Column::new(format!("c{i}")).with_width(*w))
            .collect()
    }

    #[test]
    fn test_bounds_prefix_sums() {
        let bounds = ColumnBounds::compute(&cols(&[100.0, 50.0, 25.0]));
        assert_eq!(bounds.left(0), Some(0.0));
        assert_eq!(bounds.left(2), Some(150.0));
        assert_eq!(bounds.right(2), Some(175.0));
        assert_eq!(bounds.total_width(), 175.0);
        assert_eq!(bounds.span_right(1, 5), 175.0);
    }

    #[test]
    fn test_column_at_x() {
        let bounds = ColumnBounds::compute(&cols(&[100.0, 50.0, 25.0]));
        assert_eq!(bounds.column_at_x(0.0), Some(0));
        assert_eq!(bounds.column_at_x(99.9), Some(0));
        assert_eq!(bounds.column_at_x(100.0), Some(1));
        assert_eq!(bounds.column_at_x(174.0), Some(2));
        assert_eq!(bounds.column_at_x(175.0), None);
        assert_eq!(bounds.column_at_x(-1.0), None);
    }

    #[test]
    fn test_shrink_carries_into_left_neighbours() {
        let mut columns = cols(&[100.0, 100.0, 100.0]);
        let applied = resize_column(&mut columns, 1, -100.0, ResizeMode::Free, 0.0);
        assert_eq!(applied, -100.0);
        // column 1 bottoms out at 30, the rest comes from column 0
        assert_eq!(columns[1].width, 30.0);
        assert_eq!(columns[0].width, 70.0);
        assert_eq!(columns[2].width, 100.0);
    }

    #[test]
    fn test_shrink_is_clamped_to_leeway() {
        let mut columns = cols(&[100.0, 100.0]);
        let applied = resize_column(&mut columns, 0, -500.0, ResizeMode::Free, 0.0);
        assert_eq!(applied, -70.0);
        assert_eq!(columns[0].width, 30.0);
    }

    #[test]
    fn test_grow_respects_max_width() {
        let mut columns = cols(&[100.0, 100.0]);
        columns[1].max_width = Some(120.0);
        resize_column(&mut columns, 1, 50.0, ResizeMode::Free, 0.0);
        assert_eq!(columns[1].width, 120.0);
        assert_eq!(columns[0].width, 130.0);
    }

    #[test]
    fn test_fit_mode_keeps_total() {
        let mut columns = cols(&[100.0, 100.0, 100.0]);
        resize_column(&mut columns, 0, 40.0, ResizeMode::FitToContainer, 0.0);
        let total: f64 = columns.iter().map(|c| c.width).sum();
        assert_eq!(total, 300.0);
        assert_eq!(columns[0].width, 140.0);
        assert_eq!(columns[1].width, 60.0);
    }

    #[test]
    fn test_non_resizable_columns_are_skipped() {
        let mut columns = cols(&[100.0, 100.0]);
        columns[0].resizable = false;
        let applied = resize_column(&mut columns, 1, -100.0, ResizeMode::Free, 0.0);
        assert_eq!(applied, -70.0);
        assert_eq!(columns[0].width, 100.0);
        assert_eq!(columns[1].width, 30.0);
    }

    #[test]
    fn test_autosize_shrink() {
        let mut columns = cols(&[100.0, 100.0, 100.0]);
        autosize(&mut columns, 250.0, 0.0);
        let total: f64 = columns.iter().map(|c| c.width).sum();
        assert!(total <= 250.0);
        assert!(total >= 249.0);
        assert!(columns.iter().all(|c| c.width >= 30.0));
    }

    #[test]
    fn test_autosize_grow_bounded_by_max() {
        let mut columns = cols(&[100.0, 100.0]);
        columns[0].max_width = Some(110.0);
        autosize(&mut columns, 400.0, 0.0);
        assert_eq!(columns[0].width, 110.0);
        let total: f64 = columns.iter().map(|c| c.width).sum();
        // pass cap leaves a small residual unassigned
        assert!(total <= 400.0);
        assert!(total >= 380.0);
    }

    #[test]
    fn test_autosize_reports_rerender() {
        let mut columns = cols(&[100.0, 100.0]);
        columns[1].rerender_on_resize = true;
        assert!(autosize(&mut columns, 150.0, 0.0));
        assert!(!autosize(&mut columns, 150.0, 0.0));
    }
}
