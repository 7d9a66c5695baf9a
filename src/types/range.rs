use serde::{Deserialize, Serialize};

/// Rectangular range of cells, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRange {
    pub from_row: usize,
    pub from_cell: usize,
    pub to_row: usize,
    pub to_cell: usize,
}

impl CellRange {
    /// Create a range, normalizing so that `from <= to` on both axes.
    pub fn new(row1: usize, cell1: usize, row2: usize, cell2: usize) -> Self {
        Self {
            from_row: row1.min(row2),
            from_cell: cell1.min(cell2),
            to_row: row1.max(row2),
            to_cell: cell1.max(cell2),
        }
    }

    pub fn single(row: usize, cell: usize) -> Self {
        Self::new(row, cell, row, cell)
    }

    pub fn contains(&self, row: usize, cell: usize) -> bool {
        row >= self.from_row && row <= self.to_row && cell >= self.from_cell && cell <= self.to_cell
    }

    pub fn is_single_cell(&self) -> bool {
        self.from_row == self.to_row && self.from_cell == self.to_cell
    }
}

/// A window of rows (inclusive) and a horizontal pixel span.
///
/// Used both for the strictly visible area and for the buffered range that
/// the render cache keeps materialized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRange {
    pub top: usize,
    pub bottom: usize,
    pub left_px: f64,
    pub right_px: f64,
}

impl ViewRange {
    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.top && row <= self.bottom
    }
}

/// Position of the active cell. `pos_x` is the column vertical navigation
/// aims for when passing through spanned cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellPosition {
    pub row: usize,
    pub cell: usize,
    pub pos_x: usize,
}

/// Pixel box of a cell relative to the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellBox {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub width: f64,
    pub height: f64,
    pub visible: bool,
}
