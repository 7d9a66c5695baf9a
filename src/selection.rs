//! Selection models.
//!
//! The grid owns one optional model. It pushes range changes into the model
//! and renders whatever ranges the model settles on.

use crate::types::{CellPosition, CellRange};

pub trait SelectionModel {
    /// Replace the selection and return the ranges actually selected.
    fn set_selected_ranges(&mut self, ranges: Vec<CellRange>) -> Vec<CellRange>;

    fn selected_ranges(&self) -> &[CellRange];

    /// The active cell moved. Returns the new selection when it changed.
    fn on_active_cell_changed(
        &mut self,
        _active: Option<CellPosition>,
        _column_count: usize,
    ) -> Option<Vec<CellRange>> {
        None
    }
}

/// Rows covered by `ranges`, in first-seen order without duplicates.
pub fn rows_in_ranges(ranges: &[CellRange]) -> Vec<usize> {
    let mut seen = std::collections::HashSet::new();
    ranges
        .iter()
        .flat_map(|r| r.from_row..=r.to_row)
        .filter(|row| seen.insert(*row))
        .collect()
}

/// One full-width range per row.
pub fn rows_to_ranges(rows: &[usize], column_count: usize) -> Vec<CellRange> {
    let last = column_count.saturating_sub(1);
    rows.iter()
        .map(|&row| CellRange::new(row, 0, row, last))
        .collect()
}

/// Whole-row selection, optionally following the active cell.
#[derive(Debug, Clone, Default)]
pub struct RowSelectionModel {
    ranges: Vec<CellRange>,
    select_active_row: bool,
}

impl RowSelectionModel {
    pub fn new(select_active_row: bool) -> Self {
        Self {
            ranges: Vec::new(),
            select_active_row,
        }
    }
}

impl SelectionModel for RowSelectionModel {
    fn set_selected_ranges(&mut self, ranges: Vec<CellRange>) -> Vec<CellRange> {
        self.ranges = ranges;
        self.ranges.clone()
    }

    fn selected_ranges(&self) -> &[CellRange] {
        &self.ranges
    }

    fn on_active_cell_changed(
        &mut self,
        active: Option<CellPosition>,
        column_count: usize,
    ) -> Option<Vec<CellRange>> {
        if !self.select_active_row {
            return None;
        }
        let active = active?;
        let ranges = rows_to_ranges(&[active.row], column_count);
        if ranges == self.ranges {
            return None;
        }
        Some(self.set_selected_ranges(ranges))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_in_ranges_dedups_in_order() {
        let ranges = vec![CellRange::new(3, 0, 4, 1), CellRange::new(1, 0, 3, 0)];
        assert_eq!(rows_in_ranges(&ranges), vec![3, 4, 1, 2]);
    }

    #[test]
    fn test_row_model_follows_active_cell() {
        let mut model = RowSelectionModel::new(true);
        let active = CellPosition {
            row: 2,
            cell: 1,
            pos_x: 1,
        };
        let ranges = model.on_active_cell_changed(Some(active), 3);
        assert_eq!(ranges, Some(vec![CellRange::new(2, 0, 2, 2)]));
        assert_eq!(model.on_active_cell_changed(Some(active), 3), None);

        let mut passive = RowSelectionModel::new(false);
        assert_eq!(passive.on_active_cell_changed(Some(active), 3), None);
    }
}
