use super::Grid;
use crate::error::{GridError, Result};
use crate::events::GridEvent;
use crate::render::{CssHash, Surface};
use crate::selection::{rows_in_ranges, rows_to_ranges, SelectionModel};
use crate::types::CellRange;

impl<S: Surface> Grid<S> {
    /// Install a selection model and render its current ranges.
    pub fn set_selection_model(&mut self, model: impl SelectionModel + 'static) {
        let ranges = model.selected_ranges().to_vec();
        self.selection_model = Some(Box::new(model));
        self.handle_selected_ranges_changed(&ranges);
    }

    /// Remove the selection model and its style layer.
    pub fn clear_selection_model(&mut self) {
        self.selection_model = None;
        self.selected_rows.clear();
        let key = self.options.selected_cell_css_class.clone();
        self.remove_cell_css_styles(&key);
    }

    pub fn selection_model(&self) -> Option<&dyn SelectionModel> {
        self.selection_model.as_deref()
    }

    pub fn selected_ranges(&self) -> Result<Vec<CellRange>> {
        let model = self
            .selection_model
            .as_ref()
            .ok_or(GridError::NoSelectionModel)?;
        Ok(model.selected_ranges().to_vec())
    }

    pub fn set_selected_ranges(&mut self, ranges: Vec<CellRange>) -> Result<()> {
        let model = self
            .selection_model
            .as_mut()
            .ok_or(GridError::NoSelectionModel)?;
        let applied = model.set_selected_ranges(ranges);
        self.handle_selected_ranges_changed(&applied);
        Ok(())
    }

    pub fn selected_rows(&self) -> Result<&[usize]> {
        if self.selection_model.is_none() {
            return Err(GridError::NoSelectionModel);
        }
        Ok(&self.selected_rows)
    }

    /// Select whole rows.
    pub fn set_selected_rows(&mut self, rows: &[usize]) -> Result<()> {
        let ranges = rows_to_ranges(rows, self.columns.len());
        self.set_selected_ranges(ranges)
    }

    pub(super) fn handle_selected_ranges_changed(&mut self, ranges: &[CellRange]) {
        let class = self.options.selected_cell_css_class.clone();
        let mut hash = CssHash::new();
        {
            let rules = self.cell_rules();
            for range in ranges {
                for row in range.from_row..=range.to_row {
                    for cell in range.from_cell..=range.to_cell {
                        let Some(column) = self.columns.get(cell) else {
                            continue;
                        };
                        if rules.can_cell_be_selected(row, cell) {
                            hash.entry(row)
                                .or_default()
                                .insert(column.id.clone(), class.clone());
                        }
                    }
                }
            }
        }
        self.selected_rows = rows_in_ranges(ranges);
        tracing::debug!(rows = self.selected_rows.len(), "selection changed");
        self.set_cell_css_styles(&class, hash);
        self.trigger(GridEvent::SelectedRowsChanged {
            rows: self.selected_rows.clone(),
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use crate::data::VecDataSource;
    use crate::error::GridError;
    use crate::grid::GridBuilder;
    use crate::render::RecordingSurface;
    use crate::selection::RowSelectionModel;
    use crate::types::{CellRange, Column, Item};

    #[test]
    fn test_selection_requires_model() {
        let mut grid = GridBuilder::new(RecordingSurface::new())
            .columns(vec![Column::new("a")])
            .build()
            .unwrap();
        assert!(matches!(
            grid.set_selected_rows(&[1]),
            Err(GridError::NoSelectionModel)
        ));
        assert!(grid.selected_rows().is_err());
    }

    #[test]
    fn test_selected_cells_get_class() {
        let mut grid = GridBuilder::new(RecordingSurface::new())
            .columns(vec![Column::new("a"), Column::new("b").selectable(false)])
            .data(VecDataSource::new(vec![Item::new(); 10]))
            .build()
            .unwrap();
        grid.set_selection_model(RowSelectionModel::new(false));
        grid.set_selected_ranges(vec![CellRange::new(2, 0, 3, 1)]).unwrap();
        assert_eq!(grid.selected_rows().unwrap(), &[2, 3]);
        let surface = grid.surface();
        assert!(surface.find_cell(2, 0).unwrap().classes.contains("selected"));
        assert!(!surface.find_cell(2, 1).unwrap().classes.contains("selected"));

        grid.set_selected_rows(&[5]).unwrap();
        assert!(!grid.surface().find_cell(2, 0).unwrap().classes.contains("selected"));
        assert!(grid.surface().find_cell(5, 0).unwrap().classes.contains("selected"));
    }

    #[test]
    fn test_row_model_follows_active_cell() {
        let mut grid = GridBuilder::new(RecordingSurface::new())
            .columns(vec![Column::new("a"), Column::new("b")])
            .data(VecDataSource::new(vec![Item::new(); 10]))
            .build()
            .unwrap();
        grid.set_selection_model(RowSelectionModel::new(true));
        grid.set_active_cell(4, 1);
        assert_eq!(grid.selected_rows().unwrap(), &[4]);
    }
}
