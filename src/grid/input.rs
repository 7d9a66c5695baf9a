//! Host input dispatch: keys, clicks and header clicks.

use super::Grid;
use crate::events::{GridEvent, InputEvent, Key, KeyInput, Modifiers};
use crate::navigation::Direction;
use crate::render::Surface;
use crate::types::SortColumn;

impl<S: Surface> Grid<S> {
    /// Route a host input to its handler. Returns whether the input was handled.
    pub fn handle_input(&mut self, input: InputEvent) -> bool {
        match input {
            InputEvent::Key(key) => self.handle_key_down(key),
            InputEvent::Click { x, y, modifiers } => self.handle_click(x, y, modifiers),
            InputEvent::DblClick { x, y } => self.handle_dbl_click(x, y),
            InputEvent::Wheel { row } => {
                self.handle_mouse_wheel(row);
                false
            }
            InputEvent::Scroll {
                scroll_top,
                scroll_left,
            } => {
                self.handle_scroll(scroll_top, scroll_left);
                false
            }
            InputEvent::HeaderClick {
                column_id,
                modifiers,
            } => self.handle_header_click(&column_id, modifiers),
        }
    }

    /// A key went down while the grid had focus. Returns `true` when the
    /// host should suppress the platform default.
    pub fn handle_key_down(&mut self, key: KeyInput) -> bool {
        let handled = self.with_input(InputEvent::Key(key), |grid| grid.dispatch_key(key));
        self.process_editor_requests();
        handled
    }

    fn editor_captures(&self, key: Key) -> bool {
        self.current_editor()
            .is_some_and(|editor| editor.borrow().captures_key(key))
    }

    fn dispatch_key(&mut self, input: KeyInput) -> bool {
        let args = self.trigger(GridEvent::KeyDown {
            row: self.active.map(|a| a.row),
            cell: self.active.map(|a| a.cell),
        });
        let mut handled = args.is_immediate_propagation_stopped();
        let m = input.modifiers;

        if !handled && !m.shift && !m.alt {
            if self.editor_captures(input.key) {
                return false;
            }
            match input.key {
                Key::Home => {
                    handled = if m.ctrl {
                        self.navigate_top()
                    } else {
                        self.navigate(Direction::Home)
                    };
                }
                Key::End => {
                    handled = if m.ctrl {
                        self.navigate_bottom()
                    } else {
                        self.navigate(Direction::End)
                    };
                }
                _ => {}
            }
        }
        if handled {
            return true;
        }

        if !m.shift && !m.alt && !m.ctrl {
            if self.editor_captures(input.key) {
                return false;
            }
            match input.key {
                Key::Escape => {
                    if !self.editor_lock.is_active_for(self.id) {
                        return false;
                    }
                    self.cancel_edit_and_set_focus();
                    handled = true;
                }
                Key::PageDown => {
                    self.navigate_page_down();
                    handled = true;
                }
                Key::PageUp => {
                    self.navigate_page_up();
                    handled = true;
                }
                Key::Left => handled = self.navigate(Direction::Left),
                Key::Right => handled = self.navigate(Direction::Right),
                Key::Up => handled = self.navigate(Direction::Up),
                Key::Down => handled = self.navigate(Direction::Down),
                Key::Tab => handled = self.navigate(Direction::Next),
                Key::Enter => {
                    if let Some(active) = self.active {
                        if self.is_cell_editable(active.cell) {
                            if self.session.is_editing() {
                                if active.row == self.data.len() {
                                    self.navigate(Direction::Down);
                                } else {
                                    self.commit_edit_and_set_focus();
                                }
                            } else if self.commit_current_edit() {
                                self.make_active_cell_editable(false);
                            }
                        }
                    }
                    handled = true;
                }
                _ => {}
            }
        } else if input.key == Key::Tab && m.shift && !m.ctrl && !m.alt {
            handled = self.navigate(Direction::Prev);
        }
        handled
    }

    /// A click at viewport coordinates.
    pub fn handle_click(&mut self, x: f64, y: f64, modifiers: Modifiers) -> bool {
        let input = InputEvent::Click { x, y, modifiers };
        let handled = self.with_input(input, |grid| {
            let canvas_x = x + grid.viewport.scroll_left;
            let canvas_y = y + grid.viewport.scroll_top;
            match grid.cell_from_point(canvas_x, canvas_y) {
                Some((row, cell)) => grid.click_cell(row, cell),
                None => false,
            }
        });
        self.process_editor_requests();
        handled
    }

    /// A click on a cell the host already hit-tested.
    pub fn handle_cell_click(&mut self, row: usize, cell: usize, modifiers: Modifiers) -> bool {
        let input = InputEvent::Click {
            x: self.bounds.left(cell).unwrap_or(0.0) - self.viewport.scroll_left,
            y: self.paging.row_top(row, self.options.row_height) - self.viewport.scroll_top,
            modifiers,
        };
        let handled = self.with_input(input, |grid| grid.click_cell(row, cell));
        self.process_editor_requests();
        handled
    }

    fn is_editing_cell(&self, row: usize, cell: usize) -> bool {
        self.session
            .current()
            .is_some_and(|e| e.row == row && e.cell == cell)
    }

    fn click_cell(&mut self, row: usize, cell: usize) -> bool {
        if row >= self.data_length_including_add_new() || cell >= self.columns.len() {
            return false;
        }
        if self.is_editing_cell(row, cell) {
            return false;
        }
        let args = self.trigger(GridEvent::Click { row, cell });
        if args.is_immediate_propagation_stopped() {
            return true;
        }

        let is_active = self.active.is_some_and(|a| a.row == row && a.cell == cell);
        if is_active || !self.can_cell_be_active(row, cell) {
            return false;
        }
        if self.editor_lock.is_active() && !self.editor_lock.is_active_for(self.id) {
            tracing::debug!(row, cell, "click ignored, another grid is editing");
            return false;
        }
        if !self.commit_current_edit() {
            return false;
        }
        self.scroll_row_into_view(row, false);
        let suppress = self.options.suppress_active_cell_change_on_edit
            && self.is_cell_editable(cell)
            && self.columns.get(cell).is_some_and(|c| c.editor.is_some());
        self.set_active_cell_internal(Some((row, cell)), None, false, suppress);
        true
    }

    /// A double click at viewport coordinates.
    pub fn handle_dbl_click(&mut self, x: f64, y: f64) -> bool {
        let input = InputEvent::DblClick { x, y };
        let handled = self.with_input(input, |grid| {
            let canvas_x = x + grid.viewport.scroll_left;
            let canvas_y = y + grid.viewport.scroll_top;
            match grid.cell_from_point(canvas_x, canvas_y) {
                Some((row, cell)) => grid.dbl_click_cell(row, cell),
                None => false,
            }
        });
        self.process_editor_requests();
        handled
    }

    pub fn handle_cell_dbl_click(&mut self, row: usize, cell: usize) -> bool {
        let input = InputEvent::DblClick {
            x: self.bounds.left(cell).unwrap_or(0.0) - self.viewport.scroll_left,
            y: self.paging.row_top(row, self.options.row_height) - self.viewport.scroll_top,
        };
        let handled = self.with_input(input, |grid| grid.dbl_click_cell(row, cell));
        self.process_editor_requests();
        handled
    }

    fn dbl_click_cell(&mut self, row: usize, cell: usize) -> bool {
        if row >= self.data_length_including_add_new() || cell >= self.columns.len() {
            return false;
        }
        if self.is_editing_cell(row, cell) {
            return false;
        }
        let args = self.trigger(GridEvent::DblClick { row, cell });
        if args.is_immediate_propagation_stopped() {
            return true;
        }
        if self.is_cell_editable(cell) {
            self.goto_cell(row, cell, true);
        }
        true
    }

    /// A click on a column header: updates the sort order of sortable columns.
    pub fn handle_header_click(&mut self, column_id: &str, modifiers: Modifiers) -> bool {
        let input = InputEvent::HeaderClick {
            column_id: column_id.to_string(),
            modifiers,
        };
        self.with_input(input, |grid| grid.header_click(column_id, modifiers))
    }

    fn header_click(&mut self, column_id: &str, modifiers: Modifiers) -> bool {
        let Some(column) = self
            .column_index(column_id)
            .and_then(|i| self.columns.get(i))
            .cloned()
        else {
            return false;
        };
        let args = self.trigger(GridEvent::HeaderClick {
            column_id: column.id.clone(),
        });
        if args.is_immediate_propagation_stopped() || !column.sortable {
            return false;
        }
        if !self.commit_current_edit() {
            return false;
        }

        let multi = self.options.multi_column_sort;
        let meta = modifiers.meta || modifiers.ctrl;
        let mut sort_columns = self.sort_columns.clone();
        let index = sort_columns.iter().position(|s| s.column_id == column.id);
        let toggled = index.and_then(|i| sort_columns.get_mut(i)).map(|s| {
            s.sort_asc = !s.sort_asc;
            s.clone()
        });
        let fresh = || SortColumn {
            column_id: column.id.clone(),
            sort_asc: column.default_sort_asc,
        };

        if self.options.tristate_multi_column_sort {
            let had = toggled.is_some();
            let mut current = Some(toggled.unwrap_or_else(fresh));
            // ascending again after descending: drop the column instead
            if had && current.as_ref().is_some_and(|s| s.sort_asc) {
                if let Some(i) = index {
                    sort_columns.remove(i);
                }
                current = None;
            }
            if !multi {
                sort_columns.clear();
            }
            if let Some(current) = current {
                if !had || !multi {
                    sort_columns.push(current);
                }
            }
        } else if meta && multi {
            if let Some(i) = index {
                sort_columns.remove(i);
            }
        } else {
            if (!modifiers.shift && !meta) || !multi {
                sort_columns.clear();
            }
            match toggled {
                None => sort_columns.push(fresh()),
                Some(existing) if sort_columns.is_empty() => sort_columns.push(existing),
                Some(_) => {}
            }
        }

        self.set_sort_columns(sort_columns);
        tracing::debug!(column = %column.id, sorts = self.sort_columns.len(), "sort changed");
        self.trigger(GridEvent::Sort {
            multi,
            sort_columns: self.sort_columns.clone(),
        });
        true
    }
}
