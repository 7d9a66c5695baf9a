//! The active cell, the editor lifecycle and keyboard navigation.

use std::rc::Rc;

use super::Grid;
use crate::editor::{
    CommandDisposition, EditCommand, EditState, EditorArgs, EditorRequest, SharedEditor,
};
use crate::events::GridEvent;
use crate::navigation::{self, CellRules, Direction};
use crate::registry::EditorFactory;
use crate::render::Surface;
use crate::scheduler::TimerKind;
use crate::types::{CellPosition, Column, Item};

impl<S: Surface> Grid<S> {
    pub(super) fn cell_rules(&self) -> CellRules<'_> {
        CellRules {
            columns: &self.columns,
            data: self.data.as_ref(),
            row_count: self.data_length_including_add_new(),
            enable_cell_navigation: self.options.enable_cell_navigation,
        }
    }

    pub fn can_cell_be_active(&self, row: usize, cell: usize) -> bool {
        self.cell_rules().can_cell_be_active(row, cell)
    }

    pub fn can_cell_be_selected(&self, row: usize, cell: usize) -> bool {
        self.cell_rules().can_cell_be_selected(row, cell)
    }

    pub fn colspan(&self, row: usize, cell: usize) -> usize {
        self.cell_rules().colspan(row, cell)
    }

    pub fn active_cell(&self) -> Option<CellPosition> {
        self.active
    }

    pub fn edit_state(&self) -> EditState {
        if self.session.is_editing() {
            EditState::Editing
        } else if self.active.is_some() {
            EditState::CellSelected
        } else {
            EditState::Normal
        }
    }

    pub fn is_editing(&self) -> bool {
        self.session.is_editing()
    }

    pub fn current_editor(&self) -> Option<SharedEditor> {
        self.session.current().map(|e| Rc::clone(&e.editor))
    }

    /// Type into the live editor. Returns `false` when nothing is being edited.
    pub fn set_editor_input(&mut self, text: &str) -> bool {
        match self.current_editor() {
            Some(editor) => {
                editor.borrow_mut().set_input(text);
                true
            }
            None => false,
        }
    }

    fn is_column_editable(&self, column: &Column) -> bool {
        column.editable.unwrap_or(self.options.editable)
    }

    pub(super) fn is_cell_editable(&self, cell: usize) -> bool {
        self.columns
            .get(cell)
            .is_some_and(|c| self.is_column_editable(c))
    }

    /// Metadata override by column id, then by index, then the column's editor.
    fn resolve_editor(&self, row: usize, cell: usize) -> Option<EditorFactory> {
        let column = self.columns.get(cell)?;
        let metadata = self.data.metadata(row);
        let name = metadata
            .and_then(|m| m.by_column_id(&column.id))
            .and_then(|o| o.editor.as_deref())
            .or_else(|| {
                metadata
                    .and_then(|m| m.by_column_index(cell))
                    .and_then(|o| o.editor.as_deref())
            })
            .or(column.editor.as_deref())?;
        self.registry.editor(name)
    }

    fn is_cell_potentially_editable(&self, row: usize, cell: usize) -> bool {
        let len = self.data.len();
        if row < len && self.data.item(row).is_none() {
            return false;
        }
        let Some(column) = self.columns.get(cell) else {
            return false;
        };
        if column.cannot_trigger_insert && row >= len {
            return false;
        }
        self.resolve_editor(row, cell).is_some()
    }

    pub fn reset_active_cell(&mut self) {
        self.set_active_cell_internal(None, None, false, false);
    }

    /// Make `(row, cell)` the active cell without opening an editor.
    ///
    /// A live edit is committed first; if it fails validation the active
    /// cell stays where it is and `false` is returned.
    pub fn set_active_cell(&mut self, row: usize, cell: usize) -> bool {
        if row > self.data.len() || cell >= self.columns.len() {
            return false;
        }
        if !self.options.enable_cell_navigation {
            return false;
        }
        if !self.commit_current_edit() {
            tracing::warn!(row, cell, "activation refused, current edit is invalid");
            return false;
        }
        self.scroll_cell_into_view(row, cell, false);
        self.set_active_cell_internal(Some((row, cell)), Some(false), false, false);
        true
    }

    /// Commit, scroll to and activate a cell, optionally forcing edit mode.
    pub fn goto_cell(&mut self, row: usize, cell: usize, force_edit: bool) -> bool {
        if !self.can_cell_be_active(row, cell) {
            return false;
        }
        if !self.commit_current_edit() {
            return false;
        }
        self.scroll_cell_into_view(row, cell, false);
        let edit = force_edit || row == self.data.len() || self.options.auto_edit;
        self.set_active_cell_internal(Some((row, cell)), Some(edit), false, false);
        true
    }

    fn mark_active(&mut self, pos: CellPosition, on: bool) {
        let cell_node = self.cache.cell_node(pos.row, pos.cell, &self.surface);
        let row_node = self.cache.row_node(pos.row);
        for node in [cell_node, row_node].into_iter().flatten() {
            if on {
                self.surface.add_class(node, "active");
            } else {
                self.surface.remove_class(node, "active");
            }
        }
    }

    pub(super) fn set_active_cell_internal(
        &mut self,
        target: Option<(usize, usize)>,
        edit_mode: Option<bool>,
        pre_click: bool,
        suppress_event: bool,
    ) {
        self.scheduler.cancel(TimerKind::EditorLoader);
        if let Some(previous) = self.active {
            self.make_active_cell_normal();
            self.mark_active(previous, false);
        }

        self.active = target.map(|(row, cell)| CellPosition {
            row,
            cell,
            pos_x: cell,
        });

        if let Some(active) = self.active {
            let edit_mode = edit_mode
                .unwrap_or_else(|| active.row == self.data.len() || self.options.auto_edit);
            if self.options.show_cell_selection {
                self.mark_active(active, true);
            }
            if self.is_cell_editable(active.cell)
                && edit_mode
                && self.is_cell_potentially_editable(active.row, active.cell)
            {
                if self.options.async_editor_loading {
                    self.pending_pre_click = pre_click;
                    self.scheduler
                        .schedule(TimerKind::EditorLoader, self.options.async_editor_load_delay);
                } else {
                    self.make_active_cell_editable(pre_click);
                }
            }
        }

        self.notify_selection_model();
        if !suppress_event {
            self.trigger(GridEvent::ActiveCellChanged {
                row: target.map(|t| t.0),
                cell: target.map(|t| t.1),
            });
        }
    }

    fn notify_selection_model(&mut self) {
        let column_count = self.columns.len();
        let active = self.active;
        let Some(model) = self.selection_model.as_mut() else {
            return;
        };
        if let Some(ranges) = model.on_active_cell_changed(active, column_count) {
            self.handle_selected_ranges_changed(&ranges);
        }
    }

    /// Open an editor on the active cell. Returns whether one is now live.
    pub fn make_active_cell_editable(&mut self, pre_click: bool) -> bool {
        let Some(active) = self.active else {
            return false;
        };
        let (row, cell) = (active.row, active.cell);
        if !self.is_cell_editable(cell) {
            tracing::warn!(row, cell, "cell is not editable");
            return false;
        }
        self.scheduler.cancel(TimerKind::EditorLoader);
        if !self.is_cell_potentially_editable(row, cell) {
            return false;
        }
        let Some(factory) = self.resolve_editor(row, cell) else {
            return false;
        };
        if self.session.is_editing() {
            self.make_active_cell_normal();
        }
        let column_id = self
            .columns
            .get(cell)
            .map(|c| c.id.clone())
            .unwrap_or_default();
        let args = self.trigger(GridEvent::BeforeEditCell {
            row,
            cell,
            column_id,
        });
        if args.is_vetoed() || args.is_default_prevented() {
            tracing::debug!(row, cell, "edit vetoed");
            return false;
        }
        if !self.editor_lock.activate(self.id) {
            tracing::warn!(row, cell, grid = self.id, "editor lock is held elsewhere");
            return false;
        }

        if let Some(node) = self.cache.cell_node(row, cell, &self.surface) {
            self.surface.add_class(node, "editable");
            self.surface.set_cell_content(node, "");
        }

        let cell_box = self.active_cell_position().unwrap_or_default();
        let grid_box = self.grid_position();
        let handle = self.session.handle();
        let Some(column) = self.columns.get(cell) else {
            self.editor_lock.deactivate(self.id);
            return false;
        };
        let empty = Item::new();
        let item = self.data.item(row);
        let mut editor = factory(&EditorArgs {
            row,
            cell,
            column,
            item: item.unwrap_or(&empty),
            grid_box,
            cell_box,
            handle,
        });
        if let Some(item) = item {
            editor.load_value(item);
        }
        if pre_click {
            editor.pre_click();
        }
        let serialized = editor.serialize_value();
        self.session.begin(editor, row, cell, serialized);
        tracing::debug!(row, cell, "editor opened");

        self.handle_active_cell_position_change();
        true
    }

    /// Destroy the live editor and repaint its cell.
    pub(super) fn make_active_cell_normal(&mut self) {
        let Some(current) = self.session.current() else {
            return;
        };
        let (row, cell) = (current.row, current.cell);
        self.trigger(GridEvent::BeforeCellEditorDestroy { row, cell });
        self.session.end();

        if let Some(node) = self.cache.cell_node(row, cell, &self.surface) {
            self.surface.remove_class(node, "editable");
            self.surface.remove_class(node, "invalid");
            if self.data.item(row).is_some() {
                let formatted = self.painter().format(row, cell);
                self.apply_formatted(node, formatted.as_ref());
            }
            self.invalidate_post_processing_results(row);
        }
        self.editor_lock.deactivate(self.id);
        tracing::debug!(row, cell, "editor closed");
    }

    pub(super) fn handle_active_cell_position_change(&mut self) {
        if self.active.is_none() {
            return;
        }
        self.trigger(GridEvent::ActiveCellPositionChanged);
        let Some(editor) = self.current_editor() else {
            return;
        };
        let Some(cell_box) = self.active_cell_position() else {
            return;
        };
        let mut editor = editor.borrow_mut();
        if cell_box.visible {
            editor.show();
        } else {
            editor.hide();
        }
        editor.position(&cell_box);
    }

    /// Commit the live edit.
    ///
    /// Returns `true` when nothing is left in edit, `false` when validation
    /// failed and the editor stays open.
    pub fn commit_current_edit(&mut self) -> bool {
        let Some(current) = self.session.current() else {
            return true;
        };
        let editor = Rc::clone(&current.editor);
        let (row, cell) = (current.row, current.cell);
        let prev_serialized = current.serialized.clone();

        if !editor.borrow().is_value_changed() {
            self.make_active_cell_normal();
            return true;
        }
        let Some(column) = self.columns.get(cell).cloned() else {
            self.make_active_cell_normal();
            return true;
        };

        let validation = editor.borrow().validate();
        if !validation.valid {
            if let Some(node) = self.cache.cell_node(row, cell, &self.surface) {
                self.surface.add_class(node, "invalid");
            }
            tracing::warn!(row, cell, message = ?validation.message, "edit failed validation");
            let cell_box = self.active_cell_position().unwrap_or_default();
            self.trigger(GridEvent::ValidationError {
                row,
                cell,
                column_id: column.id.clone(),
                message: validation.message,
                cell_box,
            });
            editor.borrow_mut().focus();
            return false;
        }

        let serialized = editor.borrow().serialize_value();
        if row < self.data.len() {
            let command = EditCommand {
                row,
                cell,
                editor: Rc::clone(&editor),
                serialized_value: serialized,
                prev_serialized_value: prev_serialized,
            };
            if let Some(mut handler) = self.command_handler.take() {
                self.make_active_cell_normal();
                let item = self.data.item(row).cloned().unwrap_or_default();
                let disposition = handler.handle(&item, &column, &command);
                self.command_handler = Some(handler);
                if disposition == CommandDisposition::Execute {
                    self.execute_edit_command(&command);
                }
            } else {
                self.execute_edit_command(&command);
                self.make_active_cell_normal();
            }
            let mut changed = Item::new();
            if let Some(item) = self.data.item(row) {
                if let Some(id) = item.get("id") {
                    changed.insert("id".to_string(), id.clone());
                }
                if let Some(value) = item.get(&column.field) {
                    changed.insert(column.field.clone(), value.clone());
                }
            }
            self.trigger(GridEvent::CellChange {
                row,
                cell,
                item: changed,
            });
        } else {
            let mut item = Item::new();
            editor.borrow().apply_value(&mut item, &serialized);
            self.make_active_cell_normal();
            self.trigger(GridEvent::AddNewRow {
                column_id: column.id,
                item,
            });
        }
        !self.editor_lock.is_active_for(self.id)
    }

    /// Apply an edit command to its item and repaint the row.
    pub fn execute_edit_command(&mut self, command: &EditCommand) {
        let Some(item) = self.data.item_mut(command.row) else {
            tracing::warn!(row = command.row, "edit command targets a missing item");
            return;
        };
        command.execute(item);
        self.update_row(command.row);
    }

    /// Revert an edit command previously executed.
    pub fn undo_edit_command(&mut self, command: &EditCommand) {
        let Some(item) = self.data.item_mut(command.row) else {
            return;
        };
        command.undo(item);
        self.update_row(command.row);
    }

    pub fn cancel_current_edit(&mut self) -> bool {
        self.make_active_cell_normal();
        true
    }

    pub(super) fn commit_edit_and_set_focus(&mut self) {
        if self.commit_current_edit() && self.options.auto_edit {
            self.navigate(Direction::Down);
        }
    }

    pub(super) fn cancel_edit_and_set_focus(&mut self) {
        self.cancel_current_edit();
    }

    /// Act on commit or cancel requests raised by the live editor.
    pub fn process_editor_requests(&mut self) {
        while let Some(request) = self.session.next_request() {
            match request {
                EditorRequest::Commit => self.commit_edit_and_set_focus(),
                EditorRequest::Cancel => self.cancel_edit_and_set_focus(),
            }
        }
    }

    /// Move the active cell one step in `direction`.
    ///
    /// Returns `true` when the cell moved, or when a failed commit kept it in place.
    pub fn navigate(&mut self, direction: Direction) -> bool {
        if !self.options.enable_cell_navigation {
            return false;
        }
        if self.active.is_none() && !direction.starts_without_active_cell() {
            return false;
        }
        if !self.commit_current_edit() {
            return true;
        }
        let target = navigation::step(&self.cell_rules(), direction, self.active);
        match target {
            Some(pos) => {
                let is_insert_row = pos.row == self.data.len();
                self.scroll_cell_into_view(
                    pos.row,
                    pos.cell,
                    !is_insert_row && self.options.emulate_paging_when_scrolling,
                );
                self.set_active_cell_internal(Some((pos.row, pos.cell)), None, false, false);
                if let Some(active) = &mut self.active {
                    active.pos_x = pos.pos_x;
                }
                true
            }
            None => {
                if let Some(active) = self.active {
                    self.set_active_cell_internal(
                        Some((active.row, active.cell)),
                        None,
                        false,
                        false,
                    );
                }
                false
            }
        }
    }
}
