use std::rc::Rc;

use serde_json::Value;

use super::SharedEditor;
use crate::types::{Column, Item};

/// An applied (or about to be applied) cell edit that can be undone.
#[derive(Clone)]
pub struct EditCommand {
    pub row: usize,
    pub cell: usize,
    pub editor: SharedEditor,
    pub serialized_value: Value,
    pub prev_serialized_value: Value,
}

impl EditCommand {
    pub fn execute(&self, item: &mut Item) {
        self.editor
            .borrow()
            .apply_value(item, &self.serialized_value);
    }

    pub fn undo(&self, item: &mut Item) {
        self.editor
            .borrow()
            .apply_value(item, &self.prev_serialized_value);
    }
}

impl std::fmt::Debug for EditCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditCommand")
            .field("row", &self.row)
            .field("cell", &self.cell)
            .field("serialized_value", &self.serialized_value)
            .field("prev_serialized_value", &self.prev_serialized_value)
            .field("editor_refs", &Rc::strong_count(&self.editor))
            .finish()
    }
}

/// What the grid should do with a command after the handler saw it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandDisposition {
    /// Apply it to the data now
    Execute,
    /// The handler kept it and will run it through `Grid::execute_edit_command` later
    Deferred,
}

/// Intercepts committed edits, e.g. to record an undo stack.
pub trait EditCommandHandler {
    fn handle(&mut self, item: &Item, column: &Column, command: &EditCommand) -> CommandDisposition;
}

impl<F> EditCommandHandler for F
where
    F: FnMut(&Item, &Column, &EditCommand) -> CommandDisposition,
{
    fn handle(&mut self, item: &Item, column: &Column, command: &EditCommand) -> CommandDisposition {
        self(item, column, command)
    }
}
