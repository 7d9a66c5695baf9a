//! Cell editing: the editor capability, the editor lock and the edit session.
//!
//! A grid owns at most one live editor at a time. The session holds it
//! together with the value it serialized when it was created, so a commit can
//! tell whether anything changed and build an undoable [`EditCommand`].
//! Editors talk back to the grid through an [`EditorHandle`], which queues
//! commit/cancel requests that the grid drains after each call.

mod builtin;
mod command;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

use crate::events::Key;
use crate::types::{CellBox, Column, Item};

pub use builtin::{IntegerEditor, TextEditor};
pub use command::{CommandDisposition, EditCommand, EditCommandHandler};

/// Result of [`Editor::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }
}

/// An in-place cell editor.
pub trait Editor {
    /// Initialize from the row's item.
    fn load_value(&mut self, item: &Item);

    /// Current editor state, in the form `apply_value` accepts.
    fn serialize_value(&self) -> Value;

    /// Write a serialized state into an item.
    fn apply_value(&self, item: &mut Item, state: &Value);

    fn is_value_changed(&self) -> bool;

    fn validate(&self) -> ValidationResult;

    /// Release whatever the editor created. Called exactly once.
    fn destroy(&mut self);

    fn focus(&mut self) {}

    /// The cell moved (scrolling, resize).
    fn position(&mut self, _cell_box: &CellBox) {}

    fn show(&mut self) {}

    fn hide(&mut self) {}

    /// The editor was opened by a click and may want the click itself.
    fn pre_click(&mut self) {}

    /// Keys the editor handles itself instead of letting the grid navigate.
    fn captures_key(&self, _key: Key) -> bool {
        false
    }

    /// Replace the text the user has typed so far.
    fn set_input(&mut self, _text: &str) {}

    fn input(&self) -> Option<String> {
        None
    }
}

pub type SharedEditor = Rc<RefCell<Box<dyn Editor>>>;

/// Request an editor makes of its grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorRequest {
    Commit,
    Cancel,
}

/// Lets an editor ask its grid to commit or cancel the current edit.
#[derive(Debug, Clone, Default)]
pub struct EditorHandle {
    requests: Rc<RefCell<VecDeque<EditorRequest>>>,
}

impl EditorHandle {
    pub fn commit_changes(&self) {
        self.requests.borrow_mut().push_back(EditorRequest::Commit);
    }

    pub fn cancel_changes(&self) {
        self.requests.borrow_mut().push_back(EditorRequest::Cancel);
    }

    fn take(&self) -> Option<EditorRequest> {
        self.requests.borrow_mut().pop_front()
    }

    fn clear(&self) {
        self.requests.borrow_mut().clear();
    }
}

/// Everything an editor factory receives.
pub struct EditorArgs<'a> {
    pub row: usize,
    pub cell: usize,
    pub column: &'a Column,
    /// The row's item, or an empty item on the pending-insert row
    pub item: &'a Item,
    pub grid_box: CellBox,
    pub cell_box: CellBox,
    pub handle: EditorHandle,
}

/// Mutual exclusion for editing, shareable between grids.
///
/// At most one grid holds the lock; while it is held, other grids refuse to
/// start editing or move their active cell by click.
#[derive(Debug, Clone, Default)]
pub struct EditorLock {
    owner: Rc<Cell<Option<u64>>>,
}

impl EditorLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.owner.get().is_some()
    }

    pub fn is_active_for(&self, owner: u64) -> bool {
        self.owner.get() == Some(owner)
    }

    /// Take the lock. Fails if another owner holds it.
    pub fn activate(&self, owner: u64) -> bool {
        match self.owner.get() {
            Some(current) if current != owner => false,
            _ => {
                self.owner.set(Some(owner));
                true
            }
        }
    }

    pub fn deactivate(&self, owner: u64) {
        if self.owner.get() == Some(owner) {
            self.owner.set(None);
        }
    }
}

/// Observable editing state of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    /// No active cell
    Normal,
    /// An active cell, no editor
    CellSelected,
    Editing,
}

/// The live editor and what it was created with.
pub(crate) struct ActiveEditor {
    pub editor: SharedEditor,
    pub row: usize,
    pub cell: usize,
    pub serialized: Value,
}

/// Owns the single live editor of a grid.
pub(crate) struct EditSession {
    current: Option<ActiveEditor>,
    handle: EditorHandle,
}

impl EditSession {
    pub fn new() -> Self {
        Self {
            current: None,
            handle: EditorHandle::default(),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&ActiveEditor> {
        self.current.as_ref()
    }

    /// A fresh handle for an editor about to be created; stale requests are dropped.
    pub fn handle(&self) -> EditorHandle {
        self.handle.clear();
        self.handle.clone()
    }

    /// Install a newly created editor. Any previous editor is destroyed first.
    pub fn begin(&mut self, editor: Box<dyn Editor>, row: usize, cell: usize, serialized: Value) {
        if let Some(previous) = self.current.take() {
            tracing::warn!(row = previous.row, cell = previous.cell, "replacing a live editor");
            previous.editor.borrow_mut().destroy();
        }
        self.current = Some(ActiveEditor {
            editor: Rc::new(RefCell::new(editor)),
            row,
            cell,
            serialized,
        });
    }

    /// Destroy and drop the live editor.
    pub fn end(&mut self) -> Option<ActiveEditor> {
        let current = self.current.take()?;
        current.editor.borrow_mut().destroy();
        self.handle.clear();
        Some(current)
    }

    pub fn next_request(&self) -> Option<EditorRequest> {
        self.handle.take()
    }
}
