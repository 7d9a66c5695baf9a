//! Tests for the in-place editing pipeline: opening editors, validation,
//! commit and cancel, edit commands and the shared editor lock.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::*;
use serde_json::{json, Value};
use vgrid::editor::{CommandDisposition, TextEditor, ValidationResult};
use vgrid::{
    CapabilityRegistry, CellBox, Column, EditCommand, EditState, Editor, EditorLock, EventKind,
    GridEvent, Item, Key, KeyInput, Modifiers,
};

// ============================================================================
// Opening and Closing Editors
// ============================================================================

#[test]
fn test_click_opens_editor_with_auto_edit() {
    let mut grid = editable_grid(10, json!({ "autoEdit": true }));
    assert!(grid.handle_cell_click(2, 1, Modifiers::default()));
    assert_eq!(grid.edit_state(), EditState::Editing);
    assert!(cell_has_class(&grid, 2, 1, "editable"));
    assert_eq!(cell_text(&grid, 2, 1), "");

    // The id column has no editor.
    assert!(grid.handle_cell_click(3, 0, Modifiers::default()));
    assert_eq!(grid.edit_state(), EditState::CellSelected);
    assert_eq!(cell_text(&grid, 2, 1), "Task 2");
    assert!(!cell_has_class(&grid, 2, 1, "editable"));
}

#[test]
fn test_double_click_forces_edit() {
    let mut grid = editable_grid(10, json!({}));
    assert!(grid.handle_cell_dbl_click(4, 2));
    assert_eq!(active(&grid), Some((4, 2)));
    assert!(grid.is_editing());
}

#[test]
fn test_enter_opens_then_commits_and_moves_down() {
    let mut grid = editable_grid(10, json!({ "autoEdit": true }));
    grid.handle_cell_click(1, 1, Modifiers::default());
    grid.set_editor_input("Renamed");
    assert!(grid.handle_key_down(KeyInput::plain(Key::Enter)));

    assert_eq!(grid.data().item(1).unwrap()["title"], json!("Renamed"));
    assert_eq!(cell_text(&grid, 1, 1), "Renamed");
    assert_eq!(active(&grid), Some((2, 1)));
    assert!(grid.is_editing());
}

#[test]
fn test_enter_and_escape_without_auto_edit() {
    let mut grid = editable_grid(10, json!({}));
    grid.set_active_cell(1, 1);
    assert!(!grid.is_editing());
    assert!(grid.handle_key_down(KeyInput::plain(Key::Enter)));
    assert!(grid.is_editing());
    assert!(grid.editor_lock().is_active());

    grid.set_editor_input("discarded");
    assert!(grid.handle_key_down(KeyInput::plain(Key::Escape)));
    assert!(!grid.is_editing());
    assert!(!grid.editor_lock().is_active());
    assert_eq!(grid.data().item(1).unwrap()["title"], json!("Task 1"));
    assert_eq!(cell_text(&grid, 1, 1), "Task 1");
}

#[test]
fn test_before_edit_cell_veto() {
    let mut grid = editable_grid(10, json!({}));
    grid.subscribe(EventKind::BeforeEditCell, |event, args| {
        if let GridEvent::BeforeEditCell { column_id, .. } = event {
            if column_id == "qty" {
                args.veto();
            }
        }
    });
    grid.set_active_cell(0, 2);
    assert!(!grid.make_active_cell_editable(false));
    assert!(!grid.editor_lock().is_active());

    grid.set_active_cell(0, 1);
    assert!(grid.make_active_cell_editable(false));
}

#[test]
fn test_column_editable_override() {
    let mut grid = builder(5)
        .columns(vec![
            Column::new("id"),
            Column::new("title").with_editor("text"),
        ])
        .build()
        .unwrap();
    // Grid-level editing is off.
    grid.set_active_cell(0, 1);
    assert!(!grid.make_active_cell_editable(false));

    let mut title = Column::new("title").with_editor("text");
    title.editable = Some(true);
    grid.set_columns(vec![Column::new("id"), title]).unwrap();
    grid.set_active_cell(0, 1);
    assert!(grid.make_active_cell_editable(false));
}

#[test]
fn test_async_editor_loading() {
    let mut grid = editable_grid(
        10,
        json!({ "asyncEditorLoading": true, "asyncEditorLoadDelay": 100.0 }),
    );
    assert!(grid.goto_cell(1, 1, true));
    assert!(!grid.is_editing());
    grid.advance_time(99.0);
    assert!(!grid.is_editing());
    grid.advance_time(1.0);
    assert!(grid.is_editing());
}

// ============================================================================
// Validation and Commit
// ============================================================================

#[test]
fn test_validation_error_is_reported() {
    let mut grid = editable_grid(10, json!({}));
    let errors = record(&mut grid, EventKind::ValidationError);
    grid.set_active_cell(3, 2);
    grid.make_active_cell_editable(false);
    grid.set_editor_input("twelve");

    assert!(!grid.commit_current_edit());
    assert!(grid.is_editing());
    assert!(cell_has_class(&grid, 3, 2, "invalid"));
    match errors.borrow().as_slice() {
        [GridEvent::ValidationError {
            row,
            cell,
            column_id,
            message,
            ..
        }] => {
            assert_eq!((*row, *cell), (3, 2));
            assert_eq!(column_id, "qty");
            assert_eq!(message.as_deref(), Some("Please enter a valid integer"));
        }
        other => panic!("unexpected events: {other:?}"),
    }

    grid.set_editor_input("12");
    assert!(grid.commit_current_edit());
    assert_eq!(grid.data().item(3).unwrap()["qty"], json!(12));
    assert!(!cell_has_class(&grid, 3, 2, "invalid"));
}

#[test]
fn test_unchanged_commit_leaves_data_alone() {
    let mut grid = editable_grid(10, json!({}));
    let changes = record(&mut grid, EventKind::CellChange);
    grid.set_active_cell(2, 1);
    assert!(grid.make_active_cell_editable(false));
    assert!(grid.commit_current_edit());

    assert_eq!(grid.edit_state(), EditState::CellSelected);
    assert_eq!(active(&grid), Some((2, 1)));
    assert!(changes.borrow().is_empty());
    assert_eq!(grid.data().item(2).unwrap()["title"], json!("Task 2"));
    assert_eq!(cell_text(&grid, 2, 1), "Task 2");
}

#[test]
fn test_moving_active_cell_refuses_invalid_edit() {
    let mut grid = editable_grid(10, json!({}));
    let errors = record(&mut grid, EventKind::ValidationError);
    grid.set_active_cell(3, 2);
    assert!(grid.make_active_cell_editable(false));
    grid.set_editor_input("abc");

    assert!(!grid.set_active_cell(5, 0));
    assert_eq!(active(&grid), Some((3, 2)));
    assert!(grid.is_editing());
    assert_eq!(errors.borrow().len(), 1);
    assert!(cell_has_class(&grid, 3, 2, "invalid"));
    assert_eq!(grid.data().item(3).unwrap()["qty"], json!(30));
}

#[test]
fn test_moving_active_cell_commits_dirty_edit() {
    let mut grid = editable_grid(10, json!({}));
    let changes = record(&mut grid, EventKind::CellChange);
    grid.set_active_cell(3, 1);
    assert!(grid.make_active_cell_editable(false));
    grid.set_editor_input("Changed");

    assert!(grid.set_active_cell(5, 0));
    assert_eq!(active(&grid), Some((5, 0)));
    assert!(!grid.is_editing());
    assert!(!grid.editor_lock().is_active());
    assert_eq!(grid.data().item(3).unwrap()["title"], json!("Changed"));
    assert_eq!(cell_text(&grid, 3, 1), "Changed");
    assert_eq!(changes.borrow().len(), 1);
}

#[test]
fn test_cell_change_carries_id_and_field() {
    let mut grid = editable_grid(10, json!({}));
    let changes = record(&mut grid, EventKind::CellChange);
    grid.set_active_cell(4, 2);
    grid.make_active_cell_editable(false);
    grid.set_editor_input("7");
    assert!(grid.commit_current_edit());

    let expected: Item = json!({ "id": 4, "qty": 7 }).as_object().cloned().unwrap();
    assert_eq!(
        changes.borrow().as_slice(),
        &[GridEvent::CellChange {
            row: 4,
            cell: 2,
            item: expected
        }]
    );
}

#[test]
fn test_edit_command_handler_and_undo() {
    let mut grid = editable_grid(10, json!({}));
    let commands: Rc<RefCell<Vec<EditCommand>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&commands);
    grid.set_edit_command_handler(move |_item: &Item, _column: &Column, command: &EditCommand| {
        sink.borrow_mut().push(command.clone());
        CommandDisposition::Execute
    });

    grid.set_active_cell(1, 2);
    grid.make_active_cell_editable(false);
    grid.set_editor_input("42");
    assert!(grid.commit_current_edit());
    assert_eq!(grid.data().item(1).unwrap()["qty"], json!(42));
    assert_eq!(commands.borrow().len(), 1);

    let command = commands.borrow()[0].clone();
    assert_eq!(command.prev_serialized_value, json!(10));
    grid.undo_edit_command(&command);
    assert_eq!(grid.data().item(1).unwrap()["qty"], json!(10));
    assert_eq!(cell_text(&grid, 1, 2), "10");
}

#[test]
fn test_deferred_edit_command() {
    let mut grid = editable_grid(10, json!({}));
    let held: Rc<RefCell<Option<EditCommand>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&held);
    grid.set_edit_command_handler(move |_item: &Item, _column: &Column, command: &EditCommand| {
        *sink.borrow_mut() = Some(command.clone());
        CommandDisposition::Deferred
    });

    grid.set_active_cell(2, 1);
    grid.make_active_cell_editable(false);
    grid.set_editor_input("Later");
    assert!(grid.commit_current_edit());
    assert_eq!(grid.data().item(2).unwrap()["title"], json!("Task 2"));

    let command = held.borrow_mut().take().unwrap();
    grid.execute_edit_command(&command);
    assert_eq!(grid.data().item(2).unwrap()["title"], json!("Later"));
    assert_eq!(cell_text(&grid, 2, 1), "Later");
}

#[test]
fn test_add_new_row() {
    let mut grid = editable_grid(3, json!({ "enableAddRow": true }));
    assert_eq!(grid.data_length_including_add_new(), 4);
    let node = grid.row_node(3).unwrap();
    assert!(grid.surface().row(node).unwrap().classes.contains("new-row"));

    let added = record(&mut grid, EventKind::AddNewRow);
    assert!(grid.set_active_cell(3, 1));
    assert!(grid.make_active_cell_editable(false));
    grid.set_editor_input("Fresh");
    assert!(grid.commit_current_edit());

    let expected: Item = json!({ "title": "Fresh" }).as_object().cloned().unwrap();
    assert_eq!(
        added.borrow().as_slice(),
        &[GridEvent::AddNewRow {
            column_id: "title".to_string(),
            item: expected
        }]
    );
    assert_eq!(grid.data().len(), 3);
}

// ============================================================================
// Custom Editors
// ============================================================================

/// Editor that keeps arrow keys for its caret and reports its visibility.
struct CaretEditor {
    field: String,
    text: String,
    visible: Rc<Cell<bool>>,
    last_box: Rc<Cell<CellBox>>,
}

impl Editor for CaretEditor {
    fn load_value(&mut self, item: &Item) {
        self.text = item
            .get(&self.field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
    }

    fn serialize_value(&self) -> Value {
        Value::String(self.text.clone())
    }

    fn apply_value(&self, item: &mut Item, state: &Value) {
        item.insert(self.field.clone(), state.clone());
    }

    fn is_value_changed(&self) -> bool {
        false
    }

    fn validate(&self) -> ValidationResult {
        ValidationResult::ok()
    }

    fn destroy(&mut self) {}

    fn position(&mut self, cell_box: &CellBox) {
        self.last_box.set(*cell_box);
    }

    fn show(&mut self) {
        self.visible.set(true);
    }

    fn hide(&mut self) {
        self.visible.set(false);
    }

    fn captures_key(&self, key: Key) -> bool {
        matches!(key, Key::Left | Key::Right)
    }
}

#[test]
fn test_custom_editor_captures_keys_and_follows_scroll() {
    let visible = Rc::new(Cell::new(false));
    let last_box = Rc::new(Cell::new(CellBox::default()));
    let mut registry = CapabilityRegistry::with_builtins();
    {
        let visible = Rc::clone(&visible);
        let last_box = Rc::clone(&last_box);
        registry.register_editor("caret", move |args| {
            Box::new(CaretEditor {
                field: args.column.field.clone(),
                text: String::new(),
                visible: Rc::clone(&visible),
                last_box: Rc::clone(&last_box),
            })
        });
    }
    let mut grid = builder(100)
        .columns(vec![Column::new("id"), Column::new("title").with_editor("caret")])
        .registry(registry)
        .option_overrides(json!({ "editable": true, "autoEdit": false }))
        .build()
        .unwrap();

    grid.set_active_cell(2, 1);
    assert!(grid.make_active_cell_editable(false));
    assert!(visible.get());
    assert_eq!(last_box.get().top, 50.0);

    assert!(!grid.handle_key_down(KeyInput::plain(Key::Left)));
    assert_eq!(active(&grid), Some((2, 1)));

    // Scrolling the active row out of view hides the editor.
    grid.handle_scroll(200.0, 0.0);
    assert!(!visible.get());
    assert_eq!(last_box.get().top, -150.0);
    grid.handle_scroll(0.0, 0.0);
    assert!(visible.get());
}

/// Text editor that counts how many instances are alive.
struct CountedEditor {
    inner: TextEditor,
    live: Rc<Cell<usize>>,
}

impl Editor for CountedEditor {
    fn load_value(&mut self, item: &Item) {
        self.inner.load_value(item);
    }

    fn serialize_value(&self) -> Value {
        self.inner.serialize_value()
    }

    fn apply_value(&self, item: &mut Item, state: &Value) {
        self.inner.apply_value(item, state);
    }

    fn is_value_changed(&self) -> bool {
        self.inner.is_value_changed()
    }

    fn validate(&self) -> ValidationResult {
        self.inner.validate()
    }

    fn destroy(&mut self) {
        self.inner.destroy();
        self.live.set(self.live.get() - 1);
    }

    fn set_input(&mut self, text: &str) {
        self.inner.set_input(text);
    }

    fn input(&self) -> Option<String> {
        self.inner.input()
    }
}

#[test]
fn test_at_most_one_editor_is_alive() {
    let live = Rc::new(Cell::new(0_usize));
    let peak = Rc::new(Cell::new(0_usize));
    let mut registry = CapabilityRegistry::with_builtins();
    {
        let live = Rc::clone(&live);
        let peak = Rc::clone(&peak);
        registry.register_editor("counted", move |args| {
            live.set(live.get() + 1);
            peak.set(peak.get().max(live.get()));
            Box::new(CountedEditor {
                inner: TextEditor::new(args),
                live: Rc::clone(&live),
            })
        });
    }
    let mut grid = builder(20)
        .columns(vec![
            Column::new("id"),
            Column::new("title").with_editor("counted"),
            Column::new("qty").with_editor("counted"),
        ])
        .registry(registry)
        .option_overrides(json!({ "editable": true, "autoEdit": true }))
        .build()
        .unwrap();

    let enter = KeyInput::plain(Key::Enter);
    let check = |grid: &vgrid::Grid<vgrid::RecordingSurface>| {
        assert!(live.get() <= 1, "{} editors alive", live.get());
        assert_eq!(live.get(), usize::from(grid.is_editing()));
    };

    grid.handle_cell_click(1, 1, Modifiers::default());
    check(&grid);
    grid.handle_cell_dbl_click(2, 2);
    check(&grid);
    grid.set_editor_input("Edited");
    grid.handle_key_down(enter);
    check(&grid);
    grid.handle_key_down(enter);
    check(&grid);
    grid.handle_cell_click(6, 1, Modifiers::default());
    check(&grid);
    grid.handle_cell_dbl_click(6, 2);
    check(&grid);
    grid.handle_cell_click(7, 0, Modifiers::default());
    check(&grid);
    grid.handle_key_down(KeyInput::plain(Key::Escape));
    check(&grid);
    grid.handle_cell_dbl_click(8, 1);
    assert!(grid.make_active_cell_editable(false));
    check(&grid);

    assert_eq!(peak.get(), 1);
}

// ============================================================================
// Shared Editor Lock
// ============================================================================

#[test]
fn test_editor_lock_is_shared_between_grids() {
    let lock = EditorLock::new();
    let overrides = json!({ "editable": true, "autoEdit": false });
    let mut first = builder(10)
        .option_overrides(overrides.clone())
        .editor_lock(lock.clone())
        .build()
        .unwrap();
    let mut second = builder(10)
        .option_overrides(overrides)
        .editor_lock(lock.clone())
        .build()
        .unwrap();

    first.set_active_cell(0, 1);
    assert!(first.make_active_cell_editable(false));
    assert!(lock.is_active_for(first.id()));

    second.set_active_cell(0, 1);
    assert!(!second.make_active_cell_editable(false));
    // Clicks elsewhere in the second grid are ignored while the first edits.
    assert!(!second.handle_cell_click(3, 1, Modifiers::default()));
    assert_eq!(active(&second), Some((0, 1)));
    // Escape belongs to the grid holding the lock.
    assert!(!second.handle_key_down(KeyInput::plain(Key::Escape)));
    assert!(first.is_editing());

    assert!(first.commit_current_edit());
    assert!(!lock.is_active());
    assert!(second.make_active_cell_editable(false));
    assert!(lock.is_active_for(second.id()));
}
