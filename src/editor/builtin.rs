//! Built-in editors: free text and integers.

use serde_json::Value;

use super::{Editor, EditorArgs, EditorHandle, ValidationResult};
use crate::types::Item;

fn value_as_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Single-line text editor.
#[derive(Debug, Clone)]
pub struct TextEditor {
    field: String,
    text: String,
    default_value: Option<String>,
    focused: bool,
    destroyed: bool,
    handle: EditorHandle,
}

impl TextEditor {
    pub fn new(args: &EditorArgs<'_>) -> Self {
        Self {
            field: args.column.field.clone(),
            text: String::new(),
            default_value: None,
            focused: true,
            destroyed: false,
            handle: args.handle.clone(),
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Ask the grid to commit, as pressing Enter inside the input would.
    pub fn request_commit(&self) {
        self.handle.commit_changes();
    }

    pub fn request_cancel(&self) {
        self.handle.cancel_changes();
    }
}

impl Editor for TextEditor {
    fn load_value(&mut self, item: &Item) {
        self.default_value = value_as_text(item.get(&self.field));
        self.text = self.default_value.clone().unwrap_or_default();
    }

    fn serialize_value(&self) -> Value {
        Value::String(self.text.clone())
    }

    fn apply_value(&self, item: &mut Item, state: &Value) {
        item.insert(self.field.clone(), state.clone());
    }

    fn is_value_changed(&self) -> bool {
        match &self.default_value {
            None => !self.text.is_empty(),
            Some(default) => *default != self.text,
        }
    }

    fn validate(&self) -> ValidationResult {
        ValidationResult::ok()
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.focused = false;
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn set_input(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn input(&self) -> Option<String> {
        Some(self.text.clone())
    }
}

/// Integer editor; rejects anything that does not parse as an `i64`.
#[derive(Debug, Clone)]
pub struct IntegerEditor {
    inner: TextEditor,
}

impl IntegerEditor {
    pub fn new(args: &EditorArgs<'_>) -> Self {
        Self {
            inner: TextEditor::new(args),
        }
    }
}

impl Editor for IntegerEditor {
    fn load_value(&mut self, item: &Item) {
        self.inner.load_value(item);
    }

    fn serialize_value(&self) -> Value {
        self.inner
            .text
            .trim()
            .parse::<i64>()
            .map_or(Value::from(0), Value::from)
    }

    fn apply_value(&self, item: &mut Item, state: &Value) {
        self.inner.apply_value(item, state);
    }

    fn is_value_changed(&self) -> bool {
        self.inner.is_value_changed()
    }

    fn validate(&self) -> ValidationResult {
        let text = self.inner.text.trim();
        if text.is_empty() || text.parse::<i64>().is_ok() {
            ValidationResult::ok()
        } else {
            ValidationResult::invalid("Please enter a valid integer")
        }
    }

    fn destroy(&mut self) {
        self.inner.destroy();
    }

    fn focus(&mut self) {
        self.inner.focus();
    }

    fn set_input(&mut self, text: &str) {
        self.inner.set_input(text);
    }

    fn input(&self) -> Option<String> {
        self.inner.input()
    }
}
