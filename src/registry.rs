//! Named capabilities: formatters, editors and post-render hooks.
//!
//! Columns and row metadata refer to capabilities by name. Names are checked
//! when columns are installed, so an unknown name is a configuration error up
//! front rather than a silent miss later.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde_json::Value;

use crate::editor::{Editor, EditorArgs, IntegerEditor, TextEditor};
use crate::error::{GridError, Result};
use crate::render::{NodeId, Surface};
use crate::types::{Column, Item};

pub struct FormatArgs<'a> {
    pub row: usize,
    pub cell: usize,
    pub value: Option<&'a Value>,
    pub column: &'a Column,
    pub item: Option<&'a Item>,
}

/// Formatter output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formatted {
    Text(String),
    Decorated {
        text: String,
        add_classes: Option<String>,
        remove_classes: Option<String>,
    },
}

impl Formatted {
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Decorated { text, .. } => text,
        }
    }

    pub fn add_classes(&self) -> Option<&str> {
        match self {
            Self::Decorated { add_classes, .. } => add_classes.as_deref(),
            Self::Text(_) => None,
        }
    }

    pub fn remove_classes(&self) -> Option<&str> {
        match self {
            Self::Decorated { remove_classes, .. } => remove_classes.as_deref(),
            Self::Text(_) => None,
        }
    }
}

pub struct PostRenderArgs<'a> {
    pub node: NodeId,
    pub row: usize,
    pub item: &'a Item,
    pub column: &'a Column,
    /// The cell was processed before and has been invalidated since
    pub rerender: bool,
}

pub type Formatter = Rc<dyn Fn(&FormatArgs<'_>) -> Formatted>;
pub type EditorFactory = Rc<dyn Fn(&EditorArgs<'_>) -> Box<dyn Editor>>;
pub type PostRenderHook = Rc<dyn Fn(&mut dyn Surface, &PostRenderArgs<'_>)>;
pub type PostRenderCleanupHook = Rc<dyn Fn(&mut dyn Surface, NodeId, usize, &Column)>;

/// Escape a value for display, rendering `null` and missing values as empty text.
pub fn escape_value(value: Option<&Value>) -> String {
    let raw = match value {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    formatters: HashMap<String, Formatter>,
    editors: HashMap<String, EditorFactory>,
    post_renders: HashMap<String, PostRenderHook>,
    cleanups: HashMap<String, PostRenderCleanupHook>,
}

impl CapabilityRegistry {
    /// An empty registry. Most callers want [`CapabilityRegistry::with_builtins`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `default` formatter and the `text` and `integer` editors.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_formatter("default", |args| Formatted::Text(escape_value(args.value)));
        registry.register_editor("text", |args| Box::new(TextEditor::new(args)));
        registry.register_editor("integer", |args| Box::new(IntegerEditor::new(args)));
        registry
    }

    pub fn register_formatter(
        &mut self,
        name: impl Into<String>,
        formatter: impl Fn(&FormatArgs<'_>) -> Formatted + 'static,
    ) {
        self.formatters.insert(name.into(), Rc::new(formatter));
    }

    pub fn register_editor(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(&EditorArgs<'_>) -> Box<dyn Editor> + 'static,
    ) {
        self.editors.insert(name.into(), Rc::new(factory));
    }

    pub fn register_post_render(
        &mut self,
        name: impl Into<String>,
        hook: impl Fn(&mut dyn Surface, &PostRenderArgs<'_>) + 'static,
    ) {
        self.post_renders.insert(name.into(), Rc::new(hook));
    }

    pub fn register_post_render_cleanup(
        &mut self,
        name: impl Into<String>,
        hook: impl Fn(&mut dyn Surface, NodeId, usize, &Column) + 'static,
    ) {
        self.cleanups.insert(name.into(), Rc::new(hook));
    }

    pub fn formatter(&self, name: &str) -> Option<Formatter> {
        self.formatters.get(name).cloned()
    }

    pub fn editor(&self, name: &str) -> Option<EditorFactory> {
        self.editors.get(name).cloned()
    }

    pub fn post_render(&self, name: &str) -> Option<PostRenderHook> {
        self.post_renders.get(name).cloned()
    }

    pub fn post_render_cleanup(&self, name: &str) -> Option<PostRenderCleanupHook> {
        self.cleanups.get(name).cloned()
    }

    /// Check that every capability the columns name is registered and that ids are unique.
    pub fn validate_columns(&self, columns: &[Column], default_formatter: &str) -> Result<()> {
        if !self.formatters.contains_key(default_formatter) {
            return Err(GridError::MissingCapability {
                kind: "formatter",
                name: default_formatter.to_string(),
                column: String::new(),
            });
        }
        let mut ids = HashSet::new();
        for column in columns {
            if !ids.insert(column.id.as_str()) {
                return Err(GridError::DuplicateColumn(column.id.clone()));
            }
            let checks: [(&'static str, Option<&String>, fn(&Self, &str) -> bool); 4] = [
                ("formatter", column.formatter.as_ref(), |r, n| {
                    r.formatters.contains_key(n)
                }),
                ("editor", column.editor.as_ref(), |r, n| r.editors.contains_key(n)),
                ("asyncPostRender", column.async_post_render.as_ref(), |r, n| {
                    r.post_renders.contains_key(n)
                }),
                (
                    "asyncPostRenderCleanup",
                    column.async_post_render_cleanup.as_ref(),
                    |r, n| r.cleanups.contains_key(n),
                ),
            ];
            for (kind, name, known) in checks {
                match name {
                    Some(name) if !known(self, name) => {
                        return Err(GridError::MissingCapability {
                            kind,
                            name: name.clone(),
                            column: column.id.clone(),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut formatters: Vec<&String> = self.formatters.keys().collect();
        formatters.sort();
        let mut editors: Vec<&String> = self.editors.keys().collect();
        editors.sort();
        f.debug_struct("CapabilityRegistry")
            .field("formatters", &formatters)
            .field("editors", &editors)
            .field("post_renders", &self.post_renders.len())
            .field("cleanups", &self.cleanups.len())
            .finish()
    }
}
