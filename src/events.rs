//! Grid notifications and host input events.
//!
//! Subscribers register for one [`EventKind`] and receive the [`GridEvent`]
//! payload together with mutable [`EventArgs`]. Delivery is synchronous and in
//! subscription order; a subscriber can stop immediate propagation (marking
//! the event handled), prevent the default action, or veto it.

use serde::Serialize;

use crate::render::CssHash;
use crate::types::{CellBox, Item, SortColumn, ViewRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Tab,
    Enter,
    Escape,
    Home,
    End,
    PageUp,
    PageDown,
    Char(char),
    Other(u32),
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Self {
        match key {
            "ArrowLeft" | "Left" => Self::Left,
            "ArrowRight" | "Right" => Self::Right,
            "ArrowUp" | "Up" => Self::Up,
            "ArrowDown" | "Down" => Self::Down,
            "Tab" => Self::Tab,
            "Enter" => Self::Enter,
            "Escape" | "Esc" => Self::Escape,
            "Home" => Self::Home,
            "End" => Self::End,
            "PageUp" => Self::PageUp,
            "PageDown" => Self::PageDown,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => Self::Other(0),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn none(&self) -> bool {
        !(self.shift || self.ctrl || self.alt || self.meta)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyInput {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    pub fn shift(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                shift: true,
                ..Modifiers::default()
            },
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        }
    }
}

/// The host input that caused a notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InputEvent {
    Key(KeyInput),
    Click { x: f64, y: f64, modifiers: Modifiers },
    DblClick { x: f64, y: f64 },
    Wheel { row: Option<usize> },
    Scroll { scroll_top: f64, scroll_left: f64 },
    HeaderClick { column_id: String, modifiers: Modifiers },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GridEvent {
    Scroll {
        scroll_top: f64,
        scroll_left: f64,
    },
    ViewportChanged,
    Sort {
        multi: bool,
        sort_columns: Vec<SortColumn>,
    },
    HeaderClick {
        column_id: String,
    },
    ColumnsResized,
    ColumnsReordered,
    Click {
        row: usize,
        cell: usize,
    },
    DblClick {
        row: usize,
        cell: usize,
    },
    KeyDown {
        row: Option<usize>,
        cell: Option<usize>,
    },
    ActiveCellChanged {
        row: Option<usize>,
        cell: Option<usize>,
    },
    ActiveCellPositionChanged,
    BeforeEditCell {
        row: usize,
        cell: usize,
        column_id: String,
    },
    BeforeCellEditorDestroy {
        row: usize,
        cell: usize,
    },
    ValidationError {
        row: usize,
        cell: usize,
        column_id: String,
        message: Option<String>,
        cell_box: CellBox,
    },
    CellChange {
        row: usize,
        cell: usize,
        item: Item,
    },
    AddNewRow {
        column_id: String,
        item: Item,
    },
    SelectedRowsChanged {
        rows: Vec<usize>,
    },
    CellCssStylesChanged {
        key: String,
        hash: Option<CssHash>,
    },
    RowsRendered {
        rows: Vec<usize>,
    },
    Rendered {
        range: ViewRange,
    },
    /// The viewport or canvas was resized
    CanvasResized {
        width: f64,
        height: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Scroll,
    ViewportChanged,
    Sort,
    HeaderClick,
    ColumnsResized,
    ColumnsReordered,
    Click,
    DblClick,
    KeyDown,
    ActiveCellChanged,
    ActiveCellPositionChanged,
    BeforeEditCell,
    BeforeCellEditorDestroy,
    ValidationError,
    CellChange,
    AddNewRow,
    SelectedRowsChanged,
    CellCssStylesChanged,
    RowsRendered,
    Rendered,
    CanvasResized,
}

impl GridEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Scroll { .. } => EventKind::Scroll,
            Self::ViewportChanged => EventKind::ViewportChanged,
            Self::Sort { .. } => EventKind::Sort,
            Self::HeaderClick { .. } => EventKind::HeaderClick,
            Self::ColumnsResized => EventKind::ColumnsResized,
            Self::ColumnsReordered => EventKind::ColumnsReordered,
            Self::Click { .. } => EventKind::Click,
            Self::DblClick { .. } => EventKind::DblClick,
            Self::KeyDown { .. } => EventKind::KeyDown,
            Self::ActiveCellChanged { .. } => EventKind::ActiveCellChanged,
            Self::ActiveCellPositionChanged => EventKind::ActiveCellPositionChanged,
            Self::BeforeEditCell { .. } => EventKind::BeforeEditCell,
            Self::BeforeCellEditorDestroy { .. } => EventKind::BeforeCellEditorDestroy,
            Self::ValidationError { .. } => EventKind::ValidationError,
            Self::CellChange { .. } => EventKind::CellChange,
            Self::AddNewRow { .. } => EventKind::AddNewRow,
            Self::SelectedRowsChanged { .. } => EventKind::SelectedRowsChanged,
            Self::CellCssStylesChanged { .. } => EventKind::CellCssStylesChanged,
            Self::RowsRendered { .. } => EventKind::RowsRendered,
            Self::Rendered { .. } => EventKind::Rendered,
            Self::CanvasResized { .. } => EventKind::CanvasResized,
        }
    }
}

/// Per-delivery state shared by the subscribers of one notification.
#[derive(Debug, Clone, Default)]
pub struct EventArgs {
    input: Option<InputEvent>,
    propagation_stopped: bool,
    default_prevented: bool,
    vetoed: bool,
}

impl EventArgs {
    pub fn new(input: Option<InputEvent>) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }

    pub fn input(&self) -> Option<&InputEvent> {
        self.input.as_ref()
    }

    /// Mark the event handled; later subscribers are skipped.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Refuse the action announced by a `Before*` notification.
    pub fn veto(&mut self) {
        self.vetoed = true;
    }

    pub fn is_vetoed(&self) -> bool {
        self.vetoed
    }
}

pub type SubscriptionId = u64;

type Handler = Box<dyn FnMut(&GridEvent, &mut EventArgs)>;

#[derive(Default)]
pub struct EventBus {
    next_id: SubscriptionId,
    handlers: Vec<(SubscriptionId, EventKind, Handler)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&GridEvent, &mut EventArgs) + 'static,
    ) -> SubscriptionId {
        self.next_id += 1;
        self.handlers.push((self.next_id, kind, Box::new(handler)));
        self.next_id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sid, _, _)| *sid != id);
        before != self.handlers.len()
    }

    pub fn has_subscribers(&self, kind: EventKind) -> bool {
        self.handlers.iter().any(|(_, k, _)| *k == kind)
    }

    /// Deliver `event` to its subscribers and return the resulting args.
    pub fn notify(&mut self, event: &GridEvent, mut args: EventArgs) -> EventArgs {
        let kind = event.kind();
        for (_, k, handler) in &mut self.handlers {
            if *k != kind {
                continue;
            }
            handler(event, &mut args);
            if args.is_immediate_propagation_stopped() {
                break;
            }
        }
        args
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}
