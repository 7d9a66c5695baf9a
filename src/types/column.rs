use serde::{Deserialize, Serialize};

/// Column definition.
///
/// Capabilities (`editor`, `formatter`, `async_post_render`, ...) are names
/// resolved through the [`CapabilityRegistry`](crate::registry::CapabilityRegistry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Column {
    pub id: String,
    pub name: String,
    /// Item property displayed and edited by this column
    pub field: String,
    /// Width in pixels. Zero or negative means "use the grid default".
    pub width: f64,
    pub min_width: f64,
    pub max_width: Option<f64>,
    pub resizable: bool,
    pub sortable: bool,
    pub focusable: bool,
    pub selectable: bool,
    pub default_sort_asc: bool,
    /// Hidden columns are dropped when columns are set
    pub visible: bool,
    /// Resizing this column invalidates every rendered row
    pub rerender_on_resize: bool,
    /// Editing this column on the pending-insert row is not allowed
    pub cannot_trigger_insert: bool,
    /// Overrides the grid-wide `editable` option
    pub editable: Option<bool>,
    pub css_class: Option<String>,
    pub header_css_class: Option<String>,
    pub tool_tip: Option<String>,
    pub editor: Option<String>,
    pub formatter: Option<String>,
    pub async_post_render: Option<String>,
    pub async_post_render_cleanup: Option<String>,
}

impl Default for Column {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            field: String::new(),
            width: 0.0,
            min_width: 30.0,
            max_width: None,
            resizable: true,
            sortable: false,
            focusable: true,
            selectable: true,
            default_sort_asc: true,
            visible: true,
            rerender_on_resize: false,
            cannot_trigger_insert: false,
            editable: None,
            css_class: None,
            header_css_class: None,
            tool_tip: None,
            editor: None,
            formatter: None,
            async_post_render: None,
            async_post_render_cleanup: None,
        }
    }
}

impl Column {
    /// Create a column whose id, name and field are all `id`.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            field: id.clone(),
            id,
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn with_min_width(mut self, min_width: f64) -> Self {
        self.min_width = min_width;
        self
    }

    pub fn with_max_width(mut self, max_width: f64) -> Self {
        self.max_width = Some(max_width);
        self
    }

    pub fn with_editor(mut self, editor: impl Into<String>) -> Self {
        self.editor = Some(editor.into());
        self
    }

    pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatter = Some(formatter.into());
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn focusable(mut self, focusable: bool) -> Self {
        self.focusable = focusable;
        self
    }

    pub fn selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    pub fn resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Fill in the default width and clamp it to the column's bounds.
    pub fn normalize(&mut self, default_width: f64) {
        if self.width <= 0.0 {
            self.width = default_width;
        }
        if self.width < self.min_width {
            self.width = self.min_width;
        }
        if let Some(max) = self.max_width {
            if self.width > max {
                self.width = max;
            }
        }
    }
}

/// One entry of the current sort order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortColumn {
    pub column_id: String,
    pub sort_asc: bool,
}
