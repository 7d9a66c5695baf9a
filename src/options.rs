//! Grid options.
//!
//! Options are immutable once built. [`GridOptions::merged`] layers a JSON
//! object of overrides on top of an existing set, which is how both the
//! initial configuration and `Grid::set_options` produce a new value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridOptions {
    pub row_height: f64,
    pub default_column_width: f64,
    /// Show a pending-insert row after the last data row
    pub enable_add_row: bool,
    pub leave_space_for_new_rows: bool,
    pub editable: bool,
    /// Enter edit mode as soon as an editable cell becomes active
    pub auto_edit: bool,
    pub enable_cell_navigation: bool,
    pub enable_column_reorder: bool,
    pub async_editor_loading: bool,
    pub async_editor_load_delay: f64,
    pub force_fit_columns: bool,
    pub enable_async_post_render: bool,
    pub async_post_render_delay: f64,
    pub enable_async_post_render_cleanup: bool,
    pub async_post_render_cleanup_delay: f64,
    /// Grow the viewport to fit every row instead of scrolling
    pub auto_height: bool,
    pub multi_column_sort: bool,
    pub tristate_multi_column_sort: bool,
    pub selected_cell_css_class: String,
    pub add_new_row_css_class: String,
    pub show_cell_selection: bool,
    pub min_row_buffer: usize,
    pub emulate_paging_when_scrolling: bool,
    pub force_sync_scrolling: bool,
    /// Rows span the whole viewport width even when columns are narrower
    pub full_width_rows: bool,
    pub suppress_active_cell_change_on_edit: bool,
    pub always_show_vertical_scroll: bool,
    /// Formatter used when neither the row nor the column names one
    pub default_formatter: String,
    pub absolute_column_min_width: f64,
    /// Hide, rather than destroy, the row under the mouse wheel when it scrolls out
    pub retain_momentum_row: bool,
    /// Delay of the coalesced render after a large scroll jump
    pub render_delay: f64,
    /// Scroll distance (px) since the last render that triggers a re-render
    pub sync_render_threshold: f64,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            row_height: 25.0,
            default_column_width: 80.0,
            enable_add_row: false,
            leave_space_for_new_rows: false,
            editable: false,
            auto_edit: true,
            enable_cell_navigation: true,
            enable_column_reorder: true,
            async_editor_loading: false,
            async_editor_load_delay: 100.0,
            force_fit_columns: false,
            enable_async_post_render: false,
            async_post_render_delay: 50.0,
            enable_async_post_render_cleanup: false,
            async_post_render_cleanup_delay: 40.0,
            auto_height: false,
            multi_column_sort: false,
            tristate_multi_column_sort: false,
            selected_cell_css_class: "selected".to_string(),
            add_new_row_css_class: "new-row".to_string(),
            show_cell_selection: true,
            min_row_buffer: 3,
            emulate_paging_when_scrolling: true,
            force_sync_scrolling: false,
            full_width_rows: false,
            suppress_active_cell_change_on_edit: false,
            always_show_vertical_scroll: false,
            default_formatter: "default".to_string(),
            absolute_column_min_width: 0.0,
            retain_momentum_row: true,
            render_delay: 50.0,
            sync_render_threshold: 20.0,
        }
    }
}

impl GridOptions {
    /// Build options from a JSON object of overrides on top of the defaults.
    pub fn from_json(overrides: &Value) -> Result<Self> {
        Self::default().merged(overrides)
    }

    /// Return a new set of options with `overrides` merged over `self`.
    ///
    /// Nested objects merge key by key; any other value replaces the old one.
    pub fn merged(&self, overrides: &Value) -> Result<Self> {
        let mut base = serde_json::to_value(self)?;
        merge_json(&mut base, overrides);
        let mut options: Self = serde_json::from_value(base)?;
        options.enforce();
        Ok(options)
    }

    fn enforce(&mut self) {
        if self.auto_height {
            self.leave_space_for_new_rows = false;
        }
        if !self.row_height.is_finite() || self.row_height <= 0.0 {
            tracing::warn!(row_height = self.row_height, "invalid row height, using 25");
            self.row_height = 25.0;
        }
    }
}

fn merge_json(base: &mut Value, overrides: &Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overrides) => *base = overrides.clone(),
    }
}
