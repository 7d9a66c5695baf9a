//! Common test utilities and assertion helpers.
//!
//! Builds headless grids over a [`RecordingSurface`] and inspects what the
//! grid materialized on it.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};
use vgrid::{
    Column, EventKind, GeneratedDataSource, Grid, GridBuilder, GridEvent, Item, RecordingSurface,
    VecDataSource,
};

/// Viewport used by most tests: 10 rows of 25px, plenty of width.
pub const WIDTH: f64 = 400.0;
pub const HEIGHT: f64 = 250.0;

// ============================================================================
// Data
// ============================================================================

/// Item with `id`, `title` and `qty` fields.
#[must_use]
pub fn item(id: usize) -> Item {
    json!({ "id": id, "title": format!("Task {id}"), "qty": id * 10 })
        .as_object()
        .cloned()
        .expect("object literal")
}

#[must_use]
pub fn items(count: usize) -> Vec<Item> {
    (0..count).map(item).collect()
}

/// `id` (read only), `title` (text editor) and `qty` (integer editor).
#[must_use]
pub fn columns() -> Vec<Column> {
    vec![
        Column::new("id"),
        Column::new("title").with_editor("text").with_width(120.0),
        Column::new("qty").with_editor("integer"),
    ]
}

// ============================================================================
// Grid Builders
// ============================================================================

#[must_use]
pub fn builder(rows: usize) -> GridBuilder<RecordingSurface> {
    GridBuilder::new(RecordingSurface::new())
        .columns(columns())
        .data(VecDataSource::new(items(rows)))
        .size(WIDTH, HEIGHT)
}

#[must_use]
pub fn grid(rows: usize) -> Grid<RecordingSurface> {
    builder(rows).build().expect("grid should build")
}

/// Grid with editing on and auto-edit off, so activation never opens an editor.
#[must_use]
pub fn editable_grid(rows: usize, extra: Value) -> Grid<RecordingSurface> {
    let mut overrides = json!({ "editable": true, "autoEdit": false });
    if let (Some(base), Some(extra)) = (overrides.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }
    builder(rows)
        .option_overrides(overrides)
        .build()
        .expect("grid should build")
}

/// Grid over a generated source too large to hold in memory.
#[must_use]
pub fn huge_grid(rows: usize) -> Grid<RecordingSurface> {
    GridBuilder::new(RecordingSurface::new())
        .columns(columns())
        .data(GeneratedDataSource::new(rows, item))
        .size(WIDTH, HEIGHT)
        .build()
        .expect("grid should build")
}

// ============================================================================
// Events
// ============================================================================

/// Records every notification of `kind`.
pub fn record(grid: &mut Grid<RecordingSurface>, kind: EventKind) -> Rc<RefCell<Vec<GridEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    grid.subscribe(kind, move |event, _| sink.borrow_mut().push(event.clone()));
    log
}

// ============================================================================
// Assertions
// ============================================================================

/// Rows currently held in the render cache.
#[must_use]
pub fn cached_rows(grid: &Grid<RecordingSurface>) -> Vec<usize> {
    grid.render_cache().rows()
}

pub fn assert_rows_cached(grid: &Grid<RecordingSurface>, from: usize, to: usize) {
    let expected: Vec<usize> = (from..=to).collect();
    assert_eq!(cached_rows(grid), expected, "cached rows");
}

#[must_use]
pub fn cell_text(grid: &Grid<RecordingSurface>, row: usize, cell: usize) -> String {
    grid.surface()
        .find_cell(row, cell)
        .unwrap_or_else(|| panic!("cell ({row}, {cell}) is not rendered"))
        .text
        .clone()
}

#[must_use]
pub fn cell_has_class(grid: &Grid<RecordingSurface>, row: usize, cell: usize, class: &str) -> bool {
    grid.surface()
        .find_cell(row, cell)
        .is_some_and(|c| c.classes.contains(class))
}

#[must_use]
pub fn active(grid: &Grid<RecordingSurface>) -> Option<(usize, usize)> {
    grid.active_cell().map(|a| (a.row, a.cell))
}
