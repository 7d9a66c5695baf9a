//! Column layout tests
//!
//! Column boundaries, header-drag resizing, force-fit autosizing and the
//! horizontal render window.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use common::*;
use proptest::prelude::*;
use serde_json::json;
use vgrid::layout::{resize_column, ColumnBounds, ResizeMode};
use vgrid::scheduler::TimerKind;
use vgrid::{Column, EventKind, GridBuilder, GridError, RecordingSurface, VecDataSource};

fn total_width(grid: &vgrid::Grid<RecordingSurface>) -> f64 {
    grid.columns().iter().map(|c| c.width).sum()
}

fn wide_grid(columns: usize) -> vgrid::Grid<RecordingSurface> {
    GridBuilder::new(RecordingSurface::new())
        .columns(
            (0..columns)
                .map(|i| Column::new(format!("c{i}")).with_width(100.0))
                .collect(),
        )
        .data(VecDataSource::new(items(15)))
        .size(WIDTH, HEIGHT)
        .build()
        .unwrap()
}

// ============================================================================
// Column Widths
// ============================================================================

#[test]
fn test_default_widths_and_edges() {
    let grid = grid(5);
    let widths: Vec<f64> = grid.columns().iter().map(|c| c.width).collect();
    assert_eq!(widths, vec![80.0, 120.0, 80.0]);
    assert_eq!(
        grid.surface().column_edges,
        vec![(0.0, 80.0), (80.0, 200.0), (200.0, 280.0)]
    );
    assert_eq!(grid.headers_width(), 280.0_f64.max(WIDTH) + 1000.0);
}

#[test]
fn test_resize_column_moves_edges_and_notifies() {
    let mut grid = grid(5);
    let resized = record(&mut grid, EventKind::ColumnsResized);
    assert_eq!(grid.resize_column(1, 30.0), 30.0);
    assert_eq!(grid.columns()[1].width, 150.0);
    assert_eq!(grid.surface().column_edges[2], (230.0, 310.0));
    assert_eq!(resized.borrow().len(), 1);
    assert_eq!(grid.cell_from_point(240.0, 10.0), Some((0, 2)));
}

#[test]
fn test_resize_column_respects_minimum() {
    let mut grid = grid(5);
    let resized = record(&mut grid, EventKind::ColumnsResized);
    // Column 0 can give up 50px, column 1 another 90px.
    assert_eq!(grid.resize_column(1, -500.0), -140.0);
    assert_eq!(grid.columns()[0].width, 30.0);
    assert_eq!(grid.columns()[1].width, 30.0);

    // Nothing left to give: no change, no notification
    resized.borrow_mut().clear();
    assert_eq!(grid.resize_column(1, -10.0), 0.0);
    assert!(resized.borrow().is_empty());
}

#[test]
fn test_resize_with_rerender_flag_repaints_rows() {
    let mut columns = columns();
    columns[2].rerender_on_resize = true;
    let mut grid = builder(5).columns(columns).build().unwrap();
    let node = grid.row_node(0).unwrap();
    grid.resize_column(2, 20.0);
    assert_ne!(grid.row_node(0), Some(node));
    assert_eq!(cell_text(&grid, 0, 1), "Task 0");
}

#[test]
fn test_force_fit_fills_viewport() {
    let grid = builder(5)
        .option_overrides(json!({ "forceFitColumns": true }))
        .build()
        .unwrap();
    let total = total_width(&grid);
    assert!(total <= WIDTH, "total {total}");
    assert!(total >= WIDTH - 10.0, "total {total}");
}

#[test]
fn test_force_fit_resize_keeps_total() {
    let mut grid = builder(5)
        .option_overrides(json!({ "forceFitColumns": true }))
        .build()
        .unwrap();
    let before = total_width(&grid);
    grid.resize_column(0, 25.0);
    assert!((total_width(&grid) - before).abs() < 1e-9);
}

#[test]
fn test_force_fit_respects_max_width() {
    let mut columns = columns();
    columns[0].max_width = Some(90.0);
    let grid = builder(5)
        .columns(columns)
        .option_overrides(json!({ "forceFitColumns": true }))
        .build()
        .unwrap();
    assert_eq!(grid.columns()[0].width, 90.0);
}

// ============================================================================
// Viewport Size
// ============================================================================

#[test]
fn test_invalid_container_is_rejected() {
    let result = GridBuilder::new(RecordingSurface::new())
        .columns(columns())
        .size(0.0, HEIGHT)
        .build();
    assert!(matches!(result, Err(GridError::InvalidContainer { .. })));

    let mut grid = grid(5);
    assert!(grid.resize_viewport(WIDTH, f64::NAN).is_err());
    assert!(grid.resize_viewport(-1.0, HEIGHT).is_err());
    assert_eq!(grid.viewport().height, HEIGHT);
}

#[test]
fn test_taller_viewport_renders_more_rows() {
    let mut grid = grid(100);
    grid.resize_viewport(WIDTH, 500.0).unwrap();
    assert_eq!(grid.visible_range().bottom, 21);
    assert!(grid.render_cache().contains(24));
    assert!(!grid.render_cache().contains(25));
}

#[test]
fn test_auto_height_sizes_viewport_to_rows() {
    let grid = builder(6)
        .option_overrides(json!({ "autoHeight": true }))
        .build()
        .unwrap();
    assert_eq!(grid.viewport().height, 150.0);
    assert!(!grid.viewport().has_v_scroll);
    assert_rows_cached(&grid, 0, 5);
}

// ============================================================================
// Horizontal Window
// ============================================================================

#[test]
fn test_wide_grid_renders_horizontal_window() {
    let grid = wide_grid(40);
    let cells = grid.surface().row_cells(0);
    assert_eq!(cells.first(), Some(&0));
    assert!(cells.contains(&7));
    assert!(!cells.contains(&20));
}

#[test]
fn test_horizontal_jump_swaps_cells() {
    let mut grid = wide_grid(40);
    let rows_before = grid.surface().stats().rows_created;
    grid.handle_scroll(0.0, 2000.0);
    assert!(grid.scheduler().is_pending(TimerKind::Render));
    grid.advance_time(50.0);

    let cells = grid.surface().row_cells(3);
    assert!(!cells.contains(&0));
    assert!(!cells.contains(&14));
    for cell in 16..=27 {
        assert!(cells.contains(&cell), "cell {cell} missing");
    }
    assert!(!cells.contains(&30));
    // Rows are kept; only cells change.
    assert_eq!(grid.surface().stats().rows_created, rows_before);
}

#[test]
fn test_scroll_column_into_view() {
    let mut grid = wide_grid(40);
    grid.scroll_column_into_view(10);
    assert_eq!(grid.viewport().scroll_left, 1100.0 - WIDTH);
    assert!(grid.surface().row_cells(0).contains(&10));
    grid.scroll_column_into_view(2);
    assert_eq!(grid.viewport().scroll_left, 200.0);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_column_at_x_lies_within_bounds(
        widths in prop::collection::vec(1.0_f64..300.0, 1..30),
        fraction in 0.0_f64..1.0,
    ) {
        let columns: Vec<Column> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| Column::new(format!("c{i}")).with_width(*w))
            .collect();
        let bounds = ColumnBounds::compute(&columns);
        let x = bounds.total_width() * fraction;
        let cell = bounds.column_at_x(x).unwrap();
        prop_assert!(bounds.left(cell).unwrap() <= x);
        prop_assert!(x < bounds.right(cell).unwrap());
    }

    #[test]
    fn prop_fit_resize_preserves_total(
        widths in prop::collection::vec(30_u32..300, 2..10),
        index in 0_usize..9,
        delta in -500_i32..500,
    ) {
        let mut columns: Vec<Column> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| Column::new(format!("c{i}")).with_width(f64::from(*w)))
            .collect();
        let index = index % columns.len();
        let before: f64 = columns.iter().map(|c| c.width).sum();
        resize_column(&mut columns, index, f64::from(delta), ResizeMode::FitToContainer, 0.0);
        let after: f64 = columns.iter().map(|c| c.width).sum();
        prop_assert!((after - before).abs() < 1e-6);
        prop_assert!(columns.iter().all(|c| c.width >= c.min_width - 1e-9));
    }
}
