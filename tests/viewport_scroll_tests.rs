//! Viewport and scroll tests
//!
//! Tests for the rendered window, synchronous versus deferred rendering and
//! virtual paging past the platform height ceiling.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic,
    clippy::cast_precision_loss
)]

mod common;

use common::*;
use proptest::prelude::*;
use vgrid::layout::Paging;
use vgrid::scheduler::TimerKind;
use vgrid::{EventKind, GeneratedDataSource, GridBuilder, GridEvent, RecordingSurface};

const CEILING: f64 = 1_000_000.0;

// ============================================================================
// Rendered Window
// ============================================================================

#[test]
fn test_initial_render_covers_viewport_and_buffer() {
    let grid = grid(100);
    let visible = grid.visible_range();
    assert_eq!((visible.top, visible.bottom), (0, 11));
    // min_row_buffer rows below the viewport
    assert_rows_cached(&grid, 0, 14);
    assert_eq!(cell_text(&grid, 3, 1), "Task 3");
}

#[test]
fn test_short_grid_renders_every_row() {
    let grid = grid(4);
    assert_rows_cached(&grid, 0, 3);
    assert!(!grid.viewport().has_v_scroll);
}

#[test]
fn test_small_scroll_renders_synchronously() {
    let mut grid = grid(100);
    grid.handle_scroll(100.0, 0.0);
    // Travelling forward buffers a full viewport ahead and min_row_buffer behind.
    assert_rows_cached(&grid, 1, 25);
    assert!(!grid.scheduler().is_pending(TimerKind::Render));
}

#[test]
fn test_scroll_below_threshold_skips_render() {
    let mut grid = grid(100);
    let rendered = record(&mut grid, EventKind::Rendered);
    grid.handle_scroll(10.0, 0.0);
    assert!(rendered.borrow().is_empty());
    assert_rows_cached(&grid, 0, 14);
}

#[test]
fn test_large_jump_defers_render() {
    let mut grid = grid(1000);
    grid.handle_scroll(1000.0, 0.0);
    assert!(grid.scheduler().is_pending(TimerKind::Render));
    assert_rows_cached(&grid, 0, 14);

    grid.advance_time(49.0);
    assert!(grid.scheduler().is_pending(TimerKind::Render));
    grid.advance_time(1.0);
    assert!(!grid.scheduler().is_pending(TimerKind::Render));
    assert_rows_cached(&grid, 37, 61);
}

#[test]
fn test_force_sync_scrolling_renders_jumps_immediately() {
    let mut grid = builder(1000)
        .option_overrides(serde_json::json!({ "forceSyncScrolling": true }))
        .build()
        .unwrap();
    grid.handle_scroll(5000.0, 0.0);
    assert!(!grid.scheduler().is_pending(TimerKind::Render));
    assert!(grid.render_cache().contains(200));
}

#[test]
fn test_scroll_notifications() {
    let mut grid = grid(100);
    let scrolls = record(&mut grid, EventKind::Scroll);
    let changes = record(&mut grid, EventKind::ViewportChanged);
    grid.handle_scroll(75.0, 0.0);
    assert_eq!(
        scrolls.borrow().as_slice(),
        &[GridEvent::Scroll {
            scroll_top: 75.0,
            scroll_left: 0.0
        }]
    );
    assert!(!changes.borrow().is_empty());
}

#[test]
fn test_scroll_row_into_view_from_below() {
    let mut grid = grid(100);
    grid.scroll_row_into_view(40, false);
    // Row 40 ends at the viewport bottom.
    assert_eq!(grid.viewport().scroll_top, 41.0 * 25.0 - 250.0);
    assert!(grid.render_cache().contains(40));
    assert_eq!(grid.surface().scroll.0, grid.viewport().scroll_top);
}

#[test]
fn test_scroll_row_into_view_with_paging_lands_on_top() {
    let mut grid = grid(100);
    grid.scroll_row_into_view(40, true);
    assert_eq!(grid.viewport().scroll_top, 1000.0);
}

#[test]
fn test_scroll_past_end_is_clamped() {
    let mut grid = grid(100);
    grid.scroll_to(1_000_000.0);
    assert_eq!(grid.viewport().scroll_top, 100.0 * 25.0 - 250.0);
}

#[test]
fn test_row_count_shrink_clamps_scroll() {
    let mut grid = grid(100);
    grid.scroll_row_to_top(80);
    grid.set_data(Box::new(vgrid::VecDataSource::new(items(20))), false);
    assert_eq!(grid.viewport().scroll_top, 20.0 * 25.0 - 250.0);
    assert!(cached_rows(&grid).iter().all(|r| *r < 20));
}

// ============================================================================
// Virtual Paging
// ============================================================================

#[test]
fn test_huge_grid_is_paged() {
    let grid = huge_grid(100_000_000);
    let paging = grid.paging();
    assert!(paging.is_paged());
    assert_eq!(paging.real_height, CEILING);
    assert_eq!(paging.virtual_height, 2_500_000_000.0);
    assert_eq!(grid.surface().canvas_size.1, CEILING);
}

#[test]
fn test_jump_to_bottom_of_huge_grid() {
    let mut grid = huge_grid(100_000_000);
    let bottom = grid.paging().real_height - HEIGHT;
    grid.handle_scroll(bottom, 0.0);
    grid.run_pending_timers();

    let last = 99_999_999;
    assert!(grid.render_cache().contains(last));
    assert_eq!(grid.surface().visible_rows().last(), Some(&last));
    assert_eq!(grid.paging().page, grid.paging().page_count - 1);

    // Every painted row sits inside the real scroll extent.
    for row in cached_rows(&grid) {
        let node = grid.row_node(row).unwrap();
        let top = grid.surface().row(node).unwrap().top;
        assert!((-25.0..=CEILING).contains(&top), "row {row} at {top}");
    }
}

#[test]
fn test_small_scrolls_inside_a_page_keep_offset() {
    let mut grid = huge_grid(100_000_000);
    grid.handle_scroll(500_000.0, 0.0);
    grid.run_pending_timers();
    let offset = grid.paging().offset;
    grid.handle_scroll(500_100.0, 0.0);
    assert_eq!(grid.paging().offset, offset);
    let top = grid.visible_range().top as f64;
    assert!(((500_100.0 + offset) / 25.0 - top).abs() < 1.0);
}

proptest! {
    #[test]
    fn prop_scroll_to_preserves_logical_position(
        rows in 40_001_usize..400_000_000,
        fraction in 0.0_f64..1.0,
    ) {
        let mut paging = Paging::default();
        paging.recompute(rows as f64 * 25.0, CEILING);
        let y = paging.max_scroll(HEIGHT) * fraction;
        let target = paging.scroll_to(y, HEIGHT, 0.0);
        prop_assert!((target.scroll_top + paging.offset - y).abs() < 1e-3);
        prop_assert!(target.scroll_top >= -0.5);
        prop_assert!(target.scroll_top <= paging.real_height);
    }

    #[test]
    fn prop_rendered_range_covers_visible_range(
        rows in 1_usize..200_000,
        height in 50.0_f64..1000.0,
        stops in prop::collection::vec(0.0_f64..1.0, 1..8),
    ) {
        let mut grid = GridBuilder::new(RecordingSurface::new())
            .columns(columns())
            .data(GeneratedDataSource::new(rows, item))
            .size(WIDTH, height)
            .build()
            .unwrap();
        for stop in stops {
            let max_top = (grid.paging().real_height - grid.viewport().height).max(0.0);
            grid.handle_scroll(max_top * stop, 0.0);
            grid.run_pending_timers();
            // Moves under the sync threshold leave rendering to the host.
            grid.render();

            let visible = grid.visible_range();
            let rendered = grid.rendered_range();
            prop_assert!(rendered.top <= visible.top);
            prop_assert!(rendered.bottom >= visible.bottom);
            prop_assert!(rendered.bottom < rows);
            prop_assert!(visible.top <= visible.bottom);
            for row in cached_rows(&grid) {
                prop_assert!(rendered.contains_row(row), "row {} outside {:?}", row, rendered);
            }
        }
    }

    #[test]
    fn prop_unpaged_offset_is_zero(rows in 0_usize..39_000, fraction in 0.0_f64..1.0) {
        let mut paging = Paging::default();
        paging.recompute(rows as f64 * 25.0, CEILING);
        let y = paging.max_scroll(HEIGHT) * fraction;
        let target = paging.scroll_to(y, HEIGHT, 0.0);
        prop_assert_eq!(paging.offset, 0.0);
        prop_assert_eq!(target.scroll_top, y);
    }
}
