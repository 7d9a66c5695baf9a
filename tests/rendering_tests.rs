//! Rendering tests
//!
//! Formatter resolution, in-place updates, style overlays and the
//! asynchronous post-render pipeline, observed through a recording surface.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use common::*;
use serde_json::json;
use vgrid::render::CssHash;
use vgrid::scheduler::TimerKind;
use vgrid::{
    CapabilityRegistry, Column, ColumnOverride, EventKind, Formatted, GridBuilder, GridEvent,
    RecordingSurface, RowMetadata, VecDataSource,
};

fn hash(row: usize, column: &str, class: &str) -> CssHash {
    let mut hash = CssHash::new();
    hash.insert(row, BTreeMap::from([(column.to_string(), class.to_string())]));
    hash
}

// ============================================================================
// Formatters
// ============================================================================

fn formatting_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::with_builtins();
    registry.register_formatter("upper", |args| {
        Formatted::Text(args.value.and_then(|v| v.as_str()).unwrap_or_default().to_uppercase())
    });
    registry.register_formatter("row", |args| {
        Formatted::Text(format!("row:{}", vgrid::registry::escape_value(args.value)))
    });
    registry.register_formatter("meta", |args| {
        Formatted::Text(format!("meta:{}", vgrid::registry::escape_value(args.value)))
    });
    registry.register_formatter("hot", |args| Formatted::Decorated {
        text: vgrid::registry::escape_value(args.value),
        add_classes: Some("hot".into()),
        remove_classes: None,
    });
    registry
}

#[test]
fn test_formatter_precedence() {
    let mut data = VecDataSource::new(items(10));
    data.set_metadata(
        1,
        RowMetadata {
            formatter: Some("row".into()),
            ..RowMetadata::default()
        },
    );
    data.set_metadata(
        2,
        RowMetadata::default().with_column(
            "title",
            ColumnOverride {
                formatter: Some("meta".into()),
                ..ColumnOverride::default()
            },
        ),
    );
    let grid = builder(0)
        .columns(vec![
            Column::new("id"),
            Column::new("title").with_formatter("upper"),
            Column::new("qty").with_formatter("hot"),
        ])
        .registry(formatting_registry())
        .data(data)
        .build()
        .unwrap();

    // Column formatter, then the grid default
    assert_eq!(cell_text(&grid, 0, 1), "TASK 0");
    assert_eq!(cell_text(&grid, 0, 0), "0");
    // Row formatter beats the column formatter
    assert_eq!(cell_text(&grid, 1, 1), "row:Task 1");
    assert_eq!(cell_text(&grid, 1, 0), "row:1");
    // Column override beats both
    assert_eq!(cell_text(&grid, 2, 1), "meta:Task 2");
    assert_eq!(cell_text(&grid, 2, 0), "2");

    assert!(cell_has_class(&grid, 3, 2, "hot"));
    assert_eq!(cell_text(&grid, 3, 2), "30");
}

#[test]
fn test_unknown_column_formatter_is_rejected() {
    let result = builder(5)
        .columns(vec![Column::new("id").with_formatter("missing")])
        .build();
    assert!(matches!(
        result,
        Err(vgrid::GridError::MissingCapability { .. })
    ));
}

#[test]
fn test_default_formatter_escapes_markup() {
    let mut first = item(0);
    first.insert("title".into(), json!("<b>bold</b> & co"));
    first.insert("qty".into(), json!(null));
    let grid = builder(0)
        .data(VecDataSource::new(vec![first]))
        .build()
        .unwrap();
    assert_eq!(cell_text(&grid, 0, 1), "&lt;b&gt;bold&lt;/b&gt; &amp; co");
    assert_eq!(cell_text(&grid, 0, 2), "");
}

#[test]
fn test_row_classes() {
    let mut data = VecDataSource::new(items(6));
    data.set_metadata(
        4,
        RowMetadata {
            css_classes: Some("flagged urgent".into()),
            ..RowMetadata::default()
        },
    );
    let mut grid = builder(0).data(data).build().unwrap();
    grid.set_active_cell(2, 0);

    let row = |grid: &vgrid::Grid<RecordingSurface>, r: usize| {
        grid.surface()
            .row(grid.row_node(r).unwrap())
            .unwrap()
            .classes
            .clone()
    };
    assert!(row(&grid, 1).contains("odd"));
    assert!(row(&grid, 2).contains("even"));
    assert!(row(&grid, 2).contains("active"));
    assert!(row(&grid, 4).contains("flagged"));
    assert!(row(&grid, 4).contains("urgent"));
    assert!(cell_has_class(&grid, 2, 0, "active"));
}

#[test]
fn test_unloaded_rows_render_as_loading() {
    let grid = builder(0)
        .data(VecDataSource::with_unloaded(30))
        .build()
        .unwrap();
    let row = grid.surface().row(grid.row_node(0).unwrap()).unwrap();
    assert!(row.classes.contains("loading"));
    assert_eq!(cell_text(&grid, 0, 1), "");
}

// ============================================================================
// Updates
// ============================================================================

#[test]
fn test_update_cell_repaints_in_place() {
    let mut grid = grid(20);
    let created = grid.surface().stats().cells_created;
    grid.data_mut()
        .item_mut(3)
        .unwrap()
        .insert("title".into(), json!("Renamed"));
    grid.update_cell(3, 1);
    assert_eq!(cell_text(&grid, 3, 1), "Renamed");
    assert_eq!(grid.surface().stats().cells_created, created);

    // Not rendered: nothing to do
    grid.update_cell(90, 1);
}

#[test]
fn test_invalidate_rerenders_everything() {
    let mut grid = grid(20);
    let rendered = record(&mut grid, EventKind::RowsRendered);
    grid.invalidate();
    assert_rows_cached(&grid, 0, 14);
    let events = rendered.borrow();
    assert_eq!(
        events.as_slice(),
        &[GridEvent::RowsRendered {
            rows: (0..=14).collect()
        }]
    );
}

#[test]
fn test_invalidated_rows_repaint_on_next_render() {
    let mut grid = grid(20);
    grid.data_mut()
        .item_mut(5)
        .unwrap()
        .insert("qty".into(), json!(7));
    grid.invalidate_rows(&[5, 6]);
    assert!(!grid.render_cache().contains(5));
    grid.render();
    assert_eq!(cell_text(&grid, 5, 2), "7");
}

#[test]
fn test_second_render_changes_nothing() {
    let mut grid = grid(100);
    grid.scroll_row_to_top(40);
    assert!(!grid.last_reconcile().is_noop());

    let rendered = record(&mut grid, EventKind::RowsRendered);
    let stats = grid.surface().stats();
    let cached = cached_rows(&grid);
    grid.render();

    assert!(grid.last_reconcile().is_noop());
    assert_eq!(grid.surface().stats(), stats);
    assert_eq!(cached_rows(&grid), cached);
    assert!(rendered.borrow().is_empty());
}

// ============================================================================
// Cell Style Overlays
// ============================================================================

#[test]
fn test_css_styles_notify_and_apply_to_new_rows() {
    let mut grid = grid(100);
    let changes = record(&mut grid, EventKind::CellCssStylesChanged);
    grid.add_cell_css_styles("highlight", hash(60, "qty", "changed"))
        .unwrap();
    assert_eq!(changes.borrow().len(), 1);

    // Rows rendered after the overlay was added pick it up.
    grid.scroll_row_to_top(55);
    grid.run_pending_timers();
    assert!(cell_has_class(&grid, 60, 2, "changed"));
    assert!(!cell_has_class(&grid, 61, 2, "changed"));

    grid.remove_cell_css_styles("highlight");
    assert!(!cell_has_class(&grid, 60, 2, "changed"));
    assert_eq!(
        changes.borrow().last(),
        Some(&GridEvent::CellCssStylesChanged {
            key: "highlight".into(),
            hash: None
        })
    );
}

#[test]
fn test_overlapping_style_layers() {
    let mut grid = grid(10);
    grid.add_cell_css_styles("a", hash(1, "id", "one")).unwrap();
    grid.add_cell_css_styles("b", hash(1, "id", "two")).unwrap();
    assert!(cell_has_class(&grid, 1, 0, "one"));
    assert!(cell_has_class(&grid, 1, 0, "two"));
    assert_eq!(grid.cell_css_styles("a"), Some(&hash(1, "id", "one")));
    assert!(grid.cell_css_styles("c").is_none());
}

// ============================================================================
// Async Post-Render
// ============================================================================

struct Hooks {
    rendered: Rc<RefCell<Vec<(usize, bool)>>>,
    cleaned: Rc<Cell<usize>>,
}

fn post_render_grid(rows: usize, extra: serde_json::Value) -> (vgrid::Grid<RecordingSurface>, Hooks) {
    let rendered = Rc::new(RefCell::new(Vec::new()));
    let cleaned = Rc::new(Cell::new(0));
    let mut registry = CapabilityRegistry::with_builtins();
    let sink = Rc::clone(&rendered);
    registry.register_post_render("stamp", move |surface, args| {
        surface.add_class(args.node, "stamped");
        sink.borrow_mut().push((args.row, args.rerender));
    });
    let counter = Rc::clone(&cleaned);
    registry.register_post_render_cleanup("unstamp", move |_, _, _, _| {
        counter.set(counter.get() + 1);
    });

    let mut qty = Column::new("qty");
    qty.async_post_render = Some("stamp".into());
    qty.async_post_render_cleanup = Some("unstamp".into());

    let mut overrides = json!({ "enableAsyncPostRender": true, "forceSyncScrolling": true });
    if let (Some(base), Some(extra)) = (overrides.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }
    let grid = GridBuilder::new(RecordingSurface::new())
        .columns(vec![Column::new("id"), Column::new("title"), qty])
        .data(VecDataSource::new(items(rows)))
        .registry(registry)
        .option_overrides(overrides)
        .size(WIDTH, HEIGHT)
        .build()
        .unwrap();
    (grid, Hooks { rendered, cleaned })
}

#[test]
fn test_post_render_runs_one_row_per_tick() {
    let (mut grid, hooks) = post_render_grid(100, json!({}));
    assert!(grid.scheduler().is_pending(TimerKind::PostRender));
    grid.advance_time(49.0);
    assert!(hooks.rendered.borrow().is_empty());

    grid.advance_time(1.0);
    assert_eq!(hooks.rendered.borrow().as_slice(), &[(0, false)]);
    assert!(cell_has_class(&grid, 0, 2, "stamped"));
    assert!(!cell_has_class(&grid, 1, 2, "stamped"));

    grid.run_pending_timers();
    let rows: Vec<usize> = hooks.rendered.borrow().iter().map(|(r, _)| *r).collect();
    assert_eq!(rows, (0..=11).collect::<Vec<_>>());
    // Buffer rows below the viewport are left alone.
    assert!(!cell_has_class(&grid, 12, 2, "stamped"));
    assert!(!cell_has_class(&grid, 0, 1, "stamped"));
}

#[test]
fn test_post_render_reruns_after_update() {
    let (mut grid, hooks) = post_render_grid(100, json!({}));
    grid.run_pending_timers();
    hooks.rendered.borrow_mut().clear();

    grid.update_row(3);
    grid.run_pending_timers();
    assert_eq!(hooks.rendered.borrow().as_slice(), &[(3, true)]);
}

#[test]
fn test_post_render_disabled_by_default() {
    let (mut grid, hooks) = post_render_grid(100, json!({ "enableAsyncPostRender": false }));
    assert!(!grid.scheduler().is_pending(TimerKind::PostRender));
    grid.run_pending_timers();
    assert!(hooks.rendered.borrow().is_empty());
}

#[test]
fn test_evicted_rows_are_removed_immediately_without_cleanup() {
    let (mut grid, hooks) = post_render_grid(100, json!({}));
    grid.run_pending_timers();
    let node = grid.row_node(0).unwrap();
    grid.handle_scroll(2000.0, 0.0);
    assert!(grid.surface().row(node).is_none());
    assert!(!grid.scheduler().is_pending(TimerKind::PostRenderCleanup));
    assert_eq!(hooks.cleaned.get(), 0);
}

#[test]
fn test_deferred_cleanup_drains_one_row_per_tick() {
    let (mut grid, hooks) = post_render_grid(100, json!({ "enableAsyncPostRenderCleanup": true }));
    grid.run_pending_timers();
    let processed = grid.row_node(0).unwrap();
    let plain = grid.row_node(13).unwrap();

    grid.handle_scroll(2000.0, 0.0);
    // Post-rendered rows are detached and queued, the rest go at once.
    let detached = grid.surface().row(processed).unwrap();
    assert!(!detached.attached);
    assert!(grid.surface().row(plain).is_none());
    assert!(!grid.render_cache().contains(0));
    assert!(grid.scheduler().is_pending(TimerKind::PostRenderCleanup));

    grid.advance_time(40.0);
    assert_eq!(hooks.cleaned.get(), 1);
    assert!(grid.surface().row(processed).is_none());

    grid.run_pending_timers();
    assert_eq!(hooks.cleaned.get(), 12);
    assert!(!grid.scheduler().is_pending(TimerKind::PostRenderCleanup));
    assert!(grid
        .render_cache()
        .rows()
        .iter()
        .all(|row| grid.surface().row(grid.row_node(*row).unwrap()).unwrap().attached));
}

// ============================================================================
// Momentum Row
// ============================================================================

#[test]
fn test_row_under_wheel_survives_until_wheel_moves() {
    let mut grid = builder(100)
        .option_overrides(json!({ "forceSyncScrolling": true }))
        .build()
        .unwrap();
    let node = grid.row_node(2).unwrap();
    grid.handle_mouse_wheel(Some(2));
    grid.handle_scroll(1000.0, 0.0);

    assert!(!grid.render_cache().contains(2));
    assert_eq!(grid.render_cache().zombie_row(), Some(2));
    assert!(grid.surface().row(node).unwrap().hidden);
    assert!(!grid.surface().visible_rows().contains(&2));

    // Moving the wheel releases the row; the next eviction pass destroys it.
    grid.handle_mouse_wheel(Some(45));
    assert_eq!(grid.render_cache().zombie_row(), Some(2));
    assert!(grid.surface().row(node).unwrap().hidden);
    grid.render();
    assert_eq!(grid.render_cache().zombie_row(), None);
    assert!(grid.surface().row(node).is_none());
}

#[test]
fn test_momentum_row_can_be_disabled() {
    let mut grid = builder(100)
        .option_overrides(json!({ "forceSyncScrolling": true, "retainMomentumRow": false }))
        .build()
        .unwrap();
    let node = grid.row_node(2).unwrap();
    grid.handle_mouse_wheel(Some(2));
    grid.handle_scroll(1000.0, 0.0);
    assert_eq!(grid.render_cache().zombie_row(), None);
    assert!(grid.surface().row(node).is_none());
}
