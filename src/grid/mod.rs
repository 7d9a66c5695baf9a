//! The grid: ties layout, render cache, navigation and editing together.
//!
//! [`Grid`] is generic over the host [`Surface`] and split across files by concern:
//! - `scroll.rs` sizes the viewport, pages the virtual height and follows scrolling
//! - `render.rs` paints rows, runs post-render work and keeps style overlays in sync
//! - `editing.rs` owns the active cell, the editor lifecycle and navigation
//! - `input.rs` dispatches keys, clicks and header clicks
//! - `selection.rs` plumbs the selection model into a style overlay
//!
//! Nothing here blocks or spawns. Deferred work goes through the grid's
//! [`Scheduler`] and runs when the host calls [`Grid::advance_time`].

mod editing;
mod input;
mod render;
mod scroll;
mod selection;

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::DataSource;
use crate::editor::{EditCommandHandler, EditSession, EditorLock};
use crate::error::{GridError, Result};
use crate::events::{EventArgs, EventBus, EventKind, GridEvent, InputEvent, SubscriptionId};
use crate::layout::{ColumnBounds, Paging, PlatformMetrics, Viewport};
use crate::options::GridOptions;
use crate::registry::CapabilityRegistry;
use crate::render::{
    CacheStats, CellCssStyles, EvictionPolicy, PostRenderQueue, ReconcileReport, RenderCache,
    Surface,
};
use crate::scheduler::{Scheduler, TimerKind};
use crate::selection::SelectionModel;
use crate::types::{CellPosition, Column, SortColumn, ViewRange};

static NEXT_GRID_ID: AtomicU64 = AtomicU64::new(1);

/// Paging state reported by an external pager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PagingInfo {
    /// Rows per page, 0 when paging is off
    pub page_size: usize,
    pub page_num: usize,
    pub total_pages: usize,
}

/// Render and paging counters, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridStats {
    #[serde(flatten)]
    pub cache: CacheStats,
    pub cached_rows: usize,
    pub data_length: usize,
    pub paging: Paging,
    pub visible: ViewRange,
    pub active: Option<CellPosition>,
    pub pending_cleanup: usize,
}

/// Builder for [`Grid`]. Validates the configuration before anything is rendered.
pub struct GridBuilder<S: Surface> {
    surface: S,
    data: Option<Box<dyn DataSource>>,
    columns: Vec<Column>,
    options: GridOptions,
    overrides: Option<Value>,
    registry: Option<CapabilityRegistry>,
    metrics: Option<Rc<PlatformMetrics>>,
    size: (f64, f64),
    editor_lock: Option<EditorLock>,
}

impl<S: Surface> GridBuilder<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            data: None,
            columns: Vec::new(),
            options: GridOptions::default(),
            overrides: None,
            registry: None,
            metrics: None,
            size: (800.0, 600.0),
            editor_lock: None,
        }
    }

    pub fn data(mut self, data: impl DataSource + 'static) -> Self {
        self.data = Some(Box::new(data));
        self
    }

    pub fn boxed_data(mut self, data: Box<dyn DataSource>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn options(mut self, options: GridOptions) -> Self {
        self.options = options;
        self
    }

    /// JSON overrides merged over the options at build time.
    pub fn option_overrides(mut self, overrides: Value) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn registry(mut self, registry: CapabilityRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn metrics(mut self, metrics: Rc<PlatformMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Container size in pixels.
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.size = (width, height);
        self
    }

    /// Share an editor lock with other grids.
    pub fn editor_lock(mut self, lock: EditorLock) -> Self {
        self.editor_lock = Some(lock);
        self
    }

    pub fn build(self) -> Result<Grid<S>> {
        let options = match &self.overrides {
            Some(overrides) => self.options.merged(overrides)?,
            None => self.options,
        };
        let (width, height) = self.size;
        check_container(width, height, options.auto_height)?;

        let registry = self.registry.unwrap_or_else(CapabilityRegistry::with_builtins);
        let mut columns = visible_columns(self.columns);
        registry.validate_columns(&columns, &options.default_formatter)?;
        for column in &mut columns {
            column.normalize(options.default_column_width);
        }

        let id = NEXT_GRID_ID.fetch_add(1, Ordering::Relaxed);
        let mut grid = Grid {
            id,
            surface: self.surface,
            data: self
                .data
                .unwrap_or_else(|| Box::new(crate::data::VecDataSource::default())),
            columns_by_id: index_columns(&columns),
            bounds: ColumnBounds::compute(&columns),
            columns,
            options,
            registry,
            metrics: self.metrics.unwrap_or_default(),
            viewport: Viewport::new(width, height),
            container_height: height,
            paging: Paging::default(),
            cache: RenderCache::new(),
            last_reconcile: ReconcileReport::default(),
            post: PostRenderQueue::new(),
            styles: CellCssStyles::new(),
            scheduler: Scheduler::new(),
            events: EventBus::new(),
            session: EditSession::new(),
            editor_lock: self.editor_lock.unwrap_or_default(),
            command_handler: None,
            selection_model: None,
            selected_rows: Vec::new(),
            sort_columns: Vec::new(),
            active: None,
            canvas_width: 0.0,
            paging_active: false,
            paging_is_last_page: false,
            num_visible_rows: 0,
            horizontal_dirty: true,
            pending_pre_click: false,
            current_input: None,
        };
        grid.initialize();
        Ok(grid)
    }
}

fn check_container(width: f64, height: f64, auto_height: bool) -> Result<()> {
    let height_ok = height.is_finite() && (height > 0.0 || (auto_height && height >= 0.0));
    if !width.is_finite() || width <= 0.0 || !height_ok {
        return Err(GridError::InvalidContainer { width, height });
    }
    Ok(())
}

fn visible_columns(mut columns: Vec<Column>) -> Vec<Column> {
    let before = columns.len();
    columns.retain(|c| c.visible);
    if columns.len() < before {
        tracing::debug!(hidden = before - columns.len(), "dropped hidden columns");
    }
    columns
}

fn index_columns(columns: &[Column]) -> HashMap<String, usize> {
    columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.clone(), i))
        .collect()
}

/// A virtualized, editable grid over a [`DataSource`], drawing onto a [`Surface`].
pub struct Grid<S: Surface> {
    id: u64,
    surface: S,
    data: Box<dyn DataSource>,
    columns: Vec<Column>,
    columns_by_id: HashMap<String, usize>,
    bounds: ColumnBounds,
    options: GridOptions,
    registry: CapabilityRegistry,
    metrics: Rc<PlatformMetrics>,
    viewport: Viewport,
    /// Height the host gave us; the viewport height differs under auto-height
    container_height: f64,
    paging: Paging,
    cache: RenderCache,
    /// What the latest render pass changed on the surface
    last_reconcile: ReconcileReport,
    post: PostRenderQueue,
    styles: CellCssStyles,
    scheduler: Scheduler,
    events: EventBus,
    session: EditSession,
    editor_lock: EditorLock,
    command_handler: Option<Box<dyn EditCommandHandler>>,
    selection_model: Option<Box<dyn SelectionModel>>,
    selected_rows: Vec<usize>,
    sort_columns: Vec<SortColumn>,
    active: Option<CellPosition>,
    canvas_width: f64,
    paging_active: bool,
    paging_is_last_page: bool,
    num_visible_rows: usize,
    /// Cells must be re-windowed horizontally on the next render
    horizontal_dirty: bool,
    /// Pre-click flag for a deferred editor load
    pending_pre_click: bool,
    /// Host input being dispatched, attached to notifications it causes
    current_input: Option<InputEvent>,
}

impl<S: Surface> Grid<S> {
    fn initialize(&mut self) {
        let (sb_width, sb_height) = self.metrics.scrollbar_size();
        tracing::debug!(
            grid = self.id,
            columns = self.columns.len(),
            rows = self.data.len(),
            sb_width,
            sb_height,
            "initializing grid"
        );
        self.update_canvas_width(true);
        self.resize_canvas();
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_index(&self, id: &str) -> Option<usize> {
        self.columns_by_id.get(id).copied()
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn data(&self) -> &dyn DataSource {
        self.data.as_ref()
    }

    /// Mutable access to the data. Call one of the invalidation methods afterwards.
    pub fn data_mut(&mut self) -> &mut dyn DataSource {
        self.data.as_mut()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn paging(&self) -> &Paging {
        &self.paging
    }

    /// Nodes created and removed by the most recent render pass.
    pub fn last_reconcile(&self) -> &ReconcileReport {
        &self.last_reconcile
    }

    pub fn render_cache(&self) -> &RenderCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn editor_lock(&self) -> &EditorLock {
        &self.editor_lock
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&GridEvent, &mut EventArgs) + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(kind, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn set_edit_command_handler(&mut self, handler: impl EditCommandHandler + 'static) {
        self.command_handler = Some(Box::new(handler));
    }

    pub fn clear_edit_command_handler(&mut self) {
        self.command_handler = None;
    }

    fn trigger(&mut self, event: GridEvent) -> EventArgs {
        tracing::trace!(grid = self.id, kind = ?event.kind(), "notify");
        let args = EventArgs::new(self.current_input.clone());
        self.events.notify(&event, args)
    }

    /// Run `f` with `input` attached to every notification it causes.
    fn with_input<R>(&mut self, input: InputEvent, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.current_input.replace(input);
        let result = f(self);
        self.current_input = previous;
        result
    }

    fn policy(&self) -> EvictionPolicy {
        EvictionPolicy {
            deferred_cleanup: self.options.enable_async_post_render_cleanup,
            retain_momentum_row: self.options.retain_momentum_row,
        }
    }

    pub fn data_length(&self) -> usize {
        self.data.len()
    }

    /// Row of the loaded item whose `id` renders as `id`.
    pub fn row_by_record_id(&self, id: &str) -> Option<usize> {
        (0..self.data.len()).find(|row| {
            self.data
                .item(*row)
                .and_then(crate::data::record_id)
                .is_some_and(|found| found == id)
        })
    }

    /// Data length plus the pending-insert row, when one is shown.
    pub fn data_length_including_add_new(&self) -> usize {
        let len = self.data.len();
        let show_insert =
            self.options.enable_add_row && (!self.paging_active || self.paging_is_last_page);
        len + usize::from(show_insert)
    }

    /// Follow an external pager: the pending-insert row only shows on the last page.
    pub fn update_paging_status_from_view(&mut self, info: PagingInfo) {
        self.paging_active = info.page_size != 0;
        self.paging_is_last_page = info.total_pages > 0 && info.page_num + 1 == info.total_pages;
        tracing::debug!(
            active = self.paging_active,
            last = self.paging_is_last_page,
            "paging status from view"
        );
    }

    /// Replace the column definitions. Columns marked `visible: false` are left out.
    pub fn set_columns(&mut self, columns: Vec<Column>) -> Result<()> {
        let mut columns = visible_columns(columns);
        self.registry
            .validate_columns(&columns, &self.options.default_formatter)?;
        for column in &mut columns {
            column.normalize(self.options.default_column_width);
        }
        self.columns_by_id = index_columns(&columns);
        self.columns = columns;
        self.bounds = ColumnBounds::compute(&self.columns);
        self.invalidate_all_rows();
        self.update_canvas_width(true);
        self.resize_canvas();
        self.sync_scroll(true);
        Ok(())
    }

    /// Reorder columns by id. Every current column must be named exactly once.
    pub fn reorder_columns(&mut self, ids: &[&str]) -> Result<()> {
        if !self.options.enable_column_reorder {
            return Err(GridError::NotAllowed("column reorder is disabled".to_string()));
        }
        if ids.len() != self.columns.len() {
            return Err(GridError::Other(format!(
                "reorder names {} columns, grid has {}",
                ids.len(),
                self.columns.len()
            )));
        }
        let mut reordered = Vec::with_capacity(ids.len());
        for id in ids {
            let column = self
                .column_index(id)
                .and_then(|i| self.columns.get(i))
                .ok_or_else(|| GridError::UnknownColumn((*id).to_string()))?;
            reordered.push(column.clone());
        }
        if !self.commit_current_edit() {
            return Err(GridError::NotAllowed("current edit failed to commit".to_string()));
        }
        self.set_columns(reordered)?;
        self.trigger(GridEvent::ColumnsReordered);
        Ok(())
    }

    /// Merge option overrides. Returns `false` when the current edit refused to commit.
    pub fn set_options(&mut self, overrides: &Value) -> Result<bool> {
        let options = self.options.merged(overrides)?;
        if options.default_formatter != self.options.default_formatter {
            self.registry
                .validate_columns(&self.columns, &options.default_formatter)?;
        }
        if !self.commit_current_edit() {
            return Ok(false);
        }
        self.make_active_cell_normal();
        if options.enable_add_row != self.options.enable_add_row {
            let len = self.data.len();
            self.invalidate_row(len);
        }
        let resized = options.row_height.to_bits() != self.options.row_height.to_bits()
            || options.auto_height != self.options.auto_height;
        self.options = options;
        if resized {
            self.invalidate_all_rows();
            self.resize_canvas();
        } else {
            self.update_row_count();
            self.render();
        }
        Ok(true)
    }

    /// Swap the data source.
    pub fn set_data(&mut self, data: Box<dyn DataSource>, scroll_to_top: bool) {
        self.data = data;
        self.invalidate_all_rows();
        self.update_row_count();
        if scroll_to_top {
            self.scroll_to(0.0);
        }
    }

    pub fn sort_columns(&self) -> &[SortColumn] {
        &self.sort_columns
    }

    /// Replace the sort order. Unknown column ids are dropped.
    pub fn set_sort_columns(&mut self, sort_columns: Vec<SortColumn>) {
        self.sort_columns = sort_columns
            .into_iter()
            .filter(|s| self.columns_by_id.contains_key(&s.column_id))
            .collect();
    }

    pub fn set_sort_column(&mut self, column_id: &str, ascending: bool) {
        self.set_sort_columns(vec![SortColumn {
            column_id: column_id.to_string(),
            sort_asc: ascending,
        }]);
    }

    /// Advance the scheduler clock by `ms` and run every timer that came due.
    pub fn advance_time(&mut self, ms: f64) {
        let deadline = self.scheduler.now() + ms.max(0.0);
        while let Some(kind) = self.scheduler.pop_due(deadline) {
            self.run_timer(kind);
        }
        self.scheduler.advance_clock(deadline);
        self.process_editor_requests();
    }

    /// Run pending timers until none is left, regardless of their due time.
    pub fn run_pending_timers(&mut self) {
        while let Some(due) = self.scheduler.next_due() {
            let now = self.scheduler.now();
            self.advance_time((due - now).max(0.0));
        }
    }

    fn run_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Render => self.render(),
            TimerKind::PostRender => self.post_render_tick(),
            TimerKind::PostRenderCleanup => self.cleanup_tick(),
            TimerKind::EditorLoader => {
                let pre_click = std::mem::take(&mut self.pending_pre_click);
                self.make_active_cell_editable(pre_click);
            }
        }
    }

    pub fn debug_stats(&self) -> GridStats {
        GridStats {
            cache: self.cache.stats(),
            cached_rows: self.cache.len(),
            data_length: self.data.len(),
            paging: self.paging.clone(),
            visible: self.visible_range(),
            active: self.active,
            pending_cleanup: self.post.pending_cleanup(),
        }
    }
}

impl<S: Surface> std::fmt::Debug for Grid<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("id", &self.id)
            .field("columns", &self.columns.len())
            .field("rows", &self.data.len())
            .field("active", &self.active)
            .field("editing", &self.session.is_editing())
            .field("paging", &self.paging)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::data::VecDataSource;
    use crate::render::RecordingSurface;
    use crate::types::Item;
    use serde_json::json;

    fn columns() -> Vec<Column> {
        vec![Column::new("a"), Column::new("b")]
    }

    #[test]
    fn test_rejects_bad_container() {
        let err = GridBuilder::new(RecordingSurface::new())
            .columns(columns())
            .size(0.0, 300.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, GridError::InvalidContainer { .. }));
    }

    #[test]
    fn test_rejects_unknown_formatter() {
        let result = GridBuilder::new(RecordingSurface::new())
            .columns(vec![Column::new("a").with_formatter("sparkline")])
            .build();
        assert!(matches!(result, Err(GridError::MissingCapability { .. })));
    }

    #[test]
    fn test_insert_row_follows_pager() {
        let mut grid = GridBuilder::new(RecordingSurface::new())
            .columns(columns())
            .data(VecDataSource::new(vec![Item::new(); 3]))
            .option_overrides(json!({ "enableAddRow": true }))
            .build()
            .unwrap();
        assert_eq!(grid.data_length_including_add_new(), 4);

        grid.update_paging_status_from_view(PagingInfo {
            page_size: 10,
            page_num: 0,
            total_pages: 2,
        });
        assert_eq!(grid.data_length_including_add_new(), 3);

        grid.update_paging_status_from_view(PagingInfo {
            page_size: 10,
            page_num: 1,
            total_pages: 2,
        });
        assert_eq!(grid.data_length_including_add_new(), 4);
    }

    #[test]
    fn test_reorder_requires_known_ids() {
        let mut grid = GridBuilder::new(RecordingSurface::new())
            .columns(columns())
            .build()
            .unwrap();
        assert!(matches!(
            grid.reorder_columns(&["a", "z"]),
            Err(GridError::UnknownColumn(_))
        ));
        grid.reorder_columns(&["b", "a"]).unwrap();
        assert_eq!(grid.columns()[0].id, "b");
        assert_eq!(grid.column_index("a"), Some(1));
    }

    #[test]
    fn test_set_options_merges() {
        let mut grid = GridBuilder::new(RecordingSurface::new())
            .columns(columns())
            .build()
            .unwrap();
        assert!(grid.set_options(&json!({ "editable": true })).unwrap());
        assert!(grid.options().editable);
        assert_eq!(grid.options().row_height, 25.0);
    }
}
