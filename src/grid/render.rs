//! Painting: row and cell markup, the render pass, post-render work and
//! cell style overlays.

use super::Grid;
use crate::data::{record_id, DataSource};
use crate::error::Result;
use crate::events::GridEvent;
use crate::layout::{ColumnBounds, Paging, ScrollDirection};
use crate::options::GridOptions;
use crate::registry::{CapabilityRegistry, FormatArgs, Formatted, Formatter, PostRenderArgs};
use crate::render::{
    CellCssStyles, CellMarkup, CleanupAction, CssHash, NodeId, PostStatus, RowMarkup, RowPainter,
    Surface,
};
use crate::scheduler::TimerKind;
use crate::types::{CellBox, CellPosition, Column, ViewRange};

/// Borrowed view of the grid state needed to paint rows.
pub(crate) struct PaintContext<'a> {
    columns: &'a [Column],
    bounds: &'a ColumnBounds,
    data: &'a dyn DataSource,
    options: &'a GridOptions,
    registry: &'a CapabilityRegistry,
    styles: &'a CellCssStyles,
    active: Option<CellPosition>,
    paging: &'a Paging,
    row_count: usize,
}

impl PaintContext<'_> {
    /// Column override by id or index, then the row formatter, then the
    /// column formatter, then the grid default.
    fn formatter_for(&self, row: usize, cell: usize, column: &Column) -> Option<Formatter> {
        let metadata = self.data.metadata(row);
        let name = metadata
            .and_then(|m| m.column(&column.id, cell))
            .and_then(|o| o.formatter.as_deref())
            .or_else(|| metadata.and_then(|m| m.formatter.as_deref()))
            .or(column.formatter.as_deref())
            .unwrap_or(&self.options.default_formatter);
        self.registry.formatter(name).or_else(|| {
            tracing::warn!(row, cell, name, "unknown formatter, using the default");
            self.registry.formatter(&self.options.default_formatter)
        })
    }

    pub(crate) fn format(&self, row: usize, cell: usize) -> Option<Formatted> {
        let column = self.columns.get(cell)?;
        let item = self.data.item(row)?;
        let formatter = self.formatter_for(row, cell, column)?;
        Some(formatter(&FormatArgs {
            row,
            cell,
            value: item.get(&column.field),
            column,
            item: Some(item),
        }))
    }

    fn is_active(&self, row: usize, cell: Option<usize>) -> bool {
        self.options.show_cell_selection
            && self
                .active
                .is_some_and(|a| a.row == row && cell.is_none_or(|c| c == a.cell))
    }
}

impl RowPainter for PaintContext<'_> {
    fn row_count(&self) -> usize {
        self.row_count
    }

    fn bounds(&self) -> &ColumnBounds {
        self.bounds
    }

    fn colspan(&self, row: usize, cell: usize) -> usize {
        let Some(column) = self.columns.get(cell) else {
            return 1;
        };
        self.data
            .metadata(row)
            .and_then(|m| m.column(&column.id, cell))
            .and_then(|o| o.colspan)
            .map_or(1, |c| c.resolve(cell, self.columns.len()))
    }

    fn row_markup(&self, row: usize) -> RowMarkup {
        let item = self.data.item(row);
        let mut classes = vec!["vgrid-row".to_string()];
        if row < self.data.len() && item.is_none() {
            classes.push("loading".to_string());
        }
        if self.is_active(row, None) {
            classes.push("active".to_string());
        }
        classes.push(if row % 2 == 1 { "odd" } else { "even" }.to_string());
        if item.is_none() {
            classes.push(self.options.add_new_row_css_class.clone());
        }
        if let Some(extra) = self.data.metadata(row).and_then(|m| m.css_classes.as_deref()) {
            classes.extend(extra.split_whitespace().map(str::to_string));
        }
        RowMarkup {
            row,
            top: self.paging.row_top(row, self.options.row_height),
            classes,
            data_id: item.and_then(record_id),
            cells: Vec::new(),
        }
    }

    fn cell_markup(&self, row: usize, cell: usize, colspan: usize) -> CellMarkup {
        let last = (cell + colspan.max(1) - 1).min(self.columns.len().saturating_sub(1));
        let mut classes = vec![
            "vgrid-cell".to_string(),
            format!("l{cell}"),
            format!("r{last}"),
        ];
        let column = self.columns.get(cell);
        if let Some(css) = column.and_then(|c| c.css_class.as_deref()) {
            classes.extend(css.split_whitespace().map(str::to_string));
        }
        if self.is_active(row, Some(cell)) {
            classes.push("active".to_string());
        }
        if let Some(column) = column {
            classes.extend(
                self.styles
                    .classes_for(row, &column.id)
                    .into_iter()
                    .map(str::to_string),
            );
        }
        let formatted = self.format(row, cell);
        if let Some(add) = formatted.as_ref().and_then(Formatted::add_classes) {
            classes.extend(add.split_whitespace().map(str::to_string));
        }
        CellMarkup {
            cell,
            colspan,
            classes,
            text: formatted.map(|f| f.text().to_string()).unwrap_or_default(),
        }
    }
}

impl<S: Surface> Grid<S> {
    pub(crate) fn painter(&self) -> PaintContext<'_> {
        PaintContext {
            columns: &self.columns,
            bounds: &self.bounds,
            data: self.data.as_ref(),
            options: &self.options,
            registry: &self.registry,
            styles: &self.styles,
            active: self.active,
            paging: &self.paging,
            row_count: self.data_length_including_add_new(),
        }
    }

    /// Bring the surface in line with the current scroll position.
    pub fn render(&mut self) {
        let row_count = self.data_length_including_add_new();
        let visible = self.visible_range();
        let rendered = self.rendered_range();
        if !self.data.is_empty() {
            self.data.prepare(rendered.top, rendered.bottom);
        }

        let horizontal_changed = self.horizontal_dirty
            || (self.viewport.last_rendered_scroll_left - self.viewport.scroll_left).abs()
                > f64::EPSILON;
        let policy = self.policy();
        let active = self.active.map(|a| (a.row, a.cell));
        let painter = PaintContext {
            columns: &self.columns,
            bounds: &self.bounds,
            data: self.data.as_ref(),
            options: &self.options,
            registry: &self.registry,
            styles: &self.styles,
            active: self.active,
            paging: &self.paging,
            row_count,
        };
        let report = self.cache.reconcile(
            &rendered,
            active,
            horizontal_changed,
            &painter,
            &mut self.surface,
            &mut self.post,
            policy,
        );

        if report.cleanup_queued {
            self.start_post_processing_cleanup();
        }
        if row_count > 0 {
            self.post
                .set_window(visible.top, visible.bottom.min(row_count - 1));
            self.start_post_processing();
        }
        self.viewport.last_rendered_scroll_top = self.viewport.scroll_top;
        self.viewport.last_rendered_scroll_left = self.viewport.scroll_left;
        self.horizontal_dirty = false;
        self.scheduler.cancel(TimerKind::Render);

        tracing::debug!(
            top = rendered.top,
            bottom = rendered.bottom,
            rows_rendered = report.rows_rendered.len(),
            rows_removed = report.rows_removed,
            cells_rendered = report.cells_rendered,
            cells_removed = report.cells_removed,
            "render"
        );
        let rows = report.rows_rendered.clone();
        self.last_reconcile = report;
        if !rows.is_empty() {
            self.trigger(GridEvent::RowsRendered { rows });
        }
        self.trigger(GridEvent::Rendered { range: rendered });
    }

    pub(super) fn start_post_processing(&mut self) {
        if !self.options.enable_async_post_render || !self.post.has_pending_rows() {
            return;
        }
        if self.columns.iter().all(|c| c.async_post_render.is_none()) {
            return;
        }
        self.scheduler
            .schedule(TimerKind::PostRender, self.options.async_post_render_delay);
    }

    pub(super) fn start_post_processing_cleanup(&mut self) {
        if !self.post.has_pending_cleanup() {
            return;
        }
        self.scheduler.schedule(
            TimerKind::PostRenderCleanup,
            self.options.async_post_render_cleanup_delay,
        );
    }

    /// Run post-render hooks for one row, then reschedule.
    pub(super) fn post_render_tick(&mut self) {
        let data_len = self.data.len();
        let forward = self.viewport.direction != ScrollDirection::Backward;
        while let Some(row) = self.post.next_row(forward) {
            if row >= data_len || !self.cache.contains(row) {
                continue;
            }
            let Some(item) = self.data.item(row) else {
                continue;
            };
            for (cell, node) in self.cache.cell_nodes(row, &self.surface) {
                let Some(column) = self.columns.get(cell) else {
                    continue;
                };
                let Some(name) = column.async_post_render.as_deref() else {
                    continue;
                };
                let status = self.post.status(row, cell);
                if status == Some(PostStatus::Rendered) {
                    continue;
                }
                if let Some(hook) = self.registry.post_render(name) {
                    hook(
                        &mut self.surface,
                        &PostRenderArgs {
                            node,
                            row,
                            item,
                            column,
                            rerender: status == Some(PostStatus::Invalidated),
                        },
                    );
                }
                self.post.mark_rendered(row, cell);
            }
            tracing::trace!(row, "post-rendered");
            self.scheduler
                .schedule(TimerKind::PostRender, self.options.async_post_render_delay);
            return;
        }
    }

    /// Destroy one group of detached nodes, then reschedule.
    pub(super) fn cleanup_tick(&mut self) {
        let group = self.post.pop_cleanup_group();
        tracing::trace!(entries = group.len(), "post-render cleanup");
        for entry in group {
            if entry.action == CleanupAction::Cell {
                let column = entry.cell.and_then(|c| self.columns.get(c));
                let hook = column
                    .and_then(|c| c.async_post_render_cleanup.as_deref())
                    .and_then(|name| self.registry.post_render_cleanup(name));
                if let (Some(hook), Some(column)) = (hook, column) {
                    hook(&mut self.surface, entry.node, entry.row, column);
                }
            }
            self.surface.release(entry.node);
        }
        self.start_post_processing_cleanup();
    }

    /// Recount rows, drop every rendered row and paint again.
    pub fn invalidate(&mut self) {
        self.update_row_count();
        self.invalidate_all_rows();
        self.render();
    }

    pub fn invalidate_all_rows(&mut self) {
        if self.session.is_editing() {
            self.make_active_cell_normal();
        }
        let policy = self.policy();
        if self
            .cache
            .remove_all(&mut self.surface, &mut self.post, policy)
        {
            self.start_post_processing_cleanup();
        }
    }

    /// Drop `rows` from the render cache so the next render repaints them.
    pub fn invalidate_rows(&mut self, rows: &[usize]) {
        if rows.is_empty() {
            return;
        }
        self.viewport.direction = ScrollDirection::Still;
        let policy = self.policy();
        let mut queued = false;
        for &row in rows {
            if self.session.current().is_some_and(|e| e.row == row) {
                self.make_active_cell_normal();
            }
            queued |= self
                .cache
                .remove_row(row, &mut self.surface, &mut self.post, policy);
        }
        if queued {
            self.start_post_processing_cleanup();
        }
    }

    pub fn invalidate_row(&mut self, row: usize) {
        self.invalidate_rows(&[row]);
    }

    /// Evict cached rows outside `range`, except the active row.
    pub(super) fn evict_rows_outside(&mut self, range: &ViewRange) {
        let active_row = self.active.map(|a| a.row);
        let policy = self.policy();
        let mut queued = false;
        for row in self.cache.rows() {
            if !range.contains_row(row) && Some(row) != active_row {
                queued |= self
                    .cache
                    .remove_row(row, &mut self.surface, &mut self.post, policy);
            }
        }
        if queued {
            self.start_post_processing_cleanup();
        }
    }

    pub(crate) fn apply_formatted(&mut self, node: NodeId, formatted: Option<&Formatted>) {
        let Some(formatted) = formatted else {
            self.surface.set_cell_content(node, "");
            return;
        };
        self.surface.set_cell_content(node, formatted.text());
        for class in formatted.remove_classes().unwrap_or_default().split_whitespace() {
            self.surface.remove_class(node, class);
        }
        for class in formatted.add_classes().unwrap_or_default().split_whitespace() {
            self.surface.add_class(node, class);
        }
    }

    pub(super) fn invalidate_post_processing_results(&mut self, row: usize) {
        self.post.invalidate_row(row);
        self.start_post_processing();
    }

    /// Repaint one cell in place. The cell under a live editor reloads the editor instead.
    pub fn update_cell(&mut self, row: usize, cell: usize) {
        let Some(node) = self.cache.cell_node(row, cell, &self.surface) else {
            return;
        };
        let editor = self
            .session
            .current()
            .filter(|e| e.row == row && e.cell == cell)
            .map(|e| std::rc::Rc::clone(&e.editor));
        if let Some(editor) = editor {
            if let Some(item) = self.data.item(row) {
                editor.borrow_mut().load_value(item);
            }
            return;
        }
        let formatted = self.painter().format(row, cell);
        self.apply_formatted(node, formatted.as_ref());
        self.invalidate_post_processing_results(row);
    }

    /// Repaint every rendered cell of `row` in place.
    pub fn update_row(&mut self, row: usize) {
        if !self.cache.contains(row) {
            return;
        }
        let nodes = self.cache.cell_nodes(row, &self.surface);
        let editing = self
            .session
            .current()
            .filter(|e| e.row == row)
            .map(|e| (e.cell, std::rc::Rc::clone(&e.editor)));

        let updates: Vec<(NodeId, Option<Formatted>)> = {
            let painter = self.painter();
            nodes
                .iter()
                .filter(|(cell, _)| editing.as_ref().is_none_or(|(c, _)| c != cell))
                .map(|&(cell, node)| (node, painter.format(row, cell)))
                .collect()
        };
        if let Some((_, editor)) = editing {
            if let Some(item) = self.data.item(row) {
                editor.borrow_mut().load_value(item);
            }
        }
        for (node, formatted) in updates {
            self.apply_formatted(node, formatted.as_ref());
        }
        self.invalidate_post_processing_results(row);
    }

    /// Add a style layer. Fails if `key` is already in use.
    pub fn add_cell_css_styles(&mut self, key: &str, hash: CssHash) -> Result<()> {
        self.styles.add(key, hash.clone())?;
        self.update_cell_css_styles_on_rendered_rows(Some(&hash), None);
        self.trigger(GridEvent::CellCssStylesChanged {
            key: key.to_string(),
            hash: Some(hash),
        });
        Ok(())
    }

    pub fn remove_cell_css_styles(&mut self, key: &str) {
        let Some(removed) = self.styles.remove(key) else {
            return;
        };
        self.update_cell_css_styles_on_rendered_rows(None, Some(&removed));
        self.trigger(GridEvent::CellCssStylesChanged {
            key: key.to_string(),
            hash: None,
        });
    }

    /// Add or replace a style layer.
    pub fn set_cell_css_styles(&mut self, key: &str, hash: CssHash) {
        let previous = self.styles.set(key, hash.clone());
        self.update_cell_css_styles_on_rendered_rows(Some(&hash), previous.as_ref());
        self.trigger(GridEvent::CellCssStylesChanged {
            key: key.to_string(),
            hash: Some(hash),
        });
    }

    pub fn cell_css_styles(&self, key: &str) -> Option<&CssHash> {
        self.styles.get(key)
    }

    fn update_cell_css_styles_on_rendered_rows(
        &mut self,
        added: Option<&CssHash>,
        removed: Option<&CssHash>,
    ) {
        for row in self.cache.rows() {
            for (cell, node) in self.cache.cell_nodes(row, &self.surface) {
                let Some(column) = self.columns.get(cell) else {
                    continue;
                };
                let lookup = |hash: Option<&CssHash>| {
                    hash.and_then(|h| h.get(&row))
                        .and_then(|classes| classes.get(&column.id))
                        .cloned()
                };
                let add = lookup(added);
                let remove = lookup(removed);
                if let Some(remove) = remove.as_deref().filter(|r| add.as_deref() != Some(*r)) {
                    for class in remove.split_whitespace() {
                        self.surface.remove_class(node, class);
                    }
                }
                if let Some(add) = add.as_deref().filter(|a| remove.as_deref() != Some(*a)) {
                    for class in add.split_whitespace() {
                        self.surface.add_class(node, class);
                    }
                }
            }
        }
    }

    /// Cell at canvas coordinates, if it holds a row.
    pub fn cell_from_point(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let row = self.paging.row_at(y, self.options.row_height);
        if row >= self.data_length_including_add_new() {
            return None;
        }
        let cell = self.bounds.column_at_x(x)?;
        Some((row, cell))
    }

    /// Canvas box of a cell, including its colspan.
    pub fn cell_node_box(&self, row: usize, cell: usize) -> Option<CellBox> {
        if row >= self.data_length_including_add_new() {
            return None;
        }
        let left = self.bounds.left(cell)?;
        let right = self.bounds.span_right(cell, self.colspan(row, cell));
        let rh = self.options.row_height;
        let top = self.paging.row_top(row, rh);
        Some(CellBox {
            top,
            left,
            bottom: top + rh,
            right,
            width: right - left,
            height: rh,
            visible: true,
        })
    }

    /// Box of the viewport itself.
    pub fn grid_position(&self) -> CellBox {
        CellBox {
            top: 0.0,
            left: 0.0,
            bottom: self.viewport.height,
            right: self.viewport.width,
            width: self.viewport.width,
            height: self.viewport.height,
            visible: true,
        }
    }

    /// Box of the active cell relative to the viewport, with visibility.
    pub fn active_cell_position(&self) -> Option<CellBox> {
        let active = self.active?;
        let mut cell_box = self.cell_node_box(active.row, active.cell)?;
        cell_box.top -= self.viewport.scroll_top;
        cell_box.bottom -= self.viewport.scroll_top;
        cell_box.left -= self.viewport.scroll_left;
        cell_box.right -= self.viewport.scroll_left;
        cell_box.visible = cell_box.bottom > 0.0
            && cell_box.top < self.viewport.height
            && cell_box.right > 0.0
            && cell_box.left < self.viewport.width;
        Some(cell_box)
    }

    /// Surface node of a rendered cell.
    pub fn cell_node(&mut self, row: usize, cell: usize) -> Option<NodeId> {
        self.cache.cell_node(row, cell, &self.surface)
    }

    pub fn row_node(&self, row: usize) -> Option<NodeId> {
        self.cache.row_node(row)
    }
}
