//! Render cache: the rows and cells currently materialized on the surface.
//!
//! Rows are keyed by data row index. Each entry records the row node, the
//! cells rendered so far with their colspans, and a queue of cells that were
//! rendered in a batch but whose nodes have not been looked up yet. Cell
//! nodes are indexed lazily, the first time something needs them.

use std::collections::{BTreeMap, VecDeque};

use super::post_render::{CleanupAction, CleanupEntry, PostRenderQueue, RowStatuses};
use super::surface::{CellMarkup, NodeId, RowMarkup, Surface};
use crate::layout::{ColumnBounds, Paging};
use crate::types::ViewRange;

/// Produces markup for rows and cells.
pub trait RowPainter {
    /// Rows that may be rendered, including the pending-insert row.
    fn row_count(&self) -> usize;

    fn bounds(&self) -> &ColumnBounds;

    /// Span of the cell starting at `cell`, at least 1.
    fn colspan(&self, row: usize, cell: usize) -> usize;

    /// Row markup without cells.
    fn row_markup(&self, row: usize) -> RowMarkup;

    fn cell_markup(&self, row: usize, cell: usize, colspan: usize) -> CellMarkup;
}

/// How evicted rows are disposed of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvictionPolicy {
    /// Detach post-rendered nodes and queue them for cleanup instead of removing them
    pub deferred_cleanup: bool,
    /// Hide the row last touched by the mouse wheel instead of destroying it
    pub retain_momentum_row: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub rows_rendered: usize,
    pub rows_removed: usize,
    pub cells_rendered: usize,
    pub cells_removed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RowEntry {
    pub node: NodeId,
    cells: BTreeMap<usize, NodeId>,
    colspans: BTreeMap<usize, usize>,
    pending: VecDeque<usize>,
}

impl RowEntry {
    fn new(node: NodeId) -> Self {
        Self {
            node,
            ..Self::default()
        }
    }

    /// Columns with a rendered cell, in order.
    pub fn rendered_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.colspans.keys().copied()
    }

    pub fn colspan(&self, cell: usize) -> Option<usize> {
        self.colspans.get(&cell).copied()
    }

    /// Index queued cells against the nodes the surface reports for this row.
    fn index_cells(&mut self, surface: &dyn Surface) {
        if self.pending.is_empty() {
            return;
        }
        let nodes = surface.cell_nodes(self.node);
        let start = nodes.len().saturating_sub(self.pending.len());
        for (cell, node) in self.pending.drain(..).zip(nodes.into_iter().skip(start)) {
            self.cells.insert(cell, node);
        }
    }
}

#[derive(Debug, Clone)]
struct Zombie {
    row: usize,
    entry: RowEntry,
    statuses: Option<RowStatuses>,
    /// The wheel has moved to another row; destroy on the next eviction pass
    released: bool,
}

/// Outcome of one [`RenderCache::reconcile`] pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub rows_removed: usize,
    pub rows_rendered: Vec<usize>,
    pub cells_removed: usize,
    pub cells_rendered: usize,
    /// Something was queued for deferred cleanup
    pub cleanup_queued: bool,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.rows_removed == 0
            && self.rows_rendered.is_empty()
            && self.cells_removed == 0
            && self.cells_rendered == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderCache {
    rows: BTreeMap<usize, RowEntry>,
    wheel_row: Option<NodeId>,
    zombie: Option<Zombie>,
    stats: CacheStats,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, row: usize) -> bool {
        self.rows.contains_key(&row)
    }

    pub fn rows(&self) -> Vec<usize> {
        self.rows.keys().copied().collect()
    }

    pub fn entry(&self, row: usize) -> Option<&RowEntry> {
        self.rows.get(&row)
    }

    pub fn row_node(&self, row: usize) -> Option<NodeId> {
        self.rows.get(&row).map(|e| e.node)
    }

    /// Row of the hidden momentum row, if one is being kept.
    pub fn zombie_row(&self) -> Option<usize> {
        self.zombie.as_ref().map(|z| z.row)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Node of the rendered cell at `(row, cell)`.
    pub fn cell_node(&mut self, row: usize, cell: usize, surface: &dyn Surface) -> Option<NodeId> {
        let entry = self.rows.get_mut(&row)?;
        entry.index_cells(surface);
        entry.cells.get(&cell).copied()
    }

    /// Rendered `(cell, node)` pairs of a row.
    pub fn cell_nodes(&mut self, row: usize, surface: &dyn Surface) -> Vec<(usize, NodeId)> {
        match self.rows.get_mut(&row) {
            Some(entry) => {
                entry.index_cells(surface);
                entry.cells.iter().map(|(c, n)| (*c, *n)).collect()
            }
            None => Vec::new(),
        }
    }

    /// Bring the cache in line with `range`.
    ///
    /// Rows outside the range are evicted (except `active_row`), cells of
    /// cached rows are brought in line with the horizontal window when
    /// `horizontal_changed`, and missing rows are rendered in one batch.
    #[allow(clippy::too_many_arguments)]
    pub fn reconcile(
        &mut self,
        range: &ViewRange,
        active: Option<(usize, usize)>,
        horizontal_changed: bool,
        painter: &dyn RowPainter,
        surface: &mut dyn Surface,
        post: &mut PostRenderQueue,
        policy: EvictionPolicy,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        if self.zombie.as_ref().is_some_and(|z| z.released) {
            if let Some(zombie) = self.zombie.take() {
                tracing::trace!(row = zombie.row, "destroying momentum row");
                report.cleanup_queued |= Self::destroy_zombie(zombie, surface, post, policy);
            }
        }
        self.cleanup_rows(range, active.map(|(row, _)| row), surface, post, policy, &mut report);
        if horizontal_changed {
            self.clean_up_and_render_cells(range, active, painter, surface, post, policy, &mut report);
        }
        report.rows_rendered = self.render_rows(range, painter, surface);
        tracing::debug!(
            removed = report.rows_removed,
            rendered = report.rows_rendered.len(),
            cells_removed = report.cells_removed,
            cells_rendered = report.cells_rendered,
            cached = self.rows.len(),
            "reconciled render cache"
        );
        report
    }

    fn cleanup_rows(
        &mut self,
        keep: &ViewRange,
        active_row: Option<usize>,
        surface: &mut dyn Surface,
        post: &mut PostRenderQueue,
        policy: EvictionPolicy,
        report: &mut ReconcileReport,
    ) {
        let doomed: Vec<usize> = self
            .rows
            .keys()
            .copied()
            .filter(|row| !keep.contains_row(*row) && Some(*row) != active_row)
            .collect();
        for row in doomed {
            report.cleanup_queued |= self.remove_row(row, surface, post, policy);
            report.rows_removed += 1;
        }
    }

    /// Evict one row. Returns `true` if its nodes were queued for deferred cleanup.
    pub fn remove_row(
        &mut self,
        row: usize,
        surface: &mut dyn Surface,
        post: &mut PostRenderQueue,
        policy: EvictionPolicy,
    ) -> bool {
        let Some(mut entry) = self.rows.remove(&row) else {
            return false;
        };
        let statuses = post.take_row(row);
        self.stats.rows_removed += 1;

        if policy.retain_momentum_row && self.wheel_row == Some(entry.node) {
            let mut queued = false;
            if let Some(old) = self.zombie.take() {
                queued = Self::destroy_zombie(old, surface, post, policy);
            }
            entry.index_cells(surface);
            surface.hide_row(entry.node);
            tracing::trace!(row, "keeping momentum row hidden");
            self.zombie = Some(Zombie {
                row,
                entry,
                statuses,
                released: false,
            });
            return queued;
        }

        match statuses {
            Some(statuses) if policy.deferred_cleanup && !statuses.is_empty() => {
                entry.index_cells(surface);
                Self::queue_row_cleanup(row, &entry, &statuses, surface, post);
                true
            }
            _ => {
                surface.remove_row(entry.node);
                false
            }
        }
    }

    /// Evict every cached row.
    pub fn remove_all(
        &mut self,
        surface: &mut dyn Surface,
        post: &mut PostRenderQueue,
        policy: EvictionPolicy,
    ) -> bool {
        let mut queued = false;
        for row in self.rows() {
            queued |= self.remove_row(row, surface, post, policy);
        }
        queued
    }

    /// Evict rows at or after `row_count`.
    pub fn truncate(
        &mut self,
        row_count: usize,
        surface: &mut dyn Surface,
        post: &mut PostRenderQueue,
        policy: EvictionPolicy,
    ) -> bool {
        let doomed: Vec<usize> = self.rows.range(row_count..).map(|(r, _)| *r).collect();
        let mut queued = false;
        for row in doomed {
            queued |= self.remove_row(row, surface, post, policy);
        }
        queued
    }

    fn queue_row_cleanup(
        row: usize,
        entry: &RowEntry,
        statuses: &RowStatuses,
        surface: &mut dyn Surface,
        post: &mut PostRenderQueue,
    ) {
        let group = post.next_group();
        for cell in statuses.keys() {
            if let Some(node) = entry.cells.get(cell) {
                post.queue_cleanup(CleanupEntry {
                    group,
                    action: CleanupAction::Cell,
                    node: *node,
                    row,
                    cell: Some(*cell),
                });
            }
        }
        post.queue_cleanup(CleanupEntry {
            group,
            action: CleanupAction::Row,
            node: entry.node,
            row,
            cell: None,
        });
        surface.detach_row(entry.node);
    }

    fn destroy_zombie(
        zombie: Zombie,
        surface: &mut dyn Surface,
        post: &mut PostRenderQueue,
        policy: EvictionPolicy,
    ) -> bool {
        match zombie.statuses {
            Some(statuses) if policy.deferred_cleanup && !statuses.is_empty() => {
                Self::queue_row_cleanup(zombie.row, &zombie.entry, &statuses, surface, post);
                true
            }
            _ => {
                surface.remove_row(zombie.entry.node);
                false
            }
        }
    }

    /// Record the row under the latest wheel event.
    ///
    /// When the wheel moves to a different row, a hidden momentum row kept for
    /// the previous one is released and destroyed by the next eviction pass.
    pub fn note_wheel_row(&mut self, row: Option<usize>) {
        let node = row.and_then(|r| self.row_node(r));
        if node == self.wheel_row {
            return;
        }
        if let Some(zombie) = self.zombie.as_mut() {
            if Some(zombie.entry.node) != node {
                tracing::trace!(row = zombie.row, "releasing momentum row");
                zombie.released = true;
            }
        }
        self.wheel_row = node;
    }

    fn build_row(
        row: usize,
        range: &ViewRange,
        painter: &dyn RowPainter,
    ) -> (RowMarkup, BTreeMap<usize, usize>, VecDeque<usize>) {
        let mut markup = painter.row_markup(row);
        let mut colspans = BTreeMap::new();
        let mut pending = VecDeque::new();
        let bounds = painter.bounds();
        let mut cell = 0;
        while cell < bounds.len() {
            if bounds.left(cell).unwrap_or(0.0) > range.right_px {
                break;
            }
            let colspan = painter.colspan(row, cell).max(1);
            if bounds.span_right(cell, colspan) > range.left_px {
                markup.cells.push(painter.cell_markup(row, cell, colspan));
                colspans.insert(cell, colspan);
                pending.push_back(cell);
            }
            cell += colspan;
        }
        (markup, colspans, pending)
    }

    fn render_rows(
        &mut self,
        range: &ViewRange,
        painter: &dyn RowPainter,
        surface: &mut dyn Surface,
    ) -> Vec<usize> {
        let row_count = painter.row_count();
        let mut rows = Vec::new();
        let mut markups = Vec::new();
        let mut layouts = Vec::new();
        for row in range.top..=range.bottom {
            if row >= row_count || self.rows.contains_key(&row) {
                continue;
            }
            let (markup, colspans, pending) = Self::build_row(row, range, painter);
            rows.push(row);
            markups.push(markup);
            layouts.push((colspans, pending));
        }
        if rows.is_empty() {
            return rows;
        }

        let nodes = surface.create_rows(markups);
        for ((row, node), (colspans, pending)) in rows.iter().zip(nodes).zip(layouts) {
            self.stats.cells_rendered += colspans.len();
            let mut entry = RowEntry::new(node);
            entry.colspans = colspans;
            entry.pending = pending;
            self.rows.insert(*row, entry);
        }
        self.stats.rows_rendered += rows.len();
        rows
    }

    #[allow(clippy::too_many_arguments)]
    fn clean_up_and_render_cells(
        &mut self,
        range: &ViewRange,
        active: Option<(usize, usize)>,
        painter: &dyn RowPainter,
        surface: &mut dyn Surface,
        post: &mut PostRenderQueue,
        policy: EvictionPolicy,
        report: &mut ReconcileReport,
    ) {
        let bounds = painter.bounds();
        let rows: Vec<usize> = self
            .rows
            .range(range.top..=range.bottom)
            .map(|(r, _)| *r)
            .collect();

        for row in rows {
            let Some(entry) = self.rows.get_mut(&row) else {
                continue;
            };
            entry.index_cells(surface);

            let outside: Vec<usize> = entry
                .colspans
                .iter()
                .filter(|(cell, span)| {
                    bounds.left(**cell).unwrap_or(0.0) > range.right_px
                        || bounds.span_right(**cell, **span) < range.left_px
                })
                .map(|(cell, _)| *cell)
                .filter(|cell| active != Some((row, *cell)))
                .collect();
            if !outside.is_empty() {
                let group = post.next_group();
                for cell in outside.into_iter().rev() {
                    entry.colspans.remove(&cell);
                    let Some(node) = entry.cells.remove(&cell) else {
                        continue;
                    };
                    let processed = post.forget_cell(row, cell).is_some();
                    if policy.deferred_cleanup && processed {
                        surface.detach_cell(entry.node, node);
                        post.queue_cleanup(CleanupEntry {
                            group,
                            action: CleanupAction::Cell,
                            node,
                            row,
                            cell: Some(cell),
                        });
                        report.cleanup_queued = true;
                    } else {
                        surface.remove_cell(entry.node, node);
                    }
                    report.cells_removed += 1;
                    self.stats.cells_removed += 1;
                }
            }

            let mut added = Vec::new();
            let mut added_cells = Vec::new();
            let mut cell = 0;
            while cell < bounds.len() {
                if bounds.left(cell).unwrap_or(0.0) > range.right_px {
                    break;
                }
                if let Some(span) = entry.colspans.get(&cell) {
                    cell += (*span).max(1);
                    continue;
                }
                let colspan = painter.colspan(row, cell).max(1);
                if bounds.span_right(cell, colspan) > range.left_px {
                    added.push(painter.cell_markup(row, cell, colspan));
                    added_cells.push(cell);
                    entry.colspans.insert(cell, colspan);
                }
                cell += colspan;
            }
            if !added.is_empty() {
                let nodes = surface.append_cells(entry.node, added);
                report.cells_rendered += added_cells.len();
                self.stats.cells_rendered += added_cells.len();
                for (cell, node) in added_cells.into_iter().zip(nodes) {
                    entry.cells.insert(cell, node);
                }
            }
        }
    }

    /// Move every cached row to its position under the current paging offset.
    pub fn update_row_positions(&self, paging: &Paging, row_height: f64, surface: &mut dyn Surface) {
        for (row, entry) in &self.rows {
            surface.set_row_top(entry.node, paging.row_top(*row, row_height));
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::render::RecordingSurface;
    use crate::types::Column;

    struct Painter {
        rows: usize,
        bounds: ColumnBounds,
    }

    impl Painter {
        fn new(rows: usize, columns: usize) -> Self {
            let columns: Vec<Column> = (0..columns)
                .map(|i| Column::new(format!("c{i}")).with_width(100.0))
                .collect();
            Self {
                rows,
                bounds: ColumnBounds::compute(&columns),
            }
        }
    }

    impl RowPainter for Painter {
        fn row_count(&self) -> usize {
            self.rows
        }

        fn bounds(&self) -> &ColumnBounds {
            &self.bounds
        }

        fn colspan(&self, _row: usize, _cell: usize) -> usize {
            1
        }

        fn row_markup(&self, row: usize) -> RowMarkup {
            RowMarkup {
                row,
                top: row as f64 * 25.0,
                classes: Vec::new(),
                data_id: None,
                cells: Vec::new(),
            }
        }

        fn cell_markup(&self, row: usize, cell: usize, colspan: usize) -> CellMarkup {
            CellMarkup {
                cell,
                colspan,
                classes: Vec::new(),
                text: format!("{row}:{cell}"),
            }
        }
    }

    fn range(top: usize, bottom: usize, left_px: f64, right_px: f64) -> ViewRange {
        ViewRange {
            top,
            bottom,
            left_px,
            right_px,
        }
    }

    #[test]
    fn test_lazy_cell_indexing() {
        let painter = Painter::new(10, 3);
        let mut surface = RecordingSurface::new();
        let mut post = PostRenderQueue::new();
        let mut cache = RenderCache::new();
        cache.reconcile(
            &range(0, 2, 0.0, 300.0),
            None,
            false,
            &painter,
            &mut surface,
            &mut post,
            EvictionPolicy::default(),
        );
        assert_eq!(cache.len(), 3);
        let node = cache.cell_node(1, 2, &surface).unwrap();
        assert_eq!(surface.cell(node).unwrap().text, "1:2");
        assert_eq!(cache.cell_node(1, 5, &surface), None);
    }

    #[test]
    fn test_active_row_survives_eviction() {
        let painter = Painter::new(100, 2);
        let mut surface = RecordingSurface::new();
        let mut post = PostRenderQueue::new();
        let mut cache = RenderCache::new();
        let policy = EvictionPolicy::default();
        cache.reconcile(&range(0, 5, 0.0, 200.0), None, false, &painter, &mut surface, &mut post, policy);
        let report = cache.reconcile(
            &range(50, 55, 0.0, 200.0),
            Some((2, 0)),
            false,
            &painter,
            &mut surface,
            &mut post,
            policy,
        );
        assert_eq!(report.rows_removed, 5);
        assert!(cache.contains(2));
        assert_eq!(cache.len(), 7);
    }

    #[test]
    fn test_momentum_row_hidden_then_destroyed() {
        let painter = Painter::new(100, 1);
        let mut surface = RecordingSurface::new();
        let mut post = PostRenderQueue::new();
        let mut cache = RenderCache::new();
        let policy = EvictionPolicy {
            deferred_cleanup: false,
            retain_momentum_row: true,
        };
        cache.reconcile(&range(0, 3, 0.0, 100.0), None, false, &painter, &mut surface, &mut post, policy);
        cache.note_wheel_row(Some(1));
        let node = cache.row_node(1).unwrap();

        cache.reconcile(&range(10, 13, 0.0, 100.0), None, false, &painter, &mut surface, &mut post, policy);
        assert_eq!(cache.zombie_row(), Some(1));
        assert!(surface.row(node).unwrap().hidden);

        // Released when the wheel moves on, destroyed by the next pass.
        cache.note_wheel_row(Some(11));
        assert_eq!(cache.zombie_row(), Some(1));
        assert!(surface.row(node).unwrap().hidden);
        let report = cache.reconcile(&range(10, 13, 0.0, 100.0), None, false, &painter, &mut surface, &mut post, policy);
        assert!(report.is_noop());
        assert_eq!(cache.zombie_row(), None);
        assert!(surface.row(node).is_none());
    }
}
