//! The host drawing surface.
//!
//! The grid describes rows and cells as markup and hands them to a [`Surface`]
//! in batches; the surface owns the real nodes (DOM elements, terminal cells,
//! a test recorder) and returns opaque [`NodeId`] handles.

use std::collections::{BTreeSet, HashMap};

pub type NodeId = u64;

#[derive(Debug, Clone, PartialEq)]
pub struct CellMarkup {
    pub cell: usize,
    pub colspan: usize,
    pub classes: Vec<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowMarkup {
    pub row: usize,
    pub top: f64,
    pub classes: Vec<String>,
    /// The item's `id`, exposed on the row node as `data-id`
    pub data_id: Option<String>,
    pub cells: Vec<CellMarkup>,
}

pub trait Surface {
    /// Materialize rows, with their cells, in one batch. Returns row handles in input order.
    fn create_rows(&mut self, rows: Vec<RowMarkup>) -> Vec<NodeId>;

    /// Append cells to an existing row. Returns cell handles in input order.
    fn append_cells(&mut self, row: NodeId, cells: Vec<CellMarkup>) -> Vec<NodeId>;

    /// Cell handles of a row in display order.
    fn cell_nodes(&self, row: NodeId) -> Vec<NodeId>;

    fn remove_row(&mut self, row: NodeId);

    fn remove_cell(&mut self, row: NodeId, cell: NodeId);

    /// Take a row off screen but keep the node alive until [`Surface::release`].
    fn detach_row(&mut self, row: NodeId);

    fn detach_cell(&mut self, row: NodeId, cell: NodeId);

    /// Destroy a node previously detached.
    fn release(&mut self, node: NodeId);

    fn hide_row(&mut self, row: NodeId);

    fn set_row_top(&mut self, row: NodeId, top: f64);

    fn set_cell_content(&mut self, cell: NodeId, text: &str);

    fn add_class(&mut self, node: NodeId, class: &str);

    fn remove_class(&mut self, node: NodeId, class: &str);

    /// Size of the scrollable canvas changed.
    fn set_canvas_size(&mut self, _width: f64, _height: f64) {}

    /// The grid moved the platform scroll position itself.
    fn scroll_viewport(&mut self, _scroll_top: f64, _scroll_left: f64) {}

    /// Column `(left, right)` pixel edges changed.
    fn apply_column_widths(&mut self, _edges: &[(f64, f64)]) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRow {
    pub row: usize,
    pub top: f64,
    pub classes: BTreeSet<String>,
    pub data_id: Option<String>,
    pub cells: Vec<NodeId>,
    pub attached: bool,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCell {
    pub cell: usize,
    pub colspan: usize,
    pub classes: BTreeSet<String>,
    pub text: String,
    pub attached: bool,
    pub parent: NodeId,
}

/// Counters of surface mutations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceStats {
    pub rows_created: usize,
    pub rows_removed: usize,
    pub cells_created: usize,
    pub cells_removed: usize,
    pub row_batches: usize,
    pub content_updates: usize,
}

impl SurfaceStats {
    /// Total nodes created or destroyed
    pub fn churn(&self) -> usize {
        self.rows_created + self.rows_removed + self.cells_created + self.cells_removed
    }
}

/// In-memory surface that records every node it is asked to manage.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    next_id: NodeId,
    rows: HashMap<NodeId, RecordedRow>,
    cells: HashMap<NodeId, RecordedCell>,
    stats: SurfaceStats,
    pub canvas_size: (f64, f64),
    pub scroll: (f64, f64),
    pub column_edges: Vec<(f64, f64)>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> SurfaceStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SurfaceStats::default();
    }

    fn alloc(&mut self) -> NodeId {
        self.next_id += 1;
        self.next_id
    }

    pub fn row(&self, node: NodeId) -> Option<&RecordedRow> {
        self.rows.get(&node)
    }

    pub fn cell(&self, node: NodeId) -> Option<&RecordedCell> {
        self.cells.get(&node)
    }

    /// Sorted indices of rows that are attached and not hidden.
    pub fn visible_rows(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self
            .rows
            .values()
            .filter(|r| r.attached && !r.hidden)
            .map(|r| r.row)
            .collect();
        rows.sort_unstable();
        rows
    }

    /// Node of the attached row displaying `row`, hidden rows included.
    pub fn row_node(&self, row: usize) -> Option<NodeId> {
        self.rows
            .iter()
            .filter(|(_, r)| r.attached && r.row == row)
            .map(|(id, _)| *id)
            .min()
    }

    /// The attached cell displaying column `cell` of `row`.
    pub fn find_cell(&self, row: usize, cell: usize) -> Option<&RecordedCell> {
        let row = self.rows.get(&self.row_node(row)?)?;
        row.cells
            .iter()
            .filter_map(|id| self.cells.get(id))
            .find(|c| c.attached && c.cell == cell)
    }

    /// Column indices of the attached cells of `row`, in display order.
    pub fn row_cells(&self, row: usize) -> Vec<usize> {
        self.row_node(row)
            .and_then(|node| self.rows.get(&node))
            .map(|r| {
                r.cells
                    .iter()
                    .filter_map(|id| self.cells.get(id))
                    .filter(|c| c.attached)
                    .map(|c| c.cell)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nodes that still exist (attached or detached awaiting release).
    pub fn live_nodes(&self) -> usize {
        self.rows.len() + self.cells.len()
    }

    fn insert_cells(&mut self, parent: NodeId, cells: Vec<CellMarkup>) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(cells.len());
        for markup in cells {
            let id = self.alloc();
            self.cells.insert(
                id,
                RecordedCell {
                    cell: markup.cell,
                    colspan: markup.colspan,
                    classes: markup.classes.into_iter().collect(),
                    text: markup.text,
                    attached: true,
                    parent,
                },
            );
            ids.push(id);
        }
        self.stats.cells_created += ids.len();
        if let Some(row) = self.rows.get_mut(&parent) {
            row.cells.extend(ids.iter().copied());
        }
        ids
    }
}

impl Surface for RecordingSurface {
    fn create_rows(&mut self, rows: Vec<RowMarkup>) -> Vec<NodeId> {
        self.stats.row_batches += 1;
        let mut ids = Vec::with_capacity(rows.len());
        for markup in rows {
            let id = self.alloc();
            self.rows.insert(
                id,
                RecordedRow {
                    row: markup.row,
                    top: markup.top,
                    classes: markup.classes.into_iter().collect(),
                    data_id: markup.data_id,
                    cells: Vec::new(),
                    attached: true,
                    hidden: false,
                },
            );
            self.stats.rows_created += 1;
            self.insert_cells(id, markup.cells);
            ids.push(id);
        }
        ids
    }

    fn append_cells(&mut self, row: NodeId, cells: Vec<CellMarkup>) -> Vec<NodeId> {
        self.insert_cells(row, cells)
    }

    fn cell_nodes(&self, row: NodeId) -> Vec<NodeId> {
        self.rows
            .get(&row)
            .map(|r| {
                r.cells
                    .iter()
                    .copied()
                    .filter(|id| self.cells.get(id).is_some_and(|c| c.attached))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn remove_row(&mut self, row: NodeId) {
        if let Some(removed) = self.rows.remove(&row) {
            for cell in removed.cells {
                if self.cells.remove(&cell).is_some() {
                    self.stats.cells_removed += 1;
                }
            }
            self.stats.rows_removed += 1;
        }
    }

    fn remove_cell(&mut self, row: NodeId, cell: NodeId) {
        if self.cells.remove(&cell).is_some() {
            self.stats.cells_removed += 1;
        }
        if let Some(r) = self.rows.get_mut(&row) {
            r.cells.retain(|id| *id != cell);
        }
    }

    fn detach_row(&mut self, row: NodeId) {
        if let Some(r) = self.rows.get_mut(&row) {
            r.attached = false;
        }
    }

    fn detach_cell(&mut self, _row: NodeId, cell: NodeId) {
        if let Some(c) = self.cells.get_mut(&cell) {
            c.attached = false;
        }
    }

    fn release(&mut self, node: NodeId) {
        if self.rows.contains_key(&node) {
            self.remove_row(node);
        } else if let Some(cell) = self.cells.get(&node) {
            let parent = cell.parent;
            self.remove_cell(parent, node);
        }
    }

    fn hide_row(&mut self, row: NodeId) {
        if let Some(r) = self.rows.get_mut(&row) {
            r.hidden = true;
        }
    }

    fn set_row_top(&mut self, row: NodeId, top: f64) {
        if let Some(r) = self.rows.get_mut(&row) {
            r.top = top;
        }
    }

    fn set_cell_content(&mut self, cell: NodeId, text: &str) {
        if let Some(c) = self.cells.get_mut(&cell) {
            c.text = text.to_string();
            self.stats.content_updates += 1;
        }
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(r) = self.rows.get_mut(&node) {
            r.classes.insert(class.to_string());
        } else if let Some(c) = self.cells.get_mut(&node) {
            c.classes.insert(class.to_string());
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(r) = self.rows.get_mut(&node) {
            r.classes.remove(class);
        } else if let Some(c) = self.cells.get_mut(&node) {
            c.classes.remove(class);
        }
    }

    fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.canvas_size = (width, height);
    }

    fn scroll_viewport(&mut self, scroll_top: f64, scroll_left: f64) {
        self.scroll = (scroll_top, scroll_left);
    }

    fn apply_column_widths(&mut self, edges: &[(f64, f64)]) {
        self.column_edges = edges.to_vec();
    }
}
