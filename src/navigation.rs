//! Cell navigation.
//!
//! Direction resolvers are pure functions over a [`CellGraph`]: they take the
//! current position (row, cell and the tracked column `pos_x`) and return the
//! next eligible position, or `None` for "no move". `pos_x` survives vertical
//! moves so that passing through spanned or unfocusable cells does not drift
//! the column.

use std::str::FromStr;

use crate::data::DataSource;
use crate::error::GridError;
use crate::types::{CellPosition, Column};

/// What the resolvers need to know about the grid.
pub trait CellGraph {
    fn column_count(&self) -> usize;

    /// Row count including the pending-insert row.
    fn row_count(&self) -> usize;

    /// Columns covered by the cell; always at least 1.
    fn colspan(&self, row: usize, cell: usize) -> usize;

    fn can_cell_be_active(&self, row: usize, cell: usize) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Next,
    Prev,
    Home,
    End,
}

impl FromStr for Direction {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "next" => Ok(Self::Next),
            "prev" => Ok(Self::Prev),
            "home" => Ok(Self::Home),
            "end" => Ok(Self::End),
            other => Err(GridError::Other(format!("unknown direction: {other}"))),
        }
    }
}

impl Direction {
    /// Whether the direction can start without an active cell.
    pub fn starts_without_active_cell(self) -> bool {
        matches!(self, Self::Next | Self::Prev)
    }

    /// Travel direction for rendering purposes: -1 backward, 1 forward.
    pub fn tabbing(self) -> i8 {
        match self {
            Self::Up | Self::Left | Self::Prev | Self::Home => -1,
            Self::Down | Self::Right | Self::Next | Self::End => 1,
        }
    }
}

fn span(graph: &dyn CellGraph, row: usize, cell: usize) -> usize {
    graph.colspan(row, cell).max(1)
}

pub fn first_focusable_cell(graph: &dyn CellGraph, row: usize) -> Option<usize> {
    let mut cell = 0;
    while cell < graph.column_count() {
        if graph.can_cell_be_active(row, cell) {
            return Some(cell);
        }
        cell += span(graph, row, cell);
    }
    None
}

pub fn last_focusable_cell(graph: &dyn CellGraph, row: usize) -> Option<usize> {
    let mut cell = 0;
    let mut last = None;
    while cell < graph.column_count() {
        if graph.can_cell_be_active(row, cell) {
            last = Some(cell);
        }
        cell += span(graph, row, cell);
    }
    last
}

/// The cell that occupies logical column `pos_x` in `row`.
fn cell_at_column(graph: &dyn CellGraph, row: usize, pos_x: usize) -> usize {
    let columns = graph.column_count();
    let target = pos_x.min(columns.saturating_sub(1));
    let mut cell = 0;
    let mut prev = 0;
    while cell <= target && cell < columns {
        prev = cell;
        cell += span(graph, row, cell);
    }
    prev
}

pub fn goto_right(graph: &dyn CellGraph, from: CellPosition) -> Option<CellPosition> {
    let columns = graph.column_count();
    let mut cell = from.cell;
    if cell >= columns {
        return None;
    }
    loop {
        cell += span(graph, from.row, cell);
        if cell >= columns || graph.can_cell_be_active(from.row, cell) {
            break;
        }
    }
    (cell < columns).then_some(CellPosition {
        row: from.row,
        cell,
        pos_x: cell,
    })
}

pub fn goto_left(graph: &dyn CellGraph, from: CellPosition) -> Option<CellPosition> {
    if from.cell == 0 {
        return None;
    }
    let first = first_focusable_cell(graph, from.row)?;
    if first >= from.cell {
        return None;
    }
    let mut prev = CellPosition {
        row: from.row,
        cell: first,
        pos_x: first,
    };
    loop {
        let pos = goto_right(graph, prev)?;
        if pos.cell >= from.cell {
            return Some(prev);
        }
        prev = pos;
    }
}

pub fn goto_down(graph: &dyn CellGraph, from: CellPosition) -> Option<CellPosition> {
    if graph.column_count() == 0 {
        return None;
    }
    ((from.row + 1)..graph.row_count()).find_map(|row| {
        let cell = cell_at_column(graph, row, from.pos_x);
        graph.can_cell_be_active(row, cell).then_some(CellPosition {
            row,
            cell,
            pos_x: from.pos_x,
        })
    })
}

pub fn goto_up(graph: &dyn CellGraph, from: CellPosition) -> Option<CellPosition> {
    if graph.column_count() == 0 {
        return None;
    }
    (0..from.row.min(graph.row_count())).rev().find_map(|row| {
        let cell = cell_at_column(graph, row, from.pos_x);
        graph.can_cell_be_active(row, cell).then_some(CellPosition {
            row,
            cell,
            pos_x: from.pos_x,
        })
    })
}

/// Row-major forward traversal; with no active cell, starts at the top-left.
pub fn goto_next(graph: &dyn CellGraph, from: Option<CellPosition>) -> Option<CellPosition> {
    let rows = graph.row_count();
    let from = match from {
        Some(pos) => pos,
        None => {
            if graph.can_cell_be_active(0, 0) {
                return Some(CellPosition::default());
            }
            CellPosition::default()
        }
    };
    if let Some(pos) = goto_right(graph, from) {
        return Some(pos);
    }
    // On the last row, cycle through its own cells rather than stopping.
    let start = if rows > 0 && from.row == rows - 1 {
        from.row
    } else {
        from.row + 1
    };
    (start..rows).find_map(|row| {
        first_focusable_cell(graph, row).map(|cell| CellPosition {
            row,
            cell,
            pos_x: cell,
        })
    })
}

/// Row-major backward traversal; with no active cell, starts at the bottom-right.
pub fn goto_prev(graph: &dyn CellGraph, from: Option<CellPosition>) -> Option<CellPosition> {
    let mut from = match from {
        Some(pos) => pos,
        None => {
            let row = graph.row_count().checked_sub(1)?;
            let cell = graph.column_count().checked_sub(1)?;
            if graph.can_cell_be_active(row, cell) {
                return Some(CellPosition {
                    row,
                    cell,
                    pos_x: cell,
                });
            }
            CellPosition {
                row,
                cell,
                pos_x: cell,
            }
        }
    };
    loop {
        if let Some(pos) = goto_left(graph, from) {
            return Some(pos);
        }
        let row = from.row.checked_sub(1)?;
        if let Some(cell) = last_focusable_cell(graph, row) {
            return Some(CellPosition {
                row,
                cell,
                pos_x: cell,
            });
        }
        from = CellPosition {
            row,
            cell: 0,
            pos_x: from.pos_x,
        };
    }
}

pub fn goto_row_start(graph: &dyn CellGraph, from: CellPosition) -> Option<CellPosition> {
    first_focusable_cell(graph, from.row).map(|cell| CellPosition {
        row: from.row,
        cell,
        pos_x: from.pos_x,
    })
}

pub fn goto_row_end(graph: &dyn CellGraph, from: CellPosition) -> Option<CellPosition> {
    last_focusable_cell(graph, from.row).map(|cell| CellPosition {
        row: from.row,
        cell,
        pos_x: from.pos_x,
    })
}

/// Resolve one navigation step. `None` means "no move".
pub fn step(
    graph: &dyn CellGraph,
    direction: Direction,
    from: Option<CellPosition>,
) -> Option<CellPosition> {
    match direction {
        Direction::Next => goto_next(graph, from),
        Direction::Prev => goto_prev(graph, from),
        Direction::Up => goto_up(graph, from?),
        Direction::Down => goto_down(graph, from?),
        Direction::Left => goto_left(graph, from?),
        Direction::Right => goto_right(graph, from?),
        Direction::Home => goto_row_start(graph, from?),
        Direction::End => goto_row_end(graph, from?),
    }
}

/// Focus and selection eligibility over live grid state.
pub struct CellRules<'a> {
    pub columns: &'a [Column],
    pub data: &'a dyn DataSource,
    /// Data length plus the pending-insert row, if any
    pub row_count: usize,
    pub enable_cell_navigation: bool,
}

impl CellRules<'_> {
    fn column(&self, cell: usize) -> Option<&Column> {
        self.columns.get(cell)
    }

    /// Row override, then column override by id, then by index, then the column default.
    pub fn can_cell_be_active(&self, row: usize, cell: usize) -> bool {
        if !self.enable_cell_navigation || row >= self.row_count {
            return false;
        }
        let Some(column) = self.column(cell) else {
            return false;
        };
        let metadata = self.data.metadata(row);
        if let Some(focusable) = metadata.and_then(|m| m.focusable) {
            return focusable;
        }
        if let Some(focusable) = metadata
            .and_then(|m| m.by_column_id(&column.id))
            .and_then(|o| o.focusable)
        {
            return focusable;
        }
        if let Some(focusable) = metadata
            .and_then(|m| m.by_column_index(cell))
            .and_then(|o| o.focusable)
        {
            return focusable;
        }
        column.focusable
    }

    /// Like [`CellRules::can_cell_be_active`], but over `selectable` and excluding
    /// the pending-insert row.
    pub fn can_cell_be_selected(&self, row: usize, cell: usize) -> bool {
        if row >= self.data.len() {
            return false;
        }
        let Some(column) = self.column(cell) else {
            return false;
        };
        let metadata = self.data.metadata(row);
        if let Some(selectable) = metadata.and_then(|m| m.selectable) {
            return selectable;
        }
        if let Some(selectable) = metadata
            .and_then(|m| m.column(&column.id, cell))
            .and_then(|o| o.selectable)
        {
            return selectable;
        }
        column.selectable
    }

    pub fn colspan(&self, row: usize, cell: usize) -> usize {
        let Some(column) = self.column(cell) else {
            return 1;
        };
        self.data
            .metadata(row)
            .and_then(|m| m.column(&column.id, cell))
            .and_then(|o| o.colspan)
            .map_or(1, |c| c.resolve(cell, self.columns.len()))
    }
}

impl CellGraph for CellRules<'_> {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn row_count(&self) -> usize {
        self.row_count
    }

    fn colspan(&self, row: usize, cell: usize) -> usize {
        CellRules::colspan(self, row, cell)
    }

    fn can_cell_be_active(&self, row: usize, cell: usize) -> bool {
        CellRules::can_cell_be_active(self, row, cell)
    }
}
