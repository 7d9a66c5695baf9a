//! Bookkeeping for asynchronous post-render hooks and their deferred cleanup.
//!
//! Columns may name an `async_post_render` capability that decorates a cell
//! after it is on screen. Rows are processed one per timer tick, walking the
//! visible window in the direction of scroll. When such a cell or its row is
//! evicted and cleanup is enabled, its nodes are detached and queued here;
//! the queue drains one eviction group per tick.

use std::collections::{BTreeMap, HashMap, VecDeque};

use super::surface::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Rendered,
    /// Rendered once, then invalidated; the hook runs again with `rerender = true`
    Invalidated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupAction {
    Cell,
    Row,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupEntry {
    pub group: u64,
    pub action: CleanupAction,
    pub node: NodeId,
    pub row: usize,
    pub cell: Option<usize>,
}

/// Per-row post-render statuses keyed by column index
pub type RowStatuses = BTreeMap<usize, PostStatus>;

#[derive(Debug, Clone, Default)]
pub struct PostRenderQueue {
    processed: HashMap<usize, RowStatuses>,
    from_row: Option<usize>,
    to_row: Option<usize>,
    cleanup: VecDeque<CleanupEntry>,
    group: u64,
}

impl PostRenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window of rows that still need processing.
    pub fn set_window(&mut self, from_row: usize, to_row: usize) {
        self.from_row = Some(from_row);
        self.to_row = Some(to_row);
    }

    pub fn has_pending_rows(&self) -> bool {
        matches!((self.from_row, self.to_row), (Some(from), Some(to)) if from <= to)
    }

    /// Take the next candidate row, from the top when scrolling forward and
    /// from the bottom otherwise.
    pub fn next_row(&mut self, forward: bool) -> Option<usize> {
        let (from, to) = match (self.from_row, self.to_row) {
            (Some(from), Some(to)) if from <= to => (from, to),
            _ => return None,
        };
        if forward {
            self.from_row = Some(from + 1);
            Some(from)
        } else {
            // Walking below zero empties the window.
            match to.checked_sub(1) {
                Some(next) => self.to_row = Some(next),
                None => self.from_row = Some(from + 1),
            }
            Some(to)
        }
    }

    pub fn status(&self, row: usize, cell: usize) -> Option<PostStatus> {
        self.processed.get(&row).and_then(|r| r.get(&cell)).copied()
    }

    pub fn mark_rendered(&mut self, row: usize, cell: usize) {
        self.processed
            .entry(row)
            .or_default()
            .insert(cell, PostStatus::Rendered);
    }

    pub fn is_processed(&self, row: usize) -> bool {
        self.processed.get(&row).is_some_and(|r| !r.is_empty())
    }

    /// Mark every processed cell of `row` for re-rendering and widen the window to include it.
    pub fn invalidate_row(&mut self, row: usize) {
        if let Some(statuses) = self.processed.get_mut(&row) {
            for status in statuses.values_mut() {
                *status = PostStatus::Invalidated;
            }
        }
        self.from_row = Some(self.from_row.map_or(row, |from| from.min(row)));
        self.to_row = Some(self.to_row.map_or(row, |to| to.max(row)));
    }

    /// Forget a row, returning its statuses.
    pub fn take_row(&mut self, row: usize) -> Option<RowStatuses> {
        self.processed.remove(&row)
    }

    pub fn restore_row(&mut self, row: usize, statuses: RowStatuses) {
        self.processed.insert(row, statuses);
    }

    pub fn forget_cell(&mut self, row: usize, cell: usize) -> Option<PostStatus> {
        self.processed.get_mut(&row).and_then(|r| r.remove(&cell))
    }

    pub fn clear(&mut self) {
        self.processed.clear();
        self.from_row = None;
        self.to_row = None;
    }

    /// Start a new cleanup group; everything queued until the next call drains together.
    pub fn next_group(&mut self) -> u64 {
        self.group += 1;
        self.group
    }

    pub fn current_group(&self) -> u64 {
        self.group
    }

    pub fn queue_cleanup(&mut self, entry: CleanupEntry) {
        self.cleanup.push_back(entry);
    }

    pub fn has_pending_cleanup(&self) -> bool {
        !self.cleanup.is_empty()
    }

    pub fn pending_cleanup(&self) -> usize {
        self.cleanup.len()
    }

    /// Remove and return every queued entry of the oldest group.
    pub fn pop_cleanup_group(&mut self) -> Vec<CleanupEntry> {
        let Some(group) = self.cleanup.front().map(|e| e.group) else {
            return Vec::new();
        };
        let mut batch = Vec::new();
        while self.cleanup.front().is_some_and(|e| e.group == group) {
            if let Some(entry) = self.cleanup.pop_front() {
                batch.push(entry);
            }
        }
        batch
    }
}
