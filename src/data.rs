//! Data source abstraction.
//!
//! The grid never owns rows directly. It asks a [`DataSource`] for the item
//! and optional metadata of a row index, and treats `None` as "not loaded".

use std::collections::HashMap;

use serde_json::Value;

use crate::types::{Item, RowMetadata};

/// The item's `id` as text, if it has a usable one.
pub fn record_id(item: &Item) -> Option<String> {
    match item.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

pub trait DataSource {
    /// Number of data rows, excluding the pending-insert row.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The item at `row`, or `None` if it is not loaded yet.
    fn item(&self, row: usize) -> Option<&Item>;

    fn item_mut(&mut self, row: usize) -> Option<&mut Item>;

    fn metadata(&self, _row: usize) -> Option<&RowMetadata> {
        None
    }

    /// Called before rows `top..=bottom` are rendered so lazy sources can load them.
    fn prepare(&mut self, _top: usize, _bottom: usize) {}
}

/// In-memory data source backed by a vector.
#[derive(Debug, Clone, Default)]
pub struct VecDataSource {
    items: Vec<Option<Item>>,
    metadata: HashMap<usize, RowMetadata>,
}

impl VecDataSource {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: items.into_iter().map(Some).collect(),
            metadata: HashMap::new(),
        }
    }

    /// Rows that exist but have not been loaded yet.
    pub fn with_unloaded(len: usize) -> Self {
        Self {
            items: vec![None; len],
            metadata: HashMap::new(),
        }
    }

    pub fn push(&mut self, item: Item) {
        self.items.push(Some(item));
    }

    pub fn set_item(&mut self, row: usize, item: Option<Item>) {
        if let Some(slot) = self.items.get_mut(row) {
            *slot = item;
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
        self.metadata.retain(|row, _| *row < len);
    }

    pub fn set_metadata(&mut self, row: usize, metadata: RowMetadata) {
        self.metadata.insert(row, metadata);
    }
}

impl DataSource for VecDataSource {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn item(&self, row: usize) -> Option<&Item> {
        self.items.get(row).and_then(Option::as_ref)
    }

    fn item_mut(&mut self, row: usize) -> Option<&mut Item> {
        self.items.get_mut(row).and_then(Option::as_mut)
    }

    fn metadata(&self, row: usize) -> Option<&RowMetadata> {
        self.metadata.get(&row)
    }
}

/// Data source of `len` rows whose items are generated on demand and then kept.
///
/// Used for very large synthetic grids where materializing every item up front
/// would be wasteful.
pub struct GeneratedDataSource<F> {
    len: usize,
    generate: F,
    loaded: HashMap<usize, Item>,
}

impl<F: Fn(usize) -> Item> GeneratedDataSource<F> {
    pub fn new(len: usize, generate: F) -> Self {
        Self {
            len,
            generate,
            loaded: HashMap::new(),
        }
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }
}

impl<F: Fn(usize) -> Item> DataSource for GeneratedDataSource<F> {
    fn len(&self) -> usize {
        self.len
    }

    fn item(&self, row: usize) -> Option<&Item> {
        self.loaded.get(&row)
    }

    fn item_mut(&mut self, row: usize) -> Option<&mut Item> {
        self.loaded.get_mut(&row)
    }

    fn prepare(&mut self, top: usize, bottom: usize) {
        if self.len == 0 {
            return;
        }
        let generate = &self.generate;
        for row in top..=bottom.min(self.len.saturating_sub(1)) {
            self.loaded.entry(row).or_insert_with(|| generate(row));
        }
    }
}
