//! Named cell style overlays.
//!
//! Each overlay maps `row -> column id -> class` and is stored under a key
//! (the selection overlay uses the selected-cell class as its key). Overlays
//! are applied on top of the classes a cell is rendered with.

use std::collections::BTreeMap;

use crate::error::{GridError, Result};

/// `row -> column id -> space-separated classes`
pub type CssHash = BTreeMap<usize, BTreeMap<String, String>>;

#[derive(Debug, Clone, Default)]
pub struct CellCssStyles {
    layers: Vec<(String, CssHash)>,
}

impl CellCssStyles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&CssHash> {
        self.layers.iter().find(|(k, _)| k == key).map(|(_, h)| h)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Add a new overlay. Fails if `key` is already in use.
    pub fn add(&mut self, key: &str, hash: CssHash) -> Result<()> {
        if self.contains(key) {
            return Err(GridError::DuplicateStyleKey(key.to_string()));
        }
        self.layers.push((key.to_string(), hash));
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<CssHash> {
        let index = self.layers.iter().position(|(k, _)| k == key)?;
        Some(self.layers.remove(index).1)
    }

    /// Replace (or add) an overlay, returning the previous one.
    pub fn set(&mut self, key: &str, hash: CssHash) -> Option<CssHash> {
        match self.layers.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, hash)),
            None => {
                self.layers.push((key.to_string(), hash));
                None
            }
        }
    }

    /// Classes every overlay assigns to a cell, in overlay order.
    pub fn classes_for(&self, row: usize, column_id: &str) -> Vec<&str> {
        self.layers
            .iter()
            .filter_map(|(_, hash)| hash.get(&row).and_then(|cols| cols.get(column_id)))
            .flat_map(|classes| classes.split_whitespace())
            .collect()
    }
}
