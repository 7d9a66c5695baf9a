//! Data types shared by the grid components.

mod column;
mod metadata;
mod range;

pub use column::*;
pub use metadata::*;
pub use range::*;

/// A data item: a JSON object keyed by column field
pub type Item = serde_json::Map<String, serde_json::Value>;
