use std::collections::HashMap;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// How many columns a cell spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colspan {
    Span(usize),
    /// `"*"`: to the end of the row
    Rest,
}

impl Colspan {
    /// Resolve to a concrete span for a cell at `cell` in a row of `column_count` columns.
    pub fn resolve(self, cell: usize, column_count: usize) -> usize {
        match self {
            Self::Span(n) => n.max(1),
            Self::Rest => column_count.saturating_sub(cell).max(1),
        }
    }
}

impl Serialize for Colspan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Span(n) => serializer.serialize_u64(*n as u64),
            Self::Rest => serializer.serialize_str("*"),
        }
    }
}

impl<'de> Deserialize<'de> for Colspan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) if s == "*" => Ok(Self::Rest),
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Self::Span)
                .ok_or_else(|| de::Error::custom("colspan must be a positive integer")),
            other => Err(de::Error::custom(format!("invalid colspan: {other}"))),
        }
    }
}

/// Per-cell overrides carried by row metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnOverride {
    pub focusable: Option<bool>,
    pub selectable: Option<bool>,
    pub colspan: Option<Colspan>,
    pub editor: Option<String>,
    pub formatter: Option<String>,
}

/// Optional per-row metadata supplied by the data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowMetadata {
    /// Space-separated classes added to the row
    pub css_classes: Option<String>,
    pub focusable: Option<bool>,
    pub selectable: Option<bool>,
    pub formatter: Option<String>,
    /// Cell overrides keyed by column id or by column index
    pub columns: HashMap<String, ColumnOverride>,
}

impl RowMetadata {
    pub fn by_column_id(&self, column_id: &str) -> Option<&ColumnOverride> {
        self.columns.get(column_id)
    }

    pub fn by_column_index(&self, index: usize) -> Option<&ColumnOverride> {
        self.columns.get(&index.to_string())
    }

    /// Override for a cell, preferring the id key over the index key.
    pub fn column(&self, column_id: &str, index: usize) -> Option<&ColumnOverride> {
        self.by_column_id(column_id)
            .or_else(|| self.by_column_index(index))
    }

    pub fn with_column(mut self, key: impl Into<String>, column: ColumnOverride) -> Self {
        self.columns.insert(key.into(), column);
        self
    }
}
