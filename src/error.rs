//! Structured error types for vgrid.
//!
//! Only configuration mistakes surface as errors. Lookup misses are `None`,
//! and validation failures are delivered as grid events.

/// All errors that can occur while configuring or driving a grid.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// Options or column definitions could not be (de)serialized.
    #[error("Options: {0}")]
    Serde(#[from] serde_json::Error),

    /// Viewport or container dimensions are unusable.
    #[error("Invalid container size: {width}x{height}")]
    InvalidContainer { width: f64, height: f64 },

    /// A column names a formatter, editor or post-render hook that is not registered.
    #[error("Unknown {kind} capability '{name}' on column '{column}'")]
    MissingCapability {
        kind: &'static str,
        name: String,
        column: String,
    },

    /// Two columns share the same id.
    #[error("Duplicate column id: {0}")]
    DuplicateColumn(String),

    /// A column id that the grid does not know.
    #[error("Unknown column id: {0}")]
    UnknownColumn(String),

    /// `add_cell_css_styles` was called with a key that already exists.
    #[error("Cell css styles with key '{0}' already exist")]
    DuplicateStyleKey(String),

    /// Selection APIs were used without a selection model installed.
    #[error("Selection model is not set")]
    NoSelectionModel,

    /// An operation that the current options forbid.
    #[error("Not allowed: {0}")]
    NotAllowed(String),

    /// Catch-all for string errors.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;

impl From<String> for GridError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

#[cfg(target_arch = "wasm32")]
impl From<GridError> for wasm_bindgen::JsValue {
    fn from(e: GridError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
