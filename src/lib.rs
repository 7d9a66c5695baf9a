//! vgrid - virtualized, editable data grid engine
//!
//! Renders only the rows and cells inside (or near) the viewport, so grids of
//! millions of rows stay cheap to scroll:
//! - Virtual paging past the platform's maximum element height
//! - Row and cell render cache with deferred cleanup of post-rendered nodes
//! - Keyboard navigation aware of colspans and non-focusable cells
//! - In-place editing with validation, commit/cancel and an undo-able command trail
//! - Sorting, selection and layered per-cell style overlays
//!
//! The engine draws through the [`Surface`] trait. The browser build ships a
//! DOM surface and a `WasmGrid` wrapper; native callers and tests use
//! [`RecordingSurface`].
//!
//! # Usage (Rust)
//!
//! ```no_run
//! use vgrid::{Column, GridBuilder, RecordingSurface, VecDataSource};
//!
//! let mut grid = GridBuilder::new(RecordingSurface::new())
//!     .columns(vec![Column::new("title"), Column::new("qty")])
//!     .data(VecDataSource::default())
//!     .size(640.0, 480.0)
//!     .build()?;
//! grid.handle_scroll(2_500.0, 0.0);
//! grid.advance_time(50.0);
//! # Ok::<(), vgrid::GridError>(())
//! ```
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmGrid } from 'vgrid';
//! await init();
//! const grid = new WasmGrid(container, columns, { editable: true });
//! grid.setItems(items);
//! ```

pub mod data;
pub mod editor;
pub mod error;
pub mod events;
pub mod grid;
pub mod layout;
pub mod navigation;
pub mod options;
pub mod registry;
pub mod render;
pub mod scheduler;
pub mod selection;
pub mod types;

#[cfg(target_arch = "wasm32")]
mod wasm;

use wasm_bindgen::prelude::*;

pub use data::{DataSource, GeneratedDataSource, VecDataSource};
pub use editor::{EditCommand, EditCommandHandler, EditState, Editor, EditorLock};
pub use error::{GridError, Result};
pub use events::{EventArgs, EventKind, GridEvent, InputEvent, Key, KeyInput, Modifiers};
pub use grid::{Grid, GridBuilder, GridStats, PagingInfo};
pub use layout::{FixedMetrics, MetricsProbe, PlatformMetrics};
pub use navigation::Direction;
pub use options::GridOptions;
pub use registry::{CapabilityRegistry, FormatArgs, Formatted};
pub use render::{RecordingSurface, Surface};
pub use selection::{RowSelectionModel, SelectionModel};
pub use types::*;
#[cfg(target_arch = "wasm32")]
pub use wasm::WasmGrid;

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
