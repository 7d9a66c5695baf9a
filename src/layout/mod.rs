//! Layout engine: column geometry, virtual scroll paging and viewport windows.
//!
//! This module handles:
//! - Column pixel boundaries with binary search lookup by x position
//! - Resize distribution and autosizing of column widths
//! - Paging of logical content heights above the platform ceiling
//! - Visible and buffered row ranges for the render cache

mod columns;
mod metrics;
mod paging;
mod viewport;

pub use columns::{autosize, resize_column, ColumnBounds, ResizeMode};
pub use metrics::{FixedMetrics, MetricsProbe, PlatformMetrics};
pub use paging::{Paging, ScrollTarget};
pub use viewport::{ScrollDirection, Viewport};
