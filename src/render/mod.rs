//! Windowed rendering onto a host surface.
//!
//! This module provides:
//! - The [`Surface`] trait the host implements, and an in-memory recorder
//! - The render cache that keeps only the buffered viewport materialized
//! - Async post-render bookkeeping with grouped deferred cleanup
//! - Named cell style overlays

pub mod cache;
pub mod post_render;
pub mod styles;
pub mod surface;

pub use cache::{CacheStats, EvictionPolicy, ReconcileReport, RenderCache, RowPainter};
pub use post_render::{CleanupAction, CleanupEntry, PostRenderQueue, PostStatus};
pub use styles::{CellCssStyles, CssHash};
pub use surface::{
    CellMarkup, NodeId, RecordedCell, RecordedRow, RecordingSurface, RowMarkup, Surface,
    SurfaceStats,
};
