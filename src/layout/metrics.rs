//! Platform metrics measured once and shared between grids.

use std::cell::OnceCell;

/// Measures platform properties that cannot be known statically.
pub trait MetricsProbe {
    /// Width and height of the platform scrollbars
    fn scrollbar_size(&self) -> (f64, f64);

    /// Largest height a scrollable element can be given
    fn max_supported_height(&self) -> f64;
}

/// Probe with fixed answers, for headless use and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedMetrics {
    pub scrollbar: (f64, f64),
    pub max_height: f64,
}

impl Default for FixedMetrics {
    fn default() -> Self {
        Self {
            scrollbar: (0.0, 0.0),
            max_height: 1_000_000.0,
        }
    }
}

impl MetricsProbe for FixedMetrics {
    fn scrollbar_size(&self) -> (f64, f64) {
        self.scrollbar
    }

    fn max_supported_height(&self) -> f64 {
        self.max_height
    }
}

/// Lazily measured platform metrics.
///
/// Wrap in an `Rc` and hand the same instance to every grid on a page so the
/// probe runs at most once per metric.
pub struct PlatformMetrics {
    probe: Box<dyn MetricsProbe>,
    scrollbar: OnceCell<(f64, f64)>,
    max_height: OnceCell<f64>,
}

impl PlatformMetrics {
    pub fn new(probe: impl MetricsProbe + 'static) -> Self {
        Self {
            probe: Box::new(probe),
            scrollbar: OnceCell::new(),
            max_height: OnceCell::new(),
        }
    }

    pub fn scrollbar_size(&self) -> (f64, f64) {
        *self.scrollbar.get_or_init(|| {
            let size = self.probe.scrollbar_size();
            tracing::debug!(width = size.0, height = size.1, "measured scrollbar size");
            size
        })
    }

    pub fn max_supported_height(&self) -> f64 {
        *self.max_height.get_or_init(|| {
            let height = self.probe.max_supported_height();
            tracing::debug!(height, "measured max supported height");
            height
        })
    }
}

impl Default for PlatformMetrics {
    fn default() -> Self {
        Self::new(FixedMetrics::default())
    }
}

impl std::fmt::Debug for PlatformMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformMetrics")
            .field("scrollbar", &self.scrollbar.get())
            .field("max_height", &self.max_height.get())
            .finish_non_exhaustive()
    }
}
