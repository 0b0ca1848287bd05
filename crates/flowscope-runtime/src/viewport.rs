#![forbid(unsafe_code)]

//! Camera over the graph plane.
//!
//! Screen coordinates are `world * zoom + pan`. Fitting frames a world
//! bounding box inside the canvas, leaving `padding` (a fraction of the
//! canvas on each side) free, with zoom clamped to `[min_zoom, max_zoom]`.

use flowscope_core::Point;
use flowscope_layout::Bounds;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    #[must_use]
    pub fn world_to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.zoom + self.pan_x, p.y * self.zoom + self.pan_y)
    }

    #[must_use]
    pub fn screen_to_world(&self, p: Point) -> Point {
        Point::new((p.x - self.pan_x) / self.zoom, (p.y - self.pan_y) / self.zoom)
    }
}

/// Host canvas size in screen units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

impl CanvasSize {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Fraction of the canvas kept free on each side when fitting.
    pub padding: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 2.0,
            padding: 0.1,
        }
    }
}

impl ViewportConfig {
    /// Copy with a usable zoom range and padding.
    ///
    /// Non-finite or non-positive zoom bounds fall back to the defaults, an
    /// inverted range is swapped, and padding outside `[0, 0.5)` falls back
    /// to the default.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let defaults = Self::default();
        let positive = |v: f64, fallback: f64| {
            if v.is_finite() && v > 0.0 { v } else { fallback }
        };
        let min = positive(self.min_zoom, defaults.min_zoom);
        let max = positive(self.max_zoom, defaults.max_zoom);
        let padding = if (0.0..0.5).contains(&self.padding) {
            self.padding
        } else {
            defaults.padding
        };
        Self {
            min_zoom: min.min(max),
            max_zoom: min.max(max),
            padding,
        }
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.max(self.min_zoom).min(self.max_zoom)
    }
}

/// Owns the viewport and the auto-fit preference.
#[derive(Debug, Clone)]
pub struct ViewportController {
    viewport: Viewport,
    canvas: CanvasSize,
    config: ViewportConfig,
    auto_fit: bool,
    fits: u64,
}

impl ViewportController {
    #[must_use]
    /// `config` is stored [normalized](ViewportConfig::normalized).
    pub fn new(config: ViewportConfig, auto_fit: bool) -> Self {
        let normalized = config.normalized();
        if normalized != config {
            warn!(
                min_zoom = config.min_zoom,
                max_zoom = config.max_zoom,
                padding = config.padding,
                "unusable viewport config normalized"
            );
        }
        Self {
            viewport: Viewport::default(),
            canvas: CanvasSize::default(),
            config: normalized,
            auto_fit,
            fits: 0,
        }
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    #[must_use]
    pub fn auto_fit(&self) -> bool {
        self.auto_fit
    }

    /// Number of fits performed so far.
    #[must_use]
    pub fn fit_count(&self) -> u64 {
        self.fits
    }

    pub fn set_auto_fit(&mut self, enabled: bool) {
        self.auto_fit = enabled;
    }

    pub fn set_canvas_size(&mut self, canvas: CanvasSize) {
        self.canvas = canvas;
    }

    /// Manual pan/zoom from the host. Zoom is clamped.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Viewport {
            zoom: self.clamp_zoom(viewport.zoom),
            ..viewport
        };
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_finite() {
            self.config.clamp_zoom(zoom)
        } else {
            self.viewport.zoom
        }
    }

    /// Frame `bounds`. Returns `false` (viewport unchanged) when there is
    /// nothing to frame or no usable canvas.
    pub fn fit(&mut self, bounds: Option<Bounds>) -> bool {
        let Some(bounds) = bounds else {
            return false;
        };
        if !self.canvas.is_usable() || (bounds.width() <= 0.0 && bounds.height() <= 0.0) {
            return false;
        }

        let avail_w = self.canvas.width * (1.0 - 2.0 * self.config.padding);
        let avail_h = self.canvas.height * (1.0 - 2.0 * self.config.padding);
        let scale_w = if bounds.width() > 0.0 {
            avail_w / bounds.width()
        } else {
            f64::INFINITY
        };
        let scale_h = if bounds.height() > 0.0 {
            avail_h / bounds.height()
        } else {
            f64::INFINITY
        };
        let zoom = self.config.clamp_zoom(scale_w.min(scale_h));
        let (cx, cy) = bounds.center();

        self.viewport = Viewport {
            pan_x: self.canvas.width / 2.0 - cx * zoom,
            pan_y: self.canvas.height / 2.0 - cy * zoom,
            zoom,
        };
        self.fits += 1;
        debug!(
            zoom,
            pan_x = self.viewport.pan_x,
            pan_y = self.viewport.pan_y,
            "viewport fitted"
        );
        true
    }
}
