//! Pan/zoom transform between screen space and graph space
//!
//! `graph = (screen - pan) / scale` and `screen = graph * scale + pan`.
//! The scale is clamped on every mutation.

use crate::config::CanvasConfig;
use crate::graph::SavedViewport;
use crate::types::Position;

/// Current pan offset and zoom scale of the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    scale: f64,
    pan: Position,
    min_scale: f64,
    max_scale: f64,
}

impl Viewport {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            scale: 1.0,
            pan: Position::default(),
            min_scale: config.min_scale,
            max_scale: config.max_scale,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pan(&self) -> Position {
        self.pan
    }

    /// Convert a screen-space point into graph space
    pub fn screen_to_graph(&self, screen: Position) -> Position {
        Position::new(
            (screen.x - self.pan.x) / self.scale,
            (screen.y - self.pan.y) / self.scale,
        )
    }

    /// Convert a graph-space point into screen space
    pub fn graph_to_screen(&self, graph: Position) -> Position {
        Position::new(
            graph.x * self.scale + self.pan.x,
            graph.y * self.scale + self.pan.y,
        )
    }

    /// Set the scale, clamped to the configured bounds
    pub fn set_scale(&mut self, scale: f64) {
        if scale.is_finite() {
            self.scale = scale.clamp(self.min_scale, self.max_scale);
        }
    }

    /// Multiply the scale by `factor`, clamped
    pub fn zoom_by(&mut self, factor: f64) {
        self.set_scale(self.scale * factor);
    }

    pub fn set_pan(&mut self, pan: Position) {
        self.pan = pan;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan = self.pan.offset(dx, dy);
    }

    /// Scale 1.0, no pan
    pub fn reset(&mut self) {
        self.scale = 1.0;
        self.pan = Position::default();
    }

    /// Snapshot for persisting with the workflow
    pub fn to_saved(&self) -> SavedViewport {
        SavedViewport {
            x: self.pan.x,
            y: self.pan.y,
            zoom: self.scale,
        }
    }

    /// Restore a persisted viewport; an out-of-range zoom is clamped
    pub fn restore(&mut self, saved: &SavedViewport) {
        self.pan = Position::new(saved.x, saved.y);
        self.set_scale(saved.zoom);
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(&CanvasConfig::default())
    }
}
