mod forces;
mod hierarchy;
mod placement;
mod quadtree;
mod select;
mod simulation;
pub mod sizing;
mod view;

use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};
use serde::{Deserialize, Serialize};

use crate::data::NodeId;

pub use hierarchy::{HierarchicalLayout, hierarchical_layout};
pub use placement::seed_from_normalized;
pub use select::{IncidentStats, VisibleSelection, importance, incident_stats, select_visible};
pub use simulation::{
    LayoutOutcome, Simulation, SimulationError, StepStatus, ideal_distance, normalize,
    resolve_overlaps,
};
pub use view::{GraphView, TypeFilter, ViewEdge, build_view};

/// Node id to position, keyed exactly by the visible set of one pass.
pub type Positions = HashMap<NodeId, Vec2>;

/// Pixel size of the host's drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// The viewport minus `padding` on every side.
    pub fn padded(self, padding: f32) -> Extent {
        Extent {
            min: vec2(padding, padding),
            max: vec2(
                (self.width - padding).max(padding),
                (self.height - padding).max(padding),
            ),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1440.0, 920.0)
    }
}

/// Axis-aligned rectangle positions are clamped to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub min: Vec2,
    pub max: Vec2,
}

impl Extent {
    pub fn width(self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn clamp(self, point: Vec2) -> Vec2 {
        vec2(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }

    pub fn contains(self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Grows the extent from its top-left corner to at least the given size.
    pub fn at_least(self, width: f32, height: f32) -> Self {
        Self {
            min: self.min,
            max: vec2(
                self.min.x + self.width().max(width),
                self.min.y + self.height().max(height),
            ),
        }
    }
}
