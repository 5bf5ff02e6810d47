use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::NodeKind;

/// How an edge's ownership ratio maps onto its spring rest length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeLengthMode {
    /// `ideal_dist_max - ratio / 100 * (ideal_dist_max - ideal_dist_min)`.
    Linear,
    /// `base_length / sqrt(ratio)`, clamped to the ideal range.
    InverseSqrt,
}

/// Force simulation tuning. The defaults were tuned by eye on real
/// shareholding data; none of them derive from a physical model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub gravity: f32,
    pub min_dist: f32,
    /// Multiplier of `min_dist` giving the soft repulsion range.
    pub repulsion_range: f32,
    pub repulsion_strength: f32,
    pub collision_radius_multiplier: f32,
    pub layout_radius_multiplier: f32,
    pub ideal_dist_min: f32,
    pub ideal_dist_max: f32,
    pub ideal_dist_degree_factor: f32,
    pub edge_length_mode: EdgeLengthMode,
    pub inverse_sqrt_base_length: f32,
    pub repulsion_degree_factor: f32,
    pub edge_force: f32,
    pub max_iterations: usize,
    /// Iterations at the start of a pass during which springs are disabled.
    pub repulsion_only_iterations: usize,
    pub padding: f32,
    pub use_full_area: bool,
    pub damping: f32,
    pub pack_components: bool,
    pub expansion_from_center: f32,
    pub batch_size: usize,
    pub min_layout_width: f32,
    pub min_layout_height: f32,
    pub overlap_passes: usize,
    /// Fixed jitter seed; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            gravity: 0.0,
            min_dist: 800.0,
            repulsion_range: 6.0,
            repulsion_strength: 600.0,
            collision_radius_multiplier: 8.0,
            layout_radius_multiplier: 5.0,
            ideal_dist_min: 800.0,
            ideal_dist_max: 2000.0,
            ideal_dist_degree_factor: 0.2,
            edge_length_mode: EdgeLengthMode::InverseSqrt,
            inverse_sqrt_base_length: 2000.0,
            repulsion_degree_factor: 0.5,
            edge_force: 0.022,
            max_iterations: 1200,
            repulsion_only_iterations: 300,
            padding: 100.0,
            use_full_area: true,
            damping: 0.82,
            pack_components: true,
            expansion_from_center: 0.04,
            batch_size: 12,
            min_layout_width: 700.0,
            min_layout_height: 500.0,
            overlap_passes: 50,
            seed: None,
        }
    }
}

impl LayoutConfig {
    /// Iteration budget shrinks with node count to bound latency.
    pub fn effective_max_iterations(&self, node_count: usize) -> usize {
        if node_count > 4000 {
            self.max_iterations.min(250)
        } else if node_count > 2500 {
            self.max_iterations.min(400)
        } else if node_count > 1500 {
            self.max_iterations.min(600)
        } else {
            self.max_iterations
        }
    }

    pub fn repulsion_range_px(&self) -> f32 {
        self.min_dist * self.repulsion_range
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EgoConfig {
    pub padding: f32,
    pub min_node_spacing: f32,
    pub sub_row_height: f32,
}

impl Default for EgoConfig {
    fn default() -> Self {
        Self {
            padding: 70.0,
            min_node_spacing: 58.0,
            sub_row_height: 46.0,
        }
    }
}

/// Label footprint estimate used by the physical layout radius.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelMetrics {
    pub px_per_char: f32,
    pub label_gap: f32,
    pub label_height: f32,
}

impl Default for LabelMetrics {
    fn default() -> Self {
        Self {
            px_per_char: 8.0,
            label_gap: 18.0,
            label_height: 16.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityPolicy {
    pub enabled: bool,
    /// Limiting only kicks in above this many type-matched nodes.
    pub apply_when_over: usize,
    pub min_connections: usize,
    /// Only enforced for individual shareholders.
    pub min_ratio: f32,
    pub importance_types: Vec<NodeKind>,
    /// Cap on the limited set. A selected node is kept even past it.
    pub max_nodes: usize,
    pub degree_weight: f32,
    pub ratio_weight: f32,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            apply_when_over: 280,
            min_connections: 3,
            min_ratio: 5.0,
            importance_types: vec![NodeKind::Company, NodeKind::Major, NodeKind::Institution],
            max_nodes: 380,
            degree_weight: 0.1,
            ratio_weight: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub layout: LayoutConfig,
    pub ego: EgoConfig,
    pub visibility: VisibilityPolicy,
    pub labels: LabelMetrics,
    pub heatmap_enabled: bool,
    pub ego_max_hops: usize,
    pub ego_max_nodes: usize,
    pub oracle_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            ego: EgoConfig::default(),
            visibility: VisibilityPolicy::default(),
            labels: LabelMetrics::default(),
            heatmap_enabled: false,
            ego_max_hops: 2,
            ego_max_nodes: 120,
            oracle_timeout_ms: 30_000,
        }
    }
}

impl SessionConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid layout config in {}", path.display()))
    }
}
