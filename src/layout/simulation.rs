//! Force-directed layout for the full graph.
//!
//! A pass has two phases. [`Simulation::step`] advances the physics in
//! bounded batches inside an oversized virtual extent, and
//! [`Simulation::finish`] separates leftover overlaps and rescales the result
//! into the real viewport via [`normalize`].
//!
//! Forces per iteration, all accumulated from the same snapshot of positions:
//!
//! - gravity toward the extent center, quadratic in distance and scaled by
//!   normalized degree, plus a constant outward expansion push
//! - pairwise repulsion, with a hard collision zone derived from the layout
//!   radii and a softer zone out to the repulsion range
//! - springs along edges toward a ratio-derived rest length, disabled during
//!   the warm-up iterations
//!
//! Integration is a damped Euler step without velocity; each position is
//! clamped to the extent after every iteration.

use eframe::egui::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

use crate::config::{EdgeLengthMode, LabelMetrics, LayoutConfig};
use crate::data::NodeId;
use crate::util::separation;

use super::forces::{
    PairParams, Spring, accumulate_center_forces, accumulate_pair_forces, accumulate_spring_forces,
};
use super::placement;
use super::quadtree::QuadNode;
use super::sizing::layout_radius;
use super::view::GraphView;
use super::{Extent, Positions, Viewport};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("node {node} reached a non-finite position at iteration {iteration}")]
    NonFinite { node: NodeId, iteration: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepStatus {
    InProgress {
        iteration: usize,
        max_iterations: usize,
    },
    Done,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutOutcome {
    pub positions: Positions,
    pub iterations: usize,
    /// The physics stopped early on a numeric failure.
    pub truncated: bool,
    pub overlap_passes: usize,
}

impl LayoutOutcome {
    pub fn empty() -> Self {
        Self {
            positions: Positions::new(),
            iterations: 0,
            truncated: false,
            overlap_passes: 0,
        }
    }
}

/// Spring rest length for an edge.
///
/// Higher ratio means shorter rest length; `degree_sum` (both endpoints)
/// inflates it so hub-to-hub edges get more slack.
pub fn ideal_distance(ratio: f32, degree_sum: usize, config: &LayoutConfig) -> f32 {
    let ratio = if ratio.is_finite() {
        ratio.clamp(0.1, 100.0)
    } else {
        0.1
    };
    let (min, max) = (config.ideal_dist_min, config.ideal_dist_max);

    let base = match config.edge_length_mode {
        EdgeLengthMode::InverseSqrt if config.inverse_sqrt_base_length > 0.0 => {
            (config.inverse_sqrt_base_length / ratio.sqrt()).min(max).max(min)
        }
        _ => max - (ratio / 100.0) * (max - min),
    };

    base * (1.0 + degree_sum as f32 * config.ideal_dist_degree_factor)
}

/// Pushes overlapping pairs apart by half the overlap each until nothing
/// overlaps or `max_passes` is reached. Returns the number of passes run.
pub fn resolve_overlaps(positions: &mut [Vec2], radii: &[f32], extent: Extent, max_passes: usize) -> usize {
    let max_radius = radii.iter().copied().fold(0.0_f32, f32::max);
    let mut passes = 0;

    while passes < max_passes {
        let Some(tree) = QuadNode::build(positions) else {
            break;
        };
        passes += 1;

        let mut overlapping = false;
        tree.for_each_pair_within(max_radius * 2.0, &mut |a, b| {
            let (direction, distance) = separation(positions[a], positions[b], a, b);
            let min_separation = radii[a] + radii[b];
            if distance + 1e-3 >= min_separation {
                return;
            }
            overlapping = true;
            let push = direction * ((min_separation - distance) * 0.5);
            positions[a] = extent.clamp(positions[a] + push);
            positions[b] = extent.clamp(positions[b] - push);
        });

        if !overlapping {
            break;
        }
    }

    passes
}

/// Fits the bounding box of `positions` into 90% of `target`, centered.
///
/// Never shrinks (scale floor 1) and never expands more than 4x. Non-finite
/// results land on the target center.
pub fn normalize(positions: &[Vec2], target: Extent) -> Vec<Vec2> {
    let center = target.center();
    let mut min = Vec2::splat(f32::INFINITY);
    let mut max = Vec2::splat(f32::NEG_INFINITY);
    for point in positions.iter().filter(|point| point.is_finite()) {
        min = min.min(*point);
        max = max.max(*point);
    }
    if !min.is_finite() || !max.is_finite() {
        return vec![center; positions.len()];
    }

    let span = max - min;
    let span_x = if span.x > 0.0 { span.x } else { 1.0 };
    let span_y = if span.y > 0.0 { span.y } else { 1.0 };
    let mut scale = (target.width() * 0.9 / span_x)
        .min(target.height() * 0.9 / span_y)
        .min(4.0)
        .max(1.0);
    if !scale.is_finite() || scale <= 0.0 {
        scale = 1.0;
    }

    let box_center = (min + max) * 0.5;
    positions
        .iter()
        .map(|point| {
            let mapped = center + (*point - box_center) * scale;
            if mapped.is_finite() {
                target.clamp(mapped)
            } else {
                center
            }
        })
        .collect()
}

/// One resumable force layout pass.
pub struct Simulation {
    ids: Vec<NodeId>,
    positions: Vec<Vec2>,
    next_positions: Vec<Vec2>,
    forces: Vec<Vec2>,
    radii: Vec<f32>,
    strengths: Vec<f32>,
    normalized_degrees: Vec<f32>,
    springs: Vec<Spring>,
    pair_params: PairParams,
    extent: Extent,
    real_extent: Extent,
    center: Vec2,
    config: LayoutConfig,
    iteration: usize,
    max_iterations: usize,
    failure: Option<SimulationError>,
}

impl Simulation {
    /// Places the view's nodes and prepares per-node force parameters.
    ///
    /// `seed` replaces the initial placement when it has one position per
    /// visible node; the force iterations still run on top of it.
    pub fn new(
        view: &GraphView,
        viewport: Viewport,
        config: &LayoutConfig,
        labels: &LabelMetrics,
        seed: Option<Vec<Vec2>>,
    ) -> Self {
        let real_extent = viewport.padded(config.padding);
        let extent = real_extent.at_least(config.min_layout_width, config.min_layout_height);

        let mut rng = config
            .seed
            .map(StdRng::seed_from_u64)
            .unwrap_or_else(StdRng::from_os_rng);

        let positions = match seed {
            Some(seed) if seed.len() == view.len() => seed,
            _ if config.pack_components && view.components.len() > 1 => {
                placement::pack_components(view, extent, &mut rng)
            }
            _ => placement::radial(view, extent, viewport, config.use_full_area, &mut rng),
        };

        let radii = view
            .visible_nodes
            .iter()
            .map(|node| layout_radius(node, config.layout_radius_multiplier, labels))
            .collect::<Vec<_>>();
        let degrees = (0..view.len()).map(|index| view.degree_at(index)).collect::<Vec<_>>();
        let max_degree = view.max_degree.max(1) as f32;
        let strengths = degrees
            .iter()
            .map(|degree| config.repulsion_strength * (1.0 + *degree as f32 * config.repulsion_degree_factor))
            .collect();
        let normalized_degrees = degrees
            .iter()
            .map(|degree| *degree as f32 / max_degree)
            .collect();

        let springs = view
            .edges
            .iter()
            .filter(|edge| edge.from != edge.to)
            .map(|edge| Spring {
                from: edge.from,
                to: edge.to,
                ideal: ideal_distance(edge.ratio, degrees[edge.from] + degrees[edge.to], config)
                    .max(1.0),
            })
            .collect();

        let max_iterations = if view.is_empty() {
            0
        } else {
            config.effective_max_iterations(view.len())
        };

        tracing::debug!(
            nodes = view.len(),
            springs = view.edges.len(),
            components = view.components.len(),
            max_iterations,
            "prepared force simulation"
        );

        Self {
            ids: view.visible_nodes.iter().map(|node| node.id.clone()).collect(),
            next_positions: Vec::with_capacity(positions.len()),
            forces: vec![Vec2::ZERO; positions.len()],
            positions,
            radii,
            strengths,
            normalized_degrees,
            springs,
            pair_params: PairParams {
                repulsion_range: config.repulsion_range_px(),
                collision_multiplier: config.collision_radius_multiplier,
            },
            center: extent.center(),
            extent,
            real_extent,
            config: config.clone(),
            iteration: 0,
            max_iterations,
            failure: None,
        }
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn is_done(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    pub fn failure(&self) -> Option<&SimulationError> {
        self.failure.as_ref()
    }

    /// Current positions in the virtual extent, before fitting.
    pub fn raw_positions(&self) -> Positions {
        self.ids.iter().cloned().zip(self.positions.iter().copied()).collect()
    }

    /// Runs at most `batch` iterations.
    pub fn step(&mut self, batch: usize) -> StepStatus {
        for _ in 0..batch.max(1) {
            if self.is_done() {
                break;
            }
            if let Err(error) = self.iterate() {
                tracing::warn!(%error, "force simulation stopped early");
                self.failure = Some(error);
                self.max_iterations = self.iteration;
            }
        }

        if self.is_done() {
            StepStatus::Done
        } else {
            StepStatus::InProgress {
                iteration: self.iteration,
                max_iterations: self.max_iterations,
            }
        }
    }

    fn iterate(&mut self) -> Result<(), SimulationError> {
        self.forces.fill(Vec2::ZERO);

        accumulate_center_forces(
            &self.positions,
            &self.normalized_degrees,
            self.center,
            self.config.gravity,
            self.config.expansion_from_center,
            &mut self.forces,
        );

        if let Some(tree) = QuadNode::build(&self.positions) {
            accumulate_pair_forces(
                &tree,
                &self.positions,
                &self.radii,
                &self.strengths,
                self.pair_params,
                &mut self.forces,
            );
        }

        if self.iteration >= self.config.repulsion_only_iterations {
            accumulate_spring_forces(
                &self.springs,
                &self.positions,
                self.config.edge_force,
                &mut self.forces,
            );
        }

        self.next_positions.clear();
        for (index, (position, force)) in self.positions.iter().zip(&self.forces).enumerate() {
            let moved = *position + *force * self.config.damping;
            if !moved.is_finite() {
                return Err(SimulationError::NonFinite {
                    node: self.ids[index].clone(),
                    iteration: self.iteration,
                });
            }
            self.next_positions.push(self.extent.clamp(moved));
        }
        std::mem::swap(&mut self.positions, &mut self.next_positions);
        self.iteration += 1;
        Ok(())
    }

    /// Runs every remaining iteration, then [`Simulation::finish`].
    pub fn run_to_completion(mut self) -> LayoutOutcome {
        while self.step(self.config.batch_size) != StepStatus::Done {}
        self.finish()
    }

    /// Overlap resolution and normalization into the real viewport. Safe to
    /// call early; whatever the physics reached so far is kept.
    pub fn finish(mut self) -> LayoutOutcome {
        if self.ids.is_empty() {
            return LayoutOutcome::empty();
        }

        let overlap_passes = resolve_overlaps(
            &mut self.positions,
            &self.radii,
            self.extent,
            self.config.overlap_passes,
        );
        let fitted = normalize(&self.positions, self.real_extent);

        tracing::debug!(
            iterations = self.iteration,
            overlap_passes,
            truncated = self.failure.is_some(),
            "force layout finished"
        );

        LayoutOutcome {
            positions: self.ids.into_iter().zip(fitted).collect(),
            iterations: self.iteration,
            truncated: self.failure.is_some(),
            overlap_passes,
        }
    }
}
