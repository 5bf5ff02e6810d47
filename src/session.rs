//! View-mode state machine and the layout pass lifecycle.
//!
//! A [`GraphLayoutSession`] owns the graph, the filters, the selection and
//! the positions handed to a renderer. Every pass gets a fresh generation;
//! output tagged with an older generation is dropped, so a pass that was
//! overtaken by a filter change or mode switch can never overwrite newer
//! positions.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SessionConfig;
use crate::data::{Edge, GraphData, Node, NodeId, NodeKind};
use crate::layout::{
    GraphView, LayoutOutcome, Positions, Simulation, StepStatus, TypeFilter, Viewport,
    build_view, hierarchical_layout, seed_from_normalized, select_visible,
};
use crate::oracle::{LayoutOracle, SeedPoll, SeedPositions, SeedRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EgoPresentation {
    #[default]
    NodeLink,
    Heatmap,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    FullGraph,
    Ego {
        center: NodeId,
        presentation: EgoPresentation,
    },
}

impl ViewMode {
    pub fn is_ego(&self) -> bool {
        matches!(self, Self::Ego { .. })
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullGraph => f.write_str("full graph"),
            Self::Ego {
                center,
                presentation: EgoPresentation::NodeLink,
            } => write!(f, "governance map of {center}"),
            Self::Ego {
                center,
                presentation: EgoPresentation::Heatmap,
            } => write!(f, "heatmap of {center}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    LayoutStarted { generation: u64, nodes: usize },
    LayoutConverged {
        generation: u64,
        iterations: usize,
        truncated: bool,
    },
    LayoutDiscarded { generation: u64 },
    VisibleSetLimited { shown: usize, candidates: usize },
    ModeChanged { mode: ViewMode },
}

/// Proof that a pass was started; see [`GraphLayoutSession::commit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassTicket {
    generation: u64,
}

impl PassTicket {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

struct ActivePass {
    generation: u64,
    stage: PassStage,
}

enum PassStage {
    /// Waiting on the layout oracle; no iterations have run.
    Seeding(SeedRequest),
    Running(Simulation),
}

pub struct GraphLayoutSession {
    config: SessionConfig,
    graph: GraphData,
    ego_graph: Option<GraphData>,
    viewport: Viewport,
    active_types: TypeFilter,
    selected: Option<NodeId>,
    mode: ViewMode,
    view: GraphView,
    view_revision: u64,
    positions: Positions,
    generation: u64,
    pass: Option<ActivePass>,
    events: VecDeque<SessionEvent>,
    limit_applied: bool,
    limit_notified: bool,
    oracle: Option<Arc<dyn LayoutOracle>>,
}

impl GraphLayoutSession {
    pub fn new(config: SessionConfig, viewport: Viewport) -> Self {
        Self {
            config,
            graph: GraphData::default(),
            ego_graph: None,
            viewport,
            active_types: NodeKind::KNOWN.into_iter().collect(),
            selected: None,
            mode: ViewMode::FullGraph,
            view: GraphView::default(),
            view_revision: 0,
            positions: Positions::new(),
            generation: 0,
            pass: None,
            events: VecDeque::new(),
            limit_applied: false,
            limit_notified: false,
            oracle: None,
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn LayoutOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The full graph, regardless of mode.
    pub fn graph(&self) -> &GraphData {
        &self.graph
    }

    /// What is being shown: the ego neighborhood in ego mode, else the full graph.
    pub fn current_data(&self) -> &GraphData {
        self.ego_graph.as_ref().unwrap_or(&self.graph)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn active_types(&self) -> &TypeFilter {
        &self.active_types
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    pub fn mode(&self) -> &ViewMode {
        &self.mode
    }

    pub fn view(&self) -> &GraphView {
        &self.view
    }

    /// Bumped on every view rebuild, including ego filter changes that
    /// start no pass.
    pub fn view_revision(&self) -> u64 {
        self.view_revision
    }

    pub fn visible_nodes(&self) -> &[Node] {
        &self.view.visible_nodes
    }

    pub fn positions(&self) -> &Positions {
        &self.positions
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn limit_applied(&self) -> bool {
        self.limit_applied
    }

    pub fn is_busy(&self) -> bool {
        self.pass.is_some()
    }

    /// Progress of the in-flight pass as `(iteration, max_iterations)`.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.pass.as_ref().map(|pass| match &pass.stage {
            PassStage::Seeding(_) => (0, self.planned_iterations()),
            PassStage::Running(simulation) => (simulation.iteration(), simulation.max_iterations()),
        })
    }

    /// True while the pass waits on the layout oracle.
    pub fn is_seeding(&self) -> bool {
        matches!(
            self.pass,
            Some(ActivePass {
                stage: PassStage::Seeding(_),
                ..
            })
        )
    }

    fn planned_iterations(&self) -> usize {
        self.config.layout.effective_max_iterations(self.view.len())
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    /// Replaces the graph wholesale and returns to the full graph.
    pub fn load_graph(&mut self, mut graph: GraphData) {
        let dropped = graph.retain_resolved_edges();
        if dropped > 0 {
            tracing::warn!(dropped, "dropped edges with unknown endpoints");
        }
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "graph loaded into session"
        );

        self.graph = graph;
        self.ego_graph = None;
        self.limit_notified = false;
        if self
            .selected
            .as_ref()
            .is_some_and(|id| self.graph.node(id).is_none())
        {
            self.selected = None;
        }
        self.set_mode(ViewMode::FullGraph);
        self.relayout();
    }

    /// Resizes re-run the layout; the force model works in absolute pixels.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        let moved = (viewport.width - self.viewport.width).abs() > 0.5
            || (viewport.height - self.viewport.height).abs() > 0.5;
        if !moved {
            return;
        }
        self.viewport = viewport;
        self.relayout();
    }

    /// Flips one kind on or off. Refuses to switch off the last active kind.
    pub fn toggle_type(&mut self, kind: NodeKind) -> bool {
        let mut next = self.active_types.clone();
        if !next.remove(&kind) {
            next.insert(kind);
        }
        self.set_active_types(next)
    }

    pub fn set_active_types(&mut self, types: TypeFilter) -> bool {
        if types.is_empty() {
            tracing::debug!("refusing to clear every node type filter");
            return false;
        }
        if types == self.active_types {
            return true;
        }
        self.active_types = types;

        if self.mode.is_ego() {
            // The neighborhood and its layering stay put; only the shown set changes.
            self.rebuild_ego_view();
        } else {
            self.relayout();
        }
        true
    }

    /// Selecting a node hidden by importance limiting brings it back.
    pub fn select(&mut self, id: Option<NodeId>) {
        if self.selected == id {
            return;
        }
        self.selected = id;

        let Some(selected) = &self.selected else {
            return;
        };
        let hidden = !self.view.node_index.contains_key(selected);
        if !self.mode.is_ego() && hidden && self.graph.node(selected).is_some() {
            self.relayout();
        }
    }

    /// Shows the governance map of `center` from a neighborhood supplied by
    /// the caller.
    pub fn enter_ego(&mut self, center: NodeId, mut neighborhood: GraphData) {
        neighborhood.retain_resolved_edges();
        tracing::info!(
            center = %center,
            nodes = neighborhood.node_count(),
            edges = neighborhood.edge_count(),
            "entering governance map"
        );

        self.positions.clear();
        self.ego_graph = Some(neighborhood);
        self.selected = Some(center.clone());
        self.set_mode(ViewMode::Ego {
            center,
            presentation: EgoPresentation::NodeLink,
        });
        self.relayout();
    }

    /// Like [`Self::enter_ego`], deriving the neighborhood from the loaded graph.
    pub fn enter_ego_local(&mut self, center: &NodeId) -> bool {
        if self.graph.node(center).is_none() {
            tracing::warn!(center = %center, "cannot center a governance map on an unknown node");
            return false;
        }
        let neighborhood =
            self.graph
                .ego_neighborhood(center, self.config.ego_max_hops, self.config.ego_max_nodes);
        self.enter_ego(center.clone(), neighborhood);
        true
    }

    /// Switches the ego view to the weighted matrix. Inert unless enabled.
    pub fn show_heatmap(&mut self) -> bool {
        if !self.config.heatmap_enabled {
            return false;
        }
        self.set_presentation(EgoPresentation::Heatmap)
    }

    pub fn show_node_link(&mut self) -> bool {
        self.set_presentation(EgoPresentation::NodeLink)
    }

    fn set_presentation(&mut self, presentation: EgoPresentation) -> bool {
        let ViewMode::Ego { center, .. } = &self.mode else {
            return false;
        };
        let next = ViewMode::Ego {
            center: center.clone(),
            presentation,
        };
        self.set_mode(next);
        true
    }

    pub fn exit_ego(&mut self) {
        if !self.mode.is_ego() {
            return;
        }
        tracing::info!("leaving governance map");
        self.ego_graph = None;
        self.positions.clear();
        self.set_mode(ViewMode::FullGraph);
        self.relayout();
    }

    fn set_mode(&mut self, mode: ViewMode) {
        if self.mode == mode {
            return;
        }
        tracing::info!(mode = %mode, "view mode changed");
        self.mode = mode.clone();
        self.events.push_back(SessionEvent::ModeChanged { mode });
    }

    /// Starts a fresh pass for the current mode, superseding any in flight.
    pub fn relayout(&mut self) {
        let generation = self.next_generation();

        if let ViewMode::Ego { center, .. } = &self.mode {
            let center = center.clone();
            self.rebuild_ego_view();
            let data = self.current_data();
            let layout =
                hierarchical_layout(&center, &data.nodes, &data.edges, self.viewport, &self.config.ego);
            self.events.push_back(SessionEvent::LayoutStarted {
                generation,
                nodes: layout.positions.len(),
            });
            self.apply(
                generation,
                LayoutOutcome {
                    positions: layout.positions,
                    iterations: 0,
                    truncated: false,
                    overlap_passes: 0,
                },
            );
            return;
        }

        self.rebuild_full_view();
        self.events.push_back(SessionEvent::LayoutStarted {
            generation,
            nodes: self.view.len(),
        });
        tracing::info!(generation, nodes = self.view.len(), "layout pass started");

        if self.view.is_empty() {
            self.apply(generation, LayoutOutcome::empty());
            return;
        }

        let stage = match self.oracle.clone() {
            Some(oracle) => {
                let timeout = Duration::from_millis(self.config.oracle_timeout_ms);
                let edges = self.view_edges();
                PassStage::Seeding(SeedRequest::spawn(oracle, &self.view.visible_nodes, &edges, timeout))
            }
            None => PassStage::Running(self.simulation_from(None)),
        };
        self.pass = Some(ActivePass { generation, stage });
    }

    /// Loaded edges with both endpoints in the current view.
    fn view_edges(&self) -> Vec<Edge> {
        self.graph
            .edges
            .iter()
            .filter(|edge| {
                self.view.node_index.contains_key(&edge.from) && self.view.node_index.contains_key(&edge.to)
            })
            .cloned()
            .collect()
    }

    fn simulation_from(&self, seed: Option<SeedPositions>) -> Simulation {
        let seed = seed.and_then(|normalized| {
            seed_from_normalized(&normalized, &self.view, self.viewport, self.config.layout.padding)
        });
        Simulation::new(
            &self.view,
            self.viewport,
            &self.config.layout,
            &self.config.labels,
            seed,
        )
    }

    fn start_running(&mut self, seed: Option<SeedPositions>) {
        let simulation = self.simulation_from(seed);
        if let Some(pass) = self.pass.as_mut() {
            pass.stage = PassStage::Running(simulation);
        }
    }

    fn next_generation(&mut self) -> u64 {
        if let Some(stale) = self.pass.take() {
            tracing::debug!(generation = stale.generation, "discarding superseded layout pass");
            self.events.push_back(SessionEvent::LayoutDiscarded {
                generation: stale.generation,
            });
        }
        self.generation += 1;
        self.generation
    }

    fn rebuild_full_view(&mut self) {
        let selection = select_visible(
            &self.graph.nodes,
            &self.graph.edges,
            &self.active_types,
            &self.config.visibility,
            self.selected.as_ref(),
        );

        self.limit_applied = selection.limit_applied;
        if selection.limit_applied && !self.limit_notified {
            self.limit_notified = true;
            self.events.push_back(SessionEvent::VisibleSetLimited {
                shown: selection.visible_nodes.len(),
                candidates: selection.candidates,
            });
        }

        // The selected node stays visible even when its kind is filtered out.
        let mut types = self.active_types.clone();
        if let Some(selected) = self.selected.as_ref().and_then(|id| self.graph.node(id)) {
            types.insert(selected.kind.clone());
        }
        self.view = build_view(&selection.visible_nodes, &self.graph.edges, &types);
        self.view_revision += 1;
    }

    fn rebuild_ego_view(&mut self) {
        self.limit_applied = false;
        let data = self.ego_graph.as_ref().unwrap_or(&self.graph);
        self.view = build_view(&data.nodes, &data.edges, &self.active_types);
        self.view_revision += 1;
    }

    /// Advances the in-flight pass by one batch, committing it once done.
    ///
    /// Never blocks: while the oracle has not answered, this only polls it.
    pub fn tick(&mut self) -> StepStatus {
        let polled = match &self.pass {
            Some(ActivePass {
                stage: PassStage::Seeding(request),
                ..
            }) => Some(request.poll()),
            _ => None,
        };
        match polled {
            Some(SeedPoll::Pending) => {
                return StepStatus::InProgress {
                    iteration: 0,
                    max_iterations: self.planned_iterations(),
                };
            }
            Some(SeedPoll::Ready(seed)) => self.start_running(seed),
            None => {}
        }

        let batch = self.config.layout.batch_size;
        let Some(ActivePass {
            stage: PassStage::Running(simulation),
            ..
        }) = self.pass.as_mut()
        else {
            return StepStatus::Done;
        };

        match simulation.step(batch) {
            status @ StepStatus::InProgress { .. } => {
                self.positions = simulation.raw_positions();
                status
            }
            StepStatus::Done => {
                if let Some(ActivePass {
                    generation,
                    stage: PassStage::Running(simulation),
                }) = self.pass.take()
                {
                    self.apply(generation, simulation.finish());
                }
                StepStatus::Done
            }
        }
    }

    /// Runs the in-flight pass to completion, waiting on the oracle if needed.
    /// For headless callers; a UI should call [`Self::tick`] per frame.
    pub fn run_until_idle(&mut self) {
        if self.is_seeding()
            && let Some(ActivePass {
                generation,
                stage: PassStage::Seeding(request),
            }) = self.pass.take()
        {
            let stage = PassStage::Running(self.simulation_from(request.wait()));
            self.pass = Some(ActivePass { generation, stage });
        }
        while self.tick() != StepStatus::Done {}
    }

    /// Starts a pass driven outside the session (another thread, a remote
    /// engine). Any in-flight pass is superseded.
    pub fn begin_pass(&mut self) -> PassTicket {
        let generation = self.next_generation();
        self.events.push_back(SessionEvent::LayoutStarted {
            generation,
            nodes: self.view.len(),
        });
        PassTicket { generation }
    }

    /// Applies an externally computed outcome unless a newer pass started
    /// since `ticket` was issued.
    pub fn commit(&mut self, ticket: PassTicket, outcome: LayoutOutcome) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "ignoring stale layout"
            );
            self.events.push_back(SessionEvent::LayoutDiscarded {
                generation: ticket.generation,
            });
            return false;
        }
        self.apply(ticket.generation, outcome);
        true
    }

    fn apply(&mut self, generation: u64, outcome: LayoutOutcome) {
        tracing::info!(
            generation,
            nodes = outcome.positions.len(),
            iterations = outcome.iterations,
            truncated = outcome.truncated,
            "layout pass converged"
        );
        self.positions = outcome.positions;
        self.events.push_back(SessionEvent::LayoutConverged {
            generation,
            iterations: outcome.iterations,
            truncated: outcome.truncated,
        });
    }
}
