use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context};

use stakegraph::layout::IncidentStats;
use stakegraph::layout::sizing::DegreeStats;
use stakegraph::{GraphData, GraphLayoutSession, NodeId, SessionEvent};

mod graph;
mod heatmap;
mod render_utils;
mod ui;

type LoadResult = Result<GraphData, String>;

pub struct StakeGraphApp {
    source: PathBuf,
    state: AppState,
    model: ViewModel,
    reload_rx: Option<Receiver<LoadResult>>,
    initial_ego: Option<NodeId>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready,
    Error(String),
}

struct ViewModel {
    session: GraphLayoutSession,
    camera: graph::Camera,
    notices: VecDeque<String>,
    limit_notice: Option<String>,
    render_cache: Option<RenderCache>,
    heatmap_cache: Option<(u64, heatmap::WeightedMatrix)>,
}

/// Per-pass display data derived from the session's view.
struct RenderCache {
    /// Session view revision the cache was built from.
    key: u64,
    edges: Vec<RenderEdge>,
    incident: HashMap<NodeId, IncidentStats>,
    degree_stats: DegreeStats,
}

/// All parallel edges of one (from, to) pair collapsed into one line.
struct RenderEdge {
    from: usize,
    to: usize,
    max_ratio: f32,
    label: String,
}

impl StakeGraphApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        source: PathBuf,
        session: GraphLayoutSession,
        initial_ego: Option<NodeId>,
    ) -> Self {
        let state = Self::start_load(source.clone());
        Self {
            source,
            state,
            model: ViewModel::new(session),
            reload_rx: None,
            initial_ego,
        }
    }

    fn spawn_load(source: PathBuf) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = GraphData::load_file(&source).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: PathBuf) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(source),
        }
    }

    fn apply_loaded(&mut self, result: LoadResult) -> AppState {
        match result {
            Ok(graph) => {
                self.model.load(graph);
                if let Some(center) = self.initial_ego.take()
                    && !self.model.session.enter_ego_local(&center)
                {
                    self.model.notify(format!("{center} is not in the loaded graph"));
                }
                AppState::Ready
            }
            Err(error) => AppState::Error(error),
        }
    }
}

impl eframe::App for StakeGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let mut retry = false;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => transition = Some(Ok(result)),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading shareholding graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load shareholding graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
            }
            AppState::Ready => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                self.model
                    .show(ctx, &self.source, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.source.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => transition = Some(Ok(result)),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(Err("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if retry {
            self.state = Self::start_load(self.source.clone());
        }

        if let Some(next) = transition {
            self.reload_rx = None;
            self.state = match next {
                Ok(result) => self.apply_loaded(result),
                Err(error) => AppState::Error(error),
            };
        }
    }
}

impl ViewModel {
    const MAX_NOTICES: usize = 8;

    fn new(session: GraphLayoutSession) -> Self {
        Self {
            session,
            camera: graph::Camera::default(),
            notices: VecDeque::new(),
            limit_notice: None,
            render_cache: None,
            heatmap_cache: None,
        }
    }

    fn load(&mut self, graph: GraphData) {
        self.limit_notice = None;
        self.render_cache = None;
        self.heatmap_cache = None;
        self.camera = graph::Camera::default();
        self.session.load_graph(graph);
    }

    fn notify(&mut self, notice: String) {
        if self.notices.len() == Self::MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(notice);
    }

    /// Advances the running pass and turns session events into notices.
    fn pump_session(&mut self, ctx: &Context) {
        if self.session.is_busy() {
            self.session.tick();
            ctx.request_repaint();
        }

        for event in self.session.drain_events() {
            match event {
                SessionEvent::LayoutStarted { generation, nodes } => {
                    self.notify(format!("pass {generation}: laying out {nodes} nodes"));
                }
                SessionEvent::LayoutConverged {
                    generation,
                    iterations,
                    truncated,
                } => {
                    let suffix = if truncated { " (stopped early)" } else { "" };
                    self.notify(format!("pass {generation}: done after {iterations} iterations{suffix}"));
                }
                SessionEvent::LayoutDiscarded { generation } => {
                    self.notify(format!("pass {generation}: superseded"));
                }
                SessionEvent::VisibleSetLimited { shown, candidates } => {
                    self.limit_notice = Some(format!(
                        "Showing the {shown} most connected of {candidates} nodes. Select a node or open its governance map to see the rest."
                    ));
                }
                SessionEvent::ModeChanged { mode } => {
                    self.camera = graph::Camera::default();
                    self.notify(format!("now showing {mode}"));
                }
            }
        }
    }
}
