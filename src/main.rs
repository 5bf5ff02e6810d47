mod app;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stakegraph::oracle::FileOracle;
use stakegraph::{GraphData, GraphLayoutSession, NodeId, SessionConfig, Viewport};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Shareholding graph as `{ "nodes": [...], "edges": [...] }`.
    input: PathBuf,

    /// JSON file overriding layout, visibility and ego settings.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 1440.0)]
    width: f32,

    #[arg(long, default_value_t = 920.0)]
    height: f32,

    /// Fixed jitter seed for reproducible layouts.
    #[arg(long)]
    seed: Option<u64>,

    /// Open the governance map of this node instead of the full graph.
    #[arg(long)]
    ego: Option<String>,

    /// Lay out without a window and write positions to this file.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Seed layout passes from a previously exported layout.
    #[arg(long)]
    seed_layout: Option<PathBuf>,
}

impl Args {
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)?,
            None => SessionConfig::default(),
        };
        if self.seed.is_some() {
            config.layout.seed = self.seed;
        }
        Ok(config)
    }

    fn session(&self) -> Result<GraphLayoutSession> {
        if !(self.width > 0.0 && self.height > 0.0) {
            bail!("viewport must be positive, got {}x{}", self.width, self.height);
        }
        let session = GraphLayoutSession::new(
            self.session_config()?,
            Viewport::new(self.width, self.height),
        );
        Ok(match &self.seed_layout {
            Some(path) => session.with_oracle(Arc::new(FileOracle::new(path))),
            None => session,
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let session = args.session()?;

    if let Some(path) = args.export.clone() {
        return export(&args, session, &path);
    }
    view(args, session)
}

fn export(args: &Args, mut session: GraphLayoutSession, path: &Path) -> Result<()> {
    let graph = GraphData::load_file(&args.input)?;
    session.load_graph(graph);

    if let Some(center) = &args.ego
        && !session.enter_ego_local(&NodeId::new(center.as_str()))
    {
        bail!("node {center} is not part of {}", args.input.display());
    }
    session.run_until_idle();

    stakegraph::export::write_layout(&session, path)
}

fn view(args: Args, session: GraphLayoutSession) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([args.width, args.height]),
        ..Default::default()
    };

    let ego = args.ego.map(NodeId::new);
    eframe::run_native(
        "stakegraph",
        options,
        Box::new(move |cc| Ok(Box::new(app::StakeGraphApp::new(cc, args.input, session, ego)))),
    )
    .map_err(|error| anyhow::anyhow!("viewer failed: {error}"))
    .context("failed to run the graph viewer")
}
