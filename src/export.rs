//! Headless layout output, readable back through [`crate::oracle::FileOracle`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::layout::Positions;
use crate::session::GraphLayoutSession;

#[derive(Debug, Serialize, PartialEq)]
pub struct ExportedPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Serialize)]
pub struct ExportedLayout<'a> {
    pub width: f32,
    pub height: f32,
    pub mode: String,
    pub generation: u64,
    /// Sorted by node id so repeated exports diff cleanly.
    pub positions: BTreeMap<&'a str, ExportedPoint>,
}

impl<'a> ExportedLayout<'a> {
    pub fn from_session(session: &'a GraphLayoutSession) -> Self {
        let viewport = session.viewport();
        Self {
            width: viewport.width,
            height: viewport.height,
            mode: session.mode().to_string(),
            generation: session.generation(),
            positions: sorted_points(session.positions()),
        }
    }
}

fn sorted_points(positions: &Positions) -> BTreeMap<&str, ExportedPoint> {
    positions
        .iter()
        .map(|(id, point)| {
            (
                id.as_str(),
                ExportedPoint {
                    x: point.x,
                    y: point.y,
                },
            )
        })
        .collect()
}

pub fn write_layout(session: &GraphLayoutSession, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let document = ExportedLayout::from_session(session);
    let raw = serde_json::to_string_pretty(&document).context("failed to encode layout")?;
    fs::write(path, raw).with_context(|| format!("failed to write layout to {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        nodes = document.positions.len(),
        "layout exported"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{LayoutConfig, SessionConfig};
    use crate::data::{Edge, GraphData, Node, NodeId, NodeKind};
    use crate::layout::Viewport;
    use crate::oracle::{FileOracle, LayoutOracle};

    fn laid_out_session() -> GraphLayoutSession {
        let config = SessionConfig {
            layout: LayoutConfig {
                max_iterations: 20,
                repulsion_only_iterations: 5,
                seed: Some(3),
                ..LayoutConfig::default()
            },
            ..SessionConfig::default()
        };
        let mut session = GraphLayoutSession::new(config, Viewport::new(1000.0, 800.0));
        session.load_graph(GraphData::new(
            vec![
                Node::new("b", NodeKind::Company, "B"),
                Node::new("a", NodeKind::Person, "A"),
            ],
            vec![Edge::new("a", "b", 25.0)],
        ));
        session.run_until_idle();
        session
    }

    #[test]
    fn export_is_sorted_by_id() {
        let session = laid_out_session();
        let document = ExportedLayout::from_session(&session);
        assert_eq!(document.positions.keys().copied().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(document.mode, "full graph");
    }

    #[test]
    fn exported_layout_seeds_a_later_pass() {
        let session = laid_out_session();
        let file = tempfile::NamedTempFile::new().unwrap();
        write_layout(&session, file.path()).unwrap();

        let seed = FileOracle::new(file.path()).layout(&[], &[]).unwrap();
        let a = seed[&NodeId::from("a")];
        let pixel = session.positions()[&NodeId::from("a")];
        assert!((a.x - pixel.x / 1000.0).abs() < 1e-4);
        assert!((a.y - pixel.y / 800.0).abs() < 1e-4);

        let mut seeded = GraphLayoutSession::new(SessionConfig::default(), Viewport::new(1000.0, 800.0))
            .with_oracle(Arc::new(FileOracle::new(file.path())));
        seeded.load_graph(session.graph().clone());
        assert!(seeded.is_busy());
    }
}
