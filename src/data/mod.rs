mod graph;
mod parse;

use std::path::Path;

use anyhow::{Context, Result};

pub use graph::{Edge, EdgeSummary, GraphData, Node, NodeId, NodeKind};

impl GraphData {
    /// Parses a `{ "nodes": [...], "edges": [...] }` document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        parse::parse_graph_json(raw)
    }

    pub fn from_json_value(value: &serde_json::Value) -> Self {
        parse::graph_from_value(value)
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read graph file {}", path.display()))?;
        let mut graph = Self::from_json_str(&raw)
            .with_context(|| format!("failed to parse graph file {}", path.display()))?;

        let dropped = graph.retain_resolved_edges();
        if dropped > 0 {
            tracing::warn!(
                dropped,
                path = %path.display(),
                "edges reference nodes missing from the file"
            );
        }
        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "loaded shareholding graph"
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_file_drops_dangling_edges() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"nodes":[{{"id":1,"type":"company"}},{{"id":2,"type":"person"}}],
               "edges":[{{"from":2,"to":1,"ratio":40}},{{"from":3,"to":1,"ratio":5}}]}}"#
        )
        .unwrap();

        let graph = GraphData::load_file(file.path()).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn load_file_reports_missing_path() {
        let error = GraphData::load_file("/definitely/not/here.json").unwrap_err();
        assert!(error.to_string().contains("failed to read graph file"));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(GraphData::from_json_str("{nodes").is_err());
    }
}
