//! Boundary to an external, best-effort layout service whose output seeds
//! the force layout. Nothing here is ever fatal to a layout pass.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use eframe::egui::{Vec2, vec2};
use serde_json::Value;
use thiserror::Error;

use crate::data::{Edge, Node, NodeId};

/// Node id to normalized `[0, 1]` coordinates.
pub type SeedPositions = HashMap<NodeId, Vec2>;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("layout oracle is unavailable: {0}")]
    Unavailable(String),
    #[error("layout oracle returned a malformed layout: {0}")]
    Malformed(String),
    #[error("layout oracle did not answer within {0:?}")]
    Timeout(Duration),
    #[error("layout oracle worker disconnected")]
    Disconnected,
    #[error("layout oracle placed {covered} of {expected} nodes")]
    Incomplete { covered: usize, expected: usize },
}

pub trait LayoutOracle: Send + Sync {
    fn layout(&self, nodes: &[Node], edges: &[Edge]) -> Result<SeedPositions, OracleError>;
}

/// Seed layout being computed on a worker thread.
///
/// Polling never blocks; the request resolves to `None` (and logs why) on
/// failure, timeout or a layout that leaves any requested node unplaced.
pub struct SeedRequest {
    rx: Receiver<Result<SeedPositions, OracleError>>,
    expected: Vec<NodeId>,
    timeout: Duration,
    deadline: Instant,
}

#[derive(Debug, PartialEq)]
pub enum SeedPoll {
    Pending,
    Ready(Option<SeedPositions>),
}

impl SeedRequest {
    pub fn spawn(oracle: Arc<dyn LayoutOracle>, nodes: &[Node], edges: &[Edge], timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let owned_nodes = nodes.to_vec();
        let owned_edges = edges.to_vec();

        thread::spawn(move || {
            let result = oracle.layout(&owned_nodes, &owned_edges);
            // The receiver is gone once the pass it belonged to was superseded.
            let _ = tx.send(result);
        });

        Self {
            rx,
            expected: nodes.iter().map(|node| node.id.clone()).collect(),
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn poll(&self) -> SeedPoll {
        let result = match self.rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) if Instant::now() < self.deadline => return SeedPoll::Pending,
            Err(TryRecvError::Empty) => Err(OracleError::Timeout(self.timeout)),
            Err(TryRecvError::Disconnected) => Err(OracleError::Disconnected),
        };
        SeedPoll::Ready(self.accept(result))
    }

    /// Blocks until the seed arrives or the deadline passes.
    pub fn wait(self) -> Option<SeedPositions> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        let result = match self.rx.recv_timeout(remaining) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(OracleError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(OracleError::Disconnected),
        };
        self.accept(result)
    }

    fn accept(&self, result: Result<SeedPositions, OracleError>) -> Option<SeedPositions> {
        match result.and_then(|seed| self.check_coverage(seed)) {
            Ok(seed) => {
                tracing::debug!(nodes = seed.len(), "accepted seed layout");
                Some(seed)
            }
            Err(error) => {
                tracing::warn!(%error, "ignoring seed layout");
                None
            }
        }
    }

    fn check_coverage(&self, seed: SeedPositions) -> Result<SeedPositions, OracleError> {
        let covered = self
            .expected
            .iter()
            .filter(|id| seed.get(*id).is_some_and(|point| point.is_finite()))
            .count();
        if covered < self.expected.len() {
            return Err(OracleError::Incomplete {
                covered,
                expected: self.expected.len(),
            });
        }
        Ok(seed)
    }
}

/// Asks `oracle` for seed coordinates and waits for the answer.
pub fn request_seed(
    oracle: Arc<dyn LayoutOracle>,
    nodes: &[Node],
    edges: &[Edge],
    timeout: Duration,
) -> Option<SeedPositions> {
    SeedRequest::spawn(oracle, nodes, edges, timeout).wait()
}

/// Reads `{ "positions": { "<id>": { "x": .., "y": .. } } }`.
///
/// Coordinates are taken as normalized unless the document also carries a
/// positive `width` and `height`; pixel layouts (such as an export) are then
/// scaled down by them.
pub fn parse_seed_positions(value: &Value) -> Result<SeedPositions, OracleError> {
    let entries = value
        .get("positions")
        .and_then(Value::as_object)
        .ok_or_else(|| OracleError::Malformed("missing `positions` object".to_owned()))?;

    let dimension = |key: &str| value.get(key).and_then(Value::as_f64).filter(|v| *v > 0.0);
    let scale = match (dimension("width"), dimension("height")) {
        (Some(width), Some(height)) => vec2(width as f32, height as f32),
        _ => vec2(1.0, 1.0),
    };

    let mut seed = SeedPositions::with_capacity(entries.len());
    for (id, point) in entries {
        let x = point.get("x").and_then(Value::as_f64);
        let y = point.get("y").and_then(Value::as_f64);
        if let (Some(x), Some(y)) = (x, y) {
            seed.insert(NodeId::new(id.trim()), vec2(x as f32 / scale.x, y as f32 / scale.y));
        }
    }
    Ok(seed)
}

/// Oracle backed by a layout previously exported to disk.
#[derive(Clone, Debug)]
pub struct FileOracle {
    path: PathBuf,
}

impl FileOracle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LayoutOracle for FileOracle {
    fn layout(&self, _nodes: &[Node], _edges: &[Edge]) -> Result<SeedPositions, OracleError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|error| {
            OracleError::Unavailable(format!("{}: {error}", self.path.display()))
        })?;
        let value = serde_json::from_str::<Value>(&raw)
            .map_err(|error| OracleError::Malformed(error.to_string()))?;
        parse_seed_positions(&value)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;
    use crate::data::NodeKind;

    struct Fixed(SeedPositions);

    impl LayoutOracle for Fixed {
        fn layout(&self, _: &[Node], _: &[Edge]) -> Result<SeedPositions, OracleError> {
            Ok(self.0.clone())
        }
    }

    struct Slow;

    impl LayoutOracle for Slow {
        fn layout(&self, _: &[Node], _: &[Edge]) -> Result<SeedPositions, OracleError> {
            thread::sleep(Duration::from_millis(500));
            Ok(SeedPositions::new())
        }
    }

    struct Broken;

    impl LayoutOracle for Broken {
        fn layout(&self, _: &[Node], _: &[Edge]) -> Result<SeedPositions, OracleError> {
            Err(OracleError::Unavailable("connection refused".to_owned()))
        }
    }

    fn nodes() -> Vec<Node> {
        vec![
            Node::new("a", NodeKind::Company, "a"),
            Node::new("b", NodeKind::Person, "b"),
        ]
    }

    #[test]
    fn complete_seed_is_accepted() {
        let seed = SeedPositions::from([
            (NodeId::from("a"), vec2(0.1, 0.2)),
            (NodeId::from("b"), vec2(0.9, 0.8)),
        ]);
        let result = request_seed(Arc::new(Fixed(seed.clone())), &nodes(), &[], Duration::from_secs(5));
        assert_eq!(result, Some(seed));
    }

    #[test]
    fn partial_seed_is_rejected() {
        let seed = SeedPositions::from([(NodeId::from("a"), vec2(0.1, 0.2))]);
        let request = SeedRequest::spawn(Arc::new(Fixed(seed.clone())), &nodes(), &[], Duration::from_secs(5));
        assert!(matches!(
            request.check_coverage(seed),
            Err(OracleError::Incomplete { covered: 1, expected: 2 })
        ));
        assert_eq!(request.wait(), None);
    }

    #[test]
    fn slow_and_failing_oracles_fall_back() {
        let timeout = Duration::from_millis(20);
        assert!(request_seed(Arc::new(Slow), &nodes(), &[], timeout).is_none());
        assert!(request_seed(Arc::new(Broken), &nodes(), &[], timeout).is_none());
    }

    #[test]
    fn polling_a_slow_oracle_returns_at_once() {
        let request = SeedRequest::spawn(Arc::new(Slow), &nodes(), &[], Duration::from_secs(5));
        let started = Instant::now();
        assert_eq!(request.poll(), SeedPoll::Pending);
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn polling_past_the_deadline_gives_up() {
        let request = SeedRequest::spawn(Arc::new(Slow), &nodes(), &[], Duration::from_millis(10));
        thread::sleep(Duration::from_millis(40));
        assert_eq!(request.poll(), SeedPoll::Ready(None));
    }

    #[test]
    fn file_oracle_reads_exported_positions() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"positions": {{"a": {{"x": 0.25, "y": 0.5}}, "b": {{"x": 1}}}}}}"#).unwrap();

        let seed = FileOracle::new(file.path()).layout(&[], &[]).unwrap();
        assert_eq!(seed.len(), 1);
        assert_eq!(seed[&NodeId::from("a")], vec2(0.25, 0.5));
    }

    #[test]
    fn pixel_layouts_are_scaled_down() {
        let seed = parse_seed_positions(&json!({
            "width": 800.0,
            "height": 400.0,
            "positions": {"a": {"x": 200.0, "y": 100.0}}
        }))
        .unwrap();
        assert_eq!(seed[&NodeId::from("a")], vec2(0.25, 0.25));
    }

    #[test]
    fn missing_positions_object_is_malformed() {
        assert!(matches!(
            parse_seed_positions(&json!({"nodes": []})),
            Err(OracleError::Malformed(_))
        ));
    }
}
