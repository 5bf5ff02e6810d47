use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Canonical node identifier.
///
/// Upstream sources hand out the same id as a number in one response and as a
/// string in another, so every id is folded into its string form at ingestion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn from_number(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value.fract() == 0.0 && value.abs() < 9.0e15 {
            Some(Self((value as i64).to_string()))
        } else {
            Some(Self(value.to_string()))
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Integer(i64),
            Float(f64),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Ok(Self(text.trim().to_owned())),
            RawId::Integer(value) => Ok(Self(value.to_string())),
            RawId::Float(value) => Self::from_number(value)
                .ok_or_else(|| serde::de::Error::custom("node id must be a finite number")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Company,
    Person,
    Major,
    Institution,
    Other(String),
}

impl NodeKind {
    pub const KNOWN: [NodeKind; 4] = [
        NodeKind::Company,
        NodeKind::Person,
        NodeKind::Major,
        NodeKind::Institution,
    ];

    /// Case-insensitive; anything unrecognised is kept lowercased.
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "company" => Self::Company,
            "person" => Self::Person,
            "major" => Self::Major,
            "institution" => Self::Institution,
            _ => Self::Other(normalized),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Company => "company",
            Self::Person => "person",
            Self::Major => "major",
            Self::Institution => "institution",
            Self::Other(value) => value.as_str(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for NodeKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    pub active: bool,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            active: true,
        }
    }
}

/// A "holds shares of" relation, holder to company.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub ratio: f32,
    pub count: Option<u32>,
}

impl Edge {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>, ratio: f32) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            ratio,
            count: None,
        }
    }
}

/// Display reduction of parallel edges between one (from, to) pair. Ratios are
/// never summed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeSummary {
    pub max_ratio: f32,
    pub relations: u32,
}

impl EdgeSummary {
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a Edge>) -> Self {
        let mut max_ratio = 0.0_f32;
        let mut relations = 0u32;
        for edge in edges {
            if edge.ratio.is_finite() {
                max_ratio = max_ratio.max(edge.ratio);
            }
            relations += edge.count.filter(|count| *count > 0).unwrap_or(1);
        }

        Self {
            max_ratio: max_ratio.clamp(0.0, 100.0),
            relations,
        }
    }

    pub fn label(&self) -> String {
        if self.max_ratio == 0.0 && self.relations > 0 {
            return if self.relations > 5 {
                self.relations.to_string()
            } else {
                String::new()
            };
        }

        if self.relations > 1 {
            format!("{:.1}% ({})", self.max_ratio, self.relations)
        } else {
            format!("{:.1}%", self.max_ratio)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphData {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// Drops edges whose endpoints are not in the node set.
    pub fn retain_resolved_edges(&mut self) -> usize {
        let known = self.nodes.iter().map(|node| &node.id).collect::<HashSet<_>>();
        let before = self.edges.len();
        self.edges
            .retain(|edge| known.contains(&edge.from) && known.contains(&edge.to));
        let dropped = before - self.edges.len();
        if dropped > 0 {
            tracing::debug!(dropped, "dropped edges with unresolved endpoints");
        }
        dropped
    }

    /// Governance-map neighborhood of `center`: nodes within `max_hops` in either
    /// edge direction, capped at `max_nodes`, with the induced edges.
    pub fn ego_neighborhood(&self, center: &NodeId, max_hops: usize, max_nodes: usize) -> GraphData {
        let max_hops = max_hops.clamp(1, 3);
        let max_nodes = max_nodes.clamp(10, 300);

        let Some(center_node) = self.node(center) else {
            return GraphData::default();
        };

        let mut adjacency: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
        for edge in &self.edges {
            adjacency.entry(&edge.from).or_default().push(&edge.to);
            adjacency.entry(&edge.to).or_default().push(&edge.from);
        }

        let mut kept = HashSet::new();
        let mut queue = VecDeque::new();
        kept.insert(&center_node.id);
        queue.push_back((&center_node.id, 0usize));

        'walk: while let Some((current, hops)) = queue.pop_front() {
            if hops >= max_hops {
                continue;
            }
            let Some(neighbors) = adjacency.get(current) else {
                continue;
            };

            for next in neighbors {
                if kept.len() >= max_nodes {
                    break 'walk;
                }
                if kept.insert(*next) {
                    queue.push_back((*next, hops + 1));
                }
            }
        }

        let nodes = self
            .nodes
            .iter()
            .filter(|node| kept.contains(&node.id))
            .cloned()
            .collect::<Vec<_>>();
        let node_ids = nodes.iter().map(|node| &node.id).collect::<HashSet<_>>();
        let edges = self
            .edges
            .iter()
            .filter(|edge| node_ids.contains(&edge.from) && node_ids.contains(&edge.to))
            .cloned()
            .collect();

        GraphData { nodes, edges }
    }
}
