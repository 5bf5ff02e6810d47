use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::data::{Edge, Node, NodeId, NodeKind};

/// Set of node kinds currently switched on.
pub type TypeFilter = BTreeSet<NodeKind>;

/// An edge resolved to indices into [`GraphView::visible_nodes`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewEdge {
    pub from: usize,
    pub to: usize,
    pub ratio: f32,
}

/// Read-only derivation of one layout pass's input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphView {
    pub visible_nodes: Vec<Node>,
    /// Incident edge count per visible node, parallel edges counted individually.
    pub degree_by_node: HashMap<NodeId, usize>,
    /// Floored at 1.
    pub max_degree: usize,
    /// Connected components as indices into `visible_nodes`, largest first.
    pub components: Vec<Vec<usize>>,
    pub node_index: HashMap<NodeId, usize>,
    /// Edges with both endpoints visible, in input order.
    pub edges: Vec<ViewEdge>,
}

impl GraphView {
    pub fn is_empty(&self) -> bool {
        self.visible_nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.visible_nodes.len()
    }

    pub fn degree(&self, id: &NodeId) -> usize {
        self.degree_by_node.get(id).copied().unwrap_or(0)
    }

    pub fn degree_at(&self, index: usize) -> usize {
        self.visible_nodes
            .get(index)
            .map(|node| self.degree(&node.id))
            .unwrap_or(0)
    }

    pub fn component_ids(&self, component: usize) -> Vec<&NodeId> {
        self.components
            .get(component)
            .map(|members| {
                members
                    .iter()
                    .map(|&index| &self.visible_nodes[index].id)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Visible nodes are type-matched and touch at least one edge; isolated
/// nodes never enter the force layout.
pub fn build_view(nodes: &[Node], edges: &[Edge], active_types: &TypeFilter) -> GraphView {
    let connected = edges
        .iter()
        .flat_map(|edge| [&edge.from, &edge.to])
        .collect::<HashSet<_>>();

    let mut seen = HashSet::new();
    let visible_nodes = nodes
        .iter()
        .filter(|node| active_types.contains(&node.kind) && connected.contains(&node.id))
        .filter(|node| seen.insert(&node.id))
        .cloned()
        .collect::<Vec<_>>();

    if visible_nodes.is_empty() {
        return GraphView {
            max_degree: 1,
            ..GraphView::default()
        };
    }

    let node_index = visible_nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.clone(), index))
        .collect::<HashMap<_, _>>();

    let mut degrees = vec![0usize; visible_nodes.len()];
    let mut view_edges = Vec::new();
    for edge in edges {
        let from = node_index.get(&edge.from).copied();
        let to = node_index.get(&edge.to).copied();
        if let Some(from) = from {
            degrees[from] += 1;
        }
        if let Some(to) = to
            && from != Some(to)
        {
            degrees[to] += 1;
        }
        if let (Some(from), Some(to)) = (from, to) {
            view_edges.push(ViewEdge {
                from,
                to,
                ratio: edge.ratio,
            });
        }
    }

    let max_degree = degrees.iter().copied().max().unwrap_or(0).max(1);
    let degree_by_node = visible_nodes
        .iter()
        .zip(&degrees)
        .map(|(node, degree)| (node.id.clone(), *degree))
        .collect();

    let components = connected_components(visible_nodes.len(), &view_edges);

    GraphView {
        visible_nodes,
        degree_by_node,
        max_degree,
        components,
        node_index,
        edges: view_edges,
    }
}

fn connected_components(node_count: usize, edges: &[ViewEdge]) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); node_count];
    for edge in edges {
        if edge.from == edge.to {
            continue;
        }
        adjacency[edge.from].push(edge.to);
        adjacency[edge.to].push(edge.from);
    }

    let mut visited = vec![false; node_count];
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..node_count {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);

        let mut component = Vec::new();
        while let Some(current) = queue.pop_front() {
            component.push(current);
            for &next in &adjacency[current] {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
        components.push(component);
    }

    // Stable, so equal-sized components keep discovery order.
    components.sort_by(|a, b| b.len().cmp(&a.len()));
    components
}
