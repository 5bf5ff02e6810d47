use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use eframe::egui::vec2;

use crate::config::EgoConfig;
use crate::data::{Edge, Node, NodeId};

use super::{Positions, Viewport};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HierarchicalLayout {
    /// Signed layer per placed node; the center is 0, holders are negative.
    pub layers: HashMap<NodeId, i32>,
    pub positions: Positions,
}

/// Layered layout of a governance map around `center`.
///
/// Following an edge forward (holder to company) goes one layer down,
/// following it backward one layer up. Nodes the walk never reaches sit on
/// layer 0. Crowded layers wrap into sub-rows spread around the layer's
/// baseline. Only nodes touching at least one edge are placed.
pub fn hierarchical_layout(
    center: &NodeId,
    nodes: &[Node],
    edges: &[Edge],
    viewport: Viewport,
    config: &EgoConfig,
) -> HierarchicalLayout {
    let connected = edges
        .iter()
        .flat_map(|edge| [&edge.from, &edge.to])
        .collect::<HashSet<_>>();
    let mut seen = HashSet::new();
    let placed = nodes
        .iter()
        .map(|node| &node.id)
        .filter(|id| connected.contains(id) && seen.insert(*id))
        .collect::<Vec<_>>();
    if placed.is_empty() {
        return HierarchicalLayout::default();
    }

    let walked = walk_layers(center, edges);
    let mut by_layer: BTreeMap<i32, Vec<&NodeId>> = BTreeMap::new();
    let mut layers = HashMap::with_capacity(placed.len());
    for id in placed {
        let layer = walked.get(id).copied().unwrap_or(0);
        by_layer.entry(layer).or_default().push(id);
        layers.insert(id.clone(), layer);
    }

    let padding = config.padding;
    let width = viewport.width - 2.0 * padding;
    let per_row = ((width / config.min_node_spacing).floor() as usize).max(1);

    let rows_by_layer = by_layer
        .iter()
        .map(|(layer, ids)| (*layer, ids.len().div_ceil(per_row).max(1)))
        .collect::<BTreeMap<_, _>>();
    let max_rows = rows_by_layer.values().copied().max().unwrap_or(1);
    let layer_height = (config.sub_row_height * max_rows as f32)
        .max((viewport.height - 2.0 * padding) / by_layer.len().max(1) as f32);
    let min_layer = by_layer.keys().copied().min().unwrap_or(0).min(0);

    let mut positions = Positions::with_capacity(layers.len());
    for (layer, ids) in &by_layer {
        let rows = rows_by_layer.get(layer).copied().unwrap_or(1);
        let per_this_row = ids.len().div_ceil(rows).max(1);
        let base_y = padding + (layer - min_layer) as f32 * layer_height;

        for (row, slice) in ids.chunks(per_this_row).enumerate() {
            let row_y = if rows > 1 {
                base_y + (row as f32 - (rows - 1) as f32 / 2.0) * config.sub_row_height
            } else {
                base_y
            };

            for (i, id) in slice.iter().enumerate() {
                let x = if slice.len() == 1 {
                    padding + width / 2.0
                } else {
                    padding + (i as f32 / (slice.len() - 1) as f32) * width
                };
                positions.insert((*id).clone(), vec2(x, row_y));
            }
        }
    }

    HierarchicalLayout { layers, positions }
}

/// BFS from `center`, scanning edges in input order at each step.
fn walk_layers<'a>(center: &'a NodeId, edges: &'a [Edge]) -> HashMap<&'a NodeId, i32> {
    let mut layers = HashMap::new();
    layers.insert(center, 0);
    let mut queue = VecDeque::from([center]);

    while let Some(current) = queue.pop_front() {
        let layer = layers[current];
        for edge in edges {
            if &edge.from == current && !layers.contains_key(&edge.to) {
                layers.insert(&edge.to, layer + 1);
                queue.push_back(&edge.to);
            }
            if &edge.to == current && !layers.contains_key(&edge.from) {
                layers.insert(&edge.from, layer - 1);
                queue.push_back(&edge.from);
            }
        }
    }

    layers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NodeKind;

    fn company(id: &str) -> Node {
        Node::new(id, NodeKind::Company, id)
    }

    #[test]
    fn holders_sit_above_and_holdings_below() {
        let nodes = vec![company("A"), company("B"), company("C")];
        let edges = vec![Edge::new("A", "C", 10.0), Edge::new("C", "B", 5.0)];
        let layout = hierarchical_layout(
            &NodeId::from("C"),
            &nodes,
            &edges,
            Viewport::new(1200.0, 800.0),
            &EgoConfig::default(),
        );

        assert_eq!(layout.layers[&NodeId::from("A")], -1);
        assert_eq!(layout.layers[&NodeId::from("C")], 0);
        assert_eq!(layout.layers[&NodeId::from("B")], 1);

        let y = |id: &str| layout.positions[&NodeId::from(id)].y;
        assert!(y("A") < y("C"));
        assert!(y("C") < y("B"));
        // One node per layer sits in the horizontal middle.
        assert_eq!(layout.positions[&NodeId::from("C")].x, 600.0);
    }

    #[test]
    fn unreachable_nodes_default_to_layer_zero() {
        let nodes = vec![company("C"), company("X"), company("Y"), company("Z")];
        let edges = vec![Edge::new("X", "Y", 1.0), Edge::new("C", "Z", 1.0)];
        let layout = hierarchical_layout(
            &NodeId::from("C"),
            &nodes,
            &edges,
            Viewport::new(1200.0, 800.0),
            &EgoConfig::default(),
        );
        assert_eq!(layout.layers[&NodeId::from("X")], 0);
        assert_eq!(layout.layers[&NodeId::from("Y")], 0);
        assert_eq!(layout.layers[&NodeId::from("Z")], 1);
    }

    #[test]
    fn crowded_layers_wrap_into_sub_rows() {
        let mut nodes = vec![company("hub")];
        let mut edges = Vec::new();
        for i in 0..30 {
            let id = format!("h{i}");
            nodes.push(company(&id));
            edges.push(Edge::new(id.as_str(), "hub", 1.0));
        }
        let config = EgoConfig::default();
        // width 400 - 140 = 260 -> 4 per row -> 8 rows
        let layout = hierarchical_layout(
            &NodeId::from("hub"),
            &nodes,
            &edges,
            Viewport::new(400.0, 600.0),
            &config,
        );

        let holder_rows = (0..30)
            .map(|i| layout.positions[&NodeId::from(format!("h{i}"))].y.to_bits())
            .collect::<HashSet<_>>();
        assert_eq!(holder_rows.len(), 8);

        for position in layout.positions.values() {
            assert!(position.x >= config.padding - 1e-3);
            assert!(position.x <= 400.0 - config.padding + 1e-3);
        }

        let hub_y = layout.positions[&NodeId::from("hub")].y;
        let lowest_holder = (0..30)
            .map(|i| layout.positions[&NodeId::from(format!("h{i}"))].y)
            .fold(f32::NEG_INFINITY, f32::max);
        assert!(lowest_holder < hub_y);
    }

    #[test]
    fn nodes_without_edges_are_not_placed() {
        let nodes = vec![company("C"), company("B"), company("lonely")];
        let edges = vec![Edge::new("C", "B", 1.0)];
        let layout = hierarchical_layout(
            &NodeId::from("C"),
            &nodes,
            &edges,
            Viewport::new(800.0, 600.0),
            &EgoConfig::default(),
        );
        assert_eq!(layout.positions.len(), 2);
        assert!(!layout.positions.contains_key(&NodeId::from("lonely")));
    }
}
