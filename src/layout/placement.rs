use std::collections::HashMap;
use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};
use rand::Rng;

use crate::data::NodeId;

use super::view::GraphView;
use super::{Extent, Viewport};

/// Components laid out on a grid of cells, each on a jittered ellipse sized
/// by its member count. Largest component takes the first cell.
pub(super) fn pack_components(view: &GraphView, extent: Extent, rng: &mut impl Rng) -> Vec<Vec2> {
    let mut positions = vec![extent.center(); view.len()];
    let component_count = view.components.len().max(1);
    let cols = (component_count as f32).sqrt().ceil().max(1.0) as usize;
    let rows = component_count.div_ceil(cols);
    let cell = vec2(extent.width() / cols as f32, extent.height() / rows as f32);

    for (slot, members) in view.components.iter().enumerate() {
        let row = slot / cols;
        let col = slot % cols;
        let cell_center = extent.min + vec2((col as f32 + 0.5) * cell.x, (row as f32 + 0.5) * cell.y);

        let min_radius = (members.len() as f32 * 24.0).max(80.0);
        let radius = vec2(
            (cell.x * 0.48).min((cell.x * 0.35).max(min_radius)),
            (cell.y * 0.48).min((cell.y * 0.35).max(min_radius)),
        );

        let count = members.len().max(1) as f32;
        for (i, &index) in members.iter().enumerate() {
            let angle = (i as f32 / count) * TAU + (rng.random::<f32>() - 0.5) * 1.2;
            let jitter = 0.75 + rng.random::<f32>() * 0.5;
            positions[index] =
                cell_center + vec2(angle.cos() * radius.x, angle.sin() * radius.y) * jitter;
        }
    }

    positions
}

/// One cluster around the extent center. Hubs land near the middle and
/// low-degree nodes near the rim.
pub(super) fn radial(
    view: &GraphView,
    extent: Extent,
    viewport: Viewport,
    use_full_area: bool,
    rng: &mut impl Rng,
) -> Vec<Vec2> {
    let center = extent.center();
    let mut positions = vec![center; view.len()];
    let node_count = view.len() as f32;

    let base = if use_full_area {
        vec2(extent.width() * 0.5, extent.height() * 0.5)
    } else {
        let radius = viewport.width.min(viewport.height) * 0.45;
        vec2(radius, radius)
    };
    let radius = vec2(base.x.max(node_count * 20.0), base.y.max(node_count * 20.0));

    let mut order = (0..view.len()).collect::<Vec<_>>();
    order.sort_by(|a, b| view.degree_at(*b).cmp(&view.degree_at(*a)));

    let max_degree = view.max_degree.max(1) as f32;
    let count = node_count.max(1.0);
    for (i, index) in order.into_iter().enumerate() {
        let normalized = view.degree_at(index) as f32 / max_degree;
        let fraction = if normalized > 0.8 {
            0.15 + rng.random::<f32>() * 0.25
        } else if normalized < 0.2 {
            0.6 + rng.random::<f32>() * 0.35
        } else {
            0.25 + (1.0 - normalized) * 0.5
        };
        let angle = (i as f32 / count) * TAU + (rng.random::<f32>() - 0.5) * 1.6;
        let jitter = 0.85 + rng.random::<f32>() * 0.3;
        positions[index] =
            center + vec2(angle.cos() * radius.x, angle.sin() * radius.y) * (fraction * jitter);
    }

    positions
}

/// Scales normalized `[0, 1]` seed coordinates into the padded viewport.
///
/// Returns `None` unless every visible node has a finite seed.
pub fn seed_from_normalized(
    seed: &HashMap<NodeId, Vec2>,
    view: &GraphView,
    viewport: Viewport,
    padding: f32,
) -> Option<Vec<Vec2>> {
    let span = vec2(
        (viewport.width - 2.0 * padding).max(1.0),
        (viewport.height - 2.0 * padding).max(1.0),
    );

    view.visible_nodes
        .iter()
        .map(|node| {
            let point = seed.get(&node.id).filter(|point| point.is_finite())?;
            Some(vec2(padding + point.x * span.x, padding + point.y * span.y))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::data::{Edge, Node, NodeKind};
    use crate::layout::view::{TypeFilter, build_view};

    fn view_of(edges: &[(&str, &str)]) -> GraphView {
        let mut ids = edges
            .iter()
            .flat_map(|(from, to)| [*from, *to])
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        let nodes = ids
            .iter()
            .map(|id| Node::new(*id, NodeKind::Company, *id))
            .collect::<Vec<_>>();
        let edges = edges
            .iter()
            .map(|(from, to)| Edge::new(*from, *to, 10.0))
            .collect::<Vec<_>>();
        let filter = NodeKind::KNOWN.into_iter().collect::<TypeFilter>();
        build_view(&nodes, &edges, &filter)
    }

    fn extent() -> Extent {
        Viewport::new(2000.0, 1400.0).padded(100.0)
    }

    #[test]
    fn packed_components_start_in_separate_cells() {
        let view = view_of(&[("a", "b"), ("b", "c"), ("x", "y")]);
        let mut rng = StdRng::seed_from_u64(7);
        let positions = pack_components(&view, extent(), &mut rng);

        let cell_width = extent().width() / 2.0;
        for (slot, members) in view.components.iter().enumerate() {
            for &index in members {
                let column = ((positions[index].x - extent().min.x) / cell_width).floor() as usize;
                assert_eq!(column, slot);
            }
        }
    }

    #[test]
    fn radial_places_hub_nearer_center_than_leaves() {
        let view = view_of(&[
            ("hub", "a"),
            ("hub", "b"),
            ("hub", "c"),
            ("hub", "d"),
            ("hub", "e"),
            ("hub", "f"),
        ]);
        let square = Viewport::new(2000.0, 2000.0);
        let extent = square.padded(100.0);
        let mut rng = StdRng::seed_from_u64(11);
        let positions = radial(&view, extent, square, true, &mut rng);

        let center = extent.center();
        let hub = view.node_index[&NodeId::from("hub")];
        let hub_distance = (positions[hub] - center).length();
        for (index, position) in positions.iter().enumerate() {
            if index != hub {
                assert!((*position - center).length() > hub_distance);
            }
        }
    }

    #[test]
    fn seeds_must_cover_every_visible_node() {
        let view = view_of(&[("a", "b")]);
        let viewport = Viewport::new(1000.0, 800.0);

        let mut seed = HashMap::new();
        seed.insert(NodeId::from("a"), vec2(0.0, 1.0));
        assert!(seed_from_normalized(&seed, &view, viewport, 100.0).is_none());

        seed.insert(NodeId::from("b"), vec2(0.5, 0.5));
        let positions = seed_from_normalized(&seed, &view, viewport, 100.0).unwrap();
        assert_eq!(positions[view.node_index[&NodeId::from("a")]], vec2(100.0, 700.0));
        assert_eq!(positions[view.node_index[&NodeId::from("b")]], vec2(500.0, 400.0));
    }
}
