use std::collections::HashSet;

use stakegraph::layout::sizing::layout_radius;
use stakegraph::layout::{
    Extent, build_view, hierarchical_layout, ideal_distance, importance, incident_stats,
    select_visible,
};
use stakegraph::{
    EgoConfig, Edge, GraphData, LabelMetrics, LayoutConfig, Node, NodeId, NodeKind, Positions,
    Simulation, StepStatus, TypeFilter, Viewport, VisibilityPolicy,
};

fn all_types() -> TypeFilter {
    NodeKind::KNOWN.into_iter().collect()
}

/// Springs only, stiff enough to settle within a few dozen iterations.
fn spring_only() -> LayoutConfig {
    LayoutConfig {
        repulsion_strength: 0.0,
        edge_force: 300.0,
        repulsion_only_iterations: 0,
        expansion_from_center: 0.0,
        max_iterations: 300,
        seed: Some(11),
        ..LayoutConfig::default()
    }
}

fn run_raw(graph: &GraphData, viewport: Viewport, config: &LayoutConfig) -> (Positions, Positions) {
    let view = build_view(&graph.nodes, &graph.edges, &all_types());
    let mut simulation = Simulation::new(&view, viewport, config, &LabelMetrics::default(), None);
    while simulation.step(config.batch_size) != StepStatus::Done {}
    let raw = simulation.raw_positions();
    (raw, simulation.finish().positions)
}

fn distance(positions: &Positions, a: &str, b: &str) -> f32 {
    (positions[&NodeId::from(a)] - positions[&NodeId::from(b)]).length()
}

fn assert_within(positions: &Positions, extent: Extent) {
    for (id, point) in positions {
        assert!(
            extent.contains(*point),
            "{id} at {point:?} escaped {extent:?}"
        );
    }
}

fn assert_no_overlap(graph: &GraphData, positions: &Positions, config: &LayoutConfig) {
    let labels = LabelMetrics::default();
    for (i, a) in graph.nodes.iter().enumerate() {
        for b in &graph.nodes[i + 1..] {
            let gap = (positions[&a.id] - positions[&b.id]).length();
            let needed = layout_radius(a, config.layout_radius_multiplier, &labels)
                + layout_radius(b, config.layout_radius_multiplier, &labels);
            assert!(gap >= needed - 1e-2, "{} and {} overlap: {gap} < {needed}", a.id, b.id);
        }
    }
}

#[test]
fn two_nodes_settle_near_the_ideal_distance() {
    let graph = GraphData::from_json_str(
        r#"{"nodes": [{"id": 1, "type": "company"}, {"id": 2, "type": "person"}],
            "edges": [{"from": 2, "to": 1, "ratio": 100}]}"#,
    )
    .unwrap();
    let viewport = Viewport::new(4000.0, 4000.0);
    let config = spring_only();

    let (raw, fitted) = run_raw(&graph, viewport, &config);

    let ideal = ideal_distance(100.0, 2, &config);
    let settled = distance(&raw, "1", "2");
    assert!(
        (settled - ideal).abs() < ideal * 0.05,
        "settled at {settled}, ideal {ideal}"
    );
    assert_within(&fitted, viewport.padded(config.padding));
}

#[test]
fn default_config_keeps_small_chains_apart() {
    let viewport = Viewport::new(1440.0, 920.0);
    let config = LayoutConfig {
        seed: Some(17),
        ..LayoutConfig::default()
    };

    for length in [2, 3, 5, 8] {
        let nodes = (0..length)
            .map(|i| {
                let kind = if i % 2 == 0 { NodeKind::Company } else { NodeKind::Person };
                Node::new(format!("n{i}"), kind, format!("Holder {i}"))
            })
            .collect::<Vec<_>>();
        let edges = (1..length)
            .map(|i| Edge::new(format!("n{i}"), format!("n{}", i - 1), 100.0 / i as f32))
            .collect::<Vec<_>>();
        let graph = GraphData::new(nodes, edges);

        let (_, fitted) = run_raw(&graph, viewport, &config);
        assert_eq!(fitted.len(), length);
        assert_within(&fitted, viewport.padded(config.padding));
        assert_no_overlap(&graph, &fitted, &config);
    }
}

#[test]
fn stronger_stakes_sit_closer() {
    let graph = GraphData::new(
        vec![
            Node::new("hub", NodeKind::Company, "Hub"),
            Node::new("major", NodeKind::Person, "Major"),
            Node::new("minor", NodeKind::Person, "Minor"),
        ],
        vec![Edge::new("major", "hub", 100.0), Edge::new("minor", "hub", 1.0)],
    );
    let (raw, _) = run_raw(&graph, Viewport::new(8000.0, 8000.0), &spring_only());

    assert!(distance(&raw, "hub", "major") < distance(&raw, "hub", "minor"));
}

#[test]
fn star_leaves_spread_around_the_hub_without_overlap() {
    let mut nodes = vec![Node::new("hub", NodeKind::Company, "Hub")];
    let mut edges = Vec::new();
    for i in 0..20 {
        let id = format!("leaf{i}");
        nodes.push(Node::new(id.as_str(), NodeKind::Company, format!("L{i}")));
        edges.push(Edge::new(id.as_str(), "hub", 1.0));
    }
    let graph = GraphData::new(nodes, edges);
    let viewport = Viewport::new(4000.0, 4000.0);
    let config = LayoutConfig {
        seed: Some(5),
        ..LayoutConfig::default()
    };

    let view = build_view(&graph.nodes, &graph.edges, &all_types());
    let outcome = Simulation::new(&view, viewport, &config, &LabelMetrics::default(), None)
        .run_to_completion();
    let positions = &outcome.positions;
    assert_eq!(positions.len(), 21);
    assert_within(positions, viewport.padded(config.padding));

    assert_no_overlap(&graph, positions, &config);

    let hub = positions[&NodeId::from("hub")];
    let mut quadrants = HashSet::new();
    let mut total = 0.0;
    for i in 0..20 {
        let offset = positions[&NodeId::from(format!("leaf{i}"))] - hub;
        quadrants.insert((offset.x >= 0.0, offset.y >= 0.0));
        total += offset.length();
    }
    assert!(quadrants.len() >= 3, "leaves bunched into {quadrants:?}");
    assert!(total / 20.0 >= config.ideal_dist_min);
}

#[test]
fn ego_layers_follow_edge_direction() {
    let nodes = ["A", "B", "C"]
        .map(|id| Node::new(id, NodeKind::Company, id))
        .to_vec();
    let edges = vec![Edge::new("A", "C", 10.0), Edge::new("C", "B", 5.0)];

    let layout = hierarchical_layout(
        &NodeId::from("C"),
        &nodes,
        &edges,
        Viewport::default(),
        &EgoConfig::default(),
    );

    let layer = |id: &str| layout.layers[&NodeId::from(id)];
    assert_eq!((layer("A"), layer("C"), layer("B")), (-1, 0, 1));
    let y = |id: &str| layout.positions[&NodeId::from(id)].y;
    assert!(y("A") < y("C") && y("C") < y("B"));
}

#[test]
fn visible_set_is_capped_by_importance_and_keeps_the_selection() {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for i in 0..1000 {
        nodes.push(Node::new(format!("c{i}"), NodeKind::Company, format!("C{i}")));
        for step in 1..=3 {
            let ratio = ((i * 7 + step * 13) % 97) as f32;
            edges.push(Edge::new(
                format!("c{i}").as_str(),
                format!("c{}", (i + step) % 1000).as_str(),
                ratio,
            ));
        }
    }
    nodes.push(Node::new("quiet", NodeKind::Company, "Quiet"));
    edges.push(Edge::new("quiet", "c0", 0.5));

    let policy = VisibilityPolicy::default();
    let selected = NodeId::from("quiet");
    let selection = select_visible(&nodes, &edges, &all_types(), &policy, Some(&selected));

    assert_eq!(selection.visible_nodes.len(), policy.max_nodes);
    assert_eq!(selection.candidates, 1001);
    assert!(selection.limit_applied);
    assert!(selection.visible_nodes.iter().any(|node| node.id == selected));

    let stats = incident_stats(&edges);
    let score = |id: &NodeId| importance(stats[id], &policy);
    let kept = selection
        .visible_nodes
        .iter()
        .map(|node| &node.id)
        .filter(|id| **id != selected)
        .collect::<HashSet<_>>();
    let weakest_kept = kept.iter().map(|id| score(id)).fold(f32::INFINITY, f32::min);
    let strongest_dropped = nodes
        .iter()
        .filter(|node| node.id != selected && !kept.contains(&node.id))
        .map(|node| score(&node.id))
        .fold(f32::NEG_INFINITY, f32::max);
    assert!(weakest_kept >= strongest_dropped);
}

#[test]
fn fixed_seed_reproduces_the_layout() {
    let graph = GraphData::new(
        (0..12)
            .map(|i| Node::new(format!("n{i}"), NodeKind::Company, format!("N{i}")))
            .collect(),
        (0..11)
            .filter(|i| i % 4 != 3)
            .map(|i| Edge::new(format!("n{i}").as_str(), format!("n{}", i + 1).as_str(), 10.0 + i as f32))
            .collect(),
    );
    let config = LayoutConfig {
        max_iterations: 150,
        repulsion_only_iterations: 50,
        seed: Some(99),
        ..LayoutConfig::default()
    };

    let (_, first) = run_raw(&graph, Viewport::default(), &config);
    let (_, second) = run_raw(&graph, Viewport::default(), &config);
    assert_eq!(first, second);
}

#[test]
fn disconnected_components_stay_apart() {
    let names = ["a1", "a2", "a3", "b1", "b2", "b3"];
    let graph = GraphData::new(
        names.map(|id| Node::new(id, NodeKind::Company, id)).to_vec(),
        vec![
            Edge::new("a1", "a2", 40.0),
            Edge::new("a2", "a3", 40.0),
            Edge::new("a3", "a1", 40.0),
            Edge::new("b1", "b2", 40.0),
            Edge::new("b2", "b3", 40.0),
            Edge::new("b3", "b1", 40.0),
        ],
    );
    let config = LayoutConfig {
        max_iterations: 300,
        seed: Some(8),
        ..LayoutConfig::default()
    };
    let view = build_view(&graph.nodes, &graph.edges, &all_types());
    assert_eq!(view.components.len(), 2);
    let (_, positions) = run_raw(&graph, Viewport::new(2400.0, 1600.0), &config);

    let centroid = |component: usize| {
        let members = view.component_ids(component);
        assert_eq!(members.len(), 3);
        members
            .iter()
            .fold(eframe::egui::Vec2::ZERO, |sum, id| sum + positions[*id])
            / members.len() as f32
    };
    assert!((centroid(0) - centroid(1)).length() > 200.0);
}

#[test]
fn dense_graph_stays_inside_the_viewport() {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for i in 0..60 {
        nodes.push(Node::new(format!("n{i}"), NodeKind::KNOWN[i % 4].clone(), format!("Node {i}")));
        edges.push(Edge::new(format!("n{i}").as_str(), format!("n{}", (i * 7 + 3) % 60).as_str(), (i % 50) as f32));
    }
    let graph = GraphData::new(nodes, edges);
    let viewport = Viewport::new(900.0, 700.0);
    let config = LayoutConfig {
        max_iterations: 200,
        repulsion_only_iterations: 60,
        seed: Some(1),
        ..LayoutConfig::default()
    };

    let (_, positions) = run_raw(&graph, viewport, &config);
    assert_eq!(positions.len(), 60);
    assert_within(&positions, viewport.padded(config.padding));
}
