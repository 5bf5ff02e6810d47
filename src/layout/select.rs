use std::collections::HashMap;

use crate::config::VisibilityPolicy;
use crate::data::{Edge, Node, NodeId, NodeKind};

use super::view::TypeFilter;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisibleSelection {
    pub visible_nodes: Vec<Node>,
    /// Importance limiting removed at least part of the candidate set.
    pub limit_applied: bool,
    /// Type-matched nodes before limiting.
    pub candidates: usize,
}

/// Degree and strongest incident ratio of one node.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IncidentStats {
    pub degree: usize,
    pub max_ratio: f32,
}

pub fn incident_stats(edges: &[Edge]) -> HashMap<&NodeId, IncidentStats> {
    let mut stats: HashMap<&NodeId, IncidentStats> = HashMap::new();
    for edge in edges {
        let ratio = if edge.ratio.is_finite() { edge.ratio.max(0.0) } else { 0.0 };
        let endpoints = if edge.from == edge.to {
            vec![&edge.from]
        } else {
            vec![&edge.from, &edge.to]
        };
        for id in endpoints {
            let entry = stats.entry(id).or_default();
            entry.degree += 1;
            entry.max_ratio = entry.max_ratio.max(ratio);
        }
    }
    stats
}

pub fn importance(stats: IncidentStats, policy: &VisibilityPolicy) -> f32 {
    stats.degree as f32 * policy.degree_weight + stats.max_ratio * policy.ratio_weight
}

/// Picks the default visible set.
///
/// Small candidate sets pass through untouched. Above
/// `policy.apply_when_over`, only importance-eligible kinds with enough
/// connections survive (individual shareholders also need a large enough
/// stake), ranked by [`importance`] and cut at `policy.max_nodes`. `selected`
/// is always part of the result, displacing the weakest entry when the cap
/// is full, so a known selection yields at least one node even when
/// `max_nodes` is 0. The result never exceeds `max(max_nodes, 1)`.
pub fn select_visible(
    nodes: &[Node],
    edges: &[Edge],
    active_types: &TypeFilter,
    policy: &VisibilityPolicy,
    selected: Option<&NodeId>,
) -> VisibleSelection {
    let base = nodes
        .iter()
        .filter(|node| active_types.contains(&node.kind))
        .collect::<Vec<_>>();
    let candidates = base.len();

    let limiting = policy.enabled && candidates > policy.apply_when_over;
    let mut chosen = if limiting {
        let stats = incident_stats(edges);
        let stats_of = |node: &Node| stats.get(&node.id).copied().unwrap_or_default();

        let mut eligible = base
            .iter()
            .copied()
            .filter(|node| {
                let node_stats = stats_of(node);
                policy.importance_types.contains(&node.kind)
                    && node_stats.degree >= policy.min_connections
                    && !(node.kind == NodeKind::Person && node_stats.max_ratio < policy.min_ratio)
            })
            .map(|node| (importance(stats_of(node), policy), node))
            .collect::<Vec<_>>();

        if eligible.len() > policy.max_nodes {
            eligible.sort_by(|a, b| b.0.total_cmp(&a.0));
            eligible.truncate(policy.max_nodes);
        }
        eligible.into_iter().map(|(_, node)| node).collect::<Vec<_>>()
    } else {
        base
    };

    if let Some(selected_id) = selected
        && !chosen.iter().any(|node| &node.id == selected_id)
        && let Some(selected_node) = nodes.iter().find(|node| &node.id == selected_id)
    {
        if limiting && chosen.len() >= policy.max_nodes {
            chosen.pop();
        }
        chosen.push(selected_node);
    }

    let limit_applied = limiting && chosen.len() < candidates;
    if limit_applied {
        tracing::debug!(
            shown = chosen.len(),
            candidates,
            "visible set limited by importance"
        );
    }

    VisibleSelection {
        visible_nodes: chosen.into_iter().cloned().collect(),
        limit_applied,
        candidates,
    }
}
