//! Node geometry and color. Everything here is pure.

use eframe::egui::Color32;

use crate::config::LabelMetrics;
use crate::data::{Node, NodeKind};

use super::view::GraphView;

pub fn base_radius(kind: &NodeKind) -> f32 {
    match kind {
        NodeKind::Company => 22.0,
        NodeKind::Person => 16.0,
        NodeKind::Major => 20.0,
        NodeKind::Institution => 18.0,
        NodeKind::Other(_) => 18.0,
    }
}

/// Physical radius used for collision, repulsion and fitting.
///
/// Covers the circle itself and the label drawn beneath it, so it always
/// over-estimates the drawn footprint.
pub fn layout_radius(node: &Node, multiplier: f32, labels: &LabelMetrics) -> f32 {
    let base = base_radius(&node.kind);
    let label_chars = node.label.chars().count() as f32;
    let horizontal = base + label_chars * labels.px_per_char * 0.5;
    let vertical = base + labels.label_gap + labels.label_height;
    (base * multiplier).max(horizontal.max(vertical))
}

/// Returns the (active, closed) color pair for a node kind.
pub fn kind_colors(kind: &NodeKind) -> (Color32, Color32) {
    match kind {
        NodeKind::Company => (Color32::from_rgb(0xd8, 0x56, 0x04), Color32::from_rgb(0x99, 0x99, 0x99)),
        NodeKind::Person => (Color32::from_rgb(0xad, 0x1b, 0x02), Color32::from_rgb(0x66, 0x66, 0x66)),
        NodeKind::Major => (Color32::from_rgb(0xe8, 0x8d, 0x14), Color32::from_rgb(0x88, 0x88, 0x88)),
        NodeKind::Institution => {
            (Color32::from_rgb(0x7c, 0x5c, 0xfc), Color32::from_rgb(0x77, 0x77, 0x77))
        }
        NodeKind::Other(_) => (Color32::from_rgb(0x99, 0x99, 0x99), Color32::from_rgb(0x66, 0x66, 0x66)),
    }
}

pub fn node_color(node: &Node) -> Color32 {
    let (active, closed) = kind_colors(&node.kind);
    if node.active { active } else { closed }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DegreeStats {
    pub max_degree: usize,
    pub average_degree: f32,
}

impl DegreeStats {
    pub fn from_view(view: &GraphView) -> Self {
        let count = view.visible_nodes.len().max(1) as f32;
        let total = view.degree_by_node.values().sum::<usize>() as f32;
        Self {
            max_degree: view.max_degree.max(1),
            average_degree: total / count,
        }
    }
}

/// How a node relates to the current selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionState {
    Selected,
    /// Something else is selected and this node is not adjacent to it.
    Unrelated,
    #[default]
    Neutral,
}

impl SelectionState {
    fn factor(self) -> f32 {
        match self {
            Self::Selected => 1.2,
            Self::Unrelated => 0.7,
            Self::Neutral => 1.0,
        }
    }
}

pub fn degree_factor(degree: usize, stats: DegreeStats) -> f32 {
    let degree_f = degree as f32;
    let average = stats.average_degree;
    if degree_f >= stats.max_degree as f32 * 0.7 {
        1.3
    } else if degree_f >= average * 1.5 {
        1.2
    } else if degree_f >= average {
        1.1
    } else if degree > 0 && degree_f < average * 0.5 {
        0.9
    } else if degree == 0 {
        0.85
    } else {
        1.0
    }
}

pub fn ratio_factor(max_ratio: f32) -> f32 {
    if max_ratio > 20.0 {
        1.15
    } else if max_ratio > 10.0 {
        1.08
    } else if max_ratio > 5.0 {
        1.04
    } else {
        1.0
    }
}

/// Drawn diameter, distinct from [`layout_radius`].
pub fn display_size(
    kind: &NodeKind,
    degree: usize,
    stats: DegreeStats,
    max_ratio: f32,
    state: SelectionState,
) -> f32 {
    let base = base_radius(kind);
    let size = 2.0 * base * degree_factor(degree, stats) * ratio_factor(max_ratio) * state.factor();
    let min = 16.0_f32.max(base * 0.6);
    let max = 80.0_f32.min(base * 1.8);
    size.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> LabelMetrics {
        LabelMetrics::default()
    }

    #[test]
    fn short_labels_fall_back_to_multiplied_base() {
        let node = Node::new("1", NodeKind::Company, "A");
        assert_eq!(layout_radius(&node, 5.0, &labels()), 110.0);
    }

    #[test]
    fn long_labels_widen_the_radius() {
        let label = "x".repeat(40);
        let node = Node::new("1", NodeKind::Person, label);
        assert_eq!(layout_radius(&node, 5.0, &labels()), 16.0 + 160.0);
    }

    #[test]
    fn vertical_extent_wins_with_small_multiplier() {
        let node = Node::new("1", NodeKind::Person, "");
        assert_eq!(layout_radius(&node, 1.0, &labels()), 16.0 + 18.0 + 16.0);
    }

    #[test]
    fn closed_nodes_use_muted_color() {
        let mut node = Node::new("1", NodeKind::Institution, "fund");
        assert_eq!(node_color(&node), Color32::from_rgb(0x7c, 0x5c, 0xfc));
        node.active = false;
        assert_eq!(node_color(&node), Color32::from_rgb(0x77, 0x77, 0x77));

        let unknown = Node::new("2", NodeKind::parse("trust"), "t");
        assert_eq!(node_color(&unknown), Color32::from_rgb(0x99, 0x99, 0x99));
    }

    #[test]
    fn hubs_never_shrink_below_isolated_nodes() {
        for max_degree in 1..40usize {
            let stats = DegreeStats {
                max_degree,
                average_degree: max_degree as f32 / 3.0,
            };
            let hub_degree = ((max_degree as f32) * 0.7).ceil() as usize;
            assert!(degree_factor(hub_degree, stats) >= degree_factor(0, stats));
        }
    }

    #[test]
    fn display_size_is_clamped() {
        let stats = DegreeStats {
            max_degree: 10,
            average_degree: 2.0,
        };
        let huge = display_size(&NodeKind::Company, 10, stats, 50.0, SelectionState::Selected);
        assert_eq!(huge, 22.0 * 1.8);

        let faded = display_size(&NodeKind::Person, 0, stats, 0.0, SelectionState::Unrelated);
        assert!((faded - 32.0 * 0.85 * 0.7).abs() < 1e-3);
        assert!(faded >= 16.0);
    }
}
