use std::collections::{BTreeMap, HashSet};

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Sense, Stroke, Ui, vec2};

use stakegraph::layout::incident_stats;
use stakegraph::layout::sizing::{DegreeStats, SelectionState, display_size, node_color};
use stakegraph::util::ellipsize;
use stakegraph::{Edge, EdgeSummary, ViewMode};

use super::super::render_utils::{
    disc_on_canvas, draw_canvas, fade, mix, ratio_stroke, segment_on_canvas,
};
use super::super::{RenderCache, RenderEdge, ViewModel};

const LABEL_CHARS: usize = 24;

impl ViewModel {
    fn ensure_render_cache(&mut self) {
        let view = self.session.view();
        let key = self.session.view_revision();
        if self
            .render_cache
            .as_ref()
            .is_some_and(|cache| cache.key == key)
        {
            return;
        }

        let data = self.session.current_data();
        let mut grouped: BTreeMap<(usize, usize), Vec<&Edge>> = BTreeMap::new();
        for edge in &data.edges {
            let (Some(&from), Some(&to)) =
                (view.node_index.get(&edge.from), view.node_index.get(&edge.to))
            else {
                continue;
            };
            grouped.entry((from, to)).or_default().push(edge);
        }

        let edges = grouped
            .into_iter()
            .map(|((from, to), parallel)| {
                let summary = EdgeSummary::from_edges(parallel);
                RenderEdge {
                    from,
                    to,
                    max_ratio: summary.max_ratio,
                    label: summary.label(),
                }
            })
            .collect();
        let incident = incident_stats(&data.edges)
            .into_iter()
            .map(|(id, stats)| (id.clone(), stats))
            .collect();

        self.render_cache = Some(RenderCache {
            key,
            edges,
            incident,
            degree_stats: DegreeStats::from_view(view),
        });
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_canvas(&painter, rect, self.camera);
        self.camera.follow_input(ui, rect, &response);
        self.ensure_render_cache();

        let Some(cache) = self.render_cache.as_ref() else {
            return;
        };
        let view = self.session.view();
        if view.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No nodes match the active type filters.",
                FontId::proportional(15.0),
                Color32::from_gray(90),
            );
            return;
        }

        let camera = self.camera;
        let zoom = camera.zoom;
        let positions = self.session.positions();
        let viewport = self.session.viewport();
        let origin = vec2(viewport.width, viewport.height) * 0.5;
        let ego_center = match self.session.mode() {
            ViewMode::Ego { center, .. } => view.node_index.get(center).copied(),
            ViewMode::FullGraph => None,
        };
        let selected = self
            .session
            .selected()
            .and_then(|id| view.node_index.get(id).copied());
        let neighbors = selected
            .map(|selected| {
                cache
                    .edges
                    .iter()
                    .filter_map(|edge| match (edge.from == selected, edge.to == selected) {
                        (true, _) => Some(edge.to),
                        (_, true) => Some(edge.from),
                        _ => None,
                    })
                    .collect::<HashSet<_>>()
            })
            .unwrap_or_default();

        let mut screen_positions: Vec<Option<Pos2>> = Vec::with_capacity(view.len());
        let mut screen_radii = Vec::with_capacity(view.len());
        let mut states = Vec::with_capacity(view.len());
        for (index, node) in view.visible_nodes.iter().enumerate() {
            let state = match selected {
                Some(selected) if selected == index => SelectionState::Selected,
                Some(_) if !neighbors.contains(&index) => SelectionState::Unrelated,
                _ => SelectionState::Neutral,
            };
            let max_ratio = cache.incident.get(&node.id).map_or(0.0, |stats| stats.max_ratio);
            let size = display_size(&node.kind, view.degree_at(index), cache.degree_stats, max_ratio, state);

            states.push(state);
            screen_radii.push(camera.node_radius(size));
            screen_positions.push(
                positions
                    .get(&node.id)
                    .map(|position| camera.to_screen(rect, *position - origin)),
            );
        }

        let hovered = node_under(response.hover_pos(), &screen_positions, &screen_radii);
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let show_edge_labels = zoom > 0.6;
        for edge in &cache.edges {
            let (Some(start), Some(end)) = (screen_positions[edge.from], screen_positions[edge.to]) else {
                continue;
            };
            if !segment_on_canvas(rect, start, end, 2.0) {
                continue;
            }

            let touches_selection = selected.is_some_and(|selected| edge.from == selected || edge.to == selected);
            let (width, alpha) = ratio_stroke(edge.max_ratio, zoom);
            let color = if touches_selection {
                Color32::from_rgb(216, 86, 4)
            } else if selected.is_some() {
                Color32::from_rgba_unmultiplied(150, 150, 150, alpha / 3)
            } else {
                Color32::from_rgba_unmultiplied(110, 110, 110, alpha)
            };
            painter.line_segment([start, end], Stroke::new(width, color));
            draw_arrow_head(&painter, start, end, screen_radii[edge.to], Stroke::new(width, color));

            if show_edge_labels && !edge.label.is_empty() && (selected.is_none() || touches_selection) {
                painter.text(
                    start + (end - start) * 0.5,
                    Align2::CENTER_CENTER,
                    edge.label.as_str(),
                    FontId::proportional(11.0),
                    Color32::from_gray(60),
                );
            }
        }

        let mut draw_order = (0..view.len()).collect::<Vec<_>>();
        draw_order.sort_by(|a, b| screen_radii[*a].total_cmp(&screen_radii[*b]));
        for index in draw_order {
            let Some(position) = screen_positions[index] else {
                continue;
            };
            let radius = screen_radii[index];
            if !disc_on_canvas(rect, position, radius + 40.0) {
                continue;
            }

            let node = &view.visible_nodes[index];
            let is_hovered = hovered == Some(index);
            let mut color = node_color(node);
            if states[index] == SelectionState::Unrelated {
                color = fade(color, 0.6);
            }
            if is_hovered {
                color = mix(color, Color32::WHITE, 0.25);
            }

            painter.circle_filled(position, radius, color);
            painter.circle_stroke(
                position,
                radius,
                Stroke::new(1.0, Color32::from_rgba_unmultiplied(20, 20, 20, 150)),
            );
            if states[index] == SelectionState::Selected {
                painter.circle_stroke(
                    position,
                    radius + 4.0,
                    Stroke::new(2.0, Color32::from_rgb(245, 180, 60)),
                );
            }
            if ego_center == Some(index) {
                painter.circle_stroke(
                    position,
                    radius + 8.0,
                    Stroke::new(1.5, Color32::from_rgb(60, 60, 60)),
                );
            }

            let emphasized = is_hovered || states[index] == SelectionState::Selected;
            if emphasized || zoom > 0.45 {
                painter.text(
                    position + vec2(0.0, radius + 4.0),
                    Align2::CENTER_TOP,
                    ellipsize(&node.label, LABEL_CHARS),
                    FontId::proportional(12.0),
                    Color32::from_gray(if emphasized { 15 } else { 55 }),
                );
            }
        }

        if let Some(index) = hovered {
            let node = &view.visible_nodes[index];
            let stats = cache.incident.get(&node.id).copied().unwrap_or_default();
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                format!(
                    "{}  |  {}  |  {} relations  |  largest stake {:.1}%",
                    node.label,
                    node.kind.label(),
                    stats.degree,
                    stats.max_ratio
                ),
                FontId::proportional(13.0),
                Color32::from_gray(30),
            );
        }

        let pending_selection = response
            .clicked_by(egui::PointerButton::Primary)
            .then(|| hovered.map(|index| view.visible_nodes[index].id.clone()));
        if let Some(selection) = pending_selection {
            self.session.select(selection);
        }
    }
}

/// Closest node whose drawn disc contains the pointer.
fn node_under(pointer: Option<Pos2>, screen_positions: &[Option<Pos2>], screen_radii: &[f32]) -> Option<usize> {
    let pointer = pointer?;
    screen_positions
        .iter()
        .zip(screen_radii)
        .enumerate()
        .filter_map(|(index, (position, radius))| {
            let distance = (*position)?.distance(pointer);
            (distance <= *radius).then_some((index, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

fn draw_arrow_head(painter: &egui::Painter, start: Pos2, end: Pos2, target_radius: f32, stroke: Stroke) {
    let delta = end - start;
    let length = delta.length();
    if length <= target_radius + 6.0 {
        return;
    }
    let direction = delta / length;
    let tip = end - direction * target_radius;
    let size = (stroke.width * 3.0).clamp(5.0, 10.0);
    let back = tip - direction * size;
    let normal = vec2(-direction.y, direction.x) * (size * 0.5);
    painter.line_segment([tip, back + normal], stroke);
    painter.line_segment([tip, back - normal], stroke);
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;

    #[test]
    fn pointer_picks_the_nearest_covering_node() {
        let positions = [Some(pos2(0.0, 0.0)), None, Some(pos2(8.0, 0.0)), Some(pos2(50.0, 0.0))];
        let radii = [10.0, 10.0, 10.0, 3.0];
        assert_eq!(node_under(Some(pos2(5.0, 0.0)), &positions, &radii), Some(2));
        assert_eq!(node_under(Some(pos2(30.0, 0.0)), &positions, &radii), None);
        assert_eq!(node_under(None, &positions, &radii), None);
    }
}
