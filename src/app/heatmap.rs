use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, Ui, pos2, vec2};

use stakegraph::util::ellipsize;
use stakegraph::{GraphData, NodeId};

use super::ViewModel;
use super::render_utils::mix;

/// Square holder-by-company matrix of an ego neighborhood.
///
/// Rows and columns share one order: ids sorted by label, then id. A cell
/// holds the largest ratio among the parallel edges of its (from, to) pair.
#[derive(Clone, Debug, Default, PartialEq)]
pub(super) struct WeightedMatrix {
    pub(super) ids: Vec<NodeId>,
    pub(super) labels: Vec<String>,
    cells: Vec<Option<f32>>,
}

impl WeightedMatrix {
    pub(super) fn build(data: &GraphData) -> Self {
        let mut order = data.nodes.iter().collect::<Vec<_>>();
        order.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));
        order.dedup_by(|a, b| a.id == b.id);

        let ids = order.iter().map(|node| node.id.clone()).collect::<Vec<_>>();
        let labels = order.iter().map(|node| node.label.clone()).collect();
        let size = ids.len();
        let mut cells = vec![None; size * size];

        for edge in &data.edges {
            let (Some(row), Some(col)) = (
                ids.iter().position(|id| *id == edge.from),
                ids.iter().position(|id| *id == edge.to),
            ) else {
                continue;
            };
            let ratio = if edge.ratio.is_finite() { edge.ratio.clamp(0.0, 100.0) } else { 0.0 };
            let cell = &mut cells[row * size + col];
            *cell = Some(cell.map_or(ratio, |current: f32| current.max(ratio)));
        }

        Self { ids, labels, cells }
    }

    pub(super) fn len(&self) -> usize {
        self.ids.len()
    }

    pub(super) fn cell(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.len() || col >= self.len() {
            return None;
        }
        self.cells[row * self.len() + col]
    }
}

fn heat_color(ratio: f32) -> Color32 {
    let t = (ratio / 100.0).clamp(0.0, 1.0).sqrt();
    mix(Color32::from_rgb(253, 236, 206), Color32::from_rgb(173, 27, 2), t)
}

impl ViewModel {
    pub(in crate::app) fn draw_heatmap(&mut self, ui: &mut Ui) {
        let generation = self.session.generation();
        if self
            .heatmap_cache
            .as_ref()
            .is_none_or(|(cached, _)| *cached != generation)
        {
            let matrix = WeightedMatrix::build(self.session.current_data());
            self.heatmap_cache = Some((generation, matrix));
        }
        let Some((_, matrix)) = self.heatmap_cache.as_ref() else {
            return;
        };

        if matrix.len() == 0 {
            ui.label("The governance map has no nodes to tabulate.");
            return;
        }

        let header = 140.0;
        let cell = ((ui.available_width() - header) / matrix.len() as f32).clamp(6.0, 36.0);
        let side = header + cell * matrix.len() as f32;

        egui::ScrollArea::both()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let (rect, response) = ui.allocate_exact_size(vec2(side, side), Sense::hover());
                let painter = ui.painter_at(rect);
                let origin = rect.min + vec2(header, header);
                let label_font = FontId::proportional(11.0);

                for (index, label) in matrix.labels.iter().enumerate() {
                    let offset = index as f32 * cell + cell * 0.5;
                    painter.text(
                        pos2(origin.x - 6.0, origin.y + offset),
                        Align2::RIGHT_CENTER,
                        ellipsize(label, 18),
                        label_font.clone(),
                        Color32::from_gray(40),
                    );
                    if cell >= 12.0 {
                        painter.text(
                            pos2(origin.x + offset, origin.y - 6.0),
                            Align2::CENTER_BOTTOM,
                            ellipsize(label, 3),
                            label_font.clone(),
                            Color32::from_gray(40),
                        );
                    }
                }

                for row in 0..matrix.len() {
                    for col in 0..matrix.len() {
                        let min = origin + vec2(col as f32 * cell, row as f32 * cell);
                        let cell_rect = Rect::from_min_size(min, vec2(cell, cell));
                        let fill = matrix
                            .cell(row, col)
                            .map_or(Color32::from_gray(245), heat_color);
                        painter.rect_filled(cell_rect.shrink(0.5), 0.0, fill);
                    }
                }
                painter.rect_stroke(
                    Rect::from_min_size(origin, vec2(cell, cell) * matrix.len() as f32),
                    0.0,
                    Stroke::new(1.0, Color32::from_gray(160)),
                    egui::StrokeKind::Outside,
                );

                let hovered_cell = response.hover_pos().and_then(|pointer| {
                    let local = (pointer - origin) / cell;
                    (local.x >= 0.0 && local.y >= 0.0)
                        .then(|| (local.y as usize, local.x as usize))
                        .filter(|(row, col)| *row < matrix.len() && *col < matrix.len())
                });
                if let Some((row, col)) = hovered_cell {
                    let stake = matrix
                        .cell(row, col)
                        .map_or_else(|| "no direct stake".to_owned(), |ratio| format!("{ratio:.1}%"));
                    response.on_hover_text(format!(
                        "{} holds {} of {}",
                        matrix.labels[row], stake, matrix.labels[col]
                    ));
                }
            });
    }
}
