use eframe::egui::{self, Color32, RichText, Sense, Ui, vec2};

use stakegraph::layout::sizing::kind_colors;
use stakegraph::{EgoPresentation, NodeKind, ViewMode};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Node types");
        ui.add_space(4.0);

        for kind in NodeKind::KNOWN {
            let mut active = self.session.active_types().contains(&kind);
            let (color, _) = kind_colors(&kind);
            ui.horizontal(|ui| {
                let (swatch, _) = ui.allocate_exact_size(vec2(12.0, 12.0), Sense::hover());
                ui.painter().circle_filled(swatch.center(), 6.0, color);
                if ui.checkbox(&mut active, kind.label()).changed()
                    && !self.session.toggle_type(kind.clone())
                {
                    self.notify("At least one node type has to stay visible".to_owned());
                }
            });
        }

        if self.session.mode().is_ego() {
            ui.small("Filters hide nodes here but keep the governance map layers.");
        }

        ui.separator();
        ui.heading("Layout");
        if self.session.is_seeding() {
            ui.small("Waiting for the layout service...");
        } else if let Some((iteration, max_iterations)) = self.session.progress() {
            let progress = iteration as f32 / max_iterations.max(1) as f32;
            ui.add(egui::ProgressBar::new(progress).show_percentage());
        }
        ui.horizontal(|ui| {
            if ui.button("Re-run layout").clicked() {
                self.session.relayout();
            }
            if ui.button("Reset view").clicked() {
                self.camera = Default::default();
            }
        });

        if let Some(notice) = &self.limit_notice
            && self.session.limit_applied()
            && !self.session.mode().is_ego()
        {
            ui.add_space(4.0);
            ui.label(RichText::new(notice).color(Color32::from_rgb(173, 27, 2)));
        }

        ui.separator();
        ui.heading("Governance map");
        match self.session.mode().clone() {
            ViewMode::Ego {
                center,
                presentation,
            } => {
                let center_label = self
                    .session
                    .graph()
                    .node(&center)
                    .map_or_else(|| center.to_string(), |node| node.label.clone());
                ui.label(RichText::new(center_label).strong());

                let heatmap_enabled = self.session.config().heatmap_enabled;
                ui.horizontal(|ui| {
                    if ui
                        .selectable_label(presentation == EgoPresentation::NodeLink, "Node-link")
                        .clicked()
                    {
                        self.session.show_node_link();
                    }
                    let heatmap = ui
                        .add_enabled_ui(heatmap_enabled, |ui| {
                            ui.selectable_label(presentation == EgoPresentation::Heatmap, "Heatmap")
                        })
                        .inner;
                    if heatmap.clicked() {
                        self.session.show_heatmap();
                    }
                });
                if ui.button("Back to full graph").clicked() {
                    self.session.exit_ego();
                }
            }
            ViewMode::FullGraph => {
                ui.label("Select a node, then open its governance map from the details panel.");
            }
        }

        ui.separator();
        ui.heading("Activity");
        for notice in self.notices.iter().rev() {
            ui.small(notice.as_str());
        }
    }
}
