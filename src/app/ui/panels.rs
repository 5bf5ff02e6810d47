use std::path::Path;

use eframe::egui::{self, Align, Context, Layout};

use stakegraph::{EgoPresentation, ViewMode, Viewport};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        source: &Path,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        self.pump_session(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("stakegraph");
                    ui.separator();
                    let file_name = source
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| source.display().to_string());
                    ui.label(format!("source: {file_name}"));
                    ui.label(format!("nodes: {}", self.session.graph().node_count()));
                    ui.label(format!("edges: {}", self.session.graph().edge_count()));
                    ui.label(format!("showing: {}", self.session.mode()));

                    let reload_button = ui.add_enabled(!is_loading, egui::Button::new("Reload file"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!("visible: {}", self.session.visible_nodes().len()));
                        if let Some((iteration, max_iterations)) = self.session.progress() {
                            ui.label(format!("layout {iteration}/{max_iterations}"));
                            ui.spinner();
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            let size = ui.available_size();
            if size.x >= 200.0 && size.y >= 150.0 {
                self.session.set_viewport(Viewport::new(size.x, size.y));
            }

            let heatmap = matches!(
                self.session.mode(),
                ViewMode::Ego {
                    presentation: EgoPresentation::Heatmap,
                    ..
                }
            );
            if heatmap {
                self.draw_heatmap(ui);
            } else {
                self.draw_graph(ui);
            }
        });
    }
}
