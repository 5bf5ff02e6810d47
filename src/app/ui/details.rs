use std::collections::BTreeMap;

use eframe::egui::{self, RichText, Ui};

use stakegraph::{Edge, EdgeSummary, GraphData, NodeId, ViewMode};

use super::super::ViewModel;

/// One counterparty of the selected node, parallel edges merged.
struct RelatedRow {
    id: NodeId,
    label: String,
    summary: EdgeSummary,
}

fn related_rows<'a>(
    graph: &'a GraphData,
    edges: impl Iterator<Item = &'a Edge>,
    counterparty: impl Fn(&'a Edge) -> &'a NodeId,
) -> Vec<RelatedRow> {
    let mut grouped: BTreeMap<&NodeId, Vec<&Edge>> = BTreeMap::new();
    for edge in edges {
        grouped.entry(counterparty(edge)).or_default().push(edge);
    }

    let mut rows = grouped
        .into_iter()
        .map(|(id, parallel)| RelatedRow {
            id: id.clone(),
            label: graph
                .node(id)
                .map_or_else(|| id.to_string(), |node| node.label.clone()),
            summary: EdgeSummary::from_edges(parallel),
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| b.summary.max_ratio.total_cmp(&a.summary.max_ratio));
    rows
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection");
        ui.add_space(6.0);

        let Some(selected) = self.session.selected().cloned() else {
            ui.label("Click a node to see who holds it and what it holds.");
            return;
        };

        let graph = self.session.graph();
        let Some(node) = graph.node(&selected).cloned() else {
            ui.label("The selected node is not part of the loaded graph.");
            return;
        };
        let holders = related_rows(
            graph,
            graph.edges.iter().filter(|edge| edge.to == selected),
            |edge| &edge.from,
        );
        let holdings = related_rows(
            graph,
            graph.edges.iter().filter(|edge| edge.from == selected),
            |edge| &edge.to,
        );
        let is_center = matches!(self.session.mode(), ViewMode::Ego { center, .. } if *center == selected);

        ui.label(RichText::new(node.label.as_str()).strong());
        ui.small(format!("{} · id {}", node.kind.label(), node.id));
        if !node.active {
            ui.small("closed");
        }
        ui.add_space(6.0);

        let mut next_selection = None;
        let mut open_map = false;
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!is_center, egui::Button::new("Open governance map"))
                .clicked()
            {
                open_map = true;
            }
            if ui.button("Clear selection").clicked() {
                next_selection = Some(None);
            }
        });

        for (title, rows) in [("Shareholders", &holders), ("Holdings", &holdings)] {
            ui.separator();
            ui.label(RichText::new(format!("{title} ({})", rows.len())).strong());
            if rows.is_empty() {
                ui.small("none on record");
                continue;
            }

            egui::ScrollArea::vertical()
                .id_salt(title)
                .max_height(260.0)
                .auto_shrink([false, true])
                .show(ui, |ui| {
                    for row in rows {
                        let stake = row.summary.label();
                        let text = if stake.is_empty() {
                            row.label.clone()
                        } else {
                            format!("{}  {stake}", row.label)
                        };
                        if ui.link(text).on_hover_text(row.id.as_str()).clicked() {
                            next_selection = Some(Some(row.id.clone()));
                        }
                    }
                });
        }

        if open_map && !self.session.enter_ego_local(&selected) {
            self.notify(format!("No governance map for {selected}"));
        }
        if let Some(selection) = next_selection {
            self.session.select(selection);
        }
    }
}
