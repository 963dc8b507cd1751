use eframe::egui::{Color32, RichText, Ui};

use crate::export::export_graph;
use crate::lod::{max_edges_for_zoom, target_node_count};

use super::super::ViewModel;
use super::panels::output_path;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search (entity name or id)")
            .on_hover_text("Fuzzy-highlight matching entities without changing the rendered graph.");
        ui.text_edit_singleline(&mut self.search)
            .on_hover_text("Type to highlight matching entities, then click one to select it.");

        ui.separator();

        ui.horizontal(|ui| {
            if ui.button("Zoom in").clicked() {
                self.change_zoom(1.25);
            }
            if ui.button("Zoom out").clicked() {
                self.change_zoom(0.8);
            }
            if ui.button("Fit").clicked() {
                self.fit_to_view();
            }
            if ui.button("Center").clicked() {
                self.center_graph();
            }
        });
        ui.label(format!("zoom: {:.2}", self.zoom));

        ui.separator();

        ui.horizontal(|ui| {
            if ui
                .button("Export JSON")
                .on_hover_text("Write the rendered nodes, edges and viewport to a JSON file.")
                .clicked()
            {
                self.export_json();
            }
            if ui
                .button("Screenshot")
                .on_hover_text("Capture the window as a PNG and copy a data URI to the clipboard.")
                .clicked()
            {
                self.screenshot_requested = true;
            }
        });

        if let Some(status) = &self.status {
            ui.add_space(4.0);
            ui.small(status.as_str());
        }

        ui.separator();
        ui.label(RichText::new("Detail level").strong());
        ui.label(format!(
            "target at this zoom: {} nodes / {} edges",
            target_node_count(self.zoom),
            max_edges_for_zoom(self.zoom)
        ));
        ui.label(format!(
            "drawn: {} nodes / {} edges",
            self.drawn_node_count, self.drawn_edge_count
        ));

        if self.snapshot.skipped_records() > 0 {
            ui.add_space(4.0);
            ui.colored_label(
                Color32::from_rgb(230, 160, 60),
                format!(
                    "{} malformed records skipped while loading",
                    self.snapshot.skipped_records()
                ),
            );
        }
    }

    fn export_json(&mut self) {
        let Some(rect) = self.canvas_rect else {
            return;
        };
        let center = super::super::render_utils::screen_to_world(
            rect, self.pan, self.zoom, rect.center(),
        );
        let exported = export_graph(
            &self.graph.nodes,
            &self.graph.positions,
            &self.graph.edges,
            self.zoom,
            center,
        );
        let path = output_path("entilens-export", "json");
        let result = serde_json::to_string_pretty(&exported)
            .map_err(anyhow::Error::from)
            .and_then(|json| std::fs::write(&path, json).map_err(anyhow::Error::from));
        match result {
            Ok(()) => {
                self.status = Some(format!("exported {}", path.display()));
            }
            Err(e) => {
                log::warn!("export to {} failed: {e:#}", path.display());
                self.status = Some(format!("export failed: {e:#}"));
            }
        }
    }
}
