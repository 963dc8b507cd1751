use eframe::egui::{self, RichText, Ui};

use crate::util::{ellipsize, format_fraction};

use super::super::{Selection, ViewModel};

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(selection) = self.selected.clone() else {
            ui.label("Select an entity or relationship from the graph.");
            return;
        };

        match selection {
            Selection::Node(id) => self.draw_node_details(ui, &id),
            Selection::Edge(id) => self.draw_edge_details(ui, &id),
        }
    }

    fn draw_node_details(&mut self, ui: &mut Ui, id: &str) {
        let Some(index) = self.graph.node_index(id) else {
            ui.label("Selected entity is not part of the current render.");
            return;
        };

        let node = self.graph.nodes[index].clone();
        let decision = self.graph.node_visibility.get(index).copied();
        let neighbor_rows: Vec<(usize, String, String)> = self
            .graph
            .neighbors
            .get(index)
            .map(|neighbors| {
                neighbors
                    .iter()
                    .map(|&neighbor| {
                        let other = &self.graph.nodes[neighbor];
                        let rel_type = self
                            .graph
                            .endpoints
                            .iter()
                            .position(|&(from, to)| {
                                (from == index && to == neighbor)
                                    || (from == neighbor && to == index)
                            })
                            .map(|edge| self.graph.edges[edge].rel_type.clone())
                            .unwrap_or_default();
                        (neighbor, other.name.clone(), rel_type)
                    })
                    .collect()
            })
            .unwrap_or_default();

        ui.label(RichText::new(ellipsize(&node.name, 48)).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);

        ui.label(format!("Type: {}", node.entity_type.label()));
        ui.label(format!("Importance: {}", format_fraction(node.importance)));
        ui.label(format!("Confidence: {}", format_fraction(node.confidence)));
        ui.label(format!("Connections: {}", node.degree));
        if let Some(community) = &node.community {
            ui.label(format!("Community: {community}"));
        }

        if let Some(decision) = decision {
            ui.separator();
            ui.label(RichText::new("Visibility").strong());
            ui.label(format!("score: {:.1}", decision.score));
            ui.label(if decision.show_label {
                "shown with label"
            } else if decision.show {
                "shown without label"
            } else {
                "below the current detail threshold"
            });
        }

        ui.separator();
        ui.label(RichText::new(format!("Neighbors ({})", neighbor_rows.len())).strong());
        if neighbor_rows.is_empty() {
            ui.label("No relationships in the current render.");
        } else {
            egui::ScrollArea::vertical()
                .id_salt("neighbor_rows")
                .show(ui, |ui| {
                    for (neighbor, name, rel_type) in neighbor_rows {
                        ui.horizontal(|ui| {
                            if ui.link(ellipsize(&name, 34)).clicked() {
                                let id = self.graph.nodes[neighbor].id.clone();
                                self.selected = Some(Selection::Node(id));
                            }
                            if !rel_type.is_empty() {
                                ui.small(rel_type);
                            }
                        });
                    }
                });
        }
    }

    fn draw_edge_details(&mut self, ui: &mut Ui, id: &str) {
        let Some(index) = self.graph.edge_index(id) else {
            ui.label("Selected relationship is not part of the current render.");
            return;
        };

        let edge = self.graph.edges[index].clone();
        let endpoints = self.graph.endpoints.get(index).copied();

        ui.label(RichText::new(edge.rel_type.as_str()).strong());
        ui.small(edge.id.as_str());
        ui.add_space(6.0);

        ui.label(format!("Strength: {}", format_fraction(edge.strength)));
        ui.label(format!("Weight: {}", format_fraction(edge.weight)));

        if let Some((from, to)) = endpoints {
            ui.separator();
            ui.label(RichText::new("Endpoints").strong());
            for endpoint in [from, to] {
                let name = self.graph.nodes[endpoint].name.clone();
                if ui.link(ellipsize(&name, 34)).clicked() {
                    let id = self.graph.nodes[endpoint].id.clone();
                    self.selected = Some(Selection::Node(id));
                }
            }
        }
    }
}
