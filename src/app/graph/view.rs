use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui::{self, Align2, Color32, FontId, Sense, Stroke, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::util::ellipsize;

use super::super::highlight::build_highlight_state;
use super::super::render_utils::{
    blend_color, circle_visible, dim_color, draw_background, edge_visible, node_radius,
    with_opacity, world_to_screen,
};
use super::super::{RenderGraph, SearchMatchCache, Selection, ViewModel};

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl ViewModel {
    fn update_screen_space(rect: egui::Rect, pan: egui::Vec2, zoom: f32, graph: &mut RenderGraph) {
        graph.scratch.screen_positions.clear();
        graph.scratch.screen_radii.clear();
        for (node, world_pos) in graph.nodes.iter().zip(&graph.positions) {
            graph
                .scratch
                .screen_positions
                .push(world_to_screen(rect, pan, zoom, *world_pos));
            graph
                .scratch
                .screen_radii
                .push((node_radius(node) * zoom.powf(0.40)).clamp(2.5, 46.0));
        }
    }

    fn ensure_draw_order(graph: &mut RenderGraph) {
        if !graph.scratch.draw_order_dirty && graph.scratch.draw_order.len() == graph.nodes.len() {
            return;
        }

        graph.scratch.draw_order.clear();
        graph.scratch.draw_order.extend(0..graph.nodes.len());
        graph.scratch.draw_order.sort_by(|a, b| {
            graph.nodes[*a]
                .importance
                .total_cmp(&graph.nodes[*b].importance)
        });
        graph.scratch.draw_order_dirty = false;
    }

    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<usize>>> {
        if self.selected.is_some() {
            return None;
        }

        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.render_revision == self.render_revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .graph
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                if fuzzy_match_score(&matcher, &node.name, query).is_some()
                    || fuzzy_match_score(&matcher, &node.id, query).is_some()
                {
                    Some(index)
                } else {
                    None
                }
            })
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            render_revision: self.render_revision,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        self.canvas_rect = Some(rect);

        draw_background(&painter, rect, self.pan, self.zoom);

        if self.snapshot.is_empty() {
            self.drawn_node_count = 0;
            self.drawn_edge_count = 0;
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Snapshot loaded, but it contains no entities.",
                FontId::proportional(15.0),
                Color32::from_gray(170),
            );
            return;
        }

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);
        self.advance_lod(Instant::now());

        let search_matches = self.cached_search_matches();
        let pan = self.pan;
        let zoom = self.zoom;
        let highlight = self
            .selected
            .as_ref()
            .and_then(|selection| build_highlight_state(&self.graph, selection));
        let selection_active = highlight.is_some();
        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());

        Self::update_screen_space(rect, pan, zoom, &mut self.graph);
        Self::ensure_draw_order(&mut self.graph);

        let hovered_node = Self::hovered_node(ui, &self.graph);
        let hovered_edge = if hovered_node.is_none() {
            Self::hovered_edge(ui, &self.graph)
        } else {
            None
        };

        if hovered_node.is_some() || hovered_edge.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let pending_selection = if response.clicked_by(egui::PointerButton::Primary) {
            Some(match (hovered_node, hovered_edge) {
                (Some((index, _)), _) => self
                    .graph
                    .nodes
                    .get(index)
                    .map(|node| Selection::Node(node.id.clone())),
                (None, Some(index)) => self
                    .graph
                    .edges
                    .get(index)
                    .map(|edge| Selection::Edge(edge.id.clone())),
                (None, None) => None,
            })
        } else {
            None
        };

        let zoom_sqrt = zoom.sqrt();
        let mut drawn_edges = 0usize;
        for (index, &(from, to)) in self.graph.endpoints.iter().enumerate() {
            let decision = self.graph.edge_visibility[index];
            let is_highlighted = highlight
                .as_ref()
                .is_some_and(|state| state.edges.contains(&index));
            if !decision.show && !is_highlighted {
                continue;
            }

            let start = self.graph.scratch.screen_positions[from];
            let end = self.graph.scratch.screen_positions[to];
            if !edge_visible(rect, start, end, 2.5) {
                continue;
            }

            let edge = &self.graph.edges[index];
            let width = ((0.6 + edge.strength * 2.2) * zoom_sqrt).clamp(0.5, 4.5);
            let (width, color) = if is_highlighted {
                (
                    (width * 1.6).clamp(1.4, 5.5),
                    Color32::from_rgb(241, 146, 94),
                )
            } else if selection_active {
                (
                    width * 0.8,
                    with_opacity(Color32::from_rgb(80, 90, 104), decision.opacity * 0.6),
                )
            } else {
                (
                    width,
                    with_opacity(Color32::from_rgb(120, 128, 140), decision.opacity),
                )
            };

            painter.line_segment([start, end], Stroke::new(width, color));
            drawn_edges += 1;
        }
        self.drawn_edge_count = drawn_edges;

        let selected_color = Color32::from_rgb(245, 206, 93);
        let hovered_index = hovered_node.map(|(index, _)| index);
        let mut selection_animating = false;
        let mut drawn_nodes = 0usize;

        for order_pos in 0..self.graph.scratch.draw_order.len() {
            let index = self.graph.scratch.draw_order[order_pos];
            let node = &self.graph.nodes[index];
            let decision = self.graph.node_visibility[index];

            let is_selected =
                matches!(&self.selected, Some(Selection::Node(id)) if id == &node.id);
            let is_hovered = hovered_index == Some(index);
            let is_related = highlight
                .as_ref()
                .is_some_and(|state| state.nodes.contains(&index));
            let is_search_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&index));

            if !decision.show && !is_selected && !is_related {
                continue;
            }

            let position = self.graph.scratch.screen_positions[index];
            let radius = self.graph.scratch.screen_radii[index];
            if !circle_visible(rect, position, radius) {
                continue;
            }

            let base_color = with_opacity(node.color, decision.opacity.max(0.35));
            let unselected_color = if is_hovered {
                Color32::from_rgb(255, 164, 101)
            } else if is_related {
                blend_color(base_color, Color32::from_rgb(246, 137, 92), 0.60)
            } else if is_search_match {
                blend_color(base_color, Color32::from_rgb(103, 196, 255), 0.68)
            } else if selection_active {
                dim_color(base_color, 0.52)
            } else if search_active {
                dim_color(base_color, 0.38)
            } else {
                base_color
            };

            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("node-selection", node.id.as_str())),
                is_selected,
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }

            let color = blend_color(unselected_color, selected_color, selection_mix);

            painter.circle_filled(position, radius, color);
            if selection_mix > 0.0 {
                let halo_strength = (selection_mix * (1.0 - selection_mix) * 4.0).clamp(0.0, 1.0);
                let halo_alpha = (30.0 + (halo_strength * 145.0)) as u8;
                painter.circle_stroke(
                    position,
                    radius + 4.0 + ((1.0 - selection_mix) * 6.0),
                    Stroke::new(
                        1.0 + (halo_strength * 1.6),
                        Color32::from_rgba_unmultiplied(245, 206, 93, halo_alpha),
                    ),
                );
            }

            let stroke_width = if is_search_match { 1.55 } else { 1.0 } + (selection_mix * 1.2);
            painter.circle_stroke(
                position,
                radius,
                Stroke::new(stroke_width, node.border_color),
            );

            let should_draw_label =
                decision.show_label || is_selected || is_hovered || is_related || is_search_match;
            if should_draw_label {
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    ellipsize(&node.name, 28),
                    FontId::proportional(decision.label_size),
                    Color32::from_gray(238),
                );
            }
            drawn_nodes += 1;
        }
        self.drawn_node_count = drawn_nodes;

        if selection_animating {
            ui.ctx().request_repaint();
        }

        if let Some((index, _)) = hovered_node
            && let Some(node) = self.graph.nodes.get(index)
        {
            let readout = format!(
                "{}  |  {}  |  importance {:.2}  |  {} links",
                ellipsize(&node.name, 40),
                node.entity_type.label(),
                node.importance,
                node.degree
            );
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                readout,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if self.lod.has_pending() || self.layout_job.is_some() {
            ui.ctx().request_repaint_after(Duration::from_millis(40));
        }

        if let Some(selected) = pending_selection {
            self.apply_graph_selection(selected);
        }
    }
}
