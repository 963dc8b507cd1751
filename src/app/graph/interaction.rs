use std::time::Instant;

use eframe::egui::{self, Rect, Ui, Vec2};

use super::super::render_utils::screen_to_world;
use super::super::{RenderGraph, Selection, ViewModel};

const MIN_ZOOM: f32 = 0.05;
const MAX_ZOOM: f32 = 6.0;

fn point_segment_distance(point: egui::Pos2, start: egui::Pos2, end: egui::Pos2) -> f32 {
    let segment = end - start;
    let length_sq = segment.length_sq();
    if length_sq <= f32::EPSILON {
        return start.distance(point);
    }
    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    (start + segment * t).distance(point)
}

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
        self.lod.note_zoom(self.zoom, Instant::now());
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
            || response.dragged_by(egui::PointerButton::Primary)
        {
            self.pan += response.drag_delta();
        }
    }

    /// Zoom by a fixed factor around the canvas center, used by the +/-
    /// toolbar buttons.
    pub(in crate::app) fn change_zoom(&mut self, factor: f32) {
        let previous = self.zoom;
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.pan *= self.zoom / previous;
        self.lod.note_zoom(self.zoom, Instant::now());
    }

    pub(in crate::app) fn center_graph(&mut self) {
        self.pan = Vec2::ZERO;
    }

    /// Pick pan and zoom so the whole laid-out graph fits the canvas with
    /// some margin.
    pub(in crate::app) fn fit_to_view(&mut self) {
        let Some(rect) = self.canvas_rect else {
            return;
        };
        if self.graph.positions.is_empty() {
            return;
        }

        let mut min = self.graph.positions[0];
        let mut max = self.graph.positions[0];
        for pos in &self.graph.positions {
            min = min.min(*pos);
            max = max.max(*pos);
        }

        let extent = (max - min).max(Vec2::splat(1.0));
        let fit = (rect.width() / extent.x)
            .min(rect.height() / extent.y)
            .clamp(MIN_ZOOM, MAX_ZOOM);
        self.zoom = fit * 0.85;
        let center = min + extent * 0.5;
        self.pan = -center * self.zoom;
        self.lod.note_zoom(self.zoom, Instant::now());
    }

    pub(in crate::app) fn hovered_node(ui: &Ui, graph: &RenderGraph) -> Option<(usize, f32)> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        graph
            .scratch
            .screen_positions
            .iter()
            .enumerate()
            .filter_map(|(index, position)| {
                if !graph.node_visibility.get(index).is_some_and(|v| v.show) {
                    return None;
                }
                let distance = position.distance(pointer);
                if distance <= graph.scratch.screen_radii[index] {
                    Some((index, distance))
                } else {
                    None
                }
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub(in crate::app) fn hovered_edge(ui: &Ui, graph: &RenderGraph) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        graph
            .endpoints
            .iter()
            .enumerate()
            .filter_map(|(index, &(from, to))| {
                if !graph.edge_visibility.get(index).is_some_and(|v| v.show) {
                    return None;
                }
                let start = graph.scratch.screen_positions[from];
                let end = graph.scratch.screen_positions[to];
                let distance = point_segment_distance(pointer, start, end);
                if distance <= 4.0 { Some((index, distance)) } else { None }
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    pub(in crate::app) fn apply_graph_selection(&mut self, selected: Option<Selection>) {
        self.selected = selected;
    }
}
