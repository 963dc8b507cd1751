use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use eframe::egui::Vec2;

use crate::elements::{GraphElements, build_elements, select_subset};
use crate::layout;
use crate::lod::LodAction;
use crate::visibility::score_visibility;

use super::super::{
    LAYOUT_TIMEOUT, LayoutJob, LayoutResult, RenderGraph, Selection, ViewModel, ViewScratch,
    layout_elements,
};

impl RenderGraph {
    pub(in crate::app) fn new(elements: GraphElements, positions: Vec<Vec2>) -> Self {
        let index_by_id: HashMap<String, usize> = elements
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.clone(), i))
            .collect();

        let mut positions = positions;
        positions.resize(elements.nodes.len(), Vec2::ZERO);

        let mut edges = Vec::with_capacity(elements.edges.len());
        let mut endpoints = Vec::with_capacity(elements.edges.len());
        for edge in elements.edges {
            if let (Some(&from), Some(&to)) =
                (index_by_id.get(&edge.source), index_by_id.get(&edge.target))
            {
                endpoints.push((from, to));
                edges.push(edge);
            }
        }

        let edge_index_by_id: HashMap<String, usize> = edges
            .iter()
            .enumerate()
            .map(|(i, edge)| (edge.id.clone(), i))
            .collect();

        let mut neighbors = vec![Vec::new(); elements.nodes.len()];
        for &(from, to) in &endpoints {
            neighbors[from].push(to);
            neighbors[to].push(from);
        }

        Self {
            nodes: elements.nodes,
            edges,
            endpoints,
            positions,
            index_by_id,
            edge_index_by_id,
            neighbors,
            node_visibility: Vec::new(),
            edge_visibility: Vec::new(),
            scratch: ViewScratch {
                draw_order_dirty: true,
                ..ViewScratch::default()
            },
        }
    }

    pub(in crate::app) fn node_index(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub(in crate::app) fn edge_index(&self, id: &str) -> Option<usize> {
        self.edge_index_by_id.get(id).copied()
    }
}

impl ViewModel {
    /// Per-frame LoD bookkeeping: collect a finished background layout if
    /// one is ready, then ask the controller whether the debounced zoom
    /// warrants a cosmetic rescore or a full re-filter.
    pub(in crate::app) fn advance_lod(&mut self, now: Instant) {
        self.poll_layout_job(now);

        match self.lod.poll(now, self.graph.nodes.len(), self.snapshot.entity_count()) {
            LodAction::Idle => {}
            LodAction::Cosmetic => self.rescore_visibility(),
            LodAction::Refilter {
                target_nodes,
                max_edges,
            } => self.start_layout_job(target_nodes, max_edges),
        }
    }

    pub(in crate::app) fn rescore_visibility(&mut self) {
        let (node_visibility, edge_visibility) = score_visibility(
            &self.graph.nodes,
            &self.graph.edges,
            self.zoom,
            &self.visibility_config,
        );
        self.graph.node_visibility = node_visibility;
        self.graph.edge_visibility = edge_visibility;
    }

    fn start_layout_job(&mut self, target_nodes: usize, max_edges: usize) {
        let (entities, relationships) =
            select_subset(&self.snapshot, target_nodes, max_edges, &self.filter_config);
        let elements = build_elements(&entities, &relationships);
        let key = layout::bucket_key(elements.nodes.len());

        // A cached bucket is reused only when it covers every node in the
        // new selection; a different 200-node set hitting the same bucket
        // falls through to a fresh computation.
        let cached: Option<Vec<Vec2>> = self
            .layout_cache
            .lookup(&key, elements.nodes.len())
            .and_then(|positions| {
                elements
                    .nodes
                    .iter()
                    .map(|node| positions.get(&node.id).copied())
                    .collect()
            });
        if let Some(positions) = cached {
            log::debug!("layout cache hit for {key}");
            self.apply_elements(elements, positions);
            self.lod.complete();
            return;
        }

        let (tx, rx) = mpsc::channel();
        let job_key = key.clone();
        thread::spawn(move || {
            let positions = layout_elements(&elements);
            let _ = tx.send(LayoutResult {
                key: job_key,
                elements,
                positions,
            });
        });
        self.layout_job = Some(LayoutJob {
            key,
            rx,
            started: Instant::now(),
        });
    }

    fn poll_layout_job(&mut self, now: Instant) {
        let Some(job) = self.layout_job.as_ref() else {
            return;
        };

        match job.rx.try_recv() {
            Ok(result) => {
                self.layout_job = None;
                let positions_by_id: HashMap<String, Vec2> = result
                    .elements
                    .nodes
                    .iter()
                    .zip(&result.positions)
                    .map(|(node, pos)| (node.id.clone(), *pos))
                    .collect();
                self.layout_cache.store(result.key, positions_by_id);
                self.apply_elements(result.elements, result.positions);
                self.lod.complete();
            }
            Err(mpsc::TryRecvError::Empty) => {
                if now.duration_since(job.started) > LAYOUT_TIMEOUT {
                    log::warn!(
                        "layout for {} exceeded {:?}; keeping previous render",
                        job.key,
                        LAYOUT_TIMEOUT
                    );
                    self.layout_job = None;
                    self.lod.complete();
                }
            }
            Err(mpsc::TryRecvError::Disconnected) => {
                log::warn!("layout worker for {} disconnected", job.key);
                self.layout_job = None;
                self.lod.complete();
            }
        }
    }

    /// Swap in a new element set. Pan and zoom are left untouched so the
    /// viewport survives the topology change; a selection pointing at an
    /// element that no longer exists is cleared.
    fn apply_elements(&mut self, elements: GraphElements, positions: Vec<Vec2>) {
        self.graph = RenderGraph::new(elements, positions);
        self.render_revision = self.render_revision.wrapping_add(1);
        self.search_match_cache = None;
        if let Some(selection) = &self.selected {
            let still_present = match selection {
                Selection::Node(id) => self.graph.node_index(id).is_some(),
                Selection::Edge(id) => self.graph.edge_index(id).is_some(),
            };
            if !still_present {
                self.selected = None;
            }
        }
        self.rescore_visibility();
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Color32, vec2};

    use crate::snapshot::{Entity, EntityType, GraphSnapshot, Relationship, SnapshotMetadata};

    use super::super::super::LoadedGraph;
    use super::*;

    fn entity(id: &str) -> Entity {
        Entity {
            id: id.to_owned(),
            name: id.to_owned(),
            entity_type: EntityType::Person,
            confidence: 0.5,
            importance: 0.5,
            degree: 1,
            community: None,
            size: 20.0,
            color: Color32::GRAY,
            border_color: Color32::DARK_GRAY,
        }
    }

    fn relationship(from: &str, to: &str) -> Relationship {
        Relationship {
            from: from.to_owned(),
            to: to.to_owned(),
            rel_type: "related".to_owned(),
            strength: 0.5,
            weight: 1.0,
        }
    }

    fn model_with(ids: &[&str], edges: &[(&str, &str)]) -> ViewModel {
        let entities = ids.iter().map(|id| entity(id)).collect::<Vec<_>>();
        let relationships = edges
            .iter()
            .map(|(from, to)| relationship(from, to))
            .collect::<Vec<_>>();
        let snapshot = GraphSnapshot {
            entities: entities.clone(),
            relationships: relationships.clone(),
            metadata: SnapshotMetadata::default(),
            skipped_entities: 0,
            skipped_relationships: 0,
        };
        let elements = build_elements(&entities, &relationships);
        let positions = (0..elements.nodes.len())
            .map(|index| vec2(index as f32 * 10.0, 0.0))
            .collect();
        ViewModel::new(LoadedGraph {
            snapshot,
            elements,
            positions,
        })
    }

    #[test]
    fn element_swap_preserves_viewport_and_clears_vanished_selection() {
        let mut model = model_with(&["a", "b", "c"], &[("a", "b")]);
        model.pan = vec2(42.0, -17.0);
        model.zoom = 2.5;
        model.selected = Some(Selection::Node("c".to_owned()));

        let entities = vec![entity("a"), entity("b")];
        let relationships = vec![relationship("a", "b")];
        let elements = build_elements(&entities, &relationships);
        model.apply_elements(elements, vec![vec2(0.0, 0.0), vec2(10.0, 0.0)]);

        assert_eq!(model.pan, vec2(42.0, -17.0));
        assert_eq!(model.zoom, 2.5);
        assert_eq!(model.selected, None);
        assert_eq!(model.graph.nodes.len(), 2);
    }

    #[test]
    fn element_swap_keeps_a_selection_that_survives() {
        let mut model = model_with(&["a", "b", "c"], &[("a", "b")]);
        model.selected = Some(Selection::Node("a".to_owned()));

        let entities = vec![entity("a"), entity("b")];
        let elements = build_elements(&entities, &[relationship("a", "b")]);
        model.apply_elements(elements, vec![vec2(0.0, 0.0), vec2(10.0, 0.0)]);

        assert_eq!(model.selected, Some(Selection::Node("a".to_owned())));
    }

    #[test]
    fn initial_layout_is_cached_under_both_keys() {
        let model = model_with(&["a", "b", "c"], &[]);
        assert!(model.layout_cache.lookup(layout::INITIAL_LAYOUT_KEY, 3).is_some());
        assert!(model.layout_cache.lookup(&layout::bucket_key(3), 3).is_some());
    }
}
