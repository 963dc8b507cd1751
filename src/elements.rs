use std::collections::{HashMap, HashSet};

use eframe::egui::Color32;

use crate::snapshot::{Entity, EntityType, GraphSnapshot, Relationship};

/// Tunable filter constants. The composite importance blend deliberately
/// avoids distribution normalization; the weights are load-bearing for
/// visual behavior and overridable here rather than inlined.
#[derive(Clone, Copy, Debug)]
pub struct FilterConfig {
    pub max_initial_nodes: usize,
    pub max_initial_edges: usize,
    pub degree_weight: f32,
    pub size_weight: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_initial_nodes: 200,
            max_initial_edges: 300,
            degree_weight: 0.01,
            size_weight: 0.01,
        }
    }
}

/// Renderable node descriptor with every visual field defaulted upstream,
/// so the renderer never sees undefined state.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDescriptor {
    pub id: String,
    pub name: String,
    pub entity_type: EntityType,
    pub confidence: f32,
    pub importance: f32,
    pub degree: u32,
    pub community: Option<String>,
    pub size: f32,
    pub color: Color32,
    pub border_color: Color32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeDescriptor {
    pub id: String,
    pub source: String,
    pub target: String,
    pub rel_type: String,
    pub strength: f32,
    pub weight: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphElements {
    pub nodes: Vec<NodeDescriptor>,
    pub edges: Vec<EdgeDescriptor>,
}

pub fn composite_importance(entity: &Entity, config: &FilterConfig) -> f32 {
    entity.importance
        + entity.degree as f32 * config.degree_weight
        + entity.size * config.size_weight
}

/// Rank the snapshot by composite importance and keep the top `max_nodes`
/// entities, then the top `max_edges` relationships (by strength) whose
/// endpoints both survived the cut. Edges are bounded more aggressively
/// than nodes because layout cost grows with edge count.
pub fn select_subset(
    snapshot: &GraphSnapshot,
    max_nodes: usize,
    max_edges: usize,
    config: &FilterConfig,
) -> (Vec<Entity>, Vec<Relationship>) {
    let mut ranked = snapshot.entities.iter().collect::<Vec<_>>();
    ranked.sort_by(|a, b| {
        composite_importance(b, config)
            .total_cmp(&composite_importance(a, config))
            .then_with(|| a.id.cmp(&b.id))
    });
    ranked.truncate(max_nodes);

    let kept = ranked
        .iter()
        .map(|entity| entity.id.as_str())
        .collect::<HashSet<_>>();

    let mut relationships = snapshot
        .relationships
        .iter()
        .filter(|relationship| {
            kept.contains(relationship.from.as_str()) && kept.contains(relationship.to.as_str())
        })
        .collect::<Vec<_>>();
    relationships.sort_by(|a, b| {
        b.strength
            .total_cmp(&a.strength)
            .then_with(|| (&a.from, &a.to).cmp(&(&b.from, &b.to)))
    });
    relationships.truncate(max_edges);

    (
        ranked.into_iter().cloned().collect(),
        relationships.into_iter().cloned().collect(),
    )
}

/// Convert entity/relationship records into disjoint node and edge
/// descriptor sequences. Entities without a usable id or name are skipped
/// with a warning; edges missing an endpoint in the node set are dropped.
/// The edge id is derived purely from the endpoint pair, so a duplicate
/// pair overwrites the earlier descriptor instead of accumulating.
pub fn build_elements(entities: &[Entity], relationships: &[Relationship]) -> GraphElements {
    let mut nodes = Vec::with_capacity(entities.len());
    for entity in entities {
        if entity.id.is_empty() || entity.name.is_empty() {
            log::warn!("skipping entity with empty id or name: {:?}", entity.id);
            continue;
        }
        nodes.push(NodeDescriptor {
            id: entity.id.clone(),
            name: entity.name.clone(),
            entity_type: entity.entity_type,
            confidence: entity.confidence,
            importance: entity.importance,
            degree: entity.degree,
            community: entity.community.clone(),
            size: entity.size,
            color: entity.color,
            border_color: entity.border_color,
        });
    }

    let node_ids = nodes
        .iter()
        .map(|node| node.id.as_str())
        .collect::<HashSet<_>>();

    let mut edges: Vec<EdgeDescriptor> = Vec::with_capacity(relationships.len());
    let mut edge_index: HashMap<String, usize> = HashMap::new();
    for relationship in relationships {
        if !node_ids.contains(relationship.from.as_str())
            || !node_ids.contains(relationship.to.as_str())
        {
            log::debug!(
                "dropping relationship {} -> {}: endpoint not rendered",
                relationship.from,
                relationship.to
            );
            continue;
        }

        let id = format!("{}-{}", relationship.from, relationship.to);
        let descriptor = EdgeDescriptor {
            id: id.clone(),
            source: relationship.from.clone(),
            target: relationship.to.clone(),
            rel_type: relationship.rel_type.clone(),
            strength: relationship.strength,
            weight: relationship.weight,
        };

        match edge_index.get(&id) {
            Some(&slot) => edges[slot] = descriptor,
            None => {
                edge_index.insert(id, edges.len());
                edges.push(descriptor);
            }
        }
    }

    GraphElements { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::EntityType;

    fn entity(id: &str, importance: f32) -> Entity {
        Entity {
            id: id.to_owned(),
            name: id.to_owned(),
            entity_type: EntityType::Entity,
            confidence: 0.5,
            importance,
            degree: 0,
            community: None,
            size: 10.0,
            color: Color32::GRAY,
            border_color: Color32::DARK_GRAY,
        }
    }

    fn relationship(from: &str, to: &str, strength: f32) -> Relationship {
        Relationship {
            from: from.to_owned(),
            to: to.to_owned(),
            rel_type: "related".to_owned(),
            strength,
            weight: 1.0,
        }
    }

    #[test]
    fn builds_descriptors_with_pair_derived_edge_ids() {
        let entities = vec![entity("A", 0.9), entity("B", 0.5), entity("C", 0.1)];
        let relationships = vec![relationship("A", "B", 0.8), relationship("B", "C", 0.2)];

        let elements = build_elements(&entities, &relationships);
        assert_eq!(elements.nodes.len(), 3);
        assert_eq!(elements.edges.len(), 2);
        assert_eq!(elements.edges[0].id, "A-B");
        assert_eq!(elements.edges[1].id, "B-C");
    }

    #[test]
    fn dangling_relationships_are_dropped() {
        let entities = vec![entity("A", 0.9), entity("B", 0.5), entity("C", 0.1)];
        let relationships = vec![
            relationship("A", "B", 0.8),
            relationship("B", "C", 0.2),
            relationship("A", "D", 0.7),
        ];

        let elements = build_elements(&entities, &relationships);
        assert_eq!(elements.edges.len(), 2);
        assert!(elements.edges.iter().all(|edge| edge.target != "D"));
    }

    #[test]
    fn duplicate_edge_pairs_overwrite() {
        let entities = vec![entity("A", 0.9), entity("B", 0.5)];
        let relationships = vec![relationship("A", "B", 0.1), relationship("A", "B", 0.9)];

        let elements = build_elements(&entities, &relationships);
        assert_eq!(elements.edges.len(), 1);
        assert_eq!(elements.edges[0].strength, 0.9);
    }

    #[test]
    fn building_twice_is_identical() {
        let entities = vec![entity("A", 0.9), entity("B", 0.5), entity("C", 0.1)];
        let relationships = vec![relationship("A", "B", 0.8), relationship("B", "C", 0.2)];

        let first = build_elements(&entities, &relationships);
        let second = build_elements(&entities, &relationships);
        assert_eq!(first, second);
    }

    #[test]
    fn subset_selection_is_bounded_and_consistent() {
        // 500 entities with uniformly spread importance, 1000 relationships.
        let entities = (0..500)
            .map(|i| entity(&format!("e{i:03}"), i as f32 / 500.0))
            .collect::<Vec<_>>();
        let relationships = (0..1000)
            .map(|i| {
                relationship(
                    &format!("e{:03}", i % 500),
                    &format!("e{:03}", (i * 7 + 13) % 500),
                    (i % 100) as f32 / 100.0,
                )
            })
            .collect::<Vec<_>>();
        let snapshot = GraphSnapshot {
            entities,
            relationships,
            ..GraphSnapshot::default()
        };

        let config = FilterConfig::default();
        let (nodes, edges) = select_subset(&snapshot, 200, 300, &config);

        assert_eq!(nodes.len(), 200);
        assert!(edges.len() <= 300);

        // Sorted descending by composite importance.
        for pair in nodes.windows(2) {
            assert!(
                composite_importance(&pair[0], &config)
                    >= composite_importance(&pair[1], &config)
            );
        }

        // Every surviving edge has both endpoints inside the 200.
        let kept = nodes.iter().map(|n| n.id.as_str()).collect::<HashSet<_>>();
        for edge in &edges {
            assert!(kept.contains(edge.from.as_str()));
            assert!(kept.contains(edge.to.as_str()));
        }
    }

    #[test]
    fn small_snapshots_pass_through_unbounded() {
        let snapshot = GraphSnapshot {
            entities: vec![entity("A", 0.9), entity("B", 0.5)],
            relationships: vec![relationship("A", "B", 0.8)],
            ..GraphSnapshot::default()
        };

        let (nodes, edges) = select_subset(&snapshot, 200, 300, &FilterConfig::default());
        assert_eq!(nodes.len(), 2);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn edge_cap_keeps_strongest_relationships() {
        let entities = vec![entity("A", 0.9), entity("B", 0.5), entity("C", 0.1)];
        let relationships = vec![
            relationship("A", "B", 0.2),
            relationship("B", "C", 0.9),
            relationship("A", "C", 0.5),
        ];
        let snapshot = GraphSnapshot {
            entities,
            relationships,
            ..GraphSnapshot::default()
        };

        let (_, edges) = select_subset(&snapshot, 10, 2, &FilterConfig::default());
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].strength, 0.9);
        assert_eq!(edges[1].strength, 0.5);
    }
}
