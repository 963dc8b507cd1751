use std::collections::{HashMap, HashSet, VecDeque};

use eframe::egui::Color32;

mod load;
mod parse;

pub use load::load_snapshot;
pub use parse::parse_snapshot;

/// Fixed entity vocabulary. Unrecognized type strings map to `Unknown`;
/// a missing type field defaults to the generic `Entity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityType {
    Person,
    Organization,
    Product,
    Concept,
    Location,
    Technology,
    Event,
    Topic,
    Website,
    Document,
    Entity,
    Unknown,
}

impl EntityType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "person" => Self::Person,
            "organization" => Self::Organization,
            "product" => Self::Product,
            "concept" => Self::Concept,
            "location" => Self::Location,
            "technology" => Self::Technology,
            "event" => Self::Event,
            "topic" => Self::Topic,
            "website" => Self::Website,
            "document" => Self::Document,
            "entity" => Self::Entity,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Product => "product",
            Self::Concept => "concept",
            Self::Location => "location",
            Self::Technology => "technology",
            Self::Event => "event",
            Self::Topic => "topic",
            Self::Website => "website",
            Self::Document => "document",
            Self::Entity => "entity",
            Self::Unknown => "unknown",
        }
    }

    /// Fixed visibility priority contributed to the node score.
    pub fn visibility_priority(self) -> f32 {
        match self {
            Self::Person | Self::Organization => 3.0,
            Self::Product | Self::Concept | Self::Location | Self::Technology => 2.0,
            Self::Event | Self::Document | Self::Website | Self::Topic => 1.0,
            Self::Entity | Self::Unknown => 0.0,
        }
    }

    pub fn base_color(self) -> Color32 {
        match self {
            Self::Person => Color32::from_rgb(231, 126, 94),
            Self::Organization => Color32::from_rgb(94, 139, 231),
            Self::Product => Color32::from_rgb(104, 196, 136),
            Self::Concept => Color32::from_rgb(186, 134, 224),
            Self::Location => Color32::from_rgb(226, 186, 92),
            Self::Technology => Color32::from_rgb(88, 196, 204),
            Self::Event => Color32::from_rgb(222, 112, 158),
            Self::Topic => Color32::from_rgb(148, 186, 101),
            Self::Website => Color32::from_rgb(108, 168, 222),
            Self::Document => Color32::from_rgb(171, 156, 126),
            Self::Entity | Self::Unknown => Color32::from_rgb(149, 165, 166),
        }
    }
}

/// Normalized graph node. Identifiers are stable across re-filtering so
/// cached layout positions remain valid when the same node reappears.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
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

/// Normalized graph edge. Endpoints may reference entities that were
/// filtered out; the element builder drops those before rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    pub rel_type: String,
    pub strength: f32,
    pub weight: f32,
}

#[derive(Clone, Debug, Default)]
pub struct SnapshotMetadata {
    pub source: Option<String>,
    pub generated_at: Option<String>,
}

/// The full entity/relationship collection held as the source of truth for
/// LoD filtering. Replaced wholesale on reload; the rendered subset is
/// always a bounded view over it.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub metadata: SnapshotMetadata,
    pub skipped_entities: usize,
    pub skipped_relationships: usize,
}

/// Selects what `load_snapshot` materializes: everything, or a bounded
/// breadth-first neighborhood around a focus entity.
#[derive(Clone, Debug)]
pub enum Scope {
    Global,
    Neighborhood {
        center: String,
        depth: usize,
        max_nodes: usize,
    },
}

impl GraphSnapshot {
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn skipped_records(&self) -> usize {
        self.skipped_entities + self.skipped_relationships
    }

    /// Breadth-first neighborhood around `center`, limited to `depth` hops
    /// and at most `max_nodes` entities (the center always survives).
    /// Returns `None` when the center entity is not present.
    pub fn neighborhood(&self, center: &str, depth: usize, max_nodes: usize) -> Option<Self> {
        let by_id = self
            .entities
            .iter()
            .map(|entity| (entity.id.as_str(), entity))
            .collect::<HashMap<_, _>>();
        if !by_id.contains_key(center) {
            return None;
        }

        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for relationship in &self.relationships {
            adjacency
                .entry(relationship.from.as_str())
                .or_default()
                .push(relationship.to.as_str());
            adjacency
                .entry(relationship.to.as_str())
                .or_default()
                .push(relationship.from.as_str());
        }

        let max_nodes = max_nodes.max(1);
        let mut kept = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        kept.insert(center);
        order.push(center);
        queue.push_back((center, 0usize));

        while let Some((current, level)) = queue.pop_front() {
            if level >= depth || order.len() >= max_nodes {
                continue;
            }

            let Some(neighbors) = adjacency.get(current) else {
                continue;
            };

            for &next in neighbors {
                if order.len() >= max_nodes {
                    break;
                }
                if by_id.contains_key(next) && kept.insert(next) {
                    order.push(next);
                    queue.push_back((next, level + 1));
                }
            }
        }

        let entities = order
            .iter()
            .filter_map(|id| by_id.get(id).map(|entity| (*entity).clone()))
            .collect::<Vec<_>>();
        let relationships = self
            .relationships
            .iter()
            .filter(|relationship| {
                kept.contains(relationship.from.as_str()) && kept.contains(relationship.to.as_str())
            })
            .cloned()
            .collect::<Vec<_>>();

        Some(Self {
            entities,
            relationships,
            metadata: self.metadata.clone(),
            skipped_entities: self.skipped_entities,
            skipped_relationships: self.skipped_relationships,
        })
    }
}
