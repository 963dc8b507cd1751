use std::collections::HashSet;

use anyhow::{Context, Result};
use eframe::egui::Color32;
use serde::Deserialize;

use super::{Entity, EntityType, GraphSnapshot, Relationship, SnapshotMetadata};

pub(super) const DEFAULT_CONFIDENCE: f32 = 0.5;
pub(super) const DEFAULT_STRENGTH: f32 = 0.5;
pub(super) const DEFAULT_NODE_SIZE: f32 = 20.0;
pub(super) const MIN_NODE_SIZE: f32 = 10.0;
pub(super) const DEFAULT_REL_TYPE: &str = "related";

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default, alias = "nodes")]
    entities: Vec<RawEntity>,
    #[serde(default, alias = "edges", alias = "links")]
    relationships: Vec<RawRelationship>,
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    id: Option<String>,
    #[serde(alias = "entityId")]
    entity_id: Option<String>,
    name: Option<String>,
    label: Option<String>,
    #[serde(rename = "type", alias = "entityType")]
    entity_type: Option<String>,
    confidence: Option<f32>,
    importance: Option<f32>,
    degree: Option<u32>,
    community: Option<String>,
    size: Option<f32>,
    color: Option<String>,
    #[serde(alias = "borderColor")]
    border_color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRelationship {
    #[serde(alias = "source")]
    from: Option<String>,
    #[serde(alias = "target")]
    to: Option<String>,
    #[serde(rename = "type", alias = "relationshipType")]
    rel_type: Option<String>,
    strength: Option<f32>,
    confidence: Option<f32>,
    weight: Option<f32>,
    count: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    source: Option<String>,
    #[serde(alias = "generatedAt")]
    generated_at: Option<String>,
}

/// Parse a raw snapshot document and normalize it into strongly-typed
/// records. Field fallbacks follow a fixed precedence per field; records
/// missing a usable identifier or endpoint are skipped with a warning and
/// counted, never fatal.
pub fn parse_snapshot(raw: &str) -> Result<GraphSnapshot> {
    let parsed: RawSnapshot =
        serde_json::from_str(raw).context("invalid entity graph snapshot JSON")?;
    Ok(normalize(parsed))
}

fn normalize(raw: RawSnapshot) -> GraphSnapshot {
    let mut entities = Vec::with_capacity(raw.entities.len());
    let mut seen = HashSet::new();
    let mut skipped_entities = 0usize;

    for (index, record) in raw.entities.into_iter().enumerate() {
        match normalize_entity(record) {
            Some(entity) => {
                if seen.insert(entity.id.clone()) {
                    entities.push(entity);
                } else {
                    log::warn!("skipping duplicate entity id {:?} at index {index}", entity.id);
                    skipped_entities += 1;
                }
            }
            None => {
                log::warn!("skipping entity record at index {index}: no usable identifier");
                skipped_entities += 1;
            }
        }
    }

    let mut relationships = Vec::with_capacity(raw.relationships.len());
    let mut skipped_relationships = 0usize;

    for (index, record) in raw.relationships.into_iter().enumerate() {
        match normalize_relationship(record) {
            Some(relationship) => relationships.push(relationship),
            None => {
                log::warn!("skipping relationship record at index {index}: missing endpoint");
                skipped_relationships += 1;
            }
        }
    }

    GraphSnapshot {
        entities,
        relationships,
        metadata: SnapshotMetadata {
            source: raw.metadata.source,
            generated_at: raw.metadata.generated_at,
        },
        skipped_entities,
        skipped_relationships,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn normalize_entity(raw: RawEntity) -> Option<Entity> {
    let name_field = non_empty(raw.name);

    // Identifier precedence: id, then entityId, then the display name.
    let id = non_empty(raw.id)
        .or_else(|| non_empty(raw.entity_id))
        .or_else(|| name_field.clone())?;
    let name = name_field
        .or_else(|| non_empty(raw.label))
        .unwrap_or_else(|| id.clone());

    let entity_type = match raw.entity_type.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => EntityType::parse(value),
        _ => EntityType::Entity,
    };

    let importance = raw.importance.unwrap_or(0.0).max(0.0);
    let size = raw.size.unwrap_or(DEFAULT_NODE_SIZE).max(MIN_NODE_SIZE);
    let color = raw
        .color
        .as_deref()
        .and_then(parse_hex_color)
        .unwrap_or_else(|| local_color(entity_type, importance));
    let border_color = raw
        .border_color
        .as_deref()
        .and_then(parse_hex_color)
        .unwrap_or_else(|| darken(color, 0.6));

    Some(Entity {
        id,
        name,
        entity_type,
        confidence: raw.confidence.unwrap_or(DEFAULT_CONFIDENCE).clamp(0.0, 1.0),
        importance,
        degree: raw.degree.unwrap_or(0),
        community: non_empty(raw.community),
        size,
        color,
        border_color,
    })
}

fn normalize_relationship(raw: RawRelationship) -> Option<Relationship> {
    let from = non_empty(raw.from)?;
    let to = non_empty(raw.to)?;
    if from == to {
        log::debug!("dropping self-referential relationship on {from:?}");
        return None;
    }

    let rel_type = non_empty(raw.rel_type).unwrap_or_else(|| DEFAULT_REL_TYPE.to_owned());
    let strength = raw
        .strength
        .or(raw.confidence)
        .unwrap_or(DEFAULT_STRENGTH)
        .clamp(0.0, 1.0);
    let weight = raw.weight.or(raw.count).unwrap_or(1.0).max(0.0);

    Some(Relationship {
        from,
        to,
        rel_type,
        strength,
        weight,
    })
}

fn parse_hex_color(raw: &str) -> Option<Color32> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color32::from_rgb(r, g, b))
}

/// Local fallback when the backend supplied no color: the type palette
/// color, pulled toward its darker end as importance rises.
fn local_color(entity_type: EntityType, importance: f32) -> Color32 {
    let base = entity_type.base_color();
    let factor = 0.75 + importance.clamp(0.0, 1.0) * 0.25;
    Color32::from_rgb(
        (base.r() as f32 * factor) as u8,
        (base.g() as f32 * factor) as u8,
        (base.b() as f32 * factor) as u8,
    )
}

fn darken(color: Color32, factor: f32) -> Color32 {
    Color32::from_rgb(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
    )
}
