use std::collections::BTreeMap;
use std::io::Cursor;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use eframe::egui::Vec2;
use serde::Serialize;

use crate::elements::{EdgeDescriptor, NodeDescriptor};

/// Serializable snapshot of the current render state: plain data, no
/// references back into the live graph.
#[derive(Debug, Serialize)]
pub struct ExportedGraph {
    pub nodes: Vec<ExportedNode>,
    pub edges: Vec<ExportedEdge>,
    /// Entity id to world position, independent of the per-node `x`/`y`.
    pub layout: BTreeMap<String, [f32; 2]>,
    pub zoom: f32,
    pub center: [f32; 2],
}

#[derive(Debug, Serialize)]
pub struct ExportedNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: &'static str,
    pub importance: f32,
    pub degree: u32,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Serialize)]
pub struct ExportedEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub strength: f32,
    pub weight: f32,
}

pub fn export_graph(
    nodes: &[NodeDescriptor],
    positions: &[Vec2],
    edges: &[EdgeDescriptor],
    zoom: f32,
    center: Vec2,
) -> ExportedGraph {
    let layout = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let position = positions.get(index).copied().unwrap_or(Vec2::ZERO);
            (node.id.clone(), [position.x, position.y])
        })
        .collect::<BTreeMap<_, _>>();

    let nodes = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let position = positions.get(index).copied().unwrap_or(Vec2::ZERO);
            ExportedNode {
                id: node.id.clone(),
                name: node.name.clone(),
                entity_type: node.entity_type.label(),
                importance: node.importance,
                degree: node.degree,
                x: position.x,
                y: position.y,
            }
        })
        .collect();

    let edges = edges
        .iter()
        .map(|edge| ExportedEdge {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            rel_type: edge.rel_type.clone(),
            strength: edge.strength,
            weight: edge.weight,
        })
        .collect();

    ExportedGraph {
        nodes,
        edges,
        layout,
        zoom,
        center: [center.x, center.y],
    }
}

/// PNG-encode an RGBA screenshot buffer. Returns the raw PNG bytes plus a
/// `data:image/png;base64,` URI of the same image.
pub fn encode_screenshot(rgba: &[u8], width: u32, height: u32) -> Result<(Vec<u8>, String)> {
    let image = image::RgbaImage::from_raw(width, height, rgba.to_vec())
        .context("screenshot buffer does not match its reported dimensions")?;

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .context("failed to encode screenshot as PNG")?;

    let uri = format!("data:image/png;base64,{}", STANDARD.encode(&png));
    Ok((png, uri))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::EntityType;
    use eframe::egui::{Color32, vec2};

    fn node(id: &str) -> NodeDescriptor {
        NodeDescriptor {
            id: id.to_owned(),
            name: id.to_owned(),
            entity_type: EntityType::Person,
            confidence: 0.5,
            importance: 0.7,
            degree: 3,
            community: None,
            size: 20.0,
            color: Color32::GRAY,
            border_color: Color32::DARK_GRAY,
        }
    }

    #[test]
    fn export_is_plain_serializable_data() {
        let nodes = vec![node("A"), node("B")];
        let positions = vec![vec2(1.0, 2.0), vec2(3.0, 4.0)];
        let edges = vec![EdgeDescriptor {
            id: "A-B".to_owned(),
            source: "A".to_owned(),
            target: "B".to_owned(),
            rel_type: "works_for".to_owned(),
            strength: 0.8,
            weight: 1.0,
        }];

        let export = export_graph(&nodes, &positions, &edges, 1.5, vec2(10.0, -4.0));
        assert_eq!(export.nodes.len(), 2);
        assert_eq!(export.edges.len(), 1);
        assert_eq!(export.center, [10.0, -4.0]);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["nodes"][0]["id"], "A");
        assert_eq!(json["nodes"][0]["type"], "person");
        assert_eq!(json["nodes"][1]["x"], 3.0);
        assert_eq!(json["layout"]["A"][0], 1.0);
        assert_eq!(json["layout"]["B"][1], 4.0);
        assert_eq!(json["edges"][0]["type"], "works_for");
        assert_eq!(json["zoom"], 1.5);
    }

    #[test]
    fn screenshot_encodes_to_png_data_uri() {
        let rgba = [255u8, 0, 0, 255, 0, 255, 0, 255];
        let (png, uri) = encode_screenshot(&rgba, 2, 1).unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn mismatched_screenshot_dimensions_are_an_error() {
        assert!(encode_screenshot(&[0u8; 7], 2, 1).is_err());
    }
}
