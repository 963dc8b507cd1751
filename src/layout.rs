use std::collections::HashMap;
use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use crate::util::stable_pair;

/// Iteration budgets by graph size. Larger graphs get fewer iterations so
/// interactive latency stays bounded, trading layout quality for speed.
pub const ITERATIONS_SMALL: usize = 300;
pub const ITERATIONS_MEDIUM: usize = 150;
pub const ITERATIONS_LARGE: usize = 60;
pub const ITERATIONS_MINIMAL: usize = 25;

/// Above this edge density (edges / nodes^2) the budget is halved again.
pub const DENSITY_HALVING_THRESHOLD: f32 = 0.1;

/// How strongly endpoint importance amplifies node repulsion.
pub const IMPORTANCE_REPULSION: f32 = 0.5;
/// How strongly relationship strength contracts the preferred edge length.
pub const STRENGTH_CONTRACTION: f32 = 0.5;
/// Base spring coefficient, scaled up by relationship strength.
pub const SPRING_COEFFICIENT: f32 = 0.18;

#[derive(Clone, Debug)]
pub struct LayoutNode {
    pub id: String,
    pub radius: f32,
    pub importance: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct LayoutEdge {
    pub from: usize,
    pub to: usize,
    pub strength: f32,
}

pub fn iteration_budget(node_count: usize, edge_count: usize) -> usize {
    let base = if node_count < 100 {
        ITERATIONS_SMALL
    } else if node_count < 300 {
        ITERATIONS_MEDIUM
    } else if node_count < 800 {
        ITERATIONS_LARGE
    } else {
        ITERATIONS_MINIMAL
    };

    if node_count > 0 {
        let density = edge_count as f32 / (node_count as f32 * node_count as f32);
        if density > DENSITY_HALVING_THRESHOLD {
            return (base / 2).max(1);
        }
    }
    base
}

/// Spring-embedder layout. Deterministic: initial placement is seeded from
/// the node id hash, so the same node population always produces the same
/// positions and results are safe to cache. Importance makes nodes repel
/// more strongly; strength pulls endpoints closer together.
pub fn force_layout(nodes: &[LayoutNode], edges: &[LayoutEdge], iterations: usize) -> Vec<Vec2> {
    let n = nodes.len();
    if n == 0 {
        return Vec::new();
    }

    let base_radius = (n as f32).sqrt() * 360.0;
    let mut positions = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let angle = (index as f32 / n as f32) * TAU;
            let (jx, jy) = stable_pair(&node.id);
            let jitter = vec2(jx * 160.0, jy * 160.0);
            let radial = vec2(angle.cos(), angle.sin()) * base_radius;
            radial + jitter
        })
        .collect::<Vec<_>>();

    if n == 1 {
        return positions;
    }

    let area = (base_radius * 2.4).powi(2);
    let k = (area / n as f32).sqrt().max(24.0);
    let mut temperature = (k * 5.5).max(140.0);

    for _ in 0..iterations {
        let mut disp = vec![Vec2::ZERO; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let delta = positions[i] - positions[j];
                let distance = delta.length().max(0.5);
                let direction = delta / distance;

                let ri = nodes[i].radius;
                let rj = nodes[j].radius;
                let min_distance = (ri + rj) * 4.2;

                let importance_boost = 1.0
                    + (nodes[i].importance.max(0.0) + nodes[j].importance.max(0.0))
                        * IMPORTANCE_REPULSION;
                let force = (k * k * (1.0 + (ri + rj) * 0.015) * importance_boost) / distance;
                disp[i] += direction * force;
                disp[j] -= direction * force;

                if distance < min_distance {
                    let overlap_push = (min_distance - distance) * 2.4;
                    disp[i] += direction * overlap_push;
                    disp[j] -= direction * overlap_push;
                }
            }
        }

        for edge in edges {
            let (from, to) = (edge.from, edge.to);
            if from >= n || to >= n || from == to {
                continue;
            }

            let delta = positions[from] - positions[to];
            let distance = delta.length().max(0.5);
            let direction = delta / distance;

            let rf = nodes[from].radius;
            let rt = nodes[to].radius;
            let strength = edge.strength.clamp(0.0, 1.0);
            let ideal_length =
                (k + (rf + rt) * 3.5) * (1.25 - strength * STRENGTH_CONTRACTION);
            let force =
                (distance - ideal_length) * SPRING_COEFFICIENT * (0.5 + strength);

            disp[from] -= direction * force;
            disp[to] += direction * force;
        }

        for i in 0..n {
            disp[i] -= positions[i] * 0.0012;
        }

        for i in 0..n {
            let d = disp[i];
            let length = d.length();
            if length > 0.0 {
                positions[i] += d / length * length.min(temperature) * 0.92;
            }
        }

        temperature *= 0.965;
        if temperature < 0.55 {
            break;
        }
    }

    positions
}

/// Cached layouts keyed by a semantic bucket label. A bucket also records
/// the node count it was computed for; a lookup with a different count
/// never matches, so stale positions from another population size are
/// never applied. Two different subsets of the same size share a bucket
/// id; whichever needs a layout last overwrites it.
#[derive(Default)]
pub struct LayoutCache {
    entries: HashMap<String, CacheEntry>,
}

struct CacheEntry {
    node_count: usize,
    positions: HashMap<String, Vec2>,
}

pub const INITIAL_LAYOUT_KEY: &str = "initial";

pub fn bucket_key(node_count: usize) -> String {
    format!("nodes_{node_count}")
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &str, node_count: usize) -> Option<&HashMap<String, Vec2>> {
        self.entries
            .get(key)
            .filter(|entry| entry.node_count == node_count)
            .map(|entry| &entry.positions)
    }

    pub fn store(&mut self, key: String, positions: HashMap<String, Vec2>) {
        self.entries.insert(
            key,
            CacheEntry {
                node_count: positions.len(),
                positions,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
