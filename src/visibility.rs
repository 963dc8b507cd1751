use std::collections::HashMap;

use crate::elements::{EdgeDescriptor, NodeDescriptor};

pub const NODE_SCORE_MAX: f32 = 11.0;
pub const EDGE_SCORE_MAX: f32 = 6.0;

/// Tunable scoring constants. Percentile thresholds are always taken over
/// the currently rendered population, not the full snapshot, so the same
/// absolute importance can score differently after an LoD re-filter.
#[derive(Clone, Copy, Debug)]
pub struct VisibilityConfig {
    /// A node counts as a community hub when its rendered edge count
    /// exceeds this multiple of its community's average.
    pub hub_ratio: f32,
    pub hub_bonus: f32,
    /// Edge bonus applies when either endpoint's importance exceeds this.
    pub endpoint_importance_threshold: f32,
    pub endpoint_bonus: f32,
    /// Rendered elements per +1 of threshold correction.
    pub density_norm: f32,
    pub max_density_correction: f32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            hub_ratio: 1.5,
            hub_bonus: 1.0,
            endpoint_importance_threshold: 0.7,
            endpoint_bonus: 1.0,
            density_norm: 500.0,
            max_density_correction: 2.0,
        }
    }
}

/// Ephemeral per-node decision, recomputed whole on every cosmetic pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeVisibility {
    pub score: f32,
    pub show: bool,
    pub show_label: bool,
    pub opacity: f32,
    pub label_size: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeVisibility {
    pub score: f32,
    pub show: bool,
    pub opacity: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PercentileStats {
    pub p25: f32,
    pub p50: f32,
    pub p75: f32,
    pub p90: f32,
}

impl PercentileStats {
    pub fn from_values(values: &[f32]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f32::total_cmp);
        let pick = |q: f32| {
            let index = ((sorted.len() - 1) as f32 * q).round() as usize;
            sorted[index.min(sorted.len() - 1)]
        };

        Self {
            p25: pick(0.25),
            p50: pick(0.50),
            p75: pick(0.75),
            p90: pick(0.90),
        }
    }

    /// 0-4 point bucket against all four thresholds.
    pub fn wide_bucket(&self, value: f32) -> f32 {
        if value >= self.p90 {
            4.0
        } else if value >= self.p75 {
            3.0
        } else if value >= self.p50 {
            2.0
        } else if value >= self.p25 {
            1.0
        } else {
            0.0
        }
    }

    /// 0-3 point bucket against the quartile thresholds.
    pub fn narrow_bucket(&self, value: f32) -> f32 {
        if value >= self.p75 {
            3.0
        } else if value >= self.p50 {
            2.0
        } else if value >= self.p25 {
            1.0
        } else {
            0.0
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibilityThresholds {
    pub node_show: f32,
    pub node_label: f32,
    pub edge_show: f32,
}

/// Score cutoffs by zoom band, corrected upward for dense scenes: the more
/// elements are rendered, the higher a score must be to earn visibility at
/// the same zoom.
pub fn thresholds_for(
    zoom: f32,
    element_count: usize,
    config: &VisibilityConfig,
) -> VisibilityThresholds {
    let (node_show, node_label, edge_show) = if zoom < 0.3 {
        (7.0, 9.0, 5.0)
    } else if zoom < 0.6 {
        (6.0, 8.0, 4.0)
    } else if zoom < 1.0 {
        (5.0, 7.0, 3.0)
    } else if zoom < 1.5 {
        (3.0, 6.0, 2.0)
    } else {
        (0.0, 5.0, 0.0)
    };

    let correction = (element_count as f32 / config.density_norm)
        .min(config.max_density_correction);

    VisibilityThresholds {
        node_show: node_show + correction,
        node_label: node_label + correction,
        edge_show: edge_show + correction,
    }
}

fn relationship_type_weight(rel_type: &str) -> f32 {
    match rel_type {
        "contains" | "created_by" | "located_in" | "works_for" => 2.0,
        "mentioned" => 0.0,
        _ => 1.0,
    }
}

/// Score every rendered node and edge and map scores to show/label/opacity
/// decisions. The rendered element set itself is never changed here; that
/// is the re-filter path's job.
pub fn score_visibility(
    nodes: &[NodeDescriptor],
    edges: &[EdgeDescriptor],
    zoom: f32,
    config: &VisibilityConfig,
) -> (Vec<NodeVisibility>, Vec<EdgeVisibility>) {
    let index_by_id = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.as_str(), index))
        .collect::<HashMap<_, _>>();

    let mut edge_counts = vec![0usize; nodes.len()];
    for edge in edges {
        if let (Some(&from), Some(&to)) = (
            index_by_id.get(edge.source.as_str()),
            index_by_id.get(edge.target.as_str()),
        ) {
            edge_counts[from] += 1;
            edge_counts[to] += 1;
        }
    }

    // Average rendered edge count per community, for the hub bonus.
    let mut community_totals: HashMap<&str, (usize, usize)> = HashMap::new();
    for (index, node) in nodes.iter().enumerate() {
        if let Some(community) = node.community.as_deref() {
            let entry = community_totals.entry(community).or_insert((0, 0));
            entry.0 += edge_counts[index];
            entry.1 += 1;
        }
    }

    let importance_stats = PercentileStats::from_values(
        &nodes.iter().map(|node| node.importance).collect::<Vec<_>>(),
    );
    let degree_stats = PercentileStats::from_values(
        &nodes.iter().map(|node| node.degree as f32).collect::<Vec<_>>(),
    );
    let strength_stats = PercentileStats::from_values(
        &edges.iter().map(|edge| edge.strength).collect::<Vec<_>>(),
    );

    let thresholds = thresholds_for(zoom, nodes.len() + edges.len(), config);

    let node_visibility = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let mut score = importance_stats.wide_bucket(node.importance)
                + degree_stats.narrow_bucket(node.degree as f32)
                + node.entity_type.visibility_priority();

            if let Some(community) = node.community.as_deref()
                && let Some(&(total, members)) = community_totals.get(community)
                && members > 0
            {
                let average = total as f32 / members as f32;
                if average > 0.0 && edge_counts[index] as f32 > average * config.hub_ratio {
                    score += config.hub_bonus;
                }
            }

            let show = score >= thresholds.node_show;
            NodeVisibility {
                score,
                show,
                show_label: show && score >= thresholds.node_label,
                opacity: if show {
                    (0.35 + 0.65 * (score / NODE_SCORE_MAX)).clamp(0.0, 1.0)
                } else {
                    0.0
                },
                label_size: (8.0 + score * 0.6).clamp(8.0, 16.0),
            }
        })
        .collect::<Vec<_>>();

    let edge_visibility = edges
        .iter()
        .map(|edge| {
            let mut score = strength_stats.narrow_bucket(edge.strength)
                + relationship_type_weight(&edge.rel_type);

            let endpoints = (
                index_by_id.get(edge.source.as_str()).copied(),
                index_by_id.get(edge.target.as_str()).copied(),
            );
            let endpoint_important = |index: Option<usize>| {
                index.is_some_and(|i| {
                    nodes[i].importance > config.endpoint_importance_threshold
                })
            };
            if endpoint_important(endpoints.0) || endpoint_important(endpoints.1) {
                score += config.endpoint_bonus;
            }

            // An edge whose endpoint is hidden is force-hidden regardless
            // of its own score.
            let endpoint_hidden = |index: Option<usize>| {
                index.is_none_or(|i| !node_visibility[i].show)
            };
            let show = score >= thresholds.edge_show
                && !endpoint_hidden(endpoints.0)
                && !endpoint_hidden(endpoints.1);

            EdgeVisibility {
                score,
                show,
                opacity: if show {
                    (0.25 + 0.75 * (score / EDGE_SCORE_MAX)).clamp(0.0, 1.0)
                } else {
                    0.0
                },
            }
        })
        .collect::<Vec<_>>();

    (node_visibility, edge_visibility)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::EntityType;
    use eframe::egui::Color32;

    fn node(id: &str, entity_type: EntityType, importance: f32, degree: u32) -> NodeDescriptor {
        NodeDescriptor {
            id: id.to_owned(),
            name: id.to_owned(),
            entity_type,
            confidence: 0.5,
            importance,
            degree,
            community: None,
            size: 20.0,
            color: Color32::GRAY,
            border_color: Color32::DARK_GRAY,
        }
    }

    fn edge(source: &str, target: &str, rel_type: &str, strength: f32) -> EdgeDescriptor {
        EdgeDescriptor {
            id: format!("{source}-{target}"),
            source: source.to_owned(),
            target: target.to_owned(),
            rel_type: rel_type.to_owned(),
            strength,
            weight: 1.0,
        }
    }

    #[test]
    fn percentile_stats_on_known_population() {
        let values = (1..=100).map(|v| v as f32).collect::<Vec<_>>();
        let stats = PercentileStats::from_values(&values);
        assert_eq!(stats.p25, 26.0);
        assert_eq!(stats.p50, 51.0);
        assert_eq!(stats.p75, 75.0);
        assert_eq!(stats.p90, 90.0);

        assert_eq!(stats.wide_bucket(95.0), 4.0);
        assert_eq!(stats.wide_bucket(80.0), 3.0);
        assert_eq!(stats.wide_bucket(60.0), 2.0);
        assert_eq!(stats.wide_bucket(30.0), 1.0);
        assert_eq!(stats.wide_bucket(5.0), 0.0);
        assert_eq!(stats.narrow_bucket(80.0), 3.0);
        assert_eq!(stats.narrow_bucket(5.0), 0.0);
    }

    #[test]
    fn empty_population_defaults_to_zero() {
        assert_eq!(PercentileStats::from_values(&[]), PercentileStats::default());
    }

    #[test]
    fn type_priority_separates_equal_nodes() {
        let nodes = vec![
            node("p", EntityType::Person, 0.5, 2),
            node("u", EntityType::Unknown, 0.5, 2),
        ];
        let (visibility, _) = score_visibility(&nodes, &[], 1.0, &VisibilityConfig::default());
        assert_eq!(visibility[0].score - visibility[1].score, 3.0);
    }

    #[test]
    fn community_hubs_get_a_bonus() {
        let mut hub = node("hub", EntityType::Entity, 0.5, 1);
        hub.community = Some("c1".to_owned());
        let mut quiet_a = node("qa", EntityType::Entity, 0.5, 1);
        quiet_a.community = Some("c1".to_owned());
        let mut quiet_b = node("qb", EntityType::Entity, 0.5, 1);
        quiet_b.community = Some("c1".to_owned());
        let outside = node("out", EntityType::Entity, 0.5, 1);

        // The hub carries three rendered edges; its peers carry one or two.
        let nodes = vec![hub, quiet_a, quiet_b, outside];
        let edges = vec![
            edge("hub", "qa", "related", 0.5),
            edge("hub", "qb", "related", 0.5),
            edge("hub", "out", "related", 0.5),
        ];

        let (visibility, _) = score_visibility(&nodes, &edges, 1.0, &VisibilityConfig::default());
        // hub: 3 edges vs community average (3+1+1)/3; 3 > 1.67 * 1.5.
        assert_eq!(visibility[0].score - visibility[1].score, 1.0);
    }

    #[test]
    fn edges_with_hidden_endpoints_are_force_hidden() {
        // At far zoom with a high threshold, the weak unknown-type node
        // hides, and so must every edge touching it.
        let nodes = vec![
            node("strong", EntityType::Person, 0.9, 50),
            node("alsostrong", EntityType::Organization, 0.9, 40),
            node("weak", EntityType::Unknown, 0.0, 0),
        ];
        let edges = vec![
            edge("strong", "alsostrong", "works_for", 0.9),
            edge("strong", "weak", "works_for", 0.9),
        ];

        let (node_vis, edge_vis) =
            score_visibility(&nodes, &edges, 0.2, &VisibilityConfig::default());
        assert!(node_vis[0].show);
        assert!(!node_vis[2].show);
        assert!(edge_vis[0].show);
        assert!(!edge_vis[1].show);
        assert_eq!(edge_vis[1].opacity, 0.0);
        // The force-hidden edge keeps its raw score; only `show` flips.
        assert_eq!(edge_vis[0].score, edge_vis[1].score);
    }

    #[test]
    fn relationship_type_weights() {
        assert_eq!(relationship_type_weight("works_for"), 2.0);
        assert_eq!(relationship_type_weight("contains"), 2.0);
        assert_eq!(relationship_type_weight("related"), 1.0);
        assert_eq!(relationship_type_weight("mentioned"), 0.0);
        assert_eq!(relationship_type_weight("CEO_of"), 1.0);
    }

    #[test]
    fn endpoint_importance_bonus() {
        let nodes = vec![
            node("vip", EntityType::Entity, 0.9, 0),
            node("plain", EntityType::Entity, 0.1, 0),
            node("other", EntityType::Entity, 0.1, 0),
        ];
        let edges = vec![
            edge("vip", "plain", "related", 0.5),
            edge("plain", "other", "related", 0.5),
        ];

        let (_, edge_vis) = score_visibility(&nodes, &edges, 1.0, &VisibilityConfig::default());
        assert_eq!(edge_vis[0].score - edge_vis[1].score, 1.0);
    }

    #[test]
    fn thresholds_rise_with_density_and_fall_with_zoom() {
        let config = VisibilityConfig::default();
        let sparse = thresholds_for(0.8, 100, &config);
        let dense = thresholds_for(0.8, 900, &config);
        assert!(dense.node_show > sparse.node_show);
        assert!(dense.edge_show > sparse.edge_show);

        // Correction saturates.
        let extreme = thresholds_for(0.8, 100_000, &config);
        assert_eq!(
            extreme.node_show,
            sparse.node_show - (100.0 / config.density_norm)
                + config.max_density_correction
        );

        let far = thresholds_for(0.1, 100, &config);
        let near = thresholds_for(2.0, 100, &config);
        assert!(far.node_show > near.node_show);
        assert!(far.edge_show > near.edge_show);
    }

    #[test]
    fn decisions_are_recomputed_fresh_per_population() {
        // The same absolute importance scores differently when the
        // rendered population around it changes.
        let strong_crowd = (0..10)
            .map(|i| node(&format!("s{i}"), EntityType::Entity, 0.9, 0))
            .chain([node("me", EntityType::Entity, 0.5, 0)])
            .collect::<Vec<_>>();
        let weak_crowd = (0..10)
            .map(|i| node(&format!("w{i}"), EntityType::Entity, 0.1, 0))
            .chain([node("me", EntityType::Entity, 0.5, 0)])
            .collect::<Vec<_>>();

        let config = VisibilityConfig::default();
        let (among_strong, _) = score_visibility(&strong_crowd, &[], 1.0, &config);
        let (among_weak, _) = score_visibility(&weak_crowd, &[], 1.0, &config);
        assert!(among_weak[10].score > among_strong[10].score);
    }
}
