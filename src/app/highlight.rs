use std::collections::HashSet;

use super::{RenderGraph, Selection};

/// Index sets to emphasize for the current selection: the selected node
/// plus its one-hop neighborhood, or an edge plus its two endpoints.
pub(in crate::app) struct HighlightState {
    pub(in crate::app) nodes: HashSet<usize>,
    pub(in crate::app) edges: HashSet<usize>,
}

pub(in crate::app) fn build_highlight_state(
    graph: &RenderGraph,
    selection: &Selection,
) -> Option<HighlightState> {
    match selection {
        Selection::Node(id) => {
            let center = graph.node_index(id)?;
            let mut nodes: HashSet<usize> = graph.neighbors[center].iter().copied().collect();
            nodes.insert(center);
            let edges = graph
                .endpoints
                .iter()
                .enumerate()
                .filter_map(|(index, &(from, to))| {
                    if from == center || to == center {
                        Some(index)
                    } else {
                        None
                    }
                })
                .collect();
            Some(HighlightState { nodes, edges })
        }
        Selection::Edge(id) => {
            let index = graph.edge_index(id)?;
            let (from, to) = *graph.endpoints.get(index)?;
            Some(HighlightState {
                nodes: HashSet::from([from, to]),
                edges: HashSet::from([index]),
            })
        }
    }
}
