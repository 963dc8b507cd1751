use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use eframe::egui::{self, Pos2, Rect, Vec2};

use crate::elements::{
    EdgeDescriptor, FilterConfig, GraphElements, NodeDescriptor, build_elements, select_subset,
};
use crate::layout::{self, LayoutCache, LayoutEdge, LayoutNode};
use crate::lod::{LodConfig, LodController};
use crate::snapshot::{GraphSnapshot, Scope, load_snapshot};
use crate::visibility::{EdgeVisibility, NodeVisibility, VisibilityConfig};

mod graph;
mod highlight;
mod render_utils;
mod ui;

const LAYOUT_TIMEOUT: Duration = Duration::from_secs(5);

type LoadResult = Result<LoadedGraph, String>;

pub struct EntiLensApp {
    snapshot_path: PathBuf,
    scope: Scope,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

/// Everything the loading thread hands back once the snapshot is parsed,
/// filtered and laid out. Arriving in one piece means the first Ready frame
/// already paints a settled graph.
struct LoadedGraph {
    snapshot: GraphSnapshot,
    elements: GraphElements,
    positions: Vec<Vec2>,
}

struct LayoutJob {
    key: String,
    rx: Receiver<LayoutResult>,
    started: Instant,
}

struct LayoutResult {
    key: String,
    elements: GraphElements,
    positions: Vec<Vec2>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) enum Selection {
    Node(String),
    Edge(String),
}

pub(in crate::app) struct ViewModel {
    snapshot: GraphSnapshot,
    filter_config: FilterConfig,
    visibility_config: VisibilityConfig,
    graph: RenderGraph,
    layout_cache: LayoutCache,
    lod: LodController,
    layout_job: Option<LayoutJob>,
    pan: Vec2,
    zoom: f32,
    selected: Option<Selection>,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    render_revision: u64,
    canvas_rect: Option<Rect>,
    status: Option<String>,
    screenshot_requested: bool,
    drawn_node_count: usize,
    drawn_edge_count: usize,
}

struct SearchMatchCache {
    query: String,
    render_revision: u64,
    matches: std::sync::Arc<std::collections::HashSet<usize>>,
}

/// Index-aligned render state for the currently visible slice of the
/// snapshot. Rebuilt wholesale whenever the LoD controller swaps the
/// element set; per-frame screen-space data lives in `scratch`.
pub(in crate::app) struct RenderGraph {
    nodes: Vec<NodeDescriptor>,
    edges: Vec<EdgeDescriptor>,
    endpoints: Vec<(usize, usize)>,
    positions: Vec<Vec2>,
    index_by_id: HashMap<String, usize>,
    edge_index_by_id: HashMap<String, usize>,
    neighbors: Vec<Vec<usize>>,
    node_visibility: Vec<NodeVisibility>,
    edge_visibility: Vec<EdgeVisibility>,
    scratch: ViewScratch,
}

#[derive(Default)]
struct ViewScratch {
    screen_positions: Vec<Pos2>,
    screen_radii: Vec<f32>,
    draw_order: Vec<usize>,
    draw_order_dirty: bool,
}

impl EntiLensApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, snapshot_path: PathBuf, scope: Scope) -> Self {
        let rx = spawn_load(snapshot_path.clone(), scope.clone());
        Self {
            snapshot_path,
            scope,
            state: AppState::Loading { rx },
            reload_rx: None,
        }
    }
}

fn spawn_load(path: PathBuf, scope: Scope) -> Receiver<LoadResult> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = load_and_prepare(&path, &scope).map_err(|e| format!("{e:#}"));
        let _ = tx.send(result);
    });
    rx
}

fn load_and_prepare(path: &Path, scope: &Scope) -> anyhow::Result<LoadedGraph> {
    let filter = FilterConfig::default();
    let snapshot = load_snapshot(path, scope)?;
    let (entities, relationships) = select_subset(
        &snapshot,
        filter.max_initial_nodes,
        filter.max_initial_edges,
        &filter,
    );
    let elements = build_elements(&entities, &relationships);
    let positions = layout_elements(&elements);
    Ok(LoadedGraph {
        snapshot,
        elements,
        positions,
    })
}

/// Runs the full force pass for an element set. Called on the loading
/// thread for the initial render and on a worker thread for LoD swaps.
fn layout_elements(elements: &GraphElements) -> Vec<Vec2> {
    let nodes: Vec<LayoutNode> = elements
        .nodes
        .iter()
        .map(|node| LayoutNode {
            id: node.id.clone(),
            radius: render_utils::node_radius(node),
            importance: node.importance,
        })
        .collect();
    let index: HashMap<&str, usize> = elements
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();
    let edges: Vec<LayoutEdge> = elements
        .edges
        .iter()
        .filter_map(|edge| {
            let from = *index.get(edge.source.as_str())?;
            let to = *index.get(edge.target.as_str())?;
            Some(LayoutEdge {
                from,
                to,
                strength: edge.strength,
            })
        })
        .collect();
    let iterations = layout::iteration_budget(nodes.len(), edges.len());
    layout::force_layout(&nodes, &edges, iterations)
}

impl ViewModel {
    fn new(loaded: LoadedGraph) -> Self {
        let mut layout_cache = LayoutCache::new();
        let initial_positions: HashMap<String, Vec2> = loaded
            .elements
            .nodes
            .iter()
            .zip(&loaded.positions)
            .map(|(node, pos)| (node.id.clone(), *pos))
            .collect();
        // Seed both keys: the semantic "initial" entry and the size bucket
        // a later re-filter back to this count will look up.
        layout_cache.store(
            layout::bucket_key(loaded.elements.nodes.len()),
            initial_positions.clone(),
        );
        layout_cache.store(layout::INITIAL_LAYOUT_KEY.to_owned(), initial_positions);

        let graph = RenderGraph::new(loaded.elements, loaded.positions);
        let mut model = Self {
            snapshot: loaded.snapshot,
            filter_config: FilterConfig::default(),
            visibility_config: VisibilityConfig::default(),
            graph,
            layout_cache,
            lod: LodController::new(LodConfig::default()),
            layout_job: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            selected: None,
            search: String::new(),
            search_match_cache: None,
            render_revision: 0,
            canvas_rect: None,
            status: None,
            screenshot_requested: false,
            drawn_node_count: 0,
            drawn_edge_count: 0,
        };
        model.rescore_visibility();
        model
    }
}

impl eframe::App for EntiLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(rx) = &self.reload_rx {
            match rx.try_recv() {
                Ok(Ok(loaded)) => {
                    self.state = AppState::Ready(Box::new(ViewModel::new(loaded)));
                    self.reload_rx = None;
                }
                Ok(Err(e)) => {
                    self.state = AppState::Error(e);
                    self.reload_rx = None;
                }
                Err(TryRecvError::Empty) => {
                    ctx.request_repaint_after(Duration::from_millis(100));
                }
                Err(TryRecvError::Disconnected) => {
                    self.state = AppState::Error("loading thread disconnected".to_owned());
                    self.reload_rx = None;
                }
            }
        }

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(loaded)) => {
                        self.state = AppState::Ready(Box::new(ViewModel::new(loaded)));
                    }
                    Ok(Err(e)) => {
                        self.state = AppState::Error(e);
                    }
                    Err(TryRecvError::Empty) => {
                        egui::CentralPanel::default().show(ctx, |ui| {
                            ui.centered_and_justified(|ui| {
                                ui.spinner();
                            });
                        });
                        ctx.request_repaint_after(Duration::from_millis(100));
                    }
                    Err(TryRecvError::Disconnected) => {
                        self.state = AppState::Error("loading thread disconnected".to_owned());
                    }
                }
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_loading = self.reload_rx.is_some();
                model.show(ctx, &self.snapshot_path, &mut reload_requested, is_loading);
                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(spawn_load(self.snapshot_path.clone(), self.scope.clone()));
                }
            }
            AppState::Error(message) => {
                let message = message.clone();
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(ui.available_height() * 0.4);
                        ui.colored_label(egui::Color32::from_rgb(220, 80, 80), "Failed to load snapshot");
                        ui.label(message);
                        if ui.button("Retry").clicked() {
                            retry = true;
                        }
                    });
                });
                if retry {
                    let rx = spawn_load(self.snapshot_path.clone(), self.scope.clone());
                    self.state = AppState::Loading { rx };
                }
            }
        }
    }
}
