use std::time::{Duration, Instant};

/// Level-of-detail tuning. Re-filtering only happens when the zoom-derived
/// target diverges meaningfully from what is already rendered; smaller
/// deltas get a cosmetic visibility pass instead.
#[derive(Clone, Copy, Debug)]
pub struct LodConfig {
    pub debounce: Duration,
    pub grow_ratio: f32,
    pub shrink_ratio: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            grow_ratio: 1.2,
            shrink_ratio: 0.8,
        }
    }
}

/// Zoom to target node count step function. Non-decreasing in zoom: lower
/// zoom means fewer nodes on screen.
pub fn target_node_count(zoom: f32) -> usize {
    if zoom < 0.3 {
        100
    } else if zoom < 0.6 {
        300
    } else if zoom < 1.0 {
        600
    } else if zoom < 1.5 {
        1000
    } else {
        1200
    }
}

/// Edge budget for a re-filter, scaling from 200 at far zoom to 10000 when
/// zoomed close in.
pub fn max_edges_for_zoom(zoom: f32) -> usize {
    if zoom < 0.3 {
        200
    } else if zoom < 0.6 {
        600
    } else if zoom < 1.0 {
        1500
    } else if zoom < 1.5 {
        4000
    } else {
        10000
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LodAction {
    Idle,
    /// Re-score visibility only; topology and positions stay untouched.
    Cosmetic,
    /// Re-derive the rendered subset at the new target size and re-layout.
    Refilter {
        target_nodes: usize,
        max_edges: usize,
    },
}

/// Debounced, re-entrancy-guarded controller over the single continuous
/// zoom input. Zoom events within the debounce window coalesce; only the
/// last settles. A settle arriving while a recomputation is in flight is
/// dropped, not queued; the next settle re-evaluates against current
/// state. Time is injected so the state machine is testable.
pub struct LodController {
    config: LodConfig,
    pending: Option<(f32, Instant)>,
    in_progress: bool,
}

impl LodController {
    pub fn new(config: LodConfig) -> Self {
        Self {
            config,
            pending: None,
            in_progress: false,
        }
    }

    pub fn note_zoom(&mut self, zoom: f32, now: Instant) {
        self.pending = Some((zoom, now));
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Mark the in-flight recomputation finished (layout applied, failed,
    /// or timed out), re-enabling future re-filters.
    pub fn complete(&mut self) {
        self.in_progress = false;
    }

    pub fn poll(
        &mut self,
        now: Instant,
        rendered_nodes: usize,
        snapshot_nodes: usize,
    ) -> LodAction {
        let Some((zoom, at)) = self.pending else {
            return LodAction::Idle;
        };
        if now.duration_since(at) < self.config.debounce {
            return LodAction::Idle;
        }
        self.pending = None;

        if self.in_progress {
            log::debug!("dropping LoD request at zoom {zoom:.2}: recomputation in flight");
            return LodAction::Idle;
        }
        if snapshot_nodes == 0 {
            return LodAction::Idle;
        }

        let target = target_node_count(zoom).min(snapshot_nodes);
        let grow = target as f32 > rendered_nodes as f32 * self.config.grow_ratio;
        let shrink = (target as f32) < rendered_nodes as f32 * self.config.shrink_ratio;

        if (grow || shrink) && target != rendered_nodes {
            self.in_progress = true;
            LodAction::Refilter {
                target_nodes: target,
                max_edges: max_edges_for_zoom(zoom),
            }
        } else {
            LodAction::Cosmetic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT_NODES: usize = 5000;

    fn settled(controller: &mut LodController, zoom: f32, rendered: usize) -> LodAction {
        let t0 = Instant::now();
        controller.note_zoom(zoom, t0);
        controller.poll(t0 + Duration::from_millis(150), rendered, SNAPSHOT_NODES)
    }

    #[test]
    fn target_counts_follow_zoom_bands() {
        assert_eq!(target_node_count(0.2), 100);
        assert_eq!(target_node_count(0.3), 300);
        assert_eq!(target_node_count(0.75), 600);
        assert_eq!(target_node_count(1.2), 1000);
        assert_eq!(target_node_count(1.6), 1200);
    }

    #[test]
    fn target_counts_are_monotonic_in_zoom() {
        let mut previous = 0;
        let mut zoom = 0.05_f32;
        while zoom < 3.0 {
            let target = target_node_count(zoom);
            assert!(target >= previous, "target decreased at zoom {zoom}");
            previous = target;
            zoom += 0.05;
        }
    }

    #[test]
    fn edge_budget_grows_with_zoom() {
        assert_eq!(max_edges_for_zoom(0.1), 200);
        assert_eq!(max_edges_for_zoom(2.0), 10000);
        let mut previous = 0;
        for step in 0..60 {
            let budget = max_edges_for_zoom(step as f32 * 0.05);
            assert!(budget >= previous);
            previous = budget;
        }
    }

    #[test]
    fn debounce_coalesces_rapid_zoom_events() {
        let mut controller = LodController::new(LodConfig::default());
        let t0 = Instant::now();

        controller.note_zoom(0.5, t0);
        controller.note_zoom(1.6, t0 + Duration::from_millis(50));

        // Still inside the debounce window of the last event.
        assert_eq!(
            controller.poll(t0 + Duration::from_millis(120), 100, SNAPSHOT_NODES),
            LodAction::Idle
        );

        // After the window only the last zoom value settles.
        assert_eq!(
            controller.poll(t0 + Duration::from_millis(200), 100, SNAPSHOT_NODES),
            LodAction::Refilter {
                target_nodes: 1200,
                max_edges: 10000,
            }
        );
    }

    #[test]
    fn small_deltas_are_cosmetic_only() {
        let mut controller = LodController::new(LodConfig::default());
        // Target 600 vs 550 rendered: inside the 0.8..1.2 band.
        assert_eq!(settled(&mut controller, 0.8, 550), LodAction::Cosmetic);
        assert!(!controller.in_progress());
    }

    #[test]
    fn significant_shrink_triggers_refilter() {
        let mut controller = LodController::new(LodConfig::default());
        assert_eq!(
            settled(&mut controller, 0.2, 600),
            LodAction::Refilter {
                target_nodes: 100,
                max_edges: 200,
            }
        );
        assert!(controller.in_progress());
    }

    #[test]
    fn target_is_capped_by_snapshot_size() {
        let mut controller = LodController::new(LodConfig::default());
        let t0 = Instant::now();
        controller.note_zoom(1.6, t0);
        let action = controller.poll(t0 + Duration::from_millis(150), 10, 80);
        assert_eq!(
            action,
            LodAction::Refilter {
                target_nodes: 80,
                max_edges: 10000,
            }
        );
    }

    #[test]
    fn overlapping_requests_are_dropped_not_queued() {
        let mut controller = LodController::new(LodConfig::default());
        let mut refilter_count = 0;

        if let LodAction::Refilter { .. } = settled(&mut controller, 0.2, 600) {
            refilter_count += 1;
        }

        // A second settle while the first recomputation is in flight must
        // be a no-op rather than queueing more work.
        if let LodAction::Refilter { .. } = settled(&mut controller, 1.6, 600) {
            refilter_count += 1;
        }
        assert_eq!(refilter_count, 1);
        assert!(!controller.has_pending());

        // Once complete, the next settle is honored again.
        controller.complete();
        if let LodAction::Refilter { .. } = settled(&mut controller, 1.6, 600) {
            refilter_count += 1;
        }
        assert_eq!(refilter_count, 2);
    }

    #[test]
    fn empty_snapshot_never_refilters() {
        let mut controller = LodController::new(LodConfig::default());
        let t0 = Instant::now();
        controller.note_zoom(1.0, t0);
        assert_eq!(
            controller.poll(t0 + Duration::from_millis(150), 0, 0),
            LodAction::Idle
        );
    }
}
