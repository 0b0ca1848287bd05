//! The command surface: one writer owning graph, layout and viewport.
//!
//! Every graph transaction (load, toggle, expand all, collapse all,
//! direction change) runs to completion synchronously, bumps the session
//! generation and queues a deferred layout. Layout runs and viewport fits
//! happen in [`FlowSession::tick_at`] (or [`FlowSession::flush`]); a task
//! stamped with an older generation than the current one is discarded
//! when it comes due.
//!
//! # Fit rules
//!
//! - Auto-fit on: every applied layout queues a fit after `settle_delay`.
//! - Auto-fit off: layouts never move the viewport.
//! - `reset_view` always fits. If a layout is pending it fits after that
//!   layout lands, otherwise immediately.

#![forbid(unsafe_code)]

use std::fmt;
use std::time::Instant;

use flowscope_core::{
    FlowGraph, TransformError, VisibilityError, VisibilityReport, WorkflowSource,
    parse_workflows, transform, visibility,
};
use flowscope_layout::Direction;
use tracing::{debug, info, warn};

use crate::config::FlowConfig;
use crate::footprint::footprint;
use crate::layout_engine::{LayoutEngine, LayoutOutcome};
use crate::scheduler::{DeferredQueue, DeferredTask, TaskKind};
use crate::snapshot::{EdgeView, GraphSnapshot, NodeView};
use crate::viewport::{CanvasSize, Viewport, ViewportController};

/// Callback invoked on fatal transform failures.
pub type ErrorCallback = Box<dyn FnMut(&TransformError)>;

/// What one tick or flush did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub layouts_run: usize,
    pub fits_run: usize,
    /// Tasks dropped because a newer transaction superseded them.
    pub discarded: usize,
    pub layout_failures: usize,
}

pub struct FlowSession {
    config: FlowConfig,
    graph: FlowGraph,
    engine: LayoutEngine,
    viewport: ViewportController,
    queue: DeferredQueue,
    direction: Direction,
    generation: u64,
    pending_forced_fit: bool,
    on_error: Option<ErrorCallback>,
}

impl fmt::Debug for FlowSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowSession")
            .field("direction", &self.direction)
            .field("generation", &self.generation)
            .field("nodes", &self.graph.len())
            .field("pending", &self.queue.len())
            .field("pending_forced_fit", &self.pending_forced_fit)
            .finish_non_exhaustive()
    }
}

impl Default for FlowSession {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

impl FlowSession {
    #[must_use]
    pub fn new(config: FlowConfig) -> Self {
        let engine = LayoutEngine::new(config.layout.clone(), config.display);
        Self::with_engine(config, engine)
    }

    /// Use a custom layout engine (e.g. another [`crate::LayoutAlgorithm`]).
    #[must_use]
    pub fn with_engine(config: FlowConfig, engine: LayoutEngine) -> Self {
        if let Err(errors) = config.validate() {
            warn!(count = errors.len(), "session built from an invalid config");
        }
        let viewport = ViewportController::new(config.viewport.clone(), config.auto_fit);
        Self {
            direction: config.direction,
            config,
            graph: FlowGraph::default(),
            engine,
            viewport,
            queue: DeferredQueue::new(),
            generation: 0,
            pending_forced_fit: false,
            on_error: None,
        }
    }

    // -- accessors --

    #[must_use]
    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    #[must_use]
    pub fn engine(&self) -> &LayoutEngine {
        &self.engine
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport.viewport()
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn auto_fit(&self) -> bool {
        self.viewport.auto_fit()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_layout_pending(&self) -> bool {
        self.queue.has_pending(TaskKind::Layout)
    }

    /// When the next deferred task comes due, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.next_due()
    }

    /// Register the fatal-error callback, replacing any previous one.
    pub fn on_error(&mut self, callback: impl FnMut(&TransformError) + 'static) {
        self.on_error = Some(Box::new(callback));
    }

    // -- graph transactions --

    /// Replace the graph with one built from `workflows`.
    ///
    /// On failure the graph is cleared, the error callback runs and the
    /// error is returned.
    pub fn load(&mut self, workflows: &[WorkflowSource]) -> Result<VisibilityReport, TransformError> {
        self.load_at(workflows, Instant::now())
    }

    pub fn load_at(
        &mut self,
        workflows: &[WorkflowSource],
        now: Instant,
    ) -> Result<VisibilityReport, TransformError> {
        match transform(workflows) {
            Ok(graph) => Ok(self.install(graph, now)),
            Err(err) => Err(self.fail_load(err)),
        }
    }

    /// Parse and load a JSON payload.
    pub fn load_json(&mut self, json: &str) -> Result<VisibilityReport, TransformError> {
        self.load_json_at(json, Instant::now())
    }

    pub fn load_json_at(
        &mut self,
        json: &str,
        now: Instant,
    ) -> Result<VisibilityReport, TransformError> {
        match parse_workflows(json) {
            Ok(workflows) => self.load_at(&workflows, now),
            Err(err) => Err(self.fail_load(err)),
        }
    }

    fn install(&mut self, mut graph: FlowGraph, now: Instant) -> VisibilityReport {
        let report = visibility::initialize(&mut graph);
        info!(
            nodes = graph.len(),
            edges = graph.edges().len(),
            visible = report.visible_nodes,
            "graph loaded"
        );
        self.graph = graph;
        self.engine.reset();
        self.queue.clear();
        self.commit(now);
        report
    }

    fn fail_load(&mut self, err: TransformError) -> TransformError {
        warn!(error = %err, "transform failed; graph cleared");
        self.reset_graph();
        if let Some(callback) = self.on_error.as_mut() {
            callback(&err);
        }
        err
    }

    /// Drop the graph and all pending work (refresh / disconnect).
    pub fn clear(&mut self) {
        self.reset_graph();
        debug!(generation = self.generation, "session cleared");
    }

    fn reset_graph(&mut self) {
        self.graph = FlowGraph::default();
        self.engine.reset();
        self.queue.clear();
        self.pending_forced_fit = false;
        self.generation += 1;
    }

    pub fn toggle_node(&mut self, id: &str) -> Result<VisibilityReport, VisibilityError> {
        self.toggle_node_at(id, Instant::now())
    }

    /// Rejected toggles leave the session untouched.
    pub fn toggle_node_at(
        &mut self,
        id: &str,
        now: Instant,
    ) -> Result<VisibilityReport, VisibilityError> {
        let report = visibility::toggle_node(&mut self.graph, id)?;
        if report.changed {
            self.commit(now);
        }
        Ok(report)
    }

    pub fn expand_all(&mut self) -> VisibilityReport {
        self.expand_all_at(Instant::now())
    }

    pub fn expand_all_at(&mut self, now: Instant) -> VisibilityReport {
        let report = visibility::expand_all(&mut self.graph);
        if report.changed {
            self.commit(now);
        }
        report
    }

    pub fn collapse_all(&mut self) -> VisibilityReport {
        self.collapse_all_at(Instant::now())
    }

    pub fn collapse_all_at(&mut self, now: Instant) -> VisibilityReport {
        let report = visibility::collapse_all(&mut self.graph);
        if report.changed {
            self.commit(now);
        }
        report
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.set_direction_at(direction, Instant::now());
    }

    pub fn set_direction_at(&mut self, direction: Direction, now: Instant) {
        if direction == self.direction {
            return;
        }
        self.direction = direction;
        debug!(direction = direction.as_str(), "direction changed");
        self.commit(now);
    }

    /// New generation plus a deferred layout.
    fn commit(&mut self, now: Instant) {
        self.generation += 1;
        self.queue
            .schedule(TaskKind::Layout, self.generation, now + self.config.layout_delay);
    }

    // -- viewport commands --

    pub fn set_auto_fit(&mut self, enabled: bool) {
        self.viewport.set_auto_fit(enabled);
    }

    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.viewport.set_canvas_size(CanvasSize::new(width, height));
    }

    /// Manual pan/zoom from the host.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport.set_viewport(viewport);
    }

    /// Fit the view regardless of the auto-fit setting.
    ///
    /// Returns `true` if the viewport was fitted right away, `false` if the
    /// fit waits for a pending layout (or there is nothing to frame).
    pub fn reset_view(&mut self) -> bool {
        if self.is_layout_pending() {
            self.pending_forced_fit = true;
            debug!("reset view deferred until pending layout lands");
            return false;
        }
        let bounds = self.engine.visible_bounds(&self.graph);
        self.viewport.fit(bounds)
    }

    // -- deferred work --

    pub fn tick(&mut self) -> TickReport {
        self.tick_at(Instant::now())
    }

    /// Run every task due at `now`, including tasks those tasks schedule
    /// with zero delay.
    pub fn tick_at(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        loop {
            let due = self.queue.take_due(now);
            if due.is_empty() {
                break;
            }
            for task in due {
                self.run_task(task, now, &mut report);
            }
        }
        report
    }

    /// Run all pending work now, ignoring due times.
    pub fn flush(&mut self) -> TickReport {
        let now = Instant::now();
        let mut report = TickReport::default();
        loop {
            let all = self.queue.drain_all();
            if all.is_empty() {
                break;
            }
            for task in all {
                self.run_task(task, now, &mut report);
            }
        }
        report
    }

    fn run_task(&mut self, task: DeferredTask, now: Instant, report: &mut TickReport) {
        if task.generation < self.generation {
            report.discarded += 1;
            debug!(
                task = task.kind.as_str(),
                stamped = task.generation,
                current = self.generation,
                "stale task discarded"
            );
            return;
        }
        match task.kind {
            TaskKind::Layout => {
                report.layouts_run += 1;
                match self.engine.apply(&mut self.graph, self.direction) {
                    LayoutOutcome::Applied { .. } => {
                        if self.viewport.auto_fit() || self.pending_forced_fit {
                            self.queue.schedule(
                                TaskKind::FitView {
                                    forced: self.pending_forced_fit,
                                },
                                task.generation,
                                now + self.config.settle_delay,
                            );
                        }
                    }
                    LayoutOutcome::Empty => {
                        self.pending_forced_fit = false;
                    }
                    LayoutOutcome::Failed(_) => {
                        report.layout_failures += 1;
                        if self.pending_forced_fit {
                            self.queue.schedule(
                                TaskKind::FitView { forced: true },
                                task.generation,
                                now,
                            );
                        }
                    }
                }
            }
            TaskKind::FitView { forced } => {
                let forced = forced || self.pending_forced_fit;
                if forced || self.viewport.auto_fit() {
                    let bounds = self.engine.visible_bounds(&self.graph);
                    self.viewport.fit(bounds);
                    report.fits_run += 1;
                    if forced {
                        self.pending_forced_fit = false;
                    }
                }
            }
        }
    }

    // -- snapshot --

    /// Serializable view of the current state.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        let display = self.engine.display();
        let nodes = self
            .graph
            .nodes()
            .iter()
            .map(|n| {
                let fp = footprint(n, display);
                NodeView {
                    id: n.id().to_string(),
                    kind: n.kind(),
                    label: n.label().to_string(),
                    level: n.level(),
                    parent: n.parent().map(ToString::to_string),
                    hidden: n.is_hidden(),
                    collapsed: n.collapsed(),
                    has_toggle: n.has_toggle(),
                    children_count: n.children_count(),
                    position: n.position(),
                    width: fp.width,
                    height: fp.height,
                    details: n.details().clone(),
                    raw: n.raw().clone(),
                }
            })
            .collect();
        let edges = self
            .graph
            .edges()
            .iter()
            .enumerate()
            .map(|(i, e)| EdgeView {
                id: e.id().to_string(),
                source: e.source().to_string(),
                target: e.target().to_string(),
                relationship: e.relationship(),
                hidden: e.is_hidden(),
                waypoints: if e.is_hidden() {
                    Vec::new()
                } else {
                    self.engine.route(i).map(<[_]>::to_vec).unwrap_or_default()
                },
            })
            .collect();

        GraphSnapshot {
            generation: self.generation,
            revision: self.graph.revision(),
            direction: self.direction,
            auto_fit: self.viewport.auto_fit(),
            viewport: self.viewport.viewport(),
            canvas: self.viewport.canvas(),
            layout_pending: self.is_layout_pending(),
            nodes,
            edges,
        }
    }
}
