//! Positions the visible subset of a [`FlowGraph`].
//!
//! The engine extracts visible nodes and edges, sizes them with
//! [`crate::footprint`], runs a [`LayoutAlgorithm`] inside a panic boundary
//! and writes the result back with [`FlowGraph::apply_positions`].
//!
//! Hidden nodes are parked next to their nearest visible ancestor so they
//! never spawn at the origin when revealed. Hidden nodes without a visible
//! ancestor keep the position they had.
//!
//! A rejected input or a panic inside the algorithm leaves every position
//! untouched and reports [`LayoutOutcome::Failed`]. Visibility state is
//! never rolled back.

#![forbid(unsafe_code)]

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use flowscope_core::{FlowGraph, Point};
use flowscope_layout::{
    Bounds, Direction, GraphLayout, LayeredGraph, LayoutConfig, LayoutError,
};
use tracing::{debug, debug_span, warn};

use crate::footprint::{DisplayOptions, footprint};

/// Distance along the flow between a hidden node and its visible ancestor.
pub const HIDDEN_OFFSET: f64 = 24.0;

/// Seam for the layered algorithm.
pub trait LayoutAlgorithm {
    fn run(
        &self,
        graph: &LayeredGraph,
        direction: Direction,
        config: &LayoutConfig,
    ) -> Result<GraphLayout, LayoutError>;
}

/// The default layered layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Layered;

impl LayoutAlgorithm for Layered {
    fn run(
        &self,
        graph: &LayeredGraph,
        direction: Direction,
        config: &LayoutConfig,
    ) -> Result<GraphLayout, LayoutError> {
        flowscope_layout::layout(graph, direction, config)
    }
}

/// Why a layout run left positions unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutFailure {
    Rejected(LayoutError),
    Panicked(String),
}

impl fmt::Display for LayoutFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(err) => write!(f, "layout rejected input: {err}"),
            Self::Panicked(msg) => write!(f, "layout panicked: {msg}"),
        }
    }
}

impl std::error::Error for LayoutFailure {}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutOutcome {
    Applied {
        nodes: usize,
        ranks: usize,
        crossings: usize,
        degraded: bool,
    },
    /// Nothing visible to lay out.
    Empty,
    Failed(LayoutFailure),
}

impl LayoutOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

pub struct LayoutEngine {
    config: LayoutConfig,
    display: DisplayOptions,
    algorithm: Box<dyn LayoutAlgorithm>,
    /// Waypoints from the last applied layout, indexed like the graph edges.
    routes: Vec<Option<Vec<(f64, f64)>>>,
    runs: u64,
    failures: u64,
}

impl fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("config", &self.config)
            .field("display", &self.display)
            .field("runs", &self.runs)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

impl LayoutEngine {
    #[must_use]
    pub fn new(config: LayoutConfig, display: DisplayOptions) -> Self {
        Self::with_algorithm(config, display, Box::new(Layered))
    }

    #[must_use]
    pub fn with_algorithm(
        config: LayoutConfig,
        display: DisplayOptions,
        algorithm: Box<dyn LayoutAlgorithm>,
    ) -> Self {
        Self {
            config,
            display,
            algorithm,
            routes: Vec::new(),
            runs: 0,
            failures: 0,
        }
    }

    #[must_use]
    pub fn display(&self) -> &DisplayOptions {
        &self.display
    }

    #[must_use]
    pub fn runs(&self) -> u64 {
        self.runs
    }

    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Waypoints of graph edge `edge_idx` from the last applied layout.
    #[must_use]
    pub fn route(&self, edge_idx: usize) -> Option<&[(f64, f64)]> {
        self.routes.get(edge_idx).and_then(|r| r.as_deref())
    }

    /// Forget routes from a previous graph.
    pub fn reset(&mut self) {
        self.routes.clear();
    }

    /// Bounding box of every visible node at its current position.
    #[must_use]
    pub fn visible_bounds(&self, graph: &FlowGraph) -> Option<Bounds> {
        Bounds::enclosing(graph.visible_nodes().map(|n| {
            let fp = footprint(n, &self.display);
            let p = n.position();
            (p.x, p.y, fp.width, fp.height)
        }))
    }

    /// Lay out the visible subset of `graph` in `direction`.
    pub fn apply(&mut self, graph: &mut FlowGraph, direction: Direction) -> LayoutOutcome {
        let _span = debug_span!(
            "flowscope.layout_engine",
            revision = graph.revision(),
            direction = direction.as_str()
        )
        .entered();
        self.runs += 1;

        let mut local = vec![usize::MAX; graph.len()];
        let mut members = Vec::new();
        let mut input = LayeredGraph::with_capacity(graph.visible_node_count(), graph.edges().len());
        for (idx, node) in graph.nodes().iter().enumerate() {
            if !node.is_hidden() {
                local[idx] = input.add_node(footprint(node, &self.display));
                members.push(idx);
            }
        }
        if members.is_empty() {
            debug!("no visible nodes");
            return LayoutOutcome::Empty;
        }
        let mut edge_map = Vec::new();
        for (e, edge) in graph.edges().iter().enumerate() {
            if edge.is_hidden() {
                continue;
            }
            if let Some((s, t)) = graph.edge_endpoints(e) {
                input.add_edge(local[s], local[t]);
                edge_map.push(e);
            }
        }

        let algorithm = &self.algorithm;
        let config = &self.config;
        let result = catch_unwind(AssertUnwindSafe(|| {
            algorithm.run(&input, direction, config)
        }));
        let out = match result {
            Ok(Ok(out)) => out,
            Ok(Err(err)) => return self.fail(LayoutFailure::Rejected(err)),
            Err(payload) => {
                let message = if let Some(s) = payload.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                return self.fail(LayoutFailure::Panicked(message));
            }
        };
        if out.nodes.len() != members.len() {
            return self.fail(LayoutFailure::Panicked(format!(
                "layout returned {} boxes for {} nodes",
                out.nodes.len(),
                members.len()
            )));
        }

        let mut positions: Vec<Point> = graph.nodes().iter().map(|n| n.position()).collect();
        for (b, &idx) in out.nodes.iter().zip(&members) {
            positions[idx] = Point::new(b.cx, b.cy);
        }
        park_hidden(graph, &mut positions, direction);
        graph.apply_positions(&positions);

        self.routes = vec![None; graph.edges().len()];
        for routed in &out.edges {
            if let Some(&e) = edge_map.get(routed.edge_idx) {
                self.routes[e] = Some(routed.waypoints.clone());
            }
        }

        debug!(
            nodes = members.len(),
            edges = edge_map.len(),
            ranks = out.ranks.len(),
            crossings = out.quality.crossings,
            degraded = out.degraded,
            "layout applied"
        );
        LayoutOutcome::Applied {
            nodes: members.len(),
            ranks: out.ranks.len(),
            crossings: out.quality.crossings,
            degraded: out.degraded,
        }
    }

    fn fail(&mut self, failure: LayoutFailure) -> LayoutOutcome {
        self.failures += 1;
        warn!(error = %failure, "layout failed; keeping previous positions");
        LayoutOutcome::Failed(failure)
    }
}

/// Place hidden nodes at nearest visible ancestor + offset along the flow.
fn park_hidden(graph: &FlowGraph, positions: &mut [Point], direction: Direction) {
    let (dx, dy) = match direction {
        Direction::TopBottom => (0.0, HIDDEN_OFFSET),
        Direction::LeftRight => (HIDDEN_OFFSET, 0.0),
    };
    let nodes = graph.nodes();
    for idx in 0..nodes.len() {
        if !nodes[idx].is_hidden() {
            continue;
        }
        let mut cursor = graph.parent_index(idx);
        while let Some(p) = cursor {
            if !nodes[p].is_hidden() {
                positions[idx] = positions[p].offset(dx, dy);
                break;
            }
            cursor = graph.parent_index(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowscope_core::source::{AgentSource, ToolSource, WorkflowSource};
    use flowscope_core::{transform, visibility};

    fn graph() -> FlowGraph {
        let agent = |id: &str| AgentSource {
            id: Some(id.into()),
            name: id.into(),
            tools: vec![ToolSource {
                id: Some(format!("{id}-tool")),
                name: "tool".into(),
                ..ToolSource::default()
            }],
            ..AgentSource::default()
        };
        let wf = WorkflowSource {
            id: Some("w".into()),
            name: "W".into(),
            agents: vec![agent("a1"), agent("a2")],
            ..WorkflowSource::default()
        };
        let mut g = transform(&[wf]).unwrap();
        visibility::initialize(&mut g);
        g
    }

    fn engine() -> LayoutEngine {
        LayoutEngine::new(LayoutConfig::default(), DisplayOptions::default())
    }

    struct Exploding;

    impl LayoutAlgorithm for Exploding {
        fn run(
            &self,
            _: &LayeredGraph,
            _: Direction,
            _: &LayoutConfig,
        ) -> Result<GraphLayout, LayoutError> {
            panic!("boom");
        }
    }

    struct Rejecting;

    impl LayoutAlgorithm for Rejecting {
        fn run(
            &self,
            _: &LayeredGraph,
            _: Direction,
            _: &LayoutConfig,
        ) -> Result<GraphLayout, LayoutError> {
            Err(LayoutError::InvalidSpacing {
                field: "node_spacing",
                value: -1.0,
            })
        }
    }

    #[test]
    fn lays_out_visible_children_in_next_rank() {
        let mut g = graph();
        visibility::toggle_node(&mut g, "w").unwrap();
        let outcome = engine().apply(&mut g, Direction::LeftRight);
        assert!(matches!(outcome, LayoutOutcome::Applied { nodes: 3, ranks: 2, .. }));
        let w = g.node("w").unwrap().position();
        let a1 = g.node("a1").unwrap().position();
        let a2 = g.node("a2").unwrap().position();
        assert!(a1.x > w.x && a2.x > w.x);
        assert_eq!(a1.x, a2.x);
        assert!(a1.y < a2.y);
    }

    #[test]
    fn hidden_nodes_parked_at_visible_ancestor() {
        let mut g = graph();
        visibility::toggle_node(&mut g, "w").unwrap();
        engine().apply(&mut g, Direction::TopBottom);
        let a1 = g.node("a1").unwrap().position();
        let tool = g.node("a1-tool").unwrap().position();
        assert_eq!(tool, a1.offset(0.0, HIDDEN_OFFSET));

        visibility::collapse_all(&mut g);
        engine().apply(&mut g, Direction::TopBottom);
        let w = g.node("w").unwrap().position();
        assert_eq!(g.node("a1").unwrap().position(), w.offset(0.0, HIDDEN_OFFSET));
        // two levels down still resolves to the workflow
        assert_eq!(
            g.node("a1-tool").unwrap().position(),
            w.offset(0.0, HIDDEN_OFFSET)
        );
    }

    #[test]
    fn panic_keeps_previous_positions() {
        let mut g = graph();
        visibility::toggle_node(&mut g, "w").unwrap();
        engine().apply(&mut g, Direction::LeftRight);
        let before: Vec<Point> = g.nodes().iter().map(|n| n.position()).collect();

        visibility::toggle_node(&mut g, "a1").unwrap();
        let mut broken = LayoutEngine::with_algorithm(
            LayoutConfig::default(),
            DisplayOptions::default(),
            Box::new(Exploding),
        );
        let outcome = broken.apply(&mut g, Direction::LeftRight);
        assert_eq!(
            outcome,
            LayoutOutcome::Failed(LayoutFailure::Panicked("boom".into()))
        );
        let after: Vec<Point> = g.nodes().iter().map(|n| n.position()).collect();
        assert_eq!(before, after);
        // the toggle itself still stands
        assert!(!g.node("a1-tool").unwrap().is_hidden());
        assert_eq!(broken.failures(), 1);
    }

    #[test]
    fn rejected_input_is_reported() {
        let mut g = graph();
        let mut e = LayoutEngine::with_algorithm(
            LayoutConfig::default(),
            DisplayOptions::default(),
            Box::new(Rejecting),
        );
        assert!(matches!(
            e.apply(&mut g, Direction::TopBottom),
            LayoutOutcome::Failed(LayoutFailure::Rejected(_))
        ));
    }

    #[test]
    fn empty_visible_set_is_not_a_failure() {
        let mut g = FlowGraph::default();
        assert_eq!(engine().apply(&mut g, Direction::TopBottom), LayoutOutcome::Empty);
    }

    #[test]
    fn same_visible_set_gives_same_positions() {
        let mut a = graph();
        let mut b = graph();
        visibility::expand_all(&mut a);
        visibility::expand_all(&mut b);
        engine().apply(&mut a, Direction::LeftRight);
        engine().apply(&mut b, Direction::LeftRight);
        let pa: Vec<Point> = a.nodes().iter().map(|n| n.position()).collect();
        let pb: Vec<Point> = b.nodes().iter().map(|n| n.position()).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn routes_recorded_for_visible_edges_only() {
        let mut g = graph();
        visibility::toggle_node(&mut g, "w").unwrap();
        let mut e = engine();
        e.apply(&mut g, Direction::TopBottom);
        for (i, edge) in g.edges().iter().enumerate() {
            assert_eq!(e.route(i).is_some(), !edge.is_hidden(), "{}", edge.id());
        }
    }

    #[test]
    fn visible_bounds_cover_visible_nodes() {
        let mut g = graph();
        visibility::toggle_node(&mut g, "w").unwrap();
        let e = engine();
        let mut e2 = engine();
        e2.apply(&mut g, Direction::TopBottom);
        let b = e.visible_bounds(&g).unwrap();
        for n in g.visible_nodes() {
            let p = n.position();
            assert!(p.x >= b.min_x && p.x <= b.max_x);
            assert!(p.y >= b.min_y && p.y <= b.max_y);
        }
    }
}
