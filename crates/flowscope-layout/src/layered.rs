//! Layered (Sugiyama) layout with per-node footprints.
//!
//! Fully deterministic: the same graph, direction and config always give
//! the same ranks, the same order within each rank and the same
//! coordinates. No RNG, no hash iteration.
//!
//! # Pipeline
//! 1. Cycle removal (greedy source/sink peeling)
//! 2. Rank assignment (longest path over a topological order)
//! 3. Crossing minimisation (alternating barycenter sweeps, best kept)
//! 4. Coordinate assignment in rank space (breadth × depth), then a remap
//!    to screen axes for the requested [`Direction`]
//! 5. Straight boundary-clipped edge routing, quality metrics and bounds
//!
//! Every phase draws from one shared iteration budget. When it runs out the
//! remaining phases fall back to their cheapest valid behaviour and the
//! result is flagged `degraded`.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Flow direction of the ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Ranks stacked top to bottom.
    #[default]
    #[serde(rename = "tb")]
    TopBottom,
    /// Ranks laid out left to right.
    #[serde(rename = "lr")]
    LeftRight,
}

impl Direction {
    /// Parse `tb`/`td`/`top-bottom` or `lr`/`left-right` (case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tb" | "td" | "top-bottom" | "topbottom" => Some(Self::TopBottom),
            "lr" | "left-right" | "leftright" => Some(Self::LeftRight),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TopBottom => "tb",
            Self::LeftRight => "lr",
        }
    }

    /// Size of a footprint along the rank (perpendicular to flow).
    fn breadth(self, fp: Footprint) -> f64 {
        match self {
            Self::TopBottom => fp.width,
            Self::LeftRight => fp.height,
        }
    }

    /// Size of a footprint along the flow.
    fn depth(self, fp: Footprint) -> f64 {
        match self {
            Self::TopBottom => fp.height,
            Self::LeftRight => fp.width,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Width and height a node occupies, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub width: f64,
    pub height: f64,
}

impl Footprint {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    fn is_valid(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Index-based input graph.
#[derive(Debug, Clone, Default)]
pub struct LayeredGraph {
    footprints: Vec<Footprint>,
    edges: Vec<(usize, usize)>,
}

impl LayeredGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            footprints: Vec::with_capacity(nodes),
            edges: Vec::with_capacity(edges),
        }
    }

    /// Add a node and return its index.
    pub fn add_node(&mut self, footprint: Footprint) -> usize {
        self.footprints.push(footprint);
        self.footprints.len() - 1
    }

    /// Add a directed edge. Endpoints are validated by [`layout`].
    pub fn add_edge(&mut self, from: usize, to: usize) {
        self.edges.push((from, to));
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.footprints.len()
    }

    #[must_use]
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    #[must_use]
    pub fn footprints(&self) -> &[Footprint] {
        &self.footprints
    }
}

/// Configuration knobs for the layout engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Gap between neighbouring nodes within a rank.
    pub node_spacing: f64,
    /// Gap between consecutive ranks.
    pub rank_separation: f64,
    pub max_crossing_iterations: usize,
    /// Shared work budget across all phases.
    pub iteration_budget: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 30.0,
            rank_separation: 60.0,
            max_crossing_iterations: 24,
            iteration_budget: 10_000,
        }
    }
}

/// Rejected layout input.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    DanglingEdge {
        edge: usize,
        from: usize,
        to: usize,
        nodes: usize,
    },
    InvalidFootprint {
        node: usize,
        width: f64,
        height: f64,
    },
    InvalidSpacing {
        field: &'static str,
        value: f64,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingEdge {
                edge,
                from,
                to,
                nodes,
            } => write!(
                f,
                "edge {edge} ({from}->{to}) references a node outside 0..{nodes}"
            ),
            Self::InvalidFootprint {
                node,
                width,
                height,
            } => write!(f, "node {node} has invalid footprint {width}x{height}"),
            Self::InvalidSpacing { field, value } => {
                write!(f, "{field}={value} (must be finite and non-negative)")
            }
        }
    }
}

impl std::error::Error for LayoutError {}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// A positioned node. Coordinates are the node centre.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBox {
    pub index: usize,
    pub cx: f64,
    pub cy: f64,
    pub width: f64,
    pub height: f64,
    pub rank: usize,
    /// Position within its rank after crossing minimisation.
    pub order: usize,
}

impl NodeBox {
    #[must_use]
    pub fn left(&self) -> f64 {
        self.cx - self.width / 2.0
    }
    #[must_use]
    pub fn right(&self) -> f64 {
        self.cx + self.width / 2.0
    }
    #[must_use]
    pub fn top(&self) -> f64 {
        self.cy - self.height / 2.0
    }
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.cy + self.height / 2.0
    }

    #[must_use]
    pub fn overlaps(&self, other: &NodeBox) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }
}

/// A routed edge as a polyline from boundary to boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEdge {
    pub edge_idx: usize,
    pub from: usize,
    pub to: usize,
    pub waypoints: Vec<(f64, f64)>,
    /// The edge was flipped during cycle removal.
    pub reversed: bool,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Smallest box enclosing every `(cx, cy, width, height)` rectangle.
    /// `None` when the iterator is empty.
    pub fn enclosing(rects: impl IntoIterator<Item = (f64, f64, f64, f64)>) -> Option<Self> {
        let mut out: Option<Self> = None;
        for (cx, cy, w, h) in rects {
            let (l, t, r, b) = (cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0);
            out = Some(match out {
                None => Self {
                    min_x: l,
                    min_y: t,
                    max_x: r,
                    max_y: b,
                },
                Some(acc) => Self {
                    min_x: acc.min_x.min(l),
                    min_y: acc.min_y.min(t),
                    max_x: acc.max_x.max(r),
                    max_y: acc.max_y.max(b),
                },
            });
        }
        out
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Quality metrics for a layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutQuality {
    pub crossings: usize,
    /// Mean per-rank variance of breadth positions.
    pub variance: f64,
}

/// Complete layout result.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphLayout {
    pub direction: Direction,
    /// One box per input node, indexed like the input.
    pub nodes: Vec<NodeBox>,
    pub edges: Vec<RoutedEdge>,
    /// Node indices per rank, in final order.
    pub ranks: Vec<Vec<usize>>,
    /// `None` for an empty graph.
    pub bounds: Option<Bounds>,
    pub quality: LayoutQuality,
    /// The iteration budget ran out before every phase finished.
    pub degraded: bool,
}

// ---------------------------------------------------------------------------
// Working graph
// ---------------------------------------------------------------------------

struct WorkGraph {
    n: usize,
    adj: Vec<Vec<usize>>,
    radj: Vec<Vec<usize>>,
}

impl WorkGraph {
    fn new(n: usize, edges: &[(usize, usize)]) -> Self {
        let mut adj = vec![Vec::new(); n];
        let mut radj = vec![Vec::new(); n];
        for &(u, v) in edges {
            adj[u].push(v);
            radj[v].push(u);
        }
        Self { n, adj, radj }
    }
}

/// Work budget shared by every phase.
#[derive(Debug)]
struct Budget {
    left: usize,
    /// Some phase wanted another step after `left` hit zero.
    exhausted: bool,
}

impl Budget {
    fn new(left: usize) -> Self {
        Self {
            left,
            exhausted: false,
        }
    }

    /// Take one step. Returns `false` and marks the budget exhausted when
    /// nothing is left.
    fn spend(&mut self) -> bool {
        if self.left == 0 {
            self.exhausted = true;
            return false;
        }
        self.left -= 1;
        true
    }

    /// Account for work that runs to completion regardless.
    fn charge(&mut self) {
        self.left = self.left.saturating_sub(1);
    }
}

fn validate(graph: &LayeredGraph, config: &LayoutConfig) -> Result<(), LayoutError> {
    for (field, value) in [
        ("node_spacing", config.node_spacing),
        ("rank_separation", config.rank_separation),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(LayoutError::InvalidSpacing { field, value });
        }
    }
    if let Some((node, fp)) = graph
        .footprints
        .iter()
        .enumerate()
        .find(|(_, fp)| !fp.is_valid())
    {
        return Err(LayoutError::InvalidFootprint {
            node,
            width: fp.width,
            height: fp.height,
        });
    }
    let nodes = graph.footprints.len();
    if let Some((edge, &(from, to))) = graph
        .edges
        .iter()
        .enumerate()
        .find(|(_, (u, v))| *u >= nodes || *v >= nodes)
    {
        return Err(LayoutError::DanglingEdge {
            edge,
            from,
            to,
            nodes,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Phase 1: cycle removal
// ---------------------------------------------------------------------------

/// Reorient edges against a greedy linear order so the graph is acyclic.
/// Returns the original `(u, v)` pairs that were flipped. Self-loops are
/// dropped from the working graph.
fn remove_cycles(graph: &mut WorkGraph, budget: &mut Budget) -> HashSet<(usize, usize)> {
    let n = graph.n;
    let mut in_deg = vec![0usize; n];
    let mut out_deg = vec![0usize; n];
    for (u, targets) in graph.adj.iter().enumerate() {
        for &v in targets.iter().filter(|&&v| v != u) {
            out_deg[u] += 1;
            in_deg[v] += 1;
        }
    }

    let mut removed = vec![false; n];
    let mut head: Vec<usize> = Vec::new();
    let mut tail: Vec<usize> = Vec::new();
    let mut remaining = n;

    let detach = |v: usize, removed: &[bool], in_deg: &mut [usize], out_deg: &mut [usize]| {
        for &w in graph.adj[v].iter().filter(|&&w| w != v && !removed[w]) {
            in_deg[w] = in_deg[w].saturating_sub(1);
        }
        for &u in graph.radj[v].iter().filter(|&&u| u != v && !removed[u]) {
            out_deg[u] = out_deg[u].saturating_sub(1);
        }
    };

    while remaining > 0 && budget.spend() {
        let mut progress = false;

        for v in 0..n {
            if !removed[v] && out_deg[v] == 0 {
                removed[v] = true;
                remaining -= 1;
                tail.push(v);
                detach(v, &removed, &mut in_deg, &mut out_deg);
                progress = true;
            }
        }
        for v in 0..n {
            if !removed[v] && in_deg[v] == 0 {
                removed[v] = true;
                remaining -= 1;
                head.push(v);
                detach(v, &removed, &mut in_deg, &mut out_deg);
                progress = true;
            }
        }

        if !progress {
            // Largest out-minus-in degree goes first; lowest index wins ties.
            let pick = (0..n).filter(|&v| !removed[v]).max_by(|&a, &b| {
                let da = out_deg[a] as isize - in_deg[a] as isize;
                let db = out_deg[b] as isize - in_deg[b] as isize;
                da.cmp(&db).then_with(|| b.cmp(&a))
            });
            if let Some(v) = pick {
                removed[v] = true;
                remaining -= 1;
                head.push(v);
                detach(v, &removed, &mut in_deg, &mut out_deg);
            }
        }
    }

    tail.reverse();
    head.extend(tail);
    head.extend((0..n).filter(|&v| !removed[v]));

    let mut pos = vec![0usize; n];
    for (i, &v) in head.iter().enumerate() {
        pos[v] = i;
    }

    let mut flipped = HashSet::new();
    let mut adj = vec![Vec::new(); n];
    let mut radj = vec![Vec::new(); n];
    for u in 0..n {
        for &v in &graph.adj[u] {
            if u == v {
                continue;
            }
            let (a, b) = if pos[u] > pos[v] {
                flipped.insert((u, v));
                (v, u)
            } else {
                (u, v)
            };
            adj[a].push(b);
            radj[b].push(a);
        }
    }
    graph.adj = adj;
    graph.radj = radj;
    flipped
}

// ---------------------------------------------------------------------------
// Phase 2: rank assignment
// ---------------------------------------------------------------------------

fn assign_ranks(graph: &WorkGraph, budget: &mut Budget) -> Vec<usize> {
    let n = graph.n;
    let mut in_deg = vec![0usize; n];
    for targets in &graph.adj {
        for &v in targets {
            in_deg[v] += 1;
        }
    }

    // Kahn's algorithm with a sorted frontier for determinism.
    let mut frontier: Vec<usize> = (0..n).filter(|&v| in_deg[v] == 0).collect();
    let mut topo = Vec::with_capacity(n);
    let mut seen = vec![false; n];
    while !frontier.is_empty() && budget.spend() {
        let u = frontier.remove(0);
        topo.push(u);
        seen[u] = true;
        for &v in &graph.adj[u] {
            in_deg[v] -= 1;
            if in_deg[v] == 0 {
                let at = frontier.partition_point(|&x| x < v);
                frontier.insert(at, v);
            }
        }
    }
    topo.extend((0..n).filter(|&v| !seen[v]));

    // Longest path. One pass suffices for a full topological order; a
    // budget-cut order needs the fixpoint loop.
    let mut rank = vec![0usize; n];
    let mut changed = true;
    while changed {
        changed = false;
        for &u in &topo {
            for &v in &graph.adj[u] {
                if rank[v] <= rank[u] {
                    rank[v] = rank[u] + 1;
                    changed = true;
                }
            }
        }
    }
    rank
}

// ---------------------------------------------------------------------------
// Phase 3: crossing minimisation
// ---------------------------------------------------------------------------

fn count_crossings(ranks: &[Vec<usize>], adj: &[Vec<usize>], n: usize) -> usize {
    let mut pos = vec![usize::MAX; n];
    let mut crossings = 0;
    for pair in ranks.windows(2) {
        let (upper, lower) = (&pair[0], &pair[1]);
        for (p, &v) in lower.iter().enumerate() {
            pos[v] = p;
        }
        let mut segments: Vec<(usize, usize)> = Vec::new();
        for (pa, &u) in upper.iter().enumerate() {
            for &v in &adj[u] {
                if pos[v] != usize::MAX {
                    segments.push((pa, pos[v]));
                }
            }
        }
        for i in 0..segments.len() {
            for j in (i + 1)..segments.len() {
                let (a1, b1) = segments[i];
                let (a2, b2) = segments[j];
                if (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2) {
                    crossings += 1;
                }
            }
        }
        for &v in lower {
            pos[v] = usize::MAX;
        }
    }
    crossings
}

fn minimize_crossings(
    rank_of: &[usize],
    graph: &WorkGraph,
    max_iterations: usize,
    budget: &mut Budget,
) -> Vec<Vec<usize>> {
    let rank_count = rank_of.iter().copied().max().map_or(0, |m| m + 1);
    let mut ranks: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
    // Ascending index order within each rank to start.
    for (v, &r) in rank_of.iter().enumerate() {
        ranks[r].push(v);
    }

    let mut best = ranks.clone();
    let mut best_crossings = count_crossings(&ranks, &graph.adj, graph.n);

    for iter in 0..max_iterations {
        if best_crossings == 0 || !budget.spend() {
            break;
        }
        if iter % 2 == 0 {
            for r in 1..rank_count {
                barycenter_sort(&mut ranks, r, r - 1, &graph.radj, graph.n, budget);
            }
        } else {
            for r in (0..rank_count.saturating_sub(1)).rev() {
                barycenter_sort(&mut ranks, r, r + 1, &graph.adj, graph.n, budget);
            }
        }
        let c = count_crossings(&ranks, &graph.adj, graph.n);
        if c < best_crossings {
            best_crossings = c;
            best = ranks.clone();
        }
    }
    best
}

/// Reorder `ranks[target]` by the mean position of each node's neighbours
/// in `ranks[reference]`. Nodes without such neighbours sink to the end;
/// ties keep index order.
fn barycenter_sort(
    ranks: &mut [Vec<usize>],
    target: usize,
    reference: usize,
    neighbours: &[Vec<usize>],
    n: usize,
    budget: &mut Budget,
) {
    let mut ref_pos = vec![usize::MAX; n];
    for (p, &v) in ranks[reference].iter().enumerate() {
        ref_pos[v] = p;
    }

    let mut keyed: Vec<(usize, f64)> = ranks[target]
        .iter()
        .map(|&v| {
            budget.charge();
            let (sum, count) = neighbours[v]
                .iter()
                .filter(|&&u| ref_pos[u] != usize::MAX)
                .fold((0.0, 0usize), |(s, c), &u| (s + ref_pos[u] as f64, c + 1));
            let key = if count == 0 {
                f64::MAX
            } else {
                sum / count as f64
            };
            (v, key)
        })
        .collect();
    keyed.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    ranks[target] = keyed.into_iter().map(|(v, _)| v).collect();
}

// ---------------------------------------------------------------------------
// Phase 4: coordinates in rank space
// ---------------------------------------------------------------------------

/// Returns `(breadth, depth)` centre coordinates per node.
fn assign_coordinates(
    ranks: &[Vec<usize>],
    graph: &WorkGraph,
    breadths: &[f64],
    depths: &[f64],
    config: &LayoutConfig,
    budget: &mut Budget,
) -> (Vec<f64>, Vec<f64>) {
    let mut along = vec![0.0f64; graph.n];
    let mut across = vec![0.0f64; graph.n];

    // Rank thickness is the deepest footprint it holds.
    let mut offset = 0.0;
    for (r, rank) in ranks.iter().enumerate() {
        let thickness = rank.iter().map(|&v| depths[v]).fold(0.0, f64::max);
        if r > 0 {
            offset += config.rank_separation;
        }
        let centre = offset + thickness / 2.0;
        offset += thickness;

        let total: f64 = rank.iter().map(|&v| breadths[v]).sum::<f64>()
            + rank.len().saturating_sub(1) as f64 * config.node_spacing;
        let mut cursor = -total / 2.0;
        for &v in rank {
            along[v] = cursor + breadths[v] / 2.0;
            across[v] = centre;
            cursor += breadths[v] + config.node_spacing;
        }
    }

    let passes = 4.min(config.max_crossing_iterations);
    for _ in 0..passes {
        if !budget.spend() {
            break;
        }

        // Pull each node halfway towards the median of its neighbours.
        for rank in ranks {
            for &v in rank {
                let mut near: Vec<f64> = graph.adj[v]
                    .iter()
                    .chain(&graph.radj[v])
                    .map(|&u| along[u])
                    .collect();
                if near.is_empty() {
                    continue;
                }
                near.sort_by(f64::total_cmp);
                along[v] = (along[v] + near[near.len() / 2]) / 2.0;
            }
        }

        // Restore minimum gaps, keeping the minimised order.
        for rank in ranks {
            for pair in rank.windows(2) {
                let (prev, curr) = (pair[0], pair[1]);
                let min_gap = (breadths[prev] + breadths[curr]) / 2.0 + config.node_spacing;
                if along[curr] - along[prev] < min_gap {
                    along[curr] = along[prev] + min_gap;
                }
            }
        }
    }

    (along, across)
}

// ---------------------------------------------------------------------------
// Phase 5: routing and metrics
// ---------------------------------------------------------------------------

fn clip_to_boundary(cx: f64, cy: f64, w: f64, h: f64, toward_x: f64, toward_y: f64) -> (f64, f64) {
    let dx = toward_x - cx;
    let dy = toward_y - cy;
    if dx.abs() < 1e-12 && dy.abs() < 1e-12 {
        return (cx, cy);
    }
    let sx = if dx.abs() > 1e-12 {
        (w / 2.0) / dx.abs()
    } else {
        f64::INFINITY
    };
    let sy = if dy.abs() > 1e-12 {
        (h / 2.0) / dy.abs()
    } else {
        f64::INFINITY
    };
    let s = sx.min(sy).min(1.0);
    (cx + dx * s, cy + dy * s)
}

fn route_edges(
    edges: &[(usize, usize)],
    boxes: &[NodeBox],
    flipped: &HashSet<(usize, usize)>,
) -> Vec<RoutedEdge> {
    edges
        .iter()
        .enumerate()
        .map(|(edge_idx, &(from, to))| {
            let (a, b) = (&boxes[from], &boxes[to]);
            let start = clip_to_boundary(a.cx, a.cy, a.width, a.height, b.cx, b.cy);
            let end = clip_to_boundary(b.cx, b.cy, b.width, b.height, a.cx, a.cy);
            RoutedEdge {
                edge_idx,
                from,
                to,
                waypoints: vec![start, end],
                reversed: flipped.contains(&(from, to)),
            }
        })
        .collect()
}

fn breadth_variance(ranks: &[Vec<usize>], along: &[f64]) -> f64 {
    let per_rank: Vec<f64> = ranks
        .iter()
        .filter(|rank| rank.len() > 1)
        .map(|rank| {
            let len = rank.len() as f64;
            let mean = rank.iter().map(|&v| along[v]).sum::<f64>() / len;
            rank.iter().map(|&v| (along[v] - mean).powi(2)).sum::<f64>() / len
        })
        .collect();
    if per_rank.is_empty() {
        0.0
    } else {
        per_rank.iter().sum::<f64>() / per_rank.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Lay out `graph` in `direction`.
pub fn layout(
    graph: &LayeredGraph,
    direction: Direction,
    config: &LayoutConfig,
) -> Result<GraphLayout, LayoutError> {
    validate(graph, config)?;
    let n = graph.node_count();
    let _span = debug_span!(
        "flowscope.layout",
        nodes = n,
        edges = graph.edges.len(),
        direction = direction.as_str()
    )
    .entered();

    if n == 0 {
        return Ok(GraphLayout {
            direction,
            nodes: Vec::new(),
            edges: Vec::new(),
            ranks: Vec::new(),
            bounds: None,
            quality: LayoutQuality::default(),
            degraded: false,
        });
    }

    let mut budget = Budget::new(config.iteration_budget);
    let mut work = WorkGraph::new(n, &graph.edges);

    let flipped = remove_cycles(&mut work, &mut budget);
    let rank_of = assign_ranks(&work, &mut budget);
    let ranks = minimize_crossings(
        &rank_of,
        &work,
        config.max_crossing_iterations,
        &mut budget,
    );

    let breadths: Vec<f64> = graph
        .footprints
        .iter()
        .map(|&fp| direction.breadth(fp))
        .collect();
    let depths: Vec<f64> = graph
        .footprints
        .iter()
        .map(|&fp| direction.depth(fp))
        .collect();
    let (along, across) =
        assign_coordinates(&ranks, &work, &breadths, &depths, config, &mut budget);

    let mut order = vec![0usize; n];
    for rank in &ranks {
        for (p, &v) in rank.iter().enumerate() {
            order[v] = p;
        }
    }

    let nodes: Vec<NodeBox> = (0..n)
        .map(|v| {
            let (cx, cy) = match direction {
                Direction::TopBottom => (along[v], across[v]),
                Direction::LeftRight => (across[v], along[v]),
            };
            NodeBox {
                index: v,
                cx,
                cy,
                width: graph.footprints[v].width,
                height: graph.footprints[v].height,
                rank: rank_of[v],
                order: order[v],
            }
        })
        .collect();

    let edges = route_edges(&graph.edges, &nodes, &flipped);
    let quality = LayoutQuality {
        crossings: count_crossings(&ranks, &work.adj, n),
        variance: breadth_variance(&ranks, &along),
    };
    let bounds = Bounds::enclosing(nodes.iter().map(|b| (b.cx, b.cy, b.width, b.height)));
    let degraded = budget.exhausted;

    debug!(
        ranks = ranks.len(),
        crossings = quality.crossings,
        degraded,
        "layout complete"
    );

    Ok(GraphLayout {
        direction,
        nodes,
        edges,
        ranks,
        bounds,
        quality,
        degraded,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
