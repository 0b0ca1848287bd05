#![forbid(unsafe_code)]

//! Visibility state machine.
//!
//! Every operation is one synchronous transaction over `&mut FlowGraph`:
//! node states change, every edge's hidden flag is re-derived from its
//! endpoints, and the graph revision is bumped if anything moved. The
//! `&mut` borrow means two transactions can never interleave.
//!
//! # State transitions
//!
//! | Command | Effect |
//! |---|---|
//! | initialize / collapse all | roots `Visible { collapsed: true }`, everything else `Hidden` |
//! | expand all | every node `Visible { collapsed: false }` |
//! | toggle (collapse) | target collapsed, whole descendant subtree `Hidden` |
//! | toggle (expand) | target expanded, direct children `Visible { collapsed: true }` |
//!
//! Expansion never cascades: grandchildren stay hidden until their own
//! parent is toggled. Hidden nodes carry no collapse flag, so a revealed
//! node always comes back collapsed. Visible leaves are always stored as
//! `Visible { collapsed: false }`.

use std::fmt;

use tracing::{debug, info, warn};

use crate::graph::{FlowGraph, NodeId, NodeState};

// ---------------------------------------------------------------------------
// Commands, reports, errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityCommand {
    Toggle(NodeId),
    ExpandAll,
    CollapseAll,
}

/// Outcome of one visibility transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityReport {
    /// Graph revision after the transaction.
    pub revision: u64,
    /// Whether any node state changed.
    pub changed: bool,
    /// Nodes that went from hidden to visible.
    pub revealed: Vec<NodeId>,
    /// Nodes that went from visible to hidden.
    pub hidden: Vec<NodeId>,
    pub visible_nodes: usize,
    pub visible_edges: usize,
}

/// Rejected toggle. Non-fatal; the graph is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityError {
    UnknownNode(String),
    /// Expanding a hidden node would leave visible children under a hidden
    /// parent.
    NodeHidden(NodeId),
}

impl fmt::Display for VisibilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(id) => write!(f, "unknown node `{id}`"),
            Self::NodeHidden(id) => write!(f, "node `{id}` is hidden and cannot be toggled"),
        }
    }
}

impl std::error::Error for VisibilityError {}

/// A broken structural invariant found by [`check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    ChildrenCount {
        id: NodeId,
        recorded: usize,
        actual: usize,
    },
    EdgeVisibility {
        edge: String,
        hidden: bool,
    },
    /// Visible node whose parent is hidden or collapsed.
    OrphanVisible { id: NodeId, parent: NodeId },
    /// Expanded node with a hidden direct child.
    ExpandedWithHiddenChild { id: NodeId, child: NodeId },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChildrenCount {
                id,
                recorded,
                actual,
            } => write!(f, "`{id}` records {recorded} children but has {actual}"),
            Self::EdgeVisibility { edge, hidden } => {
                write!(f, "edge `{edge}` hidden={hidden} disagrees with its endpoints")
            }
            Self::OrphanVisible { id, parent } => {
                write!(f, "`{id}` is visible under hidden or collapsed parent `{parent}`")
            }
            Self::ExpandedWithHiddenChild { id, child } => {
                write!(f, "`{id}` is expanded but child `{child}` is hidden")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction helper
// ---------------------------------------------------------------------------

struct Txn<'a> {
    graph: &'a mut FlowGraph,
    changed: bool,
    revealed: Vec<NodeId>,
    hidden: Vec<NodeId>,
}

impl<'a> Txn<'a> {
    fn new(graph: &'a mut FlowGraph) -> Self {
        Self {
            graph,
            changed: false,
            revealed: Vec::new(),
            hidden: Vec::new(),
        }
    }

    fn set(&mut self, idx: usize, state: NodeState) {
        // leaves carry no collapse flag
        let state = match state {
            NodeState::Visible { .. } if !self.graph.nodes()[idx].has_toggle() => {
                NodeState::Visible { collapsed: false }
            }
            other => other,
        };
        if self.graph.nodes()[idx].state() == state {
            return;
        }
        self.changed = true;
        match self.graph.set_state(idx, state) {
            Some(true) => self.hidden.push(self.graph.nodes()[idx].id().clone()),
            Some(false) => self.revealed.push(self.graph.nodes()[idx].id().clone()),
            None => {}
        }
    }

    fn commit(self) -> VisibilityReport {
        let Self {
            graph,
            changed,
            revealed,
            hidden,
        } = self;
        graph.recompute_edges();
        let revision = if changed {
            graph.bump_revision()
        } else {
            graph.revision()
        };
        debug_assert!(
            check_invariants(graph).is_empty(),
            "visibility invariants broken: {:?}",
            check_invariants(graph)
        );
        VisibilityReport {
            revision,
            changed,
            revealed,
            hidden,
            visible_nodes: graph.visible_node_count(),
            visible_edges: graph.visible_edge_count(),
        }
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Dispatch a command to the matching transaction.
pub fn apply(
    graph: &mut FlowGraph,
    command: &VisibilityCommand,
) -> Result<VisibilityReport, VisibilityError> {
    match command {
        VisibilityCommand::Toggle(id) => toggle_node(graph, id.as_str()),
        VisibilityCommand::ExpandAll => Ok(expand_all(graph)),
        VisibilityCommand::CollapseAll => Ok(collapse_all(graph)),
    }
}

/// Initial state: root nodes visible and collapsed, everything else hidden.
pub fn initialize(graph: &mut FlowGraph) -> VisibilityReport {
    let report = reset_to_roots(graph);
    info!(
        nodes = graph.len(),
        visible = report.visible_nodes,
        "visibility initialized"
    );
    report
}

/// Flip one node between collapsed and expanded.
///
/// Collapsing hides the entire descendant subtree. Expanding reveals only
/// direct children, each collapsed. Toggling a leaf is accepted and
/// changes nothing.
pub fn toggle_node(graph: &mut FlowGraph, id: &str) -> Result<VisibilityReport, VisibilityError> {
    let Some(idx) = graph.index_of(id) else {
        warn!(node = id, "toggle ignored: unknown node");
        return Err(VisibilityError::UnknownNode(id.to_string()));
    };
    let node = &graph.nodes()[idx];
    let NodeState::Visible { collapsed } = node.state() else {
        warn!(node = id, "toggle ignored: node is hidden");
        return Err(VisibilityError::NodeHidden(node.id().clone()));
    };
    if !node.has_toggle() {
        debug!(node = id, "toggle on leaf is a no-op");
        return Ok(Txn::new(graph).commit());
    }

    let mut txn = Txn::new(graph);
    if collapsed {
        txn.set(idx, NodeState::Visible { collapsed: false });
        let children = txn.graph.children_indices(idx).to_vec();
        for child in children {
            txn.set(child, NodeState::Visible { collapsed: true });
        }
    } else {
        txn.set(idx, NodeState::Visible { collapsed: true });
        for desc in descendants(txn.graph, idx) {
            txn.set(desc, NodeState::Hidden);
        }
    }
    let report = txn.commit();
    debug!(
        node = id,
        expanded = collapsed,
        revealed = report.revealed.len(),
        hidden = report.hidden.len(),
        revision = report.revision,
        "toggle applied"
    );
    Ok(report)
}

/// Every node visible and expanded.
pub fn expand_all(graph: &mut FlowGraph) -> VisibilityReport {
    let mut txn = Txn::new(graph);
    for idx in 0..txn.graph.len() {
        txn.set(idx, NodeState::Visible { collapsed: false });
    }
    let report = txn.commit();
    debug!(
        revealed = report.revealed.len(),
        revision = report.revision,
        "expand all"
    );
    report
}

/// Back to the initial visible set.
pub fn collapse_all(graph: &mut FlowGraph) -> VisibilityReport {
    let report = reset_to_roots(graph);
    debug!(
        hidden = report.hidden.len(),
        revision = report.revision,
        "collapse all"
    );
    report
}

fn reset_to_roots(graph: &mut FlowGraph) -> VisibilityReport {
    let mut txn = Txn::new(graph);
    for idx in 0..txn.graph.len() {
        let state = if txn.graph.parent_index(idx).is_none() {
            NodeState::Visible { collapsed: true }
        } else {
            NodeState::Hidden
        };
        txn.set(idx, state);
    }
    txn.commit()
}

/// All strict descendants of `idx`, pre-order.
fn descendants(graph: &FlowGraph, idx: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut stack: Vec<usize> = graph.children_indices(idx).iter().rev().copied().collect();
    while let Some(v) = stack.pop() {
        out.push(v);
        stack.extend(graph.children_indices(v).iter().rev().copied());
    }
    out
}

/// Check the structural invariants, returning every violation found.
#[must_use]
pub fn check_invariants(graph: &FlowGraph) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let nodes = graph.nodes();

    let mut actual = vec![0usize; nodes.len()];
    for idx in 0..nodes.len() {
        if let Some(p) = graph.parent_index(idx) {
            actual[p] += 1;
        }
    }
    for (node, &count) in nodes.iter().zip(&actual) {
        if node.children_count() != count {
            violations.push(InvariantViolation::ChildrenCount {
                id: node.id().clone(),
                recorded: node.children_count(),
                actual: count,
            });
        }
    }

    for (e, edge) in graph.edges().iter().enumerate() {
        let Some((s, t)) = graph.edge_endpoints(e) else {
            continue;
        };
        let expected = nodes[s].is_hidden() || nodes[t].is_hidden();
        if edge.is_hidden() != expected {
            violations.push(InvariantViolation::EdgeVisibility {
                edge: edge.id().to_string(),
                hidden: edge.is_hidden(),
            });
        }
    }

    for (idx, node) in nodes.iter().enumerate() {
        let Some(p) = graph.parent_index(idx) else {
            continue;
        };
        let parent = &nodes[p];
        let parent_open = parent.state() == NodeState::Visible { collapsed: false };
        if node.state().is_visible() && !parent_open {
            violations.push(InvariantViolation::OrphanVisible {
                id: node.id().clone(),
                parent: parent.id().clone(),
            });
        }
        if parent_open && node.is_hidden() {
            violations.push(InvariantViolation::ExpandedWithHiddenChild {
                id: parent.id().clone(),
                child: node.id().clone(),
            });
        }
    }

    violations
}
