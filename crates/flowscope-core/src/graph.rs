#![forbid(unsafe_code)]

//! Canonical flow-graph store.
//!
//! A [`FlowGraph`] is built once per data load by the transformer and then
//! owned by a single writer. After construction only two things change:
//!
//! - node visibility state, through the transactions in
//!   [`crate::visibility`], and
//! - node positions, through [`FlowGraph::apply_positions`] (called by the
//!   layout engine).
//!
//! The parent→children adjacency index is computed once in
//! [`GraphBuilder::finish`] so child lookups during toggles are O(1).
//!
//! # Invariants
//!
//! 1. `children_count(n)` equals the number of nodes whose parent is `n`.
//! 2. Leaves (`children_count == 0`) expose no collapse state.
//! 3. An edge is hidden iff its source or its target is hidden.
//! 4. A node with a parent is hidden unless that parent is visible and
//!    expanded.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transform::TransformError;

// ---------------------------------------------------------------------------
// Identifiers and enums
// ---------------------------------------------------------------------------

/// Unique node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// What a node represents in the automation hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Top-level automation unit (level 0).
    Workflow,
    /// Event or condition that initiates a workflow (level 0, no parent).
    Trigger,
    /// Role-bearing worker owned by a workflow (level 1).
    Agent,
    /// Capability owned by an agent (level 2).
    Tool,
}

impl NodeKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Workflow => "workflow",
            Self::Trigger => "trigger",
            Self::Agent => "agent",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective visibility of a node.
///
/// A single tag instead of two booleans: a hidden node has no collapse
/// state, so "hidden but expanded" cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Hidden,
    Visible { collapsed: bool },
}

impl NodeState {
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        matches!(self, Self::Hidden)
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        !self.is_hidden()
    }
}

/// Semantic kind of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    /// Trigger → workflow. Not an ownership link.
    Initiates,
    /// Owner → owned (workflow → agent, agent → tool).
    Uses,
}

impl Relationship {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Initiates => "initiates",
            Self::Uses => "uses",
        }
    }
}

/// A 2D point in world units (node centres).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Optional text fields carried from the source entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

// ---------------------------------------------------------------------------
// Node and edge
// ---------------------------------------------------------------------------

/// A node of the flow graph.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    parent: Option<NodeId>,
    level: usize,
    label: String,
    details: NodeDetails,
    raw: serde_json::Value,
    pub(crate) state: NodeState,
    pub(crate) children_count: usize,
    pub(crate) position: Point,
}

impl Node {
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Owning node one level up, if any. Triggers have none.
    #[must_use]
    pub fn parent(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn details(&self) -> &NodeDetails {
        &self.details
    }

    /// Opaque passthrough of the source entity.
    #[must_use]
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    #[must_use]
    pub fn state(&self) -> NodeState {
        self.state
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.state.is_hidden()
    }

    #[must_use]
    pub fn children_count(&self) -> usize {
        self.children_count
    }

    /// Whether the renderer should offer an expand/collapse control.
    #[must_use]
    pub fn has_toggle(&self) -> bool {
        self.children_count > 0
    }

    /// Collapse flag, or `None` for leaves and hidden nodes.
    #[must_use]
    pub fn collapsed(&self) -> Option<bool> {
        match self.state {
            NodeState::Visible { collapsed } if self.children_count > 0 => Some(collapsed),
            _ => None,
        }
    }

    /// Centre position. Only meaningful for visible nodes; hidden nodes
    /// carry the spawn point they will appear at when revealed.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }
}

/// A directed edge of the flow graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    id: String,
    source: NodeId,
    target: NodeId,
    relationship: Relationship,
    pub(crate) hidden: bool,
}

impl Edge {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn source(&self) -> &NodeId {
        &self.source
    }

    #[must_use]
    pub fn target(&self) -> &NodeId {
        &self.target
    }

    #[must_use]
    pub fn relationship(&self) -> Relationship {
        self.relationship
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Node map plus edge list with derived visibility flags.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    edges: Vec<Edge>,
    endpoints: Vec<(usize, usize)>,
    revision: u64,
}

impl FlowGraph {
    /// Nodes in construction order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    #[must_use]
    pub fn parent_index(&self, idx: usize) -> Option<usize> {
        self.parents.get(idx).copied().flatten()
    }

    /// Direct children of the node at `idx`, in construction order.
    #[must_use]
    pub fn children_indices(&self, idx: usize) -> &[usize] {
        self.children.get(idx).map_or(&[], Vec::as_slice)
    }

    /// Direct children of `id` (empty for unknown ids).
    pub fn children_of<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Node> + 'a {
        let slice = self
            .index_of(id)
            .map_or(&[][..], |idx| self.children_indices(idx));
        slice.iter().map(move |&c| &self.nodes[c])
    }

    /// Node indices of the edge at `edge_idx` as `(source, target)`.
    #[must_use]
    pub fn edge_endpoints(&self, edge_idx: usize) -> Option<(usize, usize)> {
        self.endpoints.get(edge_idx).copied()
    }

    /// Incremented by every visibility transaction.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn visible_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !n.is_hidden())
    }

    pub fn visible_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| !e.hidden)
    }

    #[must_use]
    pub fn visible_node_count(&self) -> usize {
        self.visible_nodes().count()
    }

    #[must_use]
    pub fn visible_edge_count(&self) -> usize {
        self.visible_edges().count()
    }

    /// Replace every node position at once, indexed like [`Self::nodes`].
    ///
    /// Returns `false` (and changes nothing) on a length mismatch.
    pub fn apply_positions(&mut self, positions: &[Point]) -> bool {
        if positions.len() != self.nodes.len() {
            return false;
        }
        for (node, &p) in self.nodes.iter_mut().zip(positions) {
            node.position = p;
        }
        true
    }

    // -- crate-internal mutation (visibility transactions) --

    /// Set a node's state, returning `Some(now_hidden)` when its hidden-ness
    /// flipped.
    pub(crate) fn set_state(&mut self, idx: usize, state: NodeState) -> Option<bool> {
        let node = &mut self.nodes[idx];
        let was_hidden = node.state.is_hidden();
        node.state = state;
        let now_hidden = state.is_hidden();
        (was_hidden != now_hidden).then_some(now_hidden)
    }

    /// Re-derive every edge's hidden flag from its endpoints.
    pub(crate) fn recompute_edges(&mut self) {
        for (edge, &(s, t)) in self.edges.iter_mut().zip(&self.endpoints) {
            edge.hidden = self.nodes[s].is_hidden() || self.nodes[t].is_hidden();
        }
    }

    pub(crate) fn bump_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Everything the transformer knows about a node before the graph exists.
#[derive(Debug, Clone)]
pub(crate) struct NodeSpec {
    pub id: NodeId,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub level: usize,
    pub label: String,
    pub details: NodeDetails,
    pub raw: serde_json::Value,
}

#[derive(Debug, Default)]
pub(crate) struct GraphBuilder {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    pending_edges: Vec<(NodeId, NodeId, Relationship)>,
}

impl GraphBuilder {
    pub(crate) fn add_node(&mut self, spec: NodeSpec) -> Result<(), TransformError> {
        if self.index.contains_key(&spec.id) {
            return Err(TransformError::DuplicateId {
                id: spec.id,
                kind: spec.kind,
            });
        }
        self.index.insert(spec.id.clone(), self.nodes.len());
        self.nodes.push(Node {
            id: spec.id,
            kind: spec.kind,
            parent: spec.parent,
            level: spec.level,
            label: spec.label,
            details: spec.details,
            raw: spec.raw,
            state: NodeState::Hidden,
            children_count: 0,
            position: Point::default(),
        });
        Ok(())
    }

    pub(crate) fn add_edge(&mut self, source: NodeId, target: NodeId, relationship: Relationship) {
        self.pending_edges.push((source, target, relationship));
    }

    /// Resolve links and build the adjacency index.
    pub(crate) fn finish(self) -> Result<FlowGraph, TransformError> {
        let Self {
            mut nodes,
            index,
            pending_edges,
        } = self;

        let mut parents = vec![None; nodes.len()];
        let mut children = vec![Vec::new(); nodes.len()];
        for (idx, node) in nodes.iter().enumerate() {
            if let Some(parent) = &node.parent {
                let Some(&p) = index.get(parent) else {
                    return Err(TransformError::MissingParent {
                        id: node.id.clone(),
                        parent: parent.clone(),
                    });
                };
                parents[idx] = Some(p);
                children[p].push(idx);
            }
        }
        for (node, kids) in nodes.iter_mut().zip(&children) {
            node.children_count = kids.len();
        }

        let mut edges = Vec::with_capacity(pending_edges.len());
        let mut endpoints = Vec::with_capacity(pending_edges.len());
        for (source, target, relationship) in pending_edges {
            let (Some(&s), Some(&t)) = (index.get(&source), index.get(&target)) else {
                return Err(TransformError::DanglingEdge { source, target });
            };
            edges.push(Edge {
                id: format!("{source}->{target}"),
                source,
                target,
                relationship,
                hidden: true,
            });
            endpoints.push((s, t));
        }

        Ok(FlowGraph {
            nodes,
            index,
            parents,
            children,
            edges,
            endpoints,
            revision: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str, kind: NodeKind, parent: Option<&str>, level: usize) -> NodeSpec {
        NodeSpec {
            id: NodeId::from(id),
            kind,
            parent: parent.map(NodeId::from),
            level,
            label: id.to_string(),
            details: NodeDetails::default(),
            raw: serde_json::Value::Null,
        }
    }

    fn small_graph() -> FlowGraph {
        let mut b = GraphBuilder::default();
        b.add_node(spec("w", NodeKind::Workflow, None, 0)).unwrap();
        b.add_node(spec("a1", NodeKind::Agent, Some("w"), 1)).unwrap();
        b.add_node(spec("a2", NodeKind::Agent, Some("w"), 1)).unwrap();
        b.add_node(spec("t1", NodeKind::Tool, Some("a1"), 2)).unwrap();
        b.add_edge("w".into(), "a1".into(), Relationship::Uses);
        b.add_edge("w".into(), "a2".into(), Relationship::Uses);
        b.add_edge("a1".into(), "t1".into(), Relationship::Uses);
        b.finish().unwrap()
    }

    #[test]
    fn children_index_and_counts() {
        let g = small_graph();
        assert_eq!(g.node("w").unwrap().children_count(), 2);
        assert_eq!(g.node("a1").unwrap().children_count(), 1);
        assert_eq!(g.node("a2").unwrap().children_count(), 0);
        let kids: Vec<&str> = g.children_of("w").map(|n| n.id().as_str()).collect();
        assert_eq!(kids, vec!["a1", "a2"]);
        assert_eq!(g.children_of("missing").count(), 0);
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut b = GraphBuilder::default();
        b.add_node(spec("x", NodeKind::Workflow, None, 0)).unwrap();
        let err = b.add_node(spec("x", NodeKind::Agent, None, 1)).unwrap_err();
        assert!(matches!(err, TransformError::DuplicateId { .. }));
    }

    #[test]
    fn missing_parent_rejected() {
        let mut b = GraphBuilder::default();
        b.add_node(spec("a", NodeKind::Agent, Some("ghost"), 1))
            .unwrap();
        assert!(matches!(
            b.finish(),
            Err(TransformError::MissingParent { .. })
        ));
    }

    #[test]
    fn dangling_edge_rejected() {
        let mut b = GraphBuilder::default();
        b.add_node(spec("a", NodeKind::Workflow, None, 0)).unwrap();
        b.add_edge("a".into(), "b".into(), Relationship::Uses);
        assert!(matches!(
            b.finish(),
            Err(TransformError::DanglingEdge { .. })
        ));
    }

    #[test]
    fn edge_ids_and_endpoints() {
        let g = small_graph();
        assert_eq!(g.edges()[0].id(), "w->a1");
        assert_eq!(g.edge_endpoints(2), Some((1, 3)));
        assert_eq!(g.edge_endpoints(9), None);
    }

    #[test]
    fn leaf_never_reports_collapse_state() {
        let mut g = small_graph();
        let leaf = g.index_of("a2").unwrap();
        g.set_state(leaf, NodeState::Visible { collapsed: true });
        assert_eq!(g.nodes()[leaf].collapsed(), None);
        assert!(!g.nodes()[leaf].has_toggle());
    }

    #[test]
    fn set_state_reports_flips_only() {
        let mut g = small_graph();
        assert_eq!(g.set_state(0, NodeState::Visible { collapsed: true }), Some(false));
        assert_eq!(g.set_state(0, NodeState::Visible { collapsed: false }), None);
        assert_eq!(g.set_state(0, NodeState::Hidden), Some(true));
    }

    #[test]
    fn apply_positions_requires_full_vector() {
        let mut g = small_graph();
        assert!(!g.apply_positions(&[Point::new(1.0, 1.0)]));
        let ps = vec![Point::new(3.0, 4.0); g.len()];
        assert!(g.apply_positions(&ps));
        assert_eq!(g.node("t1").unwrap().position(), Point::new(3.0, 4.0));
    }
}
