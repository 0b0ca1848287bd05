//! Read-only, serializable view handed to the rendering layer.

#![forbid(unsafe_code)]

use flowscope_core::{NodeDetails, NodeKind, Point, Relationship};
use flowscope_layout::Direction;
use serde::Serialize;

use crate::viewport::{CanvasSize, Viewport};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    pub generation: u64,
    pub revision: u64,
    pub direction: Direction,
    pub auto_fit: bool,
    pub viewport: Viewport,
    pub canvas: CanvasSize,
    /// A layout run is queued and positions may still move.
    pub layout_pending: bool,
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

impl GraphSnapshot {
    pub fn visible_nodes(&self) -> impl Iterator<Item = &NodeView> {
        self.nodes.iter().filter(|n| !n.hidden)
    }

    pub fn visible_edges(&self) -> impl Iterator<Item = &EdgeView> {
        self.edges.iter().filter(|e| !e.hidden)
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&NodeView> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub level: usize,
    pub parent: Option<String>,
    pub hidden: bool,
    /// `None` for leaves and hidden nodes.
    pub collapsed: Option<bool>,
    pub has_toggle: bool,
    pub children_count: usize,
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub details: NodeDetails,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeView {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relationship: Relationship,
    pub hidden: bool,
    /// Empty until a layout has routed the edge.
    pub waypoints: Vec<(f64, f64)>,
}
