#![forbid(unsafe_code)]

//! Node footprints fed to the layout.
//!
//! A collapsed node with children renders as a small fixed placeholder.
//! Everything else renders its card: a base size per kind plus one text
//! row per optional field that is both present and enabled.

use flowscope_core::{Node, NodeKind, NodeState};
use flowscope_layout::Footprint;

/// Height of one optional text row.
pub const ROW_HEIGHT: f64 = 20.0;

/// Which optional fields the renderer displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    pub show_description: bool,
    pub show_role: bool,
    pub show_condition: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_description: true,
            show_role: true,
            show_condition: true,
        }
    }
}

fn placeholder(kind: NodeKind) -> Footprint {
    match kind {
        NodeKind::Workflow => Footprint::new(200.0, 48.0),
        NodeKind::Trigger => Footprint::new(180.0, 44.0),
        NodeKind::Agent => Footprint::new(180.0, 44.0),
        NodeKind::Tool => Footprint::new(160.0, 40.0),
    }
}

fn card(kind: NodeKind) -> Footprint {
    match kind {
        NodeKind::Workflow => Footprint::new(260.0, 72.0),
        NodeKind::Trigger => Footprint::new(240.0, 64.0),
        NodeKind::Agent => Footprint::new(240.0, 64.0),
        NodeKind::Tool => Footprint::new(200.0, 56.0),
    }
}

/// Number of optional rows `node` would display.
#[must_use]
pub fn detail_rows(node: &Node, display: &DisplayOptions) -> usize {
    let d = node.details();
    [
        display.show_description && d.description.is_some(),
        display.show_role && d.role.is_some(),
        display.show_condition && d.condition.is_some(),
    ]
    .into_iter()
    .filter(|&shown| shown)
    .count()
}

/// Footprint of `node` in its current state.
///
/// Hidden childful nodes are sized as the placeholder they will appear as
/// when revealed.
#[must_use]
pub fn footprint(node: &Node, display: &DisplayOptions) -> Footprint {
    let collapsed = match node.state() {
        NodeState::Visible { collapsed } => collapsed,
        NodeState::Hidden => true,
    };
    if collapsed && node.has_toggle() {
        return placeholder(node.kind());
    }
    let base = card(node.kind());
    Footprint::new(
        base.width,
        base.height + detail_rows(node, display) as f64 * ROW_HEIGHT,
    )
}
