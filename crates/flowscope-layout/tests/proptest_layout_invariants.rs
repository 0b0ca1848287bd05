//! Property-based invariant tests for the layered layout.
//!
//! For arbitrary graphs (cycles and self-loops included):
//!
//! 1. One box per input node, all coordinates finite.
//! 2. Boxes never overlap.
//! 3. Layout is deterministic for a fixed graph, direction and config.
//! 4. Forward edges of an acyclic graph go to a strictly higher rank.
//! 5. Bounds enclose every box.
//! 6. Direction changes the axes, not the ranks or the order.

use flowscope_layout::{Direction, Footprint, LayeredGraph, LayoutConfig, layout};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn graph_strategy() -> impl Strategy<Value = LayeredGraph> {
    (1usize..16)
        .prop_flat_map(|n| {
            (
                prop::collection::vec((20.0f64..200.0, 20.0f64..120.0), n),
                prop::collection::vec((0..n, 0..n), 0..(n * 2)),
            )
        })
        .prop_map(|(sizes, edges)| {
            let mut g = LayeredGraph::new();
            for (w, h) in sizes {
                g.add_node(Footprint::new(w, h));
            }
            for (u, v) in edges {
                g.add_edge(u, v);
            }
            g
        })
}

/// Forest-shaped DAG: each node > 0 hangs off an earlier node.
fn dag_strategy() -> impl Strategy<Value = LayeredGraph> {
    (2usize..16)
        .prop_flat_map(|n| prop::collection::vec(any::<prop::sample::Index>(), n - 1))
        .prop_map(|parents| {
            let mut g = LayeredGraph::new();
            g.add_node(Footprint::new(100.0, 40.0));
            for (i, pick) in parents.iter().enumerate() {
                let child = g.add_node(Footprint::new(100.0, 40.0));
                g.add_edge(pick.index(i + 1), child);
            }
            g
        })
}

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::TopBottom), Just(Direction::LeftRight)]
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. Completeness and no overlap
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn every_node_placed_without_overlap(g in graph_strategy(), dir in direction_strategy()) {
        let out = layout(&g, dir, &LayoutConfig::default()).unwrap();
        prop_assert_eq!(out.nodes.len(), g.node_count());
        for b in &out.nodes {
            prop_assert!(b.cx.is_finite() && b.cy.is_finite());
        }
        for i in 0..out.nodes.len() {
            for j in (i + 1)..out.nodes.len() {
                prop_assert!(
                    !out.nodes[i].overlaps(&out.nodes[j]),
                    "{:?} overlaps {:?}", out.nodes[i], out.nodes[j]
                );
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn deterministic(g in graph_strategy(), dir in direction_strategy()) {
        let config = LayoutConfig::default();
        let a = layout(&g, dir, &config).unwrap();
        let b = layout(&g, dir, &config).unwrap();
        prop_assert_eq!(a, b);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Ranks respect acyclic edges
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn dag_edges_point_down_ranks(g in dag_strategy()) {
        let out = layout(&g, Direction::TopBottom, &LayoutConfig::default()).unwrap();
        for &(u, v) in g.edges() {
            prop_assert!(out.nodes[v].rank > out.nodes[u].rank);
            prop_assert!(out.nodes[v].cy > out.nodes[u].cy);
        }
        prop_assert!(out.edges.iter().all(|e| !e.reversed));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Bounds
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn bounds_enclose_boxes(g in graph_strategy(), dir in direction_strategy()) {
        let out = layout(&g, dir, &LayoutConfig::default()).unwrap();
        let bounds = out.bounds.expect("non-empty graph has bounds");
        for b in &out.nodes {
            prop_assert!(b.left() >= bounds.min_x - 1e-9);
            prop_assert!(b.right() <= bounds.max_x + 1e-9);
            prop_assert!(b.top() >= bounds.min_y - 1e-9);
            prop_assert!(b.bottom() <= bounds.max_y + 1e-9);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Direction only swaps axes
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn direction_keeps_ranks_and_order(g in graph_strategy()) {
        let config = LayoutConfig::default();
        let tb = layout(&g, Direction::TopBottom, &config).unwrap();
        let lr = layout(&g, Direction::LeftRight, &config).unwrap();
        prop_assert_eq!(&tb.ranks, &lr.ranks);
        for (a, b) in tb.nodes.iter().zip(&lr.nodes) {
            prop_assert_eq!(a.rank, b.rank);
            prop_assert_eq!(a.order, b.order);
        }
    }
}
