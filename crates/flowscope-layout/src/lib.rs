#![forbid(unsafe_code)]

//! Deterministic layered graph layout.
//!
//! The engine knows nothing about flow graphs: it takes node footprints
//! and index edges, and returns centred boxes, ranks and routed edges.
//!
//! ```
//! use flowscope_layout::{Direction, Footprint, LayeredGraph, LayoutConfig, layout};
//!
//! let mut g = LayeredGraph::new();
//! let a = g.add_node(Footprint::new(120.0, 40.0));
//! let b = g.add_node(Footprint::new(120.0, 40.0));
//! g.add_edge(a, b);
//!
//! let out = layout(&g, Direction::TopBottom, &LayoutConfig::default()).unwrap();
//! assert_eq!(out.nodes[b].rank, 1);
//! assert!(out.nodes[b].cy > out.nodes[a].cy);
//! ```

pub mod layered;

pub use layered::{
    Bounds, Direction, Footprint, GraphLayout, LayeredGraph, LayoutConfig, LayoutError,
    LayoutQuality, NodeBox, RoutedEdge, layout,
};
