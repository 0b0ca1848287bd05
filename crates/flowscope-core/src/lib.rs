#![forbid(unsafe_code)]

//! Core model for flowscope: the flow graph, the transform from nested
//! workflow definitions, and the visibility state machine.
//!
//! ```
//! use flowscope_core::{source::parse_workflows, transform::transform, visibility};
//!
//! let json = r#"[{"id":"w","name":"Billing","agents":[{"id":"a","name":"Clerk"}]}]"#;
//! let mut graph = transform(&parse_workflows(json).unwrap()).unwrap();
//! visibility::initialize(&mut graph);
//! assert_eq!(graph.visible_node_count(), 1);
//!
//! visibility::toggle_node(&mut graph, "w").unwrap();
//! assert_eq!(graph.visible_node_count(), 2);
//! ```

pub mod graph;
pub mod source;
pub mod transform;
pub mod visibility;

pub use graph::{Edge, FlowGraph, Node, NodeDetails, NodeId, NodeKind, NodeState, Point, Relationship};
pub use source::{AgentSource, ToolSource, TriggerSource, WorkflowSource, parse_workflows};
pub use transform::{TransformError, transform, transform_json};
pub use visibility::{
    InvariantViolation, VisibilityCommand, VisibilityError, VisibilityReport, check_invariants,
};
