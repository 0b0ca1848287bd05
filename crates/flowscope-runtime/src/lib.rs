#![forbid(unsafe_code)]

//! Session runtime for flowscope.
//!
//! [`FlowSession`] is the single writer over a flow graph. It applies
//! visibility transactions, defers layout and viewport work through a
//! generation-stamped queue, and hands out [`GraphSnapshot`]s.
//!
//! ```
//! use flowscope_runtime::{FlowConfig, FlowSession};
//!
//! let mut session = FlowSession::new(FlowConfig::default());
//! session
//!     .load_json(r#"[{"id":"w","name":"Billing","agents":[{"id":"a","name":"Clerk"}]}]"#)
//!     .unwrap();
//! session.toggle_node("w").unwrap();
//! session.flush();
//!
//! let snap = session.snapshot();
//! assert_eq!(snap.visible_nodes().count(), 2);
//! assert!(!snap.layout_pending);
//! ```

pub mod config;
pub mod footprint;
pub mod layout_engine;
pub mod scheduler;
pub mod session;
pub mod snapshot;
pub mod viewport;

pub use config::{ConfigError, FlowConfig, FlowConfigParse};
pub use footprint::DisplayOptions;
pub use layout_engine::{LayoutAlgorithm, LayoutEngine, LayoutFailure, LayoutOutcome, Layered};
pub use scheduler::{DeferredQueue, DeferredTask, TaskKind};
pub use session::{ErrorCallback, FlowSession, TickReport};
pub use snapshot::{EdgeView, GraphSnapshot, NodeView};
pub use viewport::{CanvasSize, Viewport, ViewportConfig, ViewportController};
