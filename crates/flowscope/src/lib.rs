#![forbid(unsafe_code)]

//! flowscope public facade crate.
//!
//! Re-exports the session, graph and layout types a host needs, plus a
//! prelude and a top-level [`Error`] that every component error converts
//! into.
//!
//! ```
//! use flowscope::prelude::*;
//!
//! fn run() -> Result<usize> {
//!     let mut session = FlowSession::new(FlowConfig::from_env());
//!     session.load_json(r#"[{"id":"w","name":"Billing","agents":[{"name":"Clerk"}]}]"#)?;
//!     session.toggle_node("w")?;
//!     session.flush();
//!     Ok(session.snapshot().visible_nodes().count())
//! }
//!
//! assert_eq!(run().unwrap(), 2);
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use flowscope_core::{
    AgentSource, Edge, FlowGraph, Node, NodeDetails, NodeId, NodeKind, NodeState, Point,
    Relationship, ToolSource, TransformError, TriggerSource, VisibilityCommand, VisibilityError,
    VisibilityReport, WorkflowSource, parse_workflows, transform, transform_json,
};

// --- Layout re-exports -----------------------------------------------------

pub use flowscope_layout::{Bounds, Direction, Footprint, LayoutConfig, LayoutError};

// --- Runtime re-exports ----------------------------------------------------

pub use flowscope_runtime::{
    CanvasSize, ConfigError, DisplayOptions, EdgeView, FlowConfig, FlowConfigParse, FlowSession,
    GraphSnapshot, LayoutAlgorithm, LayoutEngine, LayoutFailure, LayoutOutcome, NodeView,
    TickReport, Viewport, ViewportConfig,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for flowscope hosts.
#[derive(Debug)]
pub enum Error {
    /// The workflow input could not be turned into a graph.
    Transform(TransformError),
    /// A visibility command was rejected.
    Visibility(VisibilityError),
    /// The layout engine rejected its input.
    Layout(LayoutError),
    /// A layout run failed or panicked.
    LayoutFailed(LayoutFailure),
    /// One or more configuration values were invalid.
    Config(Vec<ConfigError>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transform(err) => write!(f, "{err}"),
            Self::Visibility(err) => write!(f, "{err}"),
            Self::Layout(err) => write!(f, "{err}"),
            Self::LayoutFailed(err) => write!(f, "{err}"),
            Self::Config(errors) => {
                f.write_str("invalid configuration: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{err}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transform(err) => Some(err),
            Self::Visibility(err) => Some(err),
            Self::Layout(err) => Some(err),
            Self::LayoutFailed(err) => Some(err),
            Self::Config(errors) => errors
                .first()
                .map(|e| e as &(dyn std::error::Error + 'static)),
        }
    }
}

impl From<TransformError> for Error {
    fn from(err: TransformError) -> Self {
        Self::Transform(err)
    }
}

impl From<VisibilityError> for Error {
    fn from(err: VisibilityError) -> Self {
        Self::Visibility(err)
    }
}

impl From<LayoutError> for Error {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

impl From<LayoutFailure> for Error {
    fn from(err: LayoutFailure) -> Self {
        Self::LayoutFailed(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(vec![err])
    }
}

impl From<Vec<ConfigError>> for Error {
    fn from(errors: Vec<ConfigError>) -> Self {
        Self::Config(errors)
    }
}

/// Standard result type for flowscope APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Direction, Error, FlowConfig, FlowSession, GraphSnapshot, NodeId, NodeKind, Result,
        Viewport, WorkflowSource,
    };

    pub use crate::{core, layout, runtime};
}

pub use flowscope_core as core;
pub use flowscope_layout as layout;
pub use flowscope_runtime as runtime;
