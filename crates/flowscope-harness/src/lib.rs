#![forbid(unsafe_code)]

//! Headless driver behind the `flowscope-harness` binary.

pub mod cli;

use flowscope::{FlowConfig, FlowSession, GraphSnapshot, Result};
use tracing::{info, warn};

use crate::cli::{Command, Opts};

/// What [`run`] produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub snapshot: GraphSnapshot,
    /// Commands rejected without aborting the run (e.g. toggling a
    /// hidden node).
    pub rejected: Vec<String>,
}

/// Load `json` into a fresh session, apply `opts`, and flush after every
/// step so each command sees a settled layout.
pub fn run(json: &str, mut config: FlowConfig, opts: &Opts) -> Result<RunOutput> {
    if let Some(direction) = opts.direction {
        config.direction = direction;
    }
    if !opts.auto_fit {
        config.auto_fit = false;
    }
    config.validate()?;

    let mut session = FlowSession::new(config);
    session.set_canvas_size(opts.canvas.0, opts.canvas.1);
    let report = session.load_json(json)?;
    info!(
        visible = report.visible_nodes,
        commands = opts.commands.len(),
        "workflow loaded"
    );
    session.flush();

    let mut rejected = Vec::new();
    for command in &opts.commands {
        match command {
            Command::Toggle(id) => {
                if let Err(err) = session.toggle_node(id) {
                    warn!(%command, error = %err, "command rejected");
                    rejected.push(format!("{command}: {err}"));
                }
            }
            Command::ExpandAll => {
                session.expand_all();
            }
            Command::CollapseAll => {
                session.collapse_all();
            }
            Command::Direction(direction) => session.set_direction(*direction),
            Command::ResetView => {
                session.reset_view();
            }
        }
        let tick = session.flush();
        if tick.layout_failures > 0 {
            warn!(%command, failures = tick.layout_failures, "layout degraded");
        }
    }

    Ok(RunOutput {
        snapshot: session.snapshot(),
        rejected,
    })
}
