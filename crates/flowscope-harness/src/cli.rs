#![forbid(unsafe_code)]

//! Command-line argument parsing for the harness.
//!
//! Parses args manually to keep the binary lean. Graph and viewport
//! settings come from the `FLOWSCOPE_*` variables read by
//! [`flowscope::FlowConfig::from_env_with_diagnostics`]; flags given here
//! override them.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process;

use flowscope::Direction;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Canvas override read before flags.
pub const ENV_CANVAS: &str = "FLOWSCOPE_CANVAS";

pub const HELP_TEXT: &str = "\
flowscope harness: lay out a workflow file and print the resulting snapshot

USAGE:
    flowscope-harness [OPTIONS] FILE [COMMAND...]

OPTIONS:
    --direction=DIR      Flow direction: 'lr' (default) or 'tb'
    --no-auto-fit        Do not refit the viewport after layouts
    --canvas=WxH         Canvas size in pixels (default: 1280x800)
    --help, -h           Show this help message
    --version, -V        Show version

COMMANDS (applied in order, deferred work flushed after each):
    toggle:<id>          Expand or collapse one node
    expand-all           Reveal every node
    collapse-all         Back to the initial view
    direction:lr|tb      Change flow direction
    reset-view           Fit the viewport to the visible nodes

ENVIRONMENT VARIABLES:
    FLOWSCOPE_DIRECTION           Default direction (lr|tb)
    FLOWSCOPE_AUTO_FIT            Default auto-fit (true|false)
    FLOWSCOPE_NODE_SPACING        Gap between nodes in a rank
    FLOWSCOPE_RANK_SEPARATION     Gap between ranks
    FLOWSCOPE_LAYOUT_BUDGET       Crossing-reduction work budget
    FLOWSCOPE_MIN_ZOOM            Lowest zoom a fit may pick
    FLOWSCOPE_MAX_ZOOM            Highest zoom a fit may pick
    FLOWSCOPE_FIT_PADDING         Fit padding as a fraction of the canvas
    FLOWSCOPE_SETTLE_DELAY_MS     Delay between layout and auto-fit
    FLOWSCOPE_SHOW_DESCRIPTION    Size cards with description rows
    FLOWSCOPE_SHOW_ROLE           Size cards with role rows
    FLOWSCOPE_SHOW_CONDITION      Size cards with condition rows
    FLOWSCOPE_CANVAS              Override --canvas default
    FLOWSCOPE_LOG / RUST_LOG      Log filter (logs go to stderr)";

/// One step applied to the session after loading.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Toggle(String),
    ExpandAll,
    CollapseAll,
    Direction(Direction),
    ResetView,
}

impl Command {
    pub fn parse(raw: &str) -> Result<Self, CliError> {
        match raw {
            "expand-all" => return Ok(Self::ExpandAll),
            "collapse-all" => return Ok(Self::CollapseAll),
            "reset-view" => return Ok(Self::ResetView),
            _ => {}
        }
        if let Some(id) = raw.strip_prefix("toggle:") {
            if id.is_empty() {
                return Err(CliError::InvalidCommand(raw.to_string()));
            }
            return Ok(Self::Toggle(id.to_string()));
        }
        if let Some(dir) = raw.strip_prefix("direction:") {
            return Direction::parse(dir)
                .map(Self::Direction)
                .ok_or_else(|| CliError::InvalidValue {
                    flag: "direction:",
                    value: dir.to_string(),
                });
        }
        Err(CliError::InvalidCommand(raw.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toggle(id) => write!(f, "toggle:{id}"),
            Self::ExpandAll => f.write_str("expand-all"),
            Self::CollapseAll => f.write_str("collapse-all"),
            Self::Direction(d) => write!(f, "direction:{d}"),
            Self::ResetView => f.write_str("reset-view"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CliError {
    InvalidValue { flag: &'static str, value: String },
    InvalidCommand(String),
    UnknownArgument(String),
    MissingFile,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { flag, value } => write!(f, "Invalid {flag} value: {value}"),
            Self::InvalidCommand(raw) => write!(f, "Unknown command: {raw}"),
            Self::UnknownArgument(arg) => write!(f, "Unknown argument: {arg}"),
            Self::MissingFile => f.write_str("Missing FILE argument"),
        }
    }
}

impl std::error::Error for CliError {}

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Opts {
    /// Workflow JSON file to load.
    pub file: PathBuf,
    /// Direction override; `None` keeps the configured one.
    pub direction: Option<Direction>,
    /// `false` when `--no-auto-fit` was given.
    pub auto_fit: bool,
    /// Canvas width and height.
    pub canvas: (f64, f64),
    pub commands: Vec<Command>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            file: PathBuf::new(),
            direction: None,
            auto_fit: true,
            canvas: (1280.0, 800.0),
            commands: Vec::new(),
        }
    }
}

/// Outcome of argument parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Run(Opts),
    Help,
    Version,
}

impl Opts {
    /// Parse process arguments and environment, exiting on `--help`,
    /// `--version` or bad input.
    pub fn parse() -> Self {
        match parse_args(env::args().skip(1), |key| env::var(key).ok()) {
            Ok(Parsed::Run(opts)) => opts,
            Ok(Parsed::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Parsed::Version) => {
                println!("flowscope-harness {VERSION}");
                process::exit(0);
            }
            Err(err) => {
                eprintln!("{err}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }
}

/// Parse `args` (without the program name). `get_env` supplies variable
/// lookups so tests need not touch the process environment.
pub fn parse_args<I, F>(args: I, mut get_env: F) -> Result<Parsed, CliError>
where
    I: IntoIterator<Item = String>,
    F: FnMut(&str) -> Option<String>,
{
    let mut opts = Opts::default();

    // Apply environment variable defaults first
    if let Some(val) = get_env(ENV_CANVAS) {
        opts.canvas = parse_canvas(&val).ok_or(CliError::InvalidValue {
            flag: ENV_CANVAS,
            value: val,
        })?;
    }

    let mut file = None;
    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Parsed::Help),
            "--version" | "-V" => return Ok(Parsed::Version),
            "--no-auto-fit" => opts.auto_fit = false,
            other => {
                if let Some(val) = other.strip_prefix("--direction=") {
                    opts.direction =
                        Some(Direction::parse(val).ok_or_else(|| CliError::InvalidValue {
                            flag: "--direction",
                            value: val.to_string(),
                        })?);
                } else if let Some(val) = other.strip_prefix("--canvas=") {
                    opts.canvas = parse_canvas(val).ok_or_else(|| CliError::InvalidValue {
                        flag: "--canvas",
                        value: val.to_string(),
                    })?;
                } else if other.starts_with('-') {
                    return Err(CliError::UnknownArgument(other.to_string()));
                } else if file.is_none() {
                    file = Some(PathBuf::from(other));
                } else {
                    opts.commands.push(Command::parse(other)?);
                }
            }
        }
    }

    opts.file = file.ok_or(CliError::MissingFile)?;
    Ok(Parsed::Run(opts))
}

/// `WxH` with both sides positive.
fn parse_canvas(value: &str) -> Option<(f64, f64)> {
    let (w, h) = value.split_once(['x', 'X'])?;
    let w: f64 = w.trim().parse().ok()?;
    let h: f64 = h.trim().parse().ok()?;
    (w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0).then_some((w, h))
}
