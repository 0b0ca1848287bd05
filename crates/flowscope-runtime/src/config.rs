#![forbid(unsafe_code)]

//! Session configuration with environment overrides.
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `FLOWSCOPE_DIRECTION` | `direction` (`lr` / `tb`) | `lr` |
//! | `FLOWSCOPE_AUTO_FIT` | `auto_fit` | `true` |
//! | `FLOWSCOPE_NODE_SPACING` | `layout.node_spacing` | `30` |
//! | `FLOWSCOPE_RANK_SEPARATION` | `layout.rank_separation` | `60` |
//! | `FLOWSCOPE_LAYOUT_BUDGET` | `layout.iteration_budget` | `10000` |
//! | `FLOWSCOPE_MIN_ZOOM` | `viewport.min_zoom` | `0.1` |
//! | `FLOWSCOPE_MAX_ZOOM` | `viewport.max_zoom` | `2.0` |
//! | `FLOWSCOPE_FIT_PADDING` | `viewport.padding` | `0.1` |
//! | `FLOWSCOPE_SETTLE_DELAY_MS` | `settle_delay` | `100` |
//! | `FLOWSCOPE_SHOW_DESCRIPTION` | `display.show_description` | `true` |
//! | `FLOWSCOPE_SHOW_ROLE` | `display.show_role` | `true` |
//! | `FLOWSCOPE_SHOW_CONDITION` | `display.show_condition` | `true` |

use std::env;
use std::fmt;
use std::time::Duration;

use flowscope_layout::{Direction, LayoutConfig};

use crate::footprint::DisplayOptions;
use crate::viewport::ViewportConfig;

pub const ENV_DIRECTION: &str = "FLOWSCOPE_DIRECTION";
pub const ENV_AUTO_FIT: &str = "FLOWSCOPE_AUTO_FIT";
pub const ENV_NODE_SPACING: &str = "FLOWSCOPE_NODE_SPACING";
pub const ENV_RANK_SEPARATION: &str = "FLOWSCOPE_RANK_SEPARATION";
pub const ENV_LAYOUT_BUDGET: &str = "FLOWSCOPE_LAYOUT_BUDGET";
pub const ENV_MIN_ZOOM: &str = "FLOWSCOPE_MIN_ZOOM";
pub const ENV_MAX_ZOOM: &str = "FLOWSCOPE_MAX_ZOOM";
pub const ENV_FIT_PADDING: &str = "FLOWSCOPE_FIT_PADDING";
pub const ENV_SETTLE_DELAY_MS: &str = "FLOWSCOPE_SETTLE_DELAY_MS";
pub const ENV_SHOW_DESCRIPTION: &str = "FLOWSCOPE_SHOW_DESCRIPTION";
pub const ENV_SHOW_ROLE: &str = "FLOWSCOPE_SHOW_ROLE";
pub const ENV_SHOW_CONDITION: &str = "FLOWSCOPE_SHOW_CONDITION";

/// Everything a [`crate::FlowSession`] can be tuned with.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowConfig {
    pub direction: Direction,
    pub auto_fit: bool,
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub display: DisplayOptions,
    /// Delay between a graph transaction and its layout run.
    pub layout_delay: Duration,
    /// Delay between an applied layout and the viewport fit that follows.
    pub settle_delay: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            direction: Direction::LeftRight,
            auto_fit: true,
            layout: LayoutConfig::default(),
            viewport: ViewportConfig::default(),
            display: DisplayOptions::default(),
            layout_delay: Duration::ZERO,
            settle_delay: Duration::from_millis(100),
        }
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct FlowConfigParse {
    pub config: FlowConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl FlowConfig {
    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> FlowConfig {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> FlowConfigParse {
        from_env_with(|key| env::var(key).ok())
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        validate_non_negative("node_spacing", self.layout.node_spacing, &mut errors);
        validate_non_negative("rank_separation", self.layout.rank_separation, &mut errors);
        if self.layout.iteration_budget == 0 {
            errors.push(ConfigError::new("layout_budget", "0", "must be >= 1"));
        }
        let vp = &self.viewport;
        if !(vp.min_zoom.is_finite() && vp.min_zoom > 0.0) {
            errors.push(ConfigError::new(
                "min_zoom",
                vp.min_zoom.to_string(),
                "must be a positive number",
            ));
        }
        if !vp.max_zoom.is_finite() || vp.max_zoom < vp.min_zoom {
            errors.push(ConfigError::new(
                "max_zoom",
                vp.max_zoom.to_string(),
                "must be finite and >= min_zoom",
            ));
        }
        if !(0.0..0.5).contains(&vp.padding) {
            errors.push(ConfigError::new(
                "fit_padding",
                vp.padding.to_string(),
                "must be in [0, 0.5)",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Overlay the `FLOWSCOPE_*` variables found through `get` onto `self`.
    pub(crate) fn apply_env<F>(&mut self, mut get: F, errors: &mut Vec<ConfigError>)
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(value) = get(ENV_DIRECTION) {
            match Direction::parse(&value) {
                Some(parsed) => self.direction = parsed,
                None => errors.push(ConfigError::new("direction", value, "expected lr|tb")),
            }
        }
        read_bool(&mut get, ENV_AUTO_FIT, "auto_fit", &mut self.auto_fit, errors);
        read_f64(
            &mut get,
            ENV_NODE_SPACING,
            "node_spacing",
            &mut self.layout.node_spacing,
            errors,
        );
        read_f64(
            &mut get,
            ENV_RANK_SEPARATION,
            "rank_separation",
            &mut self.layout.rank_separation,
            errors,
        );
        if let Some(value) = get(ENV_LAYOUT_BUDGET) {
            match parse_usize(&value) {
                Some(parsed) => self.layout.iteration_budget = parsed,
                None => errors.push(ConfigError::new(
                    "layout_budget",
                    value,
                    "expected positive integer",
                )),
            }
        }
        read_f64(&mut get, ENV_MIN_ZOOM, "min_zoom", &mut self.viewport.min_zoom, errors);
        read_f64(&mut get, ENV_MAX_ZOOM, "max_zoom", &mut self.viewport.max_zoom, errors);
        read_f64(
            &mut get,
            ENV_FIT_PADDING,
            "fit_padding",
            &mut self.viewport.padding,
            errors,
        );
        if let Some(value) = get(ENV_SETTLE_DELAY_MS) {
            match value.trim().parse::<u64>() {
                Ok(ms) => self.settle_delay = Duration::from_millis(ms),
                Err(_) => errors.push(ConfigError::new(
                    "settle_delay_ms",
                    value,
                    "expected milliseconds",
                )),
            }
        }
        let display = &mut self.display;
        read_bool(
            &mut get,
            ENV_SHOW_DESCRIPTION,
            "show_description",
            &mut display.show_description,
            errors,
        );
        read_bool(&mut get, ENV_SHOW_ROLE, "show_role", &mut display.show_role, errors);
        read_bool(
            &mut get,
            ENV_SHOW_CONDITION,
            "show_condition",
            &mut display.show_condition,
            errors,
        );
    }
}

fn from_env_with<F>(get: F) -> FlowConfigParse
where
    F: FnMut(&str) -> Option<String>,
{
    let mut config = FlowConfig::default();
    let mut errors = Vec::new();
    config.apply_env(get, &mut errors);
    if let Err(mut validation) = config.validate() {
        errors.append(&mut validation);
    }
    FlowConfigParse { config, errors }
}

fn read_bool<F>(
    get: &mut F,
    key: &str,
    field: &'static str,
    slot: &mut bool,
    errors: &mut Vec<ConfigError>,
) where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(value) = get(key) {
        match parse_bool(&value) {
            Some(parsed) => *slot = parsed,
            None => errors.push(ConfigError::new(
                field,
                value,
                "expected bool (1/0/true/false)",
            )),
        }
    }
}

fn read_f64<F>(
    get: &mut F,
    key: &str,
    field: &'static str,
    slot: &mut f64,
    errors: &mut Vec<ConfigError>,
) where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(value) = get(key) {
        match parse_f64(&value) {
            Some(parsed) => *slot = parsed,
            None => errors.push(ConfigError::new(field, value, "expected number")),
        }
    }
}

fn validate_non_negative(field: &'static str, value: f64, errors: &mut Vec<ConfigError>) {
    if !value.is_finite() || value < 0.0 {
        errors.push(ConfigError::new(
            field,
            value.to_string(),
            "must be finite and >= 0",
        ));
    }
}

#[inline]
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[inline]
fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}

#[inline]
fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(vars: &[(&str, &str)]) -> FlowConfigParse {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        from_env_with(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_validate() {
        assert!(FlowConfig::default().validate().is_ok());
        let parsed = parse(&[]);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.config, FlowConfig::default());
    }

    #[test]
    fn env_overrides_apply() {
        let parsed = parse(&[
            (ENV_DIRECTION, "tb"),
            (ENV_AUTO_FIT, "off"),
            (ENV_NODE_SPACING, "12.5"),
            (ENV_LAYOUT_BUDGET, "500"),
            (ENV_SETTLE_DELAY_MS, "0"),
            (ENV_SHOW_ROLE, "no"),
        ]);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let c = parsed.config;
        assert_eq!(c.direction, Direction::TopBottom);
        assert!(!c.auto_fit);
        assert_eq!(c.layout.node_spacing, 12.5);
        assert_eq!(c.layout.iteration_budget, 500);
        assert_eq!(c.settle_delay, Duration::ZERO);
        assert!(!c.display.show_role);
        assert!(c.display.show_description);
    }

    #[test]
    fn bad_values_are_reported_and_defaults_kept() {
        let parsed = parse(&[
            (ENV_DIRECTION, "diagonal"),
            (ENV_AUTO_FIT, "maybe"),
            (ENV_MIN_ZOOM, "NaN"),
        ]);
        let fields: Vec<&str> = parsed.errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["direction", "auto_fit", "min_zoom"]);
        assert_eq!(parsed.config.direction, Direction::LeftRight);
        assert!(parsed.config.auto_fit);
    }

    #[test]
    fn validation_catches_inverted_zoom_range() {
        let parsed = parse(&[(ENV_MIN_ZOOM, "3"), (ENV_MAX_ZOOM, "1")]);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].field, "max_zoom");
        assert_eq!(
            parsed.errors[0].to_string(),
            "max_zoom=1 (must be finite and >= min_zoom)"
        );
    }

    #[test]
    fn validation_collects_every_violation() {
        let mut c = FlowConfig::default();
        c.layout.node_spacing = -1.0;
        c.layout.iteration_budget = 0;
        c.viewport.padding = 0.9;
        let errs = c.validate().unwrap_err();
        assert_eq!(errs.len(), 3);
    }

    #[test]
    fn bool_parsing() {
        for t in ["1", "true", "YES", " on "] {
            assert_eq!(parse_bool(t), Some(true));
        }
        for f in ["0", "false", "No", "off"] {
            assert_eq!(parse_bool(f), Some(false));
        }
        assert_eq!(parse_bool("sure"), None);
    }
}
