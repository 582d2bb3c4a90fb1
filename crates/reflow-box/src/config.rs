#![forbid(unsafe_code)]

//! Text box defaults and their environment overrides.
//!
//! | Variable | Field | Format |
//! |----------|-------|--------|
//! | `REFLOW_BOUNDS_POLICY` | `policy` | `fixed`, `auto-width`, `auto-height`, `auto` |
//! | `REFLOW_FONT_FAMILY` | `font.family` | any non-empty string |
//! | `REFLOW_FONT_SIZE` | `font.size` | positive number; leading follows at 1.2x |
//! | `REFLOW_LEADING` | `font.leading` | positive number |
//! | `REFLOW_SPLIT_BUDGET` | `split_budget` | integer >= 1 |
//! | `REFLOW_AUTO_WRAP_LIMIT` | `auto_wrap_limit` | positive number, or `none` |
//! | `REFLOW_JUSTIFICATION` | `justification` | `left`, `center`, `right` |
//! | `REFLOW_MEASURE_CACHE` | `measure_cache_capacity` | integer, 0 disables |
//!
//! Invalid values are reported and the default is kept.

use std::env;
use std::fmt;

use reflow_text::measure::DEFAULT_LEADING_RATIO;
use reflow_text::{DEFAULT_SPLIT_BUDGET, FontState};

use crate::policy::PolicyKind;
use crate::text_box::Justification;

const ENV_BOUNDS_POLICY: &str = "REFLOW_BOUNDS_POLICY";
const ENV_FONT_FAMILY: &str = "REFLOW_FONT_FAMILY";
const ENV_FONT_SIZE: &str = "REFLOW_FONT_SIZE";
const ENV_LEADING: &str = "REFLOW_LEADING";
const ENV_SPLIT_BUDGET: &str = "REFLOW_SPLIT_BUDGET";
const ENV_AUTO_WRAP_LIMIT: &str = "REFLOW_AUTO_WRAP_LIMIT";
const ENV_JUSTIFICATION: &str = "REFLOW_JUSTIFICATION";
const ENV_MEASURE_CACHE: &str = "REFLOW_MEASURE_CACHE";

/// Default number of cached measurements per box.
pub const DEFAULT_MEASURE_CACHE: usize = 256;

/// Defaults applied to newly built text boxes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TextBoxConfig {
    pub policy: PolicyKind,
    pub font: FontState,
    pub justification: Justification,
    /// Maximum forced splits per layout pass.
    pub split_budget: usize,
    /// Wrap width for the `Auto` policy. `None` wraps at the box's current
    /// width once it is non-zero.
    pub auto_wrap_limit: Option<f64>,
    /// Measurements cached per box; 0 measures every call.
    pub measure_cache_capacity: usize,
}

impl Default for TextBoxConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Fixed,
            font: FontState::default(),
            justification: Justification::Left,
            split_budget: DEFAULT_SPLIT_BUDGET,
            auto_wrap_limit: None,
            measure_cache_capacity: DEFAULT_MEASURE_CACHE,
        }
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct TextBoxConfigParse {
    pub config: TextBoxConfig,
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

impl TextBoxConfig {
    /// Parse config from environment variables, logging rejected values.
    #[must_use]
    pub fn from_env() -> Self {
        let parse = Self::from_env_with_diagnostics();
        for error in &parse.errors {
            tracing::warn!(
                field = error.field,
                value = %error.value,
                message = %error.message,
                "ignoring invalid text box setting"
            );
        }
        parse.config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> TextBoxConfigParse {
        from_env_with(|key| env::var(key).ok())
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        validate_positive_f64("font.size", self.font.size, &mut errors);
        validate_positive_f64("font.leading", self.font.leading, &mut errors);
        if self.font.family.trim().is_empty() {
            errors.push(ConfigError::new("font.family", "", "must not be empty"));
        }
        if self.split_budget == 0 {
            errors.push(ConfigError::new("split_budget", "0", "must be >= 1"));
        }
        if let Some(limit) = self.auto_wrap_limit {
            validate_positive_f64("auto_wrap_limit", limit, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn from_env_with<F>(mut get: F) -> TextBoxConfigParse
where
    F: FnMut(&str) -> Option<String>,
{
    let mut config = TextBoxConfig::default();
    let mut errors = Vec::new();

    if let Some(value) = get(ENV_BOUNDS_POLICY) {
        match value.trim().parse::<PolicyKind>() {
            Ok(parsed) => config.policy = parsed,
            Err(_) => errors.push(ConfigError::new(
                "policy",
                value,
                "expected fixed|auto-width|auto-height|auto",
            )),
        }
    }

    if let Some(value) = get(ENV_FONT_FAMILY) {
        if value.trim().is_empty() {
            errors.push(ConfigError::new("font.family", value, "must not be empty"));
        } else {
            config.font.family = value.trim().to_owned();
        }
    }

    if let Some(value) = get(ENV_FONT_SIZE) {
        match parse_positive_f64(&value) {
            Some(size) => {
                config.font.size = size;
                config.font.leading = size * DEFAULT_LEADING_RATIO;
            }
            None => errors.push(ConfigError::new(
                "font.size",
                value,
                "expected positive number",
            )),
        }
    }

    if let Some(value) = get(ENV_LEADING) {
        match parse_positive_f64(&value) {
            Some(leading) => config.font.leading = leading,
            None => errors.push(ConfigError::new(
                "font.leading",
                value,
                "expected positive number",
            )),
        }
    }

    if let Some(value) = get(ENV_SPLIT_BUDGET) {
        match parse_usize(&value) {
            Some(budget) if budget > 0 => config.split_budget = budget,
            _ => errors.push(ConfigError::new(
                "split_budget",
                value,
                "expected integer >= 1",
            )),
        }
    }

    if let Some(value) = get(ENV_AUTO_WRAP_LIMIT) {
        match parse_optional_limit(&value) {
            Some(limit) => config.auto_wrap_limit = limit,
            None => errors.push(ConfigError::new(
                "auto_wrap_limit",
                value,
                "expected positive number or none",
            )),
        }
    }

    if let Some(value) = get(ENV_JUSTIFICATION) {
        match value.trim().parse::<Justification>() {
            Ok(parsed) => config.justification = parsed,
            Err(_) => errors.push(ConfigError::new(
                "justification",
                value,
                "expected left|center|right",
            )),
        }
    }

    if let Some(value) = get(ENV_MEASURE_CACHE) {
        match parse_usize(&value) {
            Some(capacity) => config.measure_cache_capacity = capacity,
            None => errors.push(ConfigError::new(
                "measure_cache_capacity",
                value,
                "expected integer",
            )),
        }
    }

    TextBoxConfigParse { config, errors }
}

#[inline]
fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}

#[inline]
fn parse_positive_f64(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// `Some(None)` for an explicit "no limit".
fn parse_optional_limit(value: &str) -> Option<Option<f64>> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "none" | "off" => Some(None),
        other => parse_positive_f64(other).map(Some),
    }
}

fn validate_positive_f64(field: &'static str, value: f64, errors: &mut Vec<ConfigError>) {
    if !(value.is_finite() && value > 0.0) {
        errors.push(ConfigError::new(
            field,
            value.to_string(),
            "must be a positive number",
        ));
    }
}
