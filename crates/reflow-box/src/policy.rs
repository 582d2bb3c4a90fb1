#![forbid(unsafe_code)]

//! Bounds policies: which of width and height the box owns, and which it
//! derives from content.
//!
//! | Policy | Width | Height | Surface height | Breaking |
//! |--------|-------|--------|----------------|----------|
//! | `Fixed` | authoritative | authoritative | fills the box | word wrap at box width |
//! | `AutoWidth` | derived | derived (one line) | matches the box | one line, newlines stripped |
//! | `AutoHeight` | derived once, then pinned | derived | matches the box | word wrap per paragraph |
//! | `Auto` | derived | derived | matches the box | explicit newlines, optional wrap limit |
//!
//! Derived heights are always `leading × line count`.

use std::fmt;
use std::str::FromStr;

use reflow_text::{
    BreakOptions, LayoutError, Measurer, break_explicit, break_paragraphs, break_words,
    single_line, widest_line,
};

use crate::error::TextBoxError;

/// The four sizing behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum PolicyKind {
    #[default]
    Fixed,
    AutoWidth,
    AutoHeight,
    Auto,
}

impl PolicyKind {
    pub const ALL: [Self; 4] = [Self::Fixed, Self::AutoWidth, Self::AutoHeight, Self::Auto];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::AutoWidth => "auto-width",
            Self::AutoHeight => "auto-height",
            Self::Auto => "auto",
        }
    }

    /// Whether any extent of the box follows its content.
    #[must_use]
    pub const fn derives_size(self) -> bool {
        !matches!(self, Self::Fixed)
    }

    #[must_use]
    pub const fn rules(self) -> PolicyRules {
        match self {
            Self::Fixed => PolicyRules {
                width: Extent::Authoritative,
                height: Extent::Authoritative,
                surface_height: SurfaceHeight::Fill,
                measure_width: MeasureWidth::BoxWidth,
                affordance: InputAffordance::MultiLine,
            },
            Self::AutoWidth => PolicyRules {
                width: Extent::Derived,
                height: Extent::Derived,
                surface_height: SurfaceHeight::MatchBox,
                measure_width: MeasureWidth::Unbounded,
                affordance: InputAffordance::SingleLine,
            },
            Self::AutoHeight => PolicyRules {
                width: Extent::DerivedOnce,
                height: Extent::Derived,
                surface_height: SurfaceHeight::MatchBox,
                measure_width: MeasureWidth::BoxWidth,
                affordance: InputAffordance::MultiLine,
            },
            Self::Auto => PolicyRules {
                width: Extent::Derived,
                height: Extent::Derived,
                surface_height: SurfaceHeight::MatchBox,
                measure_width: MeasureWidth::WrapLimit,
                affordance: InputAffordance::MultiLine,
            },
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = TextBoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TextBoxError::InvalidPolicy(s.to_owned()))
    }
}

/// Who owns one extent of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// Set by the caller, never touched by layout.
    Authoritative,
    /// Recomputed from content on every pass.
    Derived,
    /// Derived from content while unset (`<= 0`), then held.
    DerivedOnce,
}

/// Height of the editable surface overlaying the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceHeight {
    /// The surface fills the full box height.
    Fill,
    /// The surface tracks the box height as it is re-derived.
    MatchBox,
}

/// Width the breaker wraps against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureWidth {
    BoxWidth,
    Unbounded,
    /// The configured auto wrap limit, unbounded when unset.
    WrapLimit,
}

/// Whether the editable surface accepts newlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAffordance {
    SingleLine,
    MultiLine,
}

impl InputAffordance {
    /// Name of the matching host edit element.
    #[must_use]
    pub const fn element_name(self) -> &'static str {
        match self {
            Self::SingleLine => "input",
            Self::MultiLine => "textarea",
        }
    }

    #[must_use]
    pub const fn accepts_newlines(self) -> bool {
        matches!(self, Self::MultiLine)
    }
}

impl FromStr for InputAffordance {
    type Err = TextBoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(Self::SingleLine),
            "textarea" => Ok(Self::MultiLine),
            other => Err(TextBoxError::InvalidEditElement(other.to_owned())),
        }
    }
}

/// Per-policy rules, resolved by table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyRules {
    pub width: Extent,
    pub height: Extent,
    pub surface_height: SurfaceHeight,
    pub measure_width: MeasureWidth,
    pub affordance: InputAffordance,
}

/// Inputs to one layout pass.
#[derive(Debug, Clone, Copy)]
pub struct LayoutInput<'a> {
    pub content: &'a str,
    /// Current box width.
    pub width: f64,
    /// Current box height.
    pub height: f64,
    /// Wrap limit for `Auto`, overriding the box width.
    pub wrap_limit: Option<f64>,
    pub split_budget: usize,
    pub measurer: Measurer<'a>,
}

/// Lines and box extents produced by a pass.
///
/// Authoritative extents are echoed back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOutcome {
    pub lines: Vec<String>,
    pub width: f64,
    pub height: f64,
    /// Number of break passes run (2 when `AutoHeight` had to derive its width).
    pub passes: u8,
}

/// Run one layout pass under `kind`.
pub fn layout_pass(
    kind: PolicyKind,
    input: &LayoutInput<'_>,
) -> Result<LayoutOutcome, LayoutError> {
    let m = &input.measurer;
    let leading = m.font().leading;
    let outcome = match kind {
        PolicyKind::Fixed => {
            let options = BreakOptions::new(input.width).split_budget(input.split_budget);
            LayoutOutcome {
                lines: break_words(input.content, &options, m)?,
                width: input.width,
                height: input.height,
                passes: 1,
            }
        }
        PolicyKind::AutoWidth => {
            let line = single_line(input.content);
            LayoutOutcome {
                width: m.width(&line),
                height: leading,
                lines: vec![line],
                passes: 1,
            }
        }
        PolicyKind::AutoHeight => {
            let (width, passes) = if input.width > 0.0 {
                (input.width, 1)
            } else {
                // Unbounded fill gives each paragraph its natural line,
                // trailing space included, so the second pass keeps them whole.
                let natural = BreakOptions::new(f64::INFINITY).split_budget(input.split_budget);
                let lines = break_paragraphs(input.content, &natural, m)?;
                (widest_line(&lines, m), 2)
            };
            let options = BreakOptions::new(width).split_budget(input.split_budget);
            let lines = break_paragraphs(input.content, &options, m)?;
            LayoutOutcome {
                height: leading * lines.len() as f64,
                lines,
                width,
                passes,
            }
        }
        PolicyKind::Auto => {
            // A zero width is not settled yet: lines only break at newlines.
            let limit = input.wrap_limit.or((input.width > 0.0).then_some(input.width));
            let lines = break_explicit(input.content, limit, input.split_budget, m)?;
            LayoutOutcome {
                width: widest_line(&lines, m),
                height: leading * lines.len() as f64,
                lines,
                passes: 1,
            }
        }
    };
    tracing::trace!(
        policy = %kind,
        lines = outcome.lines.len(),
        width = outcome.width,
        height = outcome.height,
        passes = outcome.passes,
        "layout pass"
    );
    Ok(outcome)
}
