#![forbid(unsafe_code)]

//! Line breaking under a pixel width constraint.
//!
//! Three breaking strategies are provided, one per way a bounds policy
//! treats newlines:
//!
//! - [`break_words`]: newlines become spaces, then greedy word wrap.
//! - [`break_paragraphs`]: newlines are hard breaks, each paragraph is
//!   word-wrapped on its own.
//! - [`break_explicit`]: newlines are the only breaks; lines wider than an
//!   optional limit are split at their last fitting space.
//!
//! Word wrap runs a forced-splitting pre-pass first, so no token handed to
//! the greedy fill is wider than the limit on its own. Tokens that cannot be
//! split (a single grapheme wider than the limit, or a limit of zero) are
//! reported as [`LayoutError`] instead of looping.
//!
//! # Example
//! ```
//! use reflow_text::measure::{FontState, Measurer};
//! use reflow_text::wrap::{break_words, BreakOptions};
//!
//! let px = |_: &FontState, s: &str| s.chars().count() as f64 * 10.0;
//! let font = FontState::default();
//! let m = Measurer::new(&px, &font);
//!
//! let lines = break_words("hello big world", &BreakOptions::new(100.0), &m).unwrap();
//! assert_eq!(lines, vec!["hello big ", "world "]);
//! ```

use std::collections::VecDeque;
use std::fmt;

use unicode_segmentation::UnicodeSegmentation;

use crate::measure::Measurer;

/// Default cap on forced splits in one layout pass.
pub const DEFAULT_SPLIT_BUDGET: usize = 10_000;

/// Layout failure caused by a width/font combination that cannot be honored.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// Forced splitting stopped making progress or ran out of budget.
    ///
    /// Typically a single grapheme is wider than `max_width`.
    SplitDidNotTerminate {
        token: String,
        max_width: f64,
        splits: usize,
    },
    /// A token exceeds the width but no grapheme could be removed from it.
    Unshortenable { token: String, max_width: f64 },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SplitDidNotTerminate {
                token,
                max_width,
                splits,
            } => write!(
                f,
                "forced split of {token:?} did not terminate at width {max_width} after {splits} splits"
            ),
            Self::Unshortenable { token, max_width } => {
                write!(f, "token {token:?} cannot be shortened to width {max_width}")
            }
        }
    }
}

impl std::error::Error for LayoutError {}

/// Options for one breaking pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakOptions {
    /// Maximum line width in pixels.
    pub max_width: f64,
    /// Maximum number of forced splits before giving up.
    pub split_budget: usize,
}

impl BreakOptions {
    #[must_use]
    pub fn new(max_width: f64) -> Self {
        Self {
            max_width,
            split_budget: DEFAULT_SPLIT_BUDGET,
        }
    }

    #[must_use]
    pub fn split_budget(mut self, budget: usize) -> Self {
        self.split_budget = budget;
        self
    }
}

/// Word wrap with newlines flattened to spaces.
///
/// Always returns at least one line; empty content yields `[""]`. Lines keep
/// the trailing space appended after every token.
pub fn break_words(
    text: &str,
    options: &BreakOptions,
    measurer: &Measurer<'_>,
) -> Result<Vec<String>, LayoutError> {
    let flattened = text.replace('\n', " ");
    LineBreaker::new(measurer, options.split_budget).words(&flattened, options.max_width)
}

/// Word wrap with newlines kept as hard breaks.
///
/// Every paragraph contributes at least one line, so `"a\n\nb"` yields three.
pub fn break_paragraphs(
    text: &str,
    options: &BreakOptions,
    measurer: &Measurer<'_>,
) -> Result<Vec<String>, LayoutError> {
    let mut breaker = LineBreaker::new(measurer, options.split_budget);
    let mut lines = Vec::new();
    for paragraph in paragraphs(text) {
        lines.extend(breaker.words(paragraph, options.max_width)?);
    }
    Ok(lines)
}

/// Split on newlines only; optionally split lines wider than `limit`.
///
/// An overflowing line is split at the last space at or before its overflow
/// point. If that space is the line's final character the previous space is
/// used instead. A line with no usable space is force split like a token.
pub fn break_explicit(
    text: &str,
    limit: Option<f64>,
    split_budget: usize,
    measurer: &Measurer<'_>,
) -> Result<Vec<String>, LayoutError> {
    let mut breaker = LineBreaker::new(measurer, split_budget);
    let mut lines = Vec::new();
    for line in paragraphs(text) {
        match limit {
            Some(limit) => breaker.split_overflowing(line, limit, &mut lines)?,
            None => lines.push(line.to_owned()),
        }
    }
    Ok(lines)
}

/// Collapse content onto one line by stripping newlines.
#[must_use]
pub fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], "")
}

/// Measured width of the widest line, or 0 for no lines.
#[must_use]
pub fn widest_line(lines: &[String], measurer: &Measurer<'_>) -> f64 {
    lines
        .iter()
        .map(|line| measurer.width(line))
        .fold(0.0, f64::max)
}

/// Forced-splitting pre-pass over a token list.
///
/// Every returned token is no wider than `max_width`; concatenating them
/// reproduces the input.
pub fn force_split(
    tokens: impl IntoIterator<Item = String>,
    options: &BreakOptions,
    measurer: &Measurer<'_>,
) -> Result<Vec<String>, LayoutError> {
    LineBreaker::new(measurer, options.split_budget).force_split(tokens, options.max_width)
}

fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// Per-pass breaking state: the measurer and the shared split budget.
struct LineBreaker<'m, 'a> {
    measurer: &'m Measurer<'a>,
    budget: usize,
    splits: usize,
}

impl<'m, 'a> LineBreaker<'m, 'a> {
    fn new(measurer: &'m Measurer<'a>, budget: usize) -> Self {
        Self {
            measurer,
            budget,
            splits: 0,
        }
    }

    fn words(&mut self, text: &str, max_width: f64) -> Result<Vec<String>, LayoutError> {
        let tokens = text
            .split(' ')
            .filter(|token| !token.is_empty())
            .map(str::to_owned);
        let tokens = self.force_split(tokens, max_width)?;
        Ok(self.fill(&tokens, max_width))
    }

    /// Greedy fill. A line is flushed only when the tentative line is
    /// strictly wider than `max_width`; equal widths stay on the line.
    fn fill(&self, tokens: &[String], max_width: f64) -> Vec<String> {
        let mut lines = Vec::new();
        let mut line = String::new();
        for token in tokens {
            let mut candidate = String::with_capacity(line.len() + token.len() + 1);
            candidate.push_str(&line);
            candidate.push_str(token);
            candidate.push(' ');
            if self.measurer.width(&candidate) > max_width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line.push_str(token);
                line.push(' ');
            } else {
                line = candidate;
            }
        }
        lines.push(line);
        lines
    }

    fn force_split(
        &mut self,
        tokens: impl IntoIterator<Item = String>,
        max_width: f64,
    ) -> Result<Vec<String>, LayoutError> {
        let mut pending: VecDeque<String> = tokens.into_iter().collect();
        let mut out = Vec::with_capacity(pending.len());
        while let Some(mut token) = pending.pop_front() {
            if self.measurer.width(&token) <= max_width {
                out.push(token);
                continue;
            }
            let continuation = self.shorten(&mut token, max_width)?;
            out.push(token);
            pending.push_front(continuation);
        }
        Ok(out)
    }

    /// Pop trailing graphemes off `token` until it fits and return them as
    /// the continuation. `token` is left non-empty on success.
    fn shorten(&mut self, token: &mut String, max_width: f64) -> Result<String, LayoutError> {
        let mut popped: Vec<String> = Vec::new();
        while self.measurer.width(token) > max_width {
            let Some((idx, grapheme)) = token.grapheme_indices(true).next_back() else {
                break;
            };
            popped.push(grapheme.to_owned());
            token.truncate(idx);
        }
        if popped.is_empty() {
            return Err(LayoutError::Unshortenable {
                token: std::mem::take(token),
                max_width,
            });
        }
        let continuation: String = popped.into_iter().rev().collect();
        if token.is_empty() {
            // The whole token moved to the continuation: retrying would loop.
            return Err(LayoutError::SplitDidNotTerminate {
                token: continuation,
                max_width,
                splits: self.splits,
            });
        }
        self.splits += 1;
        if self.splits > self.budget {
            return Err(LayoutError::SplitDidNotTerminate {
                token: continuation,
                max_width,
                splits: self.splits,
            });
        }
        tracing::trace!(
            head = %token,
            tail = %continuation,
            max_width,
            "forced split"
        );
        Ok(continuation)
    }

    fn split_overflowing(
        &mut self,
        line: &str,
        limit: f64,
        out: &mut Vec<String>,
    ) -> Result<(), LayoutError> {
        let mut rest = line.to_owned();
        while self.measurer.width(&rest) > limit {
            let mut head = rest.clone();
            let tail = self.shorten(&mut head, limit)?;
            let overflow = head.len();
            match last_usable_space(&rest, overflow) {
                Some(space) => {
                    let remainder = rest[space + 1..].to_owned();
                    rest.truncate(space);
                    out.push(std::mem::replace(&mut rest, remainder));
                }
                None => {
                    out.push(head);
                    rest = tail;
                }
            }
        }
        out.push(rest);
        Ok(())
    }
}

/// Last space at or before byte offset `overflow` that leaves both halves
/// non-empty. A space that is the line's final character is skipped.
fn last_usable_space(line: &str, overflow: usize) -> Option<usize> {
    let window_end = if line[overflow..].starts_with(' ') {
        overflow + 1
    } else {
        overflow
    };
    line[..window_end]
        .rmatch_indices(' ')
        .map(|(idx, _)| idx)
        .find(|&idx| idx > 0 && idx + 1 < line.len())
}
