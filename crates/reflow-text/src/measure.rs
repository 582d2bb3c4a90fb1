#![forbid(unsafe_code)]

//! Font state and the width oracle consumed by the line breaker.
//!
//! The layout engine never rasterizes or shapes glyphs. The host supplies a
//! [`MeasurementOracle`] reporting the pixel width of a string under a
//! [`FontState`], and the breaker treats it as a pure function of those two
//! inputs.
//!
//! # Example
//! ```
//! use reflow_text::measure::{FontState, MonospaceOracle, Measurer};
//!
//! let font = FontState::new("monospace", 10.0);
//! let oracle = MonospaceOracle::new(0.5);
//! let m = Measurer::new(&oracle, &font);
//! assert_eq!(m.width("abcd"), 20.0);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Default ratio between leading and font size.
pub const DEFAULT_LEADING_RATIO: f64 = 1.2;

/// Font parameters handed to the oracle.
///
/// Opaque to the breaker: it only forwards them. `leading` is the baseline
/// to baseline distance used by the bounds policies to derive heights.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontState {
    pub family: String,
    /// Font size in pixels.
    pub size: f64,
    /// Numeric weight (400 = normal, 700 = bold).
    pub weight: u16,
    /// Distance between consecutive baselines, in pixels.
    pub leading: f64,
    /// Extra advance added after every grapheme, in pixels.
    pub letter_spacing: f64,
}

impl Default for FontState {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_owned(),
            size: 12.0,
            weight: 400,
            leading: 14.4,
            letter_spacing: 0.0,
        }
    }
}

impl FontState {
    /// Font with the given family and size; leading defaults to 1.2 × size.
    #[must_use]
    pub fn new(family: impl Into<String>, size: f64) -> Self {
        Self {
            family: family.into(),
            size,
            leading: size * DEFAULT_LEADING_RATIO,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub fn with_leading(mut self, leading: f64) -> Self {
        self.leading = leading;
        self
    }

    #[must_use]
    pub fn with_letter_spacing(mut self, spacing: f64) -> Self {
        self.letter_spacing = spacing;
        self
    }

    /// Leading expressed as a multiple of the font size.
    ///
    /// Returns 1.0 for a zero or negative size.
    #[must_use]
    pub fn line_height_ratio(&self) -> f64 {
        if self.size > 0.0 {
            self.leading / self.size
        } else {
            1.0
        }
    }
}

impl fmt::Display for FontState {
    /// CSS font shorthand, e.g. `400 12px sans-serif`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}px {}", self.weight, self.size, self.family)
    }
}

/// Reports the rendered width of a string under a font.
///
/// Implementations must be deterministic for a given `(font, text)` pair.
/// Any `Fn(&FontState, &str) -> f64` closure is an oracle.
pub trait MeasurementOracle {
    /// Width of `text` in pixels.
    fn measure(&self, font: &FontState, text: &str) -> f64;
}

impl<F> MeasurementOracle for F
where
    F: Fn(&FontState, &str) -> f64,
{
    fn measure(&self, font: &FontState, text: &str) -> f64 {
        self(font, text)
    }
}

/// Fixed-advance oracle for headless hosts.
///
/// Every display cell advances `advance × font.size` pixels; wide (CJK)
/// characters occupy two cells. Letter spacing is applied per grapheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceOracle {
    advance: f64,
}

impl Default for MonospaceOracle {
    fn default() -> Self {
        Self::new(0.6)
    }
}

impl MonospaceOracle {
    /// Oracle with the given per-cell advance, in ems.
    #[must_use]
    pub const fn new(advance: f64) -> Self {
        Self { advance }
    }

    #[must_use]
    pub const fn advance(&self) -> f64 {
        self.advance
    }
}

impl MeasurementOracle for MonospaceOracle {
    fn measure(&self, font: &FontState, text: &str) -> f64 {
        let cells = text.width() as f64;
        let spacing = if font.letter_spacing == 0.0 {
            0.0
        } else {
            text.graphemes(true).count() as f64 * font.letter_spacing
        };
        cells * font.size * self.advance + spacing
    }
}

/// LRU cache in front of another oracle.
///
/// Entries are only valid for the font they were measured with: the whole
/// cache is flushed the first time a different [`FontState`] is seen.
pub struct CachedOracle<O> {
    inner: O,
    state: RefCell<CacheState>,
}

struct CacheState {
    font: Option<FontState>,
    entries: LruCache<String, f64>,
}

impl<O: MeasurementOracle> CachedOracle<O> {
    /// Wrap `inner`, keeping at most `capacity` measurements (minimum 1).
    #[must_use]
    pub fn new(inner: O, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            state: RefCell::new(CacheState {
                font: None,
                entries: LruCache::new(capacity),
            }),
        }
    }

    /// Number of cached measurements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached measurement.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.entries.clear();
        state.font = None;
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<O: MeasurementOracle> MeasurementOracle for CachedOracle<O> {
    fn measure(&self, font: &FontState, text: &str) -> f64 {
        {
            let mut state = self.state.borrow_mut();
            if state.font.as_ref() != Some(font) {
                if state.font.is_some() {
                    tracing::trace!(
                        flushed = state.entries.len(),
                        font = %font,
                        "measurement cache flushed on font change"
                    );
                }
                state.entries.clear();
                state.font = Some(font.clone());
            } else if let Some(width) = state.entries.get(text) {
                return *width;
            }
        }
        // The borrow is released so a re-entrant inner oracle cannot panic.
        let width = self.inner.measure(font, text);
        self.state.borrow_mut().entries.put(text.to_owned(), width);
        width
    }
}

impl<O> fmt::Debug for CachedOracle<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CachedOracle")
            .field("font", &state.font)
            .field("entries", &state.entries.len())
            .field("capacity", &state.entries.cap())
            .finish_non_exhaustive()
    }
}

/// An oracle bound to one font for the duration of a layout pass.
#[derive(Clone, Copy)]
pub struct Measurer<'a> {
    oracle: &'a dyn MeasurementOracle,
    font: &'a FontState,
}

impl<'a> Measurer<'a> {
    #[must_use]
    pub fn new(oracle: &'a dyn MeasurementOracle, font: &'a FontState) -> Self {
        Self { oracle, font }
    }

    /// Width of `text` under the bound font.
    #[inline]
    #[must_use]
    pub fn width(&self, text: &str) -> f64 {
        self.oracle.measure(self.font, text)
    }

    #[must_use]
    pub fn font(&self) -> &'a FontState {
        self.font
    }
}

impl fmt::Debug for Measurer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Measurer")
            .field("font", self.font)
            .finish_non_exhaustive()
    }
}
