#![forbid(unsafe_code)]

//! Text measurement and line breaking for reflowable text boxes.
//!
//! - [`measure`]: font state, the host-supplied width oracle, and a cached
//!   oracle wrapper.
//! - [`wrap`]: word wrap with forced grapheme splitting, paragraph wrap,
//!   explicit-newline breaking, and the [`LayoutError`] they report.
//! - [`buffer`]: the caret-tracking rope buffer behind editable surfaces.

pub mod buffer;
pub mod measure;
pub mod wrap;

pub use buffer::EditBuffer;
pub use measure::{CachedOracle, FontState, MeasurementOracle, Measurer, MonospaceOracle};
pub use wrap::{
    BreakOptions, DEFAULT_SPLIT_BUDGET, LayoutError, break_explicit, break_paragraphs,
    break_words, single_line, widest_line,
};
