#![forbid(unsafe_code)]

//! Caret-tracking text buffer for editable surfaces.
//!
//! Text is held in a `ropey::Rope`; the caret is a character index that is
//! kept inside `0..=len_chars()` by every operation. Deleting removes a whole
//! grapheme cluster, so backspace never strands a combining mark.

use std::fmt;

use ropey::Rope;
use unicode_segmentation::UnicodeSegmentation;

/// Inserts of at least this many bytes are logged.
const LARGE_EDIT_BYTES: usize = 10_000;

#[derive(Clone, Debug, Default)]
pub struct EditBuffer {
    text: Rope,
    caret: usize,
}

impl EditBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer holding `text` with the caret at its end.
    #[must_use]
    pub fn with_text(text: &str) -> Self {
        let text = Rope::from_str(text);
        let caret = text.len_chars();
        Self { text, caret }
    }

    /// Caret position in characters.
    #[inline]
    #[must_use]
    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Move the caret, clamped to the end of the text.
    pub fn set_caret(&mut self, char_idx: usize) {
        self.caret = char_idx.min(self.text.len_chars());
    }

    #[inline]
    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.len_bytes() == 0
    }

    /// `\n` count plus one; a trailing newline opens an empty last line.
    #[must_use]
    pub fn line_count(&self) -> usize {
        1 + self.text.chars().filter(|&c| c == '\n').count()
    }

    #[must_use]
    pub fn grapheme_count(&self) -> usize {
        self.to_string().graphemes(true).count()
    }

    /// Insert at the caret and move the caret past the insertion.
    pub fn insert(&mut self, text: &str) {
        if text.len() >= LARGE_EDIT_BYTES {
            tracing::debug!(bytes = text.len(), caret = self.caret, "large insert");
        }
        self.text.insert(self.caret, text);
        self.caret += text.chars().count();
    }

    /// Remove the grapheme cluster before the caret. Returns whether
    /// anything was removed.
    pub fn backspace(&mut self) -> bool {
        let head = self.text.slice(..self.caret).to_string();
        let Some(cluster) = head.graphemes(true).next_back() else {
            return false;
        };
        let start = self.caret - cluster.chars().count();
        self.text.remove(start..self.caret);
        self.caret = start;
        true
    }

    /// Remove the grapheme cluster after the caret. Returns whether
    /// anything was removed.
    pub fn delete(&mut self) -> bool {
        let tail = self.text.slice(self.caret..).to_string();
        let Some(cluster) = tail.graphemes(true).next() else {
            return false;
        };
        let end = self.caret + cluster.chars().count();
        self.text.remove(self.caret..end);
        true
    }

    /// Replace everything and put the caret at the end.
    pub fn set_text(&mut self, text: &str) {
        if text.len() >= LARGE_EDIT_BYTES {
            tracing::debug!(bytes = text.len(), "large replace");
        }
        *self = Self::with_text(text);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for EditBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.text.chunks().try_for_each(|chunk| f.write_str(chunk))
    }
}

impl From<&str> for EditBuffer {
    fn from(text: &str) -> Self {
        Self::with_text(text)
    }
}
