#![forbid(unsafe_code)]

//! Error taxonomy for text box operations.
//!
//! | Error | Cause | Recovery |
//! |-------|-------|----------|
//! | `InvalidPolicy` | unknown bounds-policy name | caller bug |
//! | `NotCallable` | listener registration without a callback | caller bug |
//! | `Layout` | width/font combination cannot be honored | adjust width or content, then lay out again |
//! | `Unmeasured` | geometry requested before an oracle was attached | attach an oracle |
//! | `InvalidJustification`, `InvalidEditElement` | unknown name | caller bug |
//!
//! Every error is raised by the call that violated the contract; none is
//! deferred to a later layout pass.

use std::fmt;

use reflow_text::LayoutError;

/// Errors from [`TextBox`](crate::TextBox) operations.
#[derive(Debug, Clone, PartialEq)]
pub enum TextBoxError {
    /// A bounds-policy name outside `fixed`, `auto-width`, `auto-height`, `auto`.
    InvalidPolicy(String),
    /// A listener registration carried no callback.
    NotCallable { channel: &'static str },
    /// Line breaking failed.
    Layout(LayoutError),
    /// Layout was requested but no measurement oracle was ever attached.
    Unmeasured,
    /// A justification name outside `left`, `center`, `right`.
    InvalidJustification(String),
    /// An edit element name outside `input`, `textarea`.
    InvalidEditElement(String),
}

impl fmt::Display for TextBoxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPolicy(name) => write!(
                f,
                "bounds policy '{name}' is not one of fixed, auto-width, auto-height, auto"
            ),
            Self::NotCallable { channel } => {
                write!(f, "listener for channel '{channel}' is not callable")
            }
            Self::Layout(err) => write!(f, "layout failed: {err}"),
            Self::Unmeasured => f.write_str("no measurement oracle attached"),
            Self::InvalidJustification(name) => write!(
                f,
                "justification '{name}' is not one of left, center, right"
            ),
            Self::InvalidEditElement(name) => {
                write!(f, "edit element '{name}' is not one of input, textarea")
            }
        }
    }
}

impl std::error::Error for TextBoxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Layout(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LayoutError> for TextBoxError {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_names_the_allowed_set() {
        let err = TextBoxError::InvalidPolicy("stretchy".into());
        assert_eq!(
            err.to_string(),
            "bounds policy 'stretchy' is not one of fixed, auto-width, auto-height, auto"
        );
    }

    #[test]
    fn layout_error_is_the_source() {
        let inner = LayoutError::Unshortenable {
            token: "x".into(),
            max_width: 0.0,
        };
        let err = TextBoxError::from(inner.clone());
        assert_eq!(err, TextBoxError::Layout(inner));
        assert!(err.source().is_some());
        assert!(TextBoxError::Unmeasured.source().is_none());
    }
}
