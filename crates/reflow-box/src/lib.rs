#![forbid(unsafe_code)]

//! Reflowable text boxes.
//!
//! A [`TextBox`] breaks its content into lines under one of four
//! [`PolicyKind`]s and toggles between a normal mode, where it owns the
//! content, and an edit mode, where an [`EditSurface`] does.
//!
//! # Example
//! ```
//! use reflow_box::{PolicyKind, Rect, SurfaceHost, TextBox};
//! use reflow_text::MonospaceOracle;
//!
//! let mut text_box = TextBox::new(Rect::new(0.0, 0.0, 0.0, 0.0))
//!     .with_host(SurfaceHost::default())
//!     .with_oracle(MonospaceOracle::default());
//! text_box.set_bounds_policy(PolicyKind::AutoWidth).unwrap();
//! text_box.set_content("one\ntwo");
//! assert_eq!(text_box.lines().unwrap(), ["onetwo"]);
//! assert!(text_box.width() > 0.0);
//! ```
//!
//! The types are `!Send`: every box, registry and surface host lives on the
//! thread that created it.

pub mod config;
pub mod error;
pub mod geometry;
pub mod listeners;
pub mod policy;
pub mod surface;
pub mod text_box;

pub use config::{ConfigError, TextBoxConfig, TextBoxConfigParse};
pub use error::TextBoxError;
pub use geometry::{Point, Rect, Size};
pub use listeners::{ListenerFailure, ListenerId, ListenerRegistry, Registration};
pub use policy::{
    Extent, InputAffordance, LayoutInput, LayoutOutcome, MeasureWidth, PolicyKind, PolicyRules,
    SurfaceHeight, layout_pass,
};
pub use surface::{
    BoxId, EditSurface, InputEvent, RopeSurface, RopeSurfaceFactory, SurfaceFactory,
    SurfaceFrame, SurfaceHandle, SurfaceHost,
};
pub use text_box::{ChangeKind, Justification, Mode, TextBox, TextBoxInit};
