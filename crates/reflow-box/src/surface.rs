#![forbid(unsafe_code)]

//! Editable surfaces overlaid on a box while it is in edit mode.
//!
//! The box never edits text itself. On edit entry it asks a
//! [`SurfaceHost`] for a surface, hands it the content, and routes input
//! events to it; on exit it reads the value back and releases the surface.
//! A host holds at most one surface per box.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use reflow_text::{EditBuffer, FontState};
use rustc_hash::FxHashMap;

use crate::geometry::Rect;
use crate::policy::{InputAffordance, SurfaceHeight};

static NEXT_BOX_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique text box identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxId(u64);

impl BoxId {
    pub(crate) fn next() -> Self {
        Self(NEXT_BOX_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "box#{}", self.0)
    }
}

/// One user edit routed to a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Text typed or pasted at the caret.
    Insert(String),
    /// Backspace: remove the grapheme before the caret.
    DeleteBackward,
    /// Delete: remove the grapheme after the caret.
    DeleteForward,
    /// Replace the whole value, caret at the end.
    Replace(String),
}

/// Placement and styling of a surface, mirrored from its box.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceFrame {
    pub rect: Rect,
    pub height: SurfaceHeight,
    pub font: FontState,
    /// Leading as a multiple of the font size.
    pub line_height: f64,
    pub affordance: InputAffordance,
}

/// A host-side text editing control.
pub trait EditSurface {
    /// Current text.
    fn value(&self) -> String;

    /// Replace the text and move the caret to its end.
    fn set_value(&mut self, value: &str);

    fn apply_input(&mut self, event: &InputEvent);

    /// Reposition and restyle after the box geometry changed.
    fn set_frame(&mut self, frame: &SurfaceFrame);
}

/// Creates surfaces for a [`SurfaceHost`].
pub trait SurfaceFactory {
    fn create(&self, frame: &SurfaceFrame) -> Box<dyn EditSurface>;
}

impl<F> SurfaceFactory for F
where
    F: Fn(&SurfaceFrame) -> Box<dyn EditSurface>,
{
    fn create(&self, frame: &SurfaceFrame) -> Box<dyn EditSurface> {
        self(frame)
    }
}

/// In-process surface backed by an [`EditBuffer`].
///
/// Single-line frames drop newlines from everything written to the buffer.
#[derive(Debug, Clone, Default)]
pub struct RopeSurface {
    buffer: EditBuffer,
    frame: Option<SurfaceFrame>,
}

impl RopeSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_frame(frame: &SurfaceFrame) -> Self {
        Self {
            frame: Some(frame.clone()),
            ..Self::default()
        }
    }

    /// Caret position in characters.
    #[must_use]
    pub fn caret(&self) -> usize {
        self.buffer.caret()
    }

    #[must_use]
    pub fn frame(&self) -> Option<&SurfaceFrame> {
        self.frame.as_ref()
    }

    fn single_line(&self) -> bool {
        self.frame
            .as_ref()
            .is_some_and(|frame| !frame.affordance.accepts_newlines())
    }

    fn admit<'s>(&self, text: &'s str) -> std::borrow::Cow<'s, str> {
        if self.single_line() && text.contains(['\r', '\n']) {
            std::borrow::Cow::Owned(reflow_text::single_line(text))
        } else {
            std::borrow::Cow::Borrowed(text)
        }
    }
}

impl EditSurface for RopeSurface {
    fn value(&self) -> String {
        self.buffer.to_string()
    }

    fn set_value(&mut self, value: &str) {
        let value = self.admit(value).into_owned();
        self.buffer.set_text(&value);
    }

    fn apply_input(&mut self, event: &InputEvent) {
        match event {
            InputEvent::Insert(text) => {
                let text = self.admit(text).into_owned();
                self.buffer.insert(&text);
            }
            InputEvent::DeleteBackward => {
                self.buffer.backspace();
            }
            InputEvent::DeleteForward => {
                self.buffer.delete();
            }
            InputEvent::Replace(value) => self.set_value(value),
        }
    }

    fn set_frame(&mut self, frame: &SurfaceFrame) {
        let became_single_line =
            !frame.affordance.accepts_newlines() && !self.single_line();
        self.frame = Some(frame.clone());
        if became_single_line {
            let value = self.value();
            self.set_value(&value);
        }
    }
}

/// Default factory producing [`RopeSurface`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RopeSurfaceFactory;

impl SurfaceFactory for RopeSurfaceFactory {
    fn create(&self, frame: &SurfaceFrame) -> Box<dyn EditSurface> {
        Box::new(RopeSurface::with_frame(frame))
    }
}

/// Shared handle to an open surface.
pub type SurfaceHandle = Rc<RefCell<Box<dyn EditSurface>>>;

struct HostInner {
    factory: Box<dyn SurfaceFactory>,
    active: FxHashMap<BoxId, SurfaceHandle>,
}

/// Registry of open surfaces, keyed by owning box.
///
/// Cloning creates another handle to the same registry.
#[derive(Clone)]
pub struct SurfaceHost {
    inner: Rc<RefCell<HostInner>>,
}

impl Default for SurfaceHost {
    fn default() -> Self {
        Self::new(RopeSurfaceFactory)
    }
}

impl fmt::Debug for SurfaceHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceHost")
            .field("active", &self.active_count())
            .finish_non_exhaustive()
    }
}

thread_local! {
    static GLOBAL_HOST: SurfaceHost = SurfaceHost::default();
}

impl SurfaceHost {
    #[must_use]
    pub fn new(factory: impl SurfaceFactory + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(HostInner {
                factory: Box::new(factory),
                active: FxHashMap::default(),
            })),
        }
    }

    /// The host shared by every box on this thread.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_HOST.with(Clone::clone)
    }

    /// Open the surface for `owner`, or reframe and return the one already
    /// open.
    pub fn open(&self, owner: BoxId, frame: &SurfaceFrame) -> SurfaceHandle {
        if let Some(existing) = self.surface(owner) {
            tracing::debug!(box_id = %owner, "surface already open; reusing");
            existing.borrow_mut().set_frame(frame);
            return existing;
        }
        let surface = self.inner.borrow().factory.create(frame);
        let handle: SurfaceHandle = Rc::new(RefCell::new(surface));
        self.inner
            .borrow_mut()
            .active
            .insert(owner, Rc::clone(&handle));
        tracing::debug!(
            box_id = %owner,
            affordance = frame.affordance.element_name(),
            "surface opened"
        );
        handle
    }

    /// Release the surface for `owner`, returning it if one was open.
    pub fn close(&self, owner: BoxId) -> Option<SurfaceHandle> {
        let closed = self.inner.borrow_mut().active.remove(&owner);
        if closed.is_some() {
            tracing::debug!(box_id = %owner, "surface closed");
        }
        closed
    }

    #[must_use]
    pub fn surface(&self, owner: BoxId) -> Option<SurfaceHandle> {
        self.inner.borrow().active.get(&owner).cloned()
    }

    #[must_use]
    pub fn is_open(&self, owner: BoxId) -> bool {
        self.inner.borrow().active.contains_key(&owner)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.borrow().active.len()
    }

    /// Whether both handles refer to the same registry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
