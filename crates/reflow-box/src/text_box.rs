#![forbid(unsafe_code)]

//! A reflowable text box and its edit-mode controller.
//!
//! # Design
//!
//! [`TextBox`] owns its content, rectangle and bounds policy. Line breaking
//! is lazy: mutations set a dirty flag and the next [`TextBox::lines`] call
//! runs one [`layout_pass`]. Policies that derive an extent write it back
//! into the rectangle during that pass.
//!
//! In edit mode the content lives in an [`EditSurface`] opened through the
//! box's [`SurfaceHost`]; the box's own content is empty until the surface
//! value is read back on exit. Input routed through
//! [`TextBox::handle_input`] resizes auto-sized boxes live.
//!
//! # Failure Modes
//!
//! - **No oracle**: geometry queries fail with [`TextBoxError::Unmeasured`].
//!   Entering and leaving edit mode still work; the re-layout on exit is
//!   skipped.
//! - **Unbreakable content**: the layout call fails with
//!   [`TextBoxError::Layout`] and the box stays dirty.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use reflow_text::{CachedOracle, FontState, MeasurementOracle, Measurer};

use crate::config::TextBoxConfig;
use crate::error::TextBoxError;
use crate::geometry::{Point, Rect, Size};
use crate::listeners::{ListenerRegistry, Registration};
use crate::policy::{InputAffordance, LayoutInput, LayoutOutcome, PolicyKind, layout_pass};
use crate::surface::{BoxId, InputEvent, SurfaceFrame, SurfaceHandle, SurfaceHost};

const EDIT_INPUT_CHANNEL: &str = "edit-input";
const EDIT_MODE_CHANNEL: &str = "edit-mode";
const CHANGE_CHANNEL: &str = "change";

/// Whether the box or its editable surface owns the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Normal,
    Edit,
}

impl Mode {
    #[must_use]
    pub const fn is_edit(self) -> bool {
        matches!(self, Self::Edit)
    }
}

/// Horizontal alignment of lines against the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Justification {
    #[default]
    Left,
    Center,
    Right,
}

impl Justification {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for Justification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Justification {
    type Err = TextBoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            other => Err(TextBoxError::InvalidJustification(other.to_owned())),
        }
    }
}

/// What a host needs to repaint after a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Content, font or line cache changed.
    Content,
    /// The rectangle moved or was resized.
    Geometry,
}

/// Field-wise initializer, as read from a serialized item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextBoxInit {
    pub policy: PolicyKind,
    pub origin: Point,
    pub width: f64,
    pub height: f64,
    /// Content lines, joined with `\n`.
    pub lines: Vec<String>,
}

/// A text item constrained by a rectangle and a bounds policy.
pub struct TextBox {
    id: BoxId,
    content: String,
    rect: Rect,
    policy: PolicyKind,
    lines: Vec<String>,
    dirty: bool,
    mode: Mode,
    font: FontState,
    justification: Justification,
    affordance: InputAffordance,
    wrap_limit: Option<f64>,
    split_budget: usize,
    cache_capacity: usize,
    oracle: Option<Rc<dyn MeasurementOracle>>,
    host: SurfaceHost,
    surface: Option<SurfaceHandle>,
    edit_input: ListenerRegistry<InputEvent>,
    mode_change: ListenerRegistry<bool>,
    changes: ListenerRegistry<ChangeKind>,
}

impl fmt::Debug for TextBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextBox")
            .field("id", &self.id)
            .field("content", &self.content)
            .field("rect", &self.rect)
            .field("policy", &self.policy)
            .field("mode", &self.mode)
            .field("dirty", &self.dirty)
            .field("lines", &self.lines.len())
            .field("measured", &self.oracle.is_some())
            .finish_non_exhaustive()
    }
}

impl TextBox {
    /// Empty box with default settings, using the thread's surface host.
    #[must_use]
    pub fn new(rect: Rect) -> Self {
        Self::from_config(rect, &TextBoxConfig::default())
    }

    #[must_use]
    pub fn from_config(rect: Rect, config: &TextBoxConfig) -> Self {
        Self {
            id: BoxId::next(),
            content: String::new(),
            rect,
            policy: config.policy,
            lines: Vec::new(),
            dirty: true,
            mode: Mode::Normal,
            font: config.font.clone(),
            justification: config.justification,
            affordance: config.policy.rules().affordance,
            wrap_limit: config.auto_wrap_limit,
            split_budget: config.split_budget,
            cache_capacity: config.measure_cache_capacity,
            oracle: None,
            host: SurfaceHost::global(),
            surface: None,
            edit_input: ListenerRegistry::new(EDIT_INPUT_CHANNEL),
            mode_change: ListenerRegistry::new(EDIT_MODE_CHANNEL),
            changes: ListenerRegistry::new(CHANGE_CHANNEL),
        }
    }

    #[must_use]
    pub fn from_init(init: TextBoxInit) -> Self {
        let rect = Rect::from_origin_size(init.origin, Size::new(init.width, init.height));
        let config = TextBoxConfig {
            policy: init.policy,
            ..TextBoxConfig::default()
        };
        let mut text_box = Self::from_config(rect, &config);
        text_box.content = init.lines.join("\n");
        text_box
    }

    /// Use `host` for edit surfaces. Call before entering edit mode.
    #[must_use]
    pub fn with_host(mut self, host: SurfaceHost) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub fn with_oracle(mut self, oracle: impl MeasurementOracle + 'static) -> Self {
        self.set_oracle(oracle);
        self
    }

    /// Attach a measurement oracle, wrapped in a per-box cache unless the
    /// configured cache capacity is 0.
    pub fn set_oracle(&mut self, oracle: impl MeasurementOracle + 'static) {
        let oracle: Rc<dyn MeasurementOracle> = if self.cache_capacity > 0 {
            Rc::new(CachedOracle::new(oracle, self.cache_capacity))
        } else {
            Rc::new(oracle)
        };
        self.set_shared_oracle(oracle);
    }

    /// Attach an oracle shared with other boxes, without a per-box cache.
    pub fn set_shared_oracle(&mut self, oracle: Rc<dyn MeasurementOracle>) {
        self.oracle = Some(oracle);
        self.dirty = true;
    }

    #[must_use]
    pub fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    #[must_use]
    pub fn id(&self) -> BoxId {
        self.id
    }

    #[must_use]
    pub fn host(&self) -> &SurfaceHost {
        &self.host
    }

    // --- content -------------------------------------------------------

    /// The box's own content. Empty while editing.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replace the content. While editing, the text goes to the open
    /// surface instead and is read back on exit.
    pub fn set_content(&mut self, content: impl Into<String>) {
        let content = content.into();
        if let Some(surface) = &self.surface {
            surface.borrow_mut().set_value(&content);
            return;
        }
        self.replace_content(content);
    }

    fn replace_content(&mut self, content: String) {
        self.content = content;
        self.dirty = true;
        self.emit(ChangeKind::Content);
    }

    // --- geometry ------------------------------------------------------

    #[must_use]
    pub fn rectangle(&self) -> Rect {
        self.rect
    }

    pub fn set_rectangle(&mut self, rect: Rect) {
        self.rect = rect;
        self.dirty = true;
        self.geometry_changed();
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.rect.width
    }

    pub fn set_width(&mut self, width: f64) {
        self.set_rectangle(self.rect.with_width(width));
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.rect.height
    }

    pub fn set_height(&mut self, height: f64) {
        self.set_rectangle(self.rect.with_height(height));
    }

    /// Move without resizing. Lines are kept.
    pub fn move_to(&mut self, origin: Point) {
        self.rect = Rect::from_origin_size(origin, self.rect.size());
        self.geometry_changed();
    }

    /// Local bounds: the rectangle's size at the origin.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(Point::default(), self.rect.size())
    }

    /// Where the first baseline starts, relative to the box origin.
    #[must_use]
    pub fn anchor(&self) -> Point {
        let x = match self.justification {
            Justification::Left => 0.0,
            Justification::Center => self.rect.width / 2.0,
            Justification::Right => self.rect.width,
        };
        Point::new(x, self.font.size)
    }

    fn geometry_changed(&mut self) {
        self.sync_surface_frame();
        self.emit(ChangeKind::Geometry);
    }

    // --- policy --------------------------------------------------------

    #[must_use]
    pub fn bounds_policy(&self) -> PolicyKind {
        self.policy
    }

    /// Switch policy. Size-deriving policies lay out immediately when an
    /// oracle is attached.
    ///
    /// # Errors
    ///
    /// [`TextBoxError::Layout`] when the eager layout fails.
    pub fn set_bounds_policy(&mut self, kind: PolicyKind) -> Result<(), TextBoxError> {
        let previous = self.policy;
        if previous == kind && kind == PolicyKind::Fixed && self.rect.width > 0.0 {
            return Ok(());
        }
        self.policy = kind;
        if previous == PolicyKind::AutoWidth || kind == PolicyKind::AutoWidth {
            self.affordance = kind.rules().affordance;
        }
        self.dirty = true;
        tracing::debug!(box_id = %self.id, from = %previous, to = %kind, "bounds policy changed");
        self.sync_surface_frame();

        if kind.derives_size() && self.oracle.is_some() {
            if self.mode.is_edit() {
                self.resize_from_surface()?;
            } else {
                self.relayout()?;
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`TextBoxError::InvalidPolicy`] for an unknown name; otherwise as
    /// [`set_bounds_policy`](Self::set_bounds_policy).
    pub fn set_bounds_policy_str(&mut self, name: &str) -> Result<(), TextBoxError> {
        self.set_bounds_policy(name.parse()?)
    }

    /// Explicit `Auto` wrap width, used instead of the box width.
    #[must_use]
    pub fn auto_wrap_limit(&self) -> Option<f64> {
        self.wrap_limit
    }

    pub fn set_auto_wrap_limit(&mut self, limit: Option<f64>) {
        self.wrap_limit = limit;
        self.dirty = true;
    }

    // --- layout --------------------------------------------------------

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Lay out if dirty and return the lines.
    ///
    /// # Errors
    ///
    /// [`TextBoxError::Unmeasured`] without an oracle,
    /// [`TextBoxError::Layout`] when breaking fails.
    pub fn layout(&mut self) -> Result<&[String], TextBoxError> {
        if self.dirty {
            self.relayout()?;
        }
        Ok(&self.lines)
    }

    /// Same as [`layout`](Self::layout).
    pub fn lines(&mut self) -> Result<&[String], TextBoxError> {
        self.layout()
    }

    /// Lines from the last successful pass, possibly stale.
    #[must_use]
    pub fn cached_lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines to paint. Under `Fixed`, lines starting below the box are
    /// dropped.
    pub fn visible_lines(&mut self) -> Result<&[String], TextBoxError> {
        let leading = self.font.leading;
        let height = self.rect.height;
        let clip = self.policy == PolicyKind::Fixed;
        let lines = self.layout()?;
        if !clip {
            return Ok(lines);
        }
        let visible = (0..lines.len())
            .take_while(|&i| i as f64 * leading <= height)
            .count();
        Ok(&lines[..visible])
    }

    /// Whether a host should paint the box at all.
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        !self.mode.is_edit() && !self.content.is_empty()
    }

    fn relayout(&mut self) -> Result<(), TextBoxError> {
        let outcome = self.run_pass(&self.content, self.rect.width)?;
        self.lines = outcome.lines;
        self.dirty = false;
        // The surface owns geometry while editing.
        if !self.mode.is_edit() {
            self.apply_extents(outcome.width, outcome.height);
        }
        tracing::debug!(
            box_id = %self.id,
            policy = %self.policy,
            lines = self.lines.len(),
            width = self.rect.width,
            height = self.rect.height,
            "layout"
        );
        Ok(())
    }

    fn run_pass(&self, content: &str, width: f64) -> Result<LayoutOutcome, TextBoxError> {
        let oracle = self.oracle.as_deref().ok_or(TextBoxError::Unmeasured)?;
        let input = LayoutInput {
            content,
            width,
            height: self.rect.height,
            wrap_limit: self.wrap_limit,
            split_budget: self.split_budget,
            measurer: Measurer::new(oracle, &self.font),
        };
        Ok(layout_pass(self.policy, &input)?)
    }

    fn apply_extents(&mut self, width: f64, height: f64) {
        if self.rect.width == width && self.rect.height == height {
            return;
        }
        self.rect = self.rect.with_width(width).with_height(height);
        self.geometry_changed();
    }

    // --- font and input affordance -------------------------------------

    #[must_use]
    pub fn font(&self) -> &FontState {
        &self.font
    }

    pub fn set_font(&mut self, font: FontState) {
        self.font = font;
        self.dirty = true;
        self.sync_surface_frame();
        self.emit(ChangeKind::Content);
    }

    #[must_use]
    pub fn leading(&self) -> f64 {
        self.font.leading
    }

    #[must_use]
    pub fn justification(&self) -> Justification {
        self.justification
    }

    pub fn set_justification(&mut self, justification: Justification) {
        self.justification = justification;
        self.emit(ChangeKind::Geometry);
    }

    /// # Errors
    ///
    /// [`TextBoxError::InvalidJustification`] for an unknown name.
    pub fn set_justification_str(&mut self, name: &str) -> Result<(), TextBoxError> {
        self.set_justification(name.parse()?);
        Ok(())
    }

    #[must_use]
    pub fn edit_element(&self) -> InputAffordance {
        self.affordance
    }

    pub fn set_input_affordance(&mut self, affordance: InputAffordance) {
        self.affordance = affordance;
        self.sync_surface_frame();
    }

    /// Pick the edit element by name: `input` or `textarea`.
    ///
    /// # Errors
    ///
    /// [`TextBoxError::InvalidEditElement`] for any other name.
    pub fn set_edit_element(&mut self, name: &str) -> Result<(), TextBoxError> {
        self.set_input_affordance(name.parse()?);
        Ok(())
    }

    // --- edit mode -----------------------------------------------------

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.mode.is_edit()
    }

    /// The open surface, while editing.
    #[must_use]
    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.surface.clone()
    }

    /// Enter (`Some(true)`), leave (`Some(false)`) or toggle (`None`) edit
    /// mode. Requesting the current mode only re-notifies mode listeners.
    ///
    /// # Errors
    ///
    /// [`TextBoxError::Layout`] when the re-layout after leaving fails. The
    /// box is back in normal mode with the edited content either way.
    pub fn set_edit_mode(&mut self, edit: Option<bool>) -> Result<(), TextBoxError> {
        let target = edit.unwrap_or(!self.mode.is_edit());
        if target == self.mode.is_edit() {
            tracing::debug!(box_id = %self.id, edit = target, "edit mode unchanged");
            self.mode_change.notify(&target);
            return Ok(());
        }
        if target {
            self.enter_edit();
            Ok(())
        } else {
            self.exit_edit()
        }
    }

    fn enter_edit(&mut self) {
        self.mode = Mode::Edit;
        self.mode_change.notify(&true);
        let handle = self.host.open(self.id, &self.surface_frame());
        handle.borrow_mut().set_value(&self.content);
        self.surface = Some(handle);
        tracing::debug!(box_id = %self.id, policy = %self.policy, "entered edit mode");
        self.replace_content(String::new());
    }

    fn exit_edit(&mut self) -> Result<(), TextBoxError> {
        self.mode = Mode::Normal;
        self.mode_change.notify(&false);
        let value = self
            .surface
            .as_ref()
            .map(|surface| surface.borrow().value())
            .unwrap_or_default();
        self.surface = None;
        self.host.close(self.id);
        tracing::debug!(box_id = %self.id, chars = value.chars().count(), "left edit mode");
        self.replace_content(value);
        if self.oracle.is_some() {
            self.relayout()?;
        }
        Ok(())
    }

    /// Route one edit to the open surface. Ignored outside edit mode.
    ///
    /// # Errors
    ///
    /// [`TextBoxError::Layout`] when the live resize fails.
    pub fn handle_input(&mut self, event: InputEvent) -> Result<(), TextBoxError> {
        let Some(surface) = self.surface.clone() else {
            tracing::debug!(box_id = %self.id, "input outside edit mode ignored");
            return Ok(());
        };
        surface.borrow_mut().apply_input(&event);
        self.edit_input.notify(&event);
        if self.policy.derives_size() && self.oracle.is_some() {
            self.resize_from_surface()?;
        }
        Ok(())
    }

    fn resize_from_surface(&mut self) -> Result<(), TextBoxError> {
        let Some(surface) = &self.surface else {
            return Ok(());
        };
        let value = surface.borrow().value();
        // An `Auto` surface grows with the text instead of wrapping at the
        // width it had on entry.
        let width = match self.policy {
            PolicyKind::Auto => 0.0,
            _ => self.rect.width,
        };
        let outcome = self.run_pass(&value, width)?;
        self.apply_extents(outcome.width, outcome.height);
        Ok(())
    }

    /// A pointer press outside the rectangle ends editing. Returns whether
    /// it did.
    pub fn pointer_down(&mut self, point: Point) -> Result<bool, TextBoxError> {
        if self.mode.is_edit() && !self.rect.contains(point) {
            self.exit_edit()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Toggle edit mode.
    pub fn double_click(&mut self) -> Result<(), TextBoxError> {
        self.set_edit_mode(None)
    }

    fn surface_frame(&self) -> SurfaceFrame {
        SurfaceFrame {
            rect: self.rect,
            height: self.policy.rules().surface_height,
            font: self.font.clone(),
            line_height: self.font.line_height_ratio(),
            affordance: self.affordance,
        }
    }

    fn sync_surface_frame(&self) {
        if let Some(surface) = &self.surface {
            surface.borrow_mut().set_frame(&self.surface_frame());
        }
    }

    // --- listeners -----------------------------------------------------

    /// Called with every input event applied while editing.
    pub fn on_edit_input(&self, callback: impl Fn(&InputEvent) + 'static) -> Registration {
        self.edit_input.register(callback)
    }

    /// # Errors
    ///
    /// [`TextBoxError::NotCallable`] when `callback` is `None`.
    pub fn try_on_edit_input<F>(&self, callback: Option<F>) -> Result<Registration, TextBoxError>
    where
        F: Fn(&InputEvent) + 'static,
    {
        self.edit_input.try_register(callback)
    }

    /// Called with `true` on entering and `false` on leaving edit mode.
    pub fn on_edit_mode_change(&self, callback: impl Fn(&bool) + 'static) -> Registration {
        self.mode_change.register(callback)
    }

    /// # Errors
    ///
    /// [`TextBoxError::NotCallable`] when `callback` is `None`.
    pub fn try_on_edit_mode_change<F>(
        &self,
        callback: Option<F>,
    ) -> Result<Registration, TextBoxError>
    where
        F: Fn(&bool) + 'static,
    {
        self.mode_change.try_register(callback)
    }

    /// Called whenever the host should repaint.
    pub fn on_change(&self, callback: impl Fn(&ChangeKind) + 'static) -> Registration {
        self.changes.register(callback)
    }

    fn emit(&self, kind: ChangeKind) {
        self.changes.notify(&kind);
    }
}

impl Drop for TextBox {
    fn drop(&mut self) {
        if self.surface.take().is_some() {
            self.host.close(self.id);
            tracing::debug!(box_id = %self.id, "released surface of dropped box");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use tracing_test::traced_test;

    // Ten pixels per char, leading 12.
    fn px(_: &FontState, text: &str) -> f64 {
        text.chars().count() as f64 * 10.0
    }

    fn font() -> FontState {
        FontState::new("test", 10.0)
    }

    fn measured(rect: Rect, policy: PolicyKind) -> TextBox {
        let config = TextBoxConfig {
            policy,
            font: font(),
            ..TextBoxConfig::default()
        };
        TextBox::from_config(rect, &config)
            .with_host(SurfaceHost::default())
            .with_oracle(px)
    }

    #[test]
    fn scenario_fixed_fits_on_one_line() {
        let mut b = measured(Rect::new(0.0, 0.0, 400.0, 50.0), PolicyKind::Fixed);
        b.set_content("The quick brown fox");
        assert_eq!(b.lines().unwrap(), ["The quick brown fox "]);
        assert!(!b.is_dirty());
    }

    #[test]
    fn scenario_auto_width_strips_newlines() {
        let mut b = measured(Rect::new(0.0, 0.0, 10.0, 10.0), PolicyKind::AutoWidth);
        b.set_content("multi\nline");
        assert_eq!(b.lines().unwrap(), ["multiline"]);
        assert_eq!(b.width(), 90.0);
        assert_eq!(b.height(), b.leading());
    }

    #[test]
    fn scenario_auto_empty_content() {
        let mut b = measured(Rect::new(0.0, 0.0, 10.0, 10.0), PolicyKind::Auto);
        assert_eq!(b.lines().unwrap(), [""]);
        assert_eq!(b.height(), b.leading());
        assert_eq!(b.width(), 0.0);
    }

    #[test]
    fn auto_wraps_long_lines_at_box_width() {
        let mut b = measured(Rect::new(0.0, 0.0, 50.0, 10.0), PolicyKind::Auto);
        b.set_content("hello world again");
        assert_eq!(b.lines().unwrap(), ["hello", "world", "again"]);
        assert_eq!(b.width(), 50.0);
        assert_eq!(b.height(), 3.0 * b.leading());
    }

    #[test]
    fn scenario_zero_width_fixed_fails() {
        let mut b = measured(Rect::new(0.0, 0.0, 0.0, 10.0), PolicyKind::Fixed);
        b.set_content("a");
        assert!(matches!(b.lines(), Err(TextBoxError::Layout(_))));
        assert!(b.is_dirty());
    }

    #[test]
    fn unmeasured_box_reports_error() {
        let mut b =
            TextBox::new(Rect::new(0.0, 0.0, 100.0, 10.0)).with_host(SurfaceHost::default());
        b.set_content("hi");
        assert_eq!(b.lines(), Err(TextBoxError::Unmeasured));
        assert!(!b.has_oracle());
    }

    #[test]
    fn layout_is_lazy_and_idempotent() {
        let mut b = measured(Rect::new(0.0, 0.0, 60.0, 50.0), PolicyKind::Fixed);
        b.set_content("aaa bbb ccc");
        let first = b.lines().unwrap().to_vec();
        b.invalidate();
        assert_eq!(b.lines().unwrap(), first.as_slice());
        assert_eq!(first, vec!["aaa ", "bbb ", "ccc "]);
    }

    #[test]
    fn staying_fixed_with_width_keeps_cache() {
        let mut b = measured(Rect::new(0.0, 0.0, 60.0, 50.0), PolicyKind::Fixed);
        b.set_content("x");
        b.lines().unwrap();
        b.set_bounds_policy(PolicyKind::Fixed).unwrap();
        assert!(!b.is_dirty());
    }

    #[test]
    fn policy_switch_lays_out_eagerly() {
        let mut b = measured(Rect::new(0.0, 0.0, 60.0, 50.0), PolicyKind::Fixed);
        b.set_content("abc");
        b.set_bounds_policy(PolicyKind::AutoWidth).unwrap();
        assert!(!b.is_dirty());
        assert_eq!(b.width(), 30.0);
        assert_eq!(b.edit_element(), InputAffordance::SingleLine);

        b.set_bounds_policy_str("auto").unwrap();
        assert_eq!(b.edit_element(), InputAffordance::MultiLine);
        assert_eq!(
            b.set_bounds_policy_str("grow"),
            Err(TextBoxError::InvalidPolicy("grow".into()))
        );
        assert_eq!(b.bounds_policy(), PolicyKind::Auto);
    }

    #[test]
    fn auto_height_derives_width_then_holds_it() {
        let mut b = measured(Rect::new(0.0, 0.0, 0.0, 0.0), PolicyKind::AutoHeight);
        b.set_content("ab cd\nefg");
        b.lines().unwrap();
        assert_eq!(b.width(), 60.0);
        assert_eq!(b.height(), 2.0 * b.leading());

        b.set_content("ab cd efgh");
        assert_eq!(b.lines().unwrap(), ["ab cd ", "efgh "]);
        assert_eq!(b.width(), 60.0);
    }

    #[test]
    fn justification_moves_anchor() {
        let mut b = measured(Rect::new(0.0, 0.0, 80.0, 20.0), PolicyKind::Fixed);
        assert_eq!(b.anchor(), Point::new(0.0, 10.0));
        b.set_justification(Justification::Center);
        assert_eq!(b.anchor(), Point::new(40.0, 10.0));
        b.set_justification_str("right").unwrap();
        assert_eq!(b.anchor(), Point::new(80.0, 10.0));
        b.set_width(100.0);
        assert_eq!(b.anchor().x, 100.0);
        assert_eq!(
            b.set_justification_str("justify"),
            Err(TextBoxError::InvalidJustification("justify".into()))
        );
    }

    #[test]
    fn visible_lines_clip_under_fixed() {
        // Leading 12: line tops at 0, 12, 24.
        let mut b = measured(Rect::new(0.0, 0.0, 40.0, 12.0), PolicyKind::Fixed);
        b.set_content("aa bb cc");
        assert_eq!(b.lines().unwrap().len(), 3);
        assert_eq!(b.visible_lines().unwrap(), ["aa ", "bb "]);

        b.set_bounds_policy(PolicyKind::AutoHeight).unwrap();
        assert_eq!(b.visible_lines().unwrap().len(), 3);
    }

    #[test]
    fn bounds_are_local() {
        let b = measured(Rect::new(5.0, 6.0, 7.0, 8.0), PolicyKind::Fixed);
        assert_eq!(b.bounds(), Rect::new(0.0, 0.0, 7.0, 8.0));
    }

    #[test]
    fn edit_round_trip_restores_content() {
        let mut b = measured(Rect::new(0.0, 0.0, 100.0, 40.0), PolicyKind::Fixed);
        b.set_content("hello");
        let before = b.lines().unwrap().to_vec();

        b.set_edit_mode(Some(true)).unwrap();
        assert!(b.is_editing());
        assert_eq!(b.content(), "");
        assert!(!b.is_renderable());
        assert_eq!(b.surface().unwrap().borrow().value(), "hello");

        b.set_edit_mode(Some(false)).unwrap();
        assert_eq!(b.content(), "hello");
        assert!(!b.is_dirty());
        assert_eq!(b.cached_lines(), before.as_slice());
        assert!(b.is_renderable());
    }

    #[test]
    fn entering_edit_without_oracle_succeeds() {
        let host = SurfaceHost::default();
        let mut b = TextBox::new(Rect::new(0.0, 0.0, 10.0, 10.0)).with_host(host.clone());
        b.set_content("x");
        b.set_edit_mode(None).unwrap();
        assert!(host.is_open(b.id()));
        b.set_edit_mode(None).unwrap();
        assert!(!host.is_open(b.id()));
        assert_eq!(b.content(), "x");
        assert!(b.is_dirty());
    }

    #[test]
    fn repeated_mode_request_renotifies_only() {
        let mut b = measured(Rect::new(0.0, 0.0, 10.0, 10.0), PolicyKind::Fixed);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        b.on_edit_mode_change(move |edit| s.borrow_mut().push(*edit));

        b.set_edit_mode(Some(false)).unwrap();
        b.set_edit_mode(Some(true)).unwrap();
        b.set_edit_mode(Some(true)).unwrap();
        assert_eq!(*seen.borrow(), vec![false, true, true]);
        assert!(b.is_editing());
        assert_eq!(b.host().active_count(), 1);
    }

    #[test]
    fn set_content_while_editing_writes_through() {
        let mut b = measured(Rect::new(0.0, 0.0, 100.0, 40.0), PolicyKind::Fixed);
        b.set_edit_mode(Some(true)).unwrap();
        b.set_content("typed");
        assert_eq!(b.content(), "");
        b.set_edit_mode(Some(false)).unwrap();
        assert_eq!(b.content(), "typed");
    }

    #[test]
    fn input_resizes_auto_boxes_live() {
        let mut b = measured(Rect::new(0.0, 0.0, 0.0, 0.0), PolicyKind::Auto);
        let inputs = Rc::new(Cell::new(0));
        let i = Rc::clone(&inputs);
        b.on_edit_input(move |_| i.set(i.get() + 1));

        b.set_edit_mode(Some(true)).unwrap();
        b.handle_input(InputEvent::Insert("abcd".into())).unwrap();
        assert_eq!(b.width(), 40.0);
        b.handle_input(InputEvent::Insert("\nx".into())).unwrap();
        assert_eq!(b.width(), 40.0);
        assert_eq!(b.height(), 2.0 * b.leading());
        b.handle_input(InputEvent::DeleteBackward).unwrap();
        assert_eq!(inputs.get(), 3);

        b.set_edit_mode(Some(false)).unwrap();
        assert_eq!(b.content(), "abcd\n");
        assert_eq!(b.cached_lines(), ["abcd", ""]);
    }

    #[test]
    fn input_outside_edit_is_ignored() {
        let mut b = measured(Rect::new(0.0, 0.0, 10.0, 10.0), PolicyKind::Auto);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        b.on_edit_input(move |_| h.set(h.get() + 1));
        b.handle_input(InputEvent::Insert("x".into())).unwrap();
        assert_eq!(hits.get(), 0);
        assert_eq!(b.content(), "");
    }

    #[test]
    fn fixed_box_keeps_size_while_typing() {
        let mut b = measured(Rect::new(0.0, 0.0, 50.0, 20.0), PolicyKind::Fixed);
        b.set_edit_mode(Some(true)).unwrap();
        b.handle_input(InputEvent::Insert("a very long line".into())).unwrap();
        assert_eq!(b.rectangle(), Rect::new(0.0, 0.0, 50.0, 20.0));
    }

    #[test]
    fn pointer_outside_leaves_edit() {
        let mut b = measured(Rect::new(10.0, 10.0, 50.0, 20.0), PolicyKind::Fixed);
        b.set_edit_mode(Some(true)).unwrap();
        assert!(!b.pointer_down(Point::new(20.0, 20.0)).unwrap());
        assert!(b.is_editing());
        assert!(b.pointer_down(Point::new(0.0, 0.0)).unwrap());
        assert!(!b.is_editing());
        assert!(!b.pointer_down(Point::new(0.0, 0.0)).unwrap());
    }

    #[test]
    fn double_click_toggles() {
        let mut b = measured(Rect::new(0.0, 0.0, 50.0, 20.0), PolicyKind::Fixed);
        b.double_click().unwrap();
        assert_eq!(b.mode(), Mode::Edit);
        b.double_click().unwrap();
        assert_eq!(b.mode(), Mode::Normal);
    }

    #[test]
    fn edit_element_override() {
        let mut b = measured(Rect::new(0.0, 0.0, 50.0, 20.0), PolicyKind::Fixed);
        b.set_edit_element("input").unwrap();
        b.set_content("a\nb");
        b.set_edit_mode(Some(true)).unwrap();
        assert_eq!(b.surface().unwrap().borrow().value(), "ab");
        assert_eq!(
            b.set_edit_element("select"),
            Err(TextBoxError::InvalidEditElement("select".into()))
        );
    }

    #[test]
    fn change_listener_sees_content_and_geometry() {
        let mut b = measured(Rect::new(0.0, 0.0, 0.0, 0.0), PolicyKind::AutoWidth);
        let kinds = Rc::new(RefCell::new(Vec::new()));
        let k = Rc::clone(&kinds);
        b.on_change(move |kind| k.borrow_mut().push(*kind));

        b.set_content("abc");
        b.lines().unwrap();
        assert_eq!(*kinds.borrow(), vec![ChangeKind::Content, ChangeKind::Geometry]);
    }

    #[test]
    fn try_register_rejects_missing_callback() {
        let b = measured(Rect::new(0.0, 0.0, 1.0, 1.0), PolicyKind::Fixed);
        assert_eq!(
            b.try_on_edit_input(None::<fn(&InputEvent)>).unwrap_err(),
            TextBoxError::NotCallable { channel: "edit-input" }
        );
        assert_eq!(
            b.try_on_edit_mode_change(None::<fn(&bool)>).unwrap_err(),
            TextBoxError::NotCallable { channel: "edit-mode" }
        );
    }

    #[test]
    fn dropping_an_editing_box_releases_its_surface() {
        let host = SurfaceHost::default();
        let mut b = TextBox::new(Rect::new(0.0, 0.0, 10.0, 10.0)).with_host(host.clone());
        b.set_edit_mode(Some(true)).unwrap();
        assert_eq!(host.active_count(), 1);
        drop(b);
        assert_eq!(host.active_count(), 0);
    }

    #[test]
    fn init_literal_builds_content_from_lines() {
        let mut b = TextBox::from_init(TextBoxInit {
            policy: PolicyKind::Auto,
            origin: Point::new(3.0, 4.0),
            width: 0.0,
            height: 0.0,
            lines: vec!["one".into(), "three".into()],
        })
        .with_oracle(px);
        assert_eq!(b.content(), "one\nthree");
        assert_eq!(b.lines().unwrap(), ["one", "three"]);
        assert_eq!(b.rectangle().origin(), Point::new(3.0, 4.0));
        assert_eq!(b.width(), 50.0);
    }

    #[test]
    #[traced_test]
    fn panicking_mode_listener_does_not_block_edit() {
        let mut b = measured(Rect::new(0.0, 0.0, 50.0, 20.0), PolicyKind::Fixed);
        let later = Rc::new(Cell::new(false));
        let l = Rc::clone(&later);
        b.on_edit_mode_change(|_| panic!("listener bug"));
        b.on_edit_mode_change(move |_| l.set(true));

        b.set_edit_mode(Some(true)).unwrap();
        assert!(b.is_editing());
        assert!(later.get());
        assert!(logs_contain("listener panicked"));
    }
}
