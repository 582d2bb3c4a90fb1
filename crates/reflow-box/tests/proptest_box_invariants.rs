//! Property-based invariant tests for text box layout.
//!
//! 1. Fit: under `Fixed` and `AutoHeight` every line, trailing space
//!    trimmed, is no wider than the box.
//! 2. Idempotence: re-laying out the same content in the same rectangle
//!    yields identical lines and extents.
//! 3. Policy round-trip: `Fixed -> AutoWidth -> Fixed` at the original width
//!    restores the original lines.
//! 4. Mode round-trip: entering and leaving edit mode without input
//!    restores content and lines.
//! 5. Derived heights are `leading × line count`.
//! 6. Listener ordering survives arbitrary unregistration.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use reflow_box::{ListenerRegistry, PolicyKind, Rect, SurfaceHost, TextBox, TextBoxConfig};
use reflow_text::FontState;

// ── Helpers ─────────────────────────────────────────────────────────────

/// Ten pixels per character.
fn px(_: &FontState, text: &str) -> f64 {
    text.chars().count() as f64 * 10.0
}

fn content_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z ]{0,16}", 1..5).prop_map(|paragraphs| paragraphs.join("\n"))
}

fn policy_strategy() -> impl Strategy<Value = PolicyKind> {
    prop_oneof![
        Just(PolicyKind::Fixed),
        Just(PolicyKind::AutoWidth),
        Just(PolicyKind::AutoHeight),
        Just(PolicyKind::Auto),
    ]
}

fn text_box(policy: PolicyKind, width: f64, content: &str) -> TextBox {
    let config = TextBoxConfig {
        policy,
        font: FontState::new("test", 10.0),
        ..TextBoxConfig::default()
    };
    let mut b = TextBox::from_config(Rect::new(0.0, 0.0, width, 100.0), &config)
        .with_host(SurfaceHost::default())
        .with_oracle(px);
    b.set_content(content);
    b
}

fn fits(lines: &[String], width: f64) -> bool {
    lines.iter().all(|line| px(&FontState::default(), line.trim_end()) <= width)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Fit
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn fixed_lines_fit(content in content_strategy(), cells in 1u32..=40) {
        let width = f64::from(cells) * 10.0;
        let mut b = text_box(PolicyKind::Fixed, width, &content);
        let lines = b.lines().expect("layout");
        prop_assert!(fits(lines, width), "{lines:?} at {width}");
    }

    #[test]
    fn auto_height_lines_fit_pinned_width(content in content_strategy(), cells in 1u32..=40) {
        let width = f64::from(cells) * 10.0;
        let mut b = text_box(PolicyKind::AutoHeight, width, &content);
        let lines = b.lines().expect("layout").to_vec();
        prop_assert!(fits(&lines, width));
        prop_assert_eq!(b.width(), width);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Idempotence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn layout_is_idempotent(
        content in content_strategy(),
        policy in policy_strategy(),
        cells in 1u32..=40,
    ) {
        let mut b = text_box(policy, f64::from(cells) * 10.0, &content);
        let input = b.rectangle();
        let first = b.lines().expect("layout").to_vec();
        let derived = b.rectangle();

        b.set_rectangle(input);
        prop_assert_eq!(b.lines().expect("layout"), first.as_slice());
        prop_assert_eq!(b.rectangle(), derived);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Policy round-trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn policy_round_trip_restores_fixed_layout(content in content_strategy(), cells in 1u32..=40) {
        let width = f64::from(cells) * 10.0;
        let mut b = text_box(PolicyKind::Fixed, width, &content);
        let original = b.lines().expect("layout").to_vec();

        b.set_bounds_policy(PolicyKind::AutoWidth).expect("auto-width");
        b.set_bounds_policy(PolicyKind::Fixed).expect("fixed");
        b.set_width(width);
        prop_assert_eq!(b.lines().expect("layout"), original.as_slice());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Mode round-trip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn mode_round_trip_restores_content(
        content in content_strategy(),
        policy in policy_strategy(),
        cells in 1u32..=40,
    ) {
        // `Auto` wraps at a settled width, and the width it derives can be
        // narrower, so it starts unsettled to make the first layout final.
        let width = if policy == PolicyKind::Auto { 0.0 } else { f64::from(cells) * 10.0 };
        let mut b = text_box(policy, width, &content);
        let before = b.lines().expect("layout").to_vec();
        let expected = content.clone();

        b.set_edit_mode(Some(true)).expect("enter");
        prop_assert_eq!(b.content(), "");
        b.set_edit_mode(Some(false)).expect("exit");

        if policy == PolicyKind::AutoWidth {
            // The single-line surface drops newlines.
            prop_assert_eq!(b.content(), expected.replace('\n', ""));
        } else {
            prop_assert_eq!(b.content(), expected.as_str());
        }
        prop_assert!(!b.is_dirty());
        prop_assert_eq!(b.cached_lines(), before.as_slice());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Derived heights
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn auto_lines_fit_settled_width(content in content_strategy(), cells in 1u32..=40) {
        let width = f64::from(cells) * 10.0;
        let mut b = text_box(PolicyKind::Auto, width, &content);
        let lines = b.lines().expect("layout").to_vec();
        prop_assert!(lines.iter().all(|line| px(&FontState::default(), line) <= width));
        prop_assert!(b.width() <= width);
    }

    #[test]
    fn derived_height_is_leading_times_lines(
        content in content_strategy(),
        policy in prop_oneof![Just(PolicyKind::AutoHeight), Just(PolicyKind::Auto)],
    ) {
        let mut b = text_box(policy, 0.0, &content);
        let count = b.lines().expect("layout").len();
        prop_assert_eq!(b.height(), b.leading() * count as f64);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Listener ordering
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn listeners_run_in_order_after_removals(
        removed in proptest::collection::vec(any::<bool>(), 1..12),
    ) {
        let registry = ListenerRegistry::<()>::new("order");
        let log = Rc::new(RefCell::new(Vec::new()));
        let registrations: Vec<_> = (0..removed.len())
            .map(|i| {
                let log = Rc::clone(&log);
                registry.register(move |_| log.borrow_mut().push(i))
            })
            .collect();

        for (registration, &remove) in registrations.iter().zip(&removed) {
            if remove {
                registration.unregister();
            }
        }
        registry.notify(&());

        let expected: Vec<usize> = removed
            .iter()
            .enumerate()
            .filter(|&(_, &remove)| !remove)
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(&*log.borrow(), &expected);
    }
}
