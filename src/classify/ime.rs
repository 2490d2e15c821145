use super::{contains_ci, ImeHints};
use crate::snapshot::{WindowKind, WindowSnapshot};

const OWNER_HINTS: [&str; 2] = ["inputmethod", "keyboard"];
const TITLE_HINTS: [&str; 3] = ["gboard", "keyboard", "input"];

/// Keyboard visibility from window geometry. `None` means no window in the
/// snapshot qualifies as a keyboard at all; callers then fall back to the
/// input-subsystem hints.
pub(super) fn ime_visibility(
    snap: &WindowSnapshot,
    default_ime: Option<&str>,
    min_ime_height: i32,
    bar_height: i32,
) -> Option<bool> {
    let mut any_qualifying = false;
    for win in &snap.windows {
        if !qualifies(win.kind, &win.owner_package, win.title.as_deref(), default_ime) {
            continue;
        }
        any_qualifying = true;
        let rect = match win.bounds() {
            Ok(rect) => rect,
            Err(err) => {
                tracing::debug!(owner = %win.owner_package, reason = %err.reason, "skipping window with unreadable bounds");
                continue;
            }
        };
        // Visible when tall enough and anchored near the bottom of the
        // screen (within one bar height).
        if rect.height() >= min_ime_height && (snap.screen.bottom - rect.bottom) <= bar_height {
            return Some(true);
        }
    }
    if any_qualifying {
        Some(false)
    } else {
        None
    }
}

fn qualifies(
    kind: WindowKind,
    owner_package: &str,
    title: Option<&str>,
    default_ime: Option<&str>,
) -> bool {
    if kind == WindowKind::InputMethod {
        return true;
    }
    if let Some(ime) = default_ime {
        // Default IME ids look like "com.pkg/.ServiceClass"; match on the
        // package part.
        let ime_package = ime.split('/').next().unwrap_or(ime);
        if owner_package.eq_ignore_ascii_case(ime_package) {
            return true;
        }
    }
    if OWNER_HINTS.iter().any(|hint| contains_ci(owner_package, hint)) {
        return true;
    }
    if let Some(title) = title {
        if TITLE_HINTS.iter().any(|hint| contains_ci(title, hint)) {
            return true;
        }
    }
    false
}

/// Compensates for keyboards whose window is not observable during
/// transition animations: the input subsystem must be accepting text and
/// either hold active focus or have seen an input event recently.
pub(super) fn fallback_visible(hints: ImeHints, recency_ms: u64) -> bool {
    if !hints.accepting_text {
        return false;
    }
    if hints.focus_active {
        return true;
    }
    hints
        .last_event_age_ms
        .map(|age| age <= recency_ms)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::snapshot::WindowDescriptor;

    fn snap(windows: Vec<WindowDescriptor>) -> WindowSnapshot {
        WindowSnapshot::new(Rect::of_size(1080, 2160)).with_windows(windows)
    }

    fn keyboard_window(top: i32, bottom: i32) -> WindowDescriptor {
        WindowDescriptor::new(
            WindowKind::InputMethod,
            "com.google.android.inputmethod.latin",
            Rect::new(0, top, 1080, bottom),
        )
    }

    #[test]
    fn anchored_keyboard_window_is_visible() {
        let snapshot = snap(vec![keyboard_window(1400, 2160)]);
        assert_eq!(ime_visibility(&snapshot, None, 120, 96), Some(true));
    }

    #[test]
    fn collapsed_keyboard_window_is_not_visible() {
        // Qualifies by kind but is only 40px tall.
        let snapshot = snap(vec![keyboard_window(2120, 2160)]);
        assert_eq!(ime_visibility(&snapshot, None, 120, 96), Some(false));
    }

    #[test]
    fn floating_keyboard_window_is_not_visible() {
        // Tall enough but detached from the bottom edge.
        let snapshot = snap(vec![keyboard_window(400, 1000)]);
        assert_eq!(ime_visibility(&snapshot, None, 120, 96), Some(false));
    }

    #[test]
    fn qualifies_by_default_ime_package() {
        let win = WindowDescriptor::new(
            WindowKind::Application,
            "com.vendor.typer",
            Rect::new(0, 1400, 1080, 2160),
        );
        let snapshot = snap(vec![win]);
        assert_eq!(
            ime_visibility(
                &snapshot,
                Some("com.vendor.typer/.TyperService"),
                120,
                96
            ),
            Some(true)
        );
        assert_eq!(ime_visibility(&snapshot, None, 120, 96), None);
    }

    #[test]
    fn qualifies_by_owner_or_title_substring() {
        let by_owner = WindowDescriptor::new(
            WindowKind::Application,
            "com.example.KeyBoard.pro",
            Rect::new(0, 1400, 1080, 2160),
        );
        assert_eq!(ime_visibility(&snap(vec![by_owner]), None, 120, 96), Some(true));

        let by_title = WindowDescriptor::new(
            WindowKind::Application,
            "com.example.opaque",
            Rect::new(0, 1400, 1080, 2160),
        )
        .with_title("Gboard");
        assert_eq!(ime_visibility(&snap(vec![by_title]), None, 120, 96), Some(true));
    }

    #[test]
    fn no_qualifying_window_defers_to_fallback() {
        let app = WindowDescriptor::new(
            WindowKind::Application,
            "com.example.mail",
            Rect::new(0, 0, 1080, 2160),
        );
        assert_eq!(ime_visibility(&snap(vec![app]), None, 120, 96), None);
    }

    #[test]
    fn fallback_needs_accepting_text() {
        let hints = ImeHints {
            accepting_text: false,
            focus_active: true,
            last_event_age_ms: Some(10),
        };
        assert!(!fallback_visible(hints, 500));
    }

    #[test]
    fn fallback_accepts_focus_or_recent_event() {
        let focused = ImeHints {
            accepting_text: true,
            focus_active: true,
            last_event_age_ms: None,
        };
        assert!(fallback_visible(focused, 500));

        let recent = ImeHints {
            accepting_text: true,
            focus_active: false,
            last_event_age_ms: Some(400),
        };
        assert!(fallback_visible(recent, 500));

        let stale = ImeHints {
            accepting_text: true,
            focus_active: false,
            last_event_age_ms: Some(900),
        };
        assert!(!fallback_visible(stale, 500));
    }
}
