use crate::snapshot::{WindowKind, WindowSnapshot};

/// Tolerance for "touching" a screen edge. Shell bars occasionally report
/// bounds a pixel or two off during rotation.
const EDGE_SLOP_PX: i32 = 2;

/// Max height among shell-owned overlay windows that touch the bottom edge
/// and span at least half the screen width. `None` when no window
/// qualifies, which callers read as a fully hidden bar.
pub(super) fn scan_bottom_bar(snap: &WindowSnapshot, shell_package: &str) -> Option<i32> {
    let mut thickness: Option<i32> = None;
    for win in &snap.windows {
        if win.kind != WindowKind::SystemOverlay
            || !win.owner_package.eq_ignore_ascii_case(shell_package)
        {
            continue;
        }
        let rect = match win.bounds() {
            Ok(rect) => rect,
            Err(err) => {
                tracing::debug!(owner = %win.owner_package, reason = %err.reason, "skipping window with unreadable bounds");
                continue;
            }
        };
        if (snap.screen.bottom - rect.bottom).abs() > EDGE_SLOP_PX {
            continue;
        }
        if rect.width() * 2 < snap.screen.width() {
            continue;
        }
        let height = rect.height();
        thickness = Some(thickness.map_or(height, |t| t.max(height)));
    }
    thickness
}

/// A shell-owned window spanning at least half the screen width, anchored to
/// the top edge and tall enough to be the open shade.
pub(super) fn notification_panel_open(
    snap: &WindowSnapshot,
    shell_package: &str,
    min_panel_height: i32,
) -> bool {
    for win in &snap.windows {
        if !win.owner_package.eq_ignore_ascii_case(shell_package) {
            continue;
        }
        let rect = match win.bounds() {
            Ok(rect) => rect,
            Err(err) => {
                tracing::debug!(owner = %win.owner_package, reason = %err.reason, "skipping window with unreadable bounds");
                continue;
            }
        };
        if (rect.top - snap.screen.top).abs() > EDGE_SLOP_PX {
            continue;
        }
        if rect.width() * 2 < snap.screen.width() {
            continue;
        }
        if rect.height() >= min_panel_height {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::snapshot::WindowDescriptor;

    const SHELL: &str = "com.android.systemui";

    fn snap(windows: Vec<WindowDescriptor>) -> WindowSnapshot {
        WindowSnapshot::new(Rect::of_size(1080, 2160)).with_windows(windows)
    }

    #[test]
    fn widest_qualifying_bar_sets_thickness() {
        let snapshot = snap(vec![
            WindowDescriptor::new(
                WindowKind::SystemOverlay,
                SHELL,
                Rect::new(0, 2064, 1080, 2160),
            ),
            WindowDescriptor::new(
                WindowKind::SystemOverlay,
                SHELL,
                Rect::new(0, 2110, 1080, 2160),
            ),
        ]);
        assert_eq!(scan_bottom_bar(&snapshot, SHELL), Some(96));
    }

    #[test]
    fn non_shell_windows_are_ignored() {
        let snapshot = snap(vec![WindowDescriptor::new(
            WindowKind::SystemOverlay,
            "com.example.floaty",
            Rect::new(0, 2064, 1080, 2160),
        )]);
        assert_eq!(scan_bottom_bar(&snapshot, SHELL), None);
    }

    #[test]
    fn bar_two_px_off_the_edge_still_counts() {
        let snapshot = snap(vec![WindowDescriptor::new(
            WindowKind::SystemOverlay,
            SHELL,
            Rect::new(0, 2062, 1080, 2158),
        )]);
        assert_eq!(scan_bottom_bar(&snapshot, SHELL), Some(96));
    }

    #[test]
    fn panel_requires_top_edge_and_height() {
        let shade = snap(vec![WindowDescriptor::new(
            WindowKind::SystemOverlay,
            SHELL,
            Rect::new(0, 0, 1080, 900),
        )]);
        assert!(notification_panel_open(&shade, SHELL, 160));

        let status_bar = snap(vec![WindowDescriptor::new(
            WindowKind::SystemOverlay,
            SHELL,
            Rect::new(0, 0, 1080, 80),
        )]);
        assert!(!notification_panel_open(&status_bar, SHELL, 160));

        let mid_screen = snap(vec![WindowDescriptor::new(
            WindowKind::SystemOverlay,
            SHELL,
            Rect::new(0, 400, 1080, 1400),
        )]);
        assert!(!notification_panel_open(&mid_screen, SHELL, 160));
    }
}
