mod bars;
mod foreground;
mod ime;

pub use foreground::{is_recents_class, is_wallpaper_preview_class};

use std::collections::HashSet;

use crate::settings::Settings;
use crate::snapshot::WindowSnapshot;

/// Candidate signals extracted from one observation pass. These are raw
/// readings; debouncing and acceptance happen in the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signals {
    pub fullscreen: bool,
    pub ime_visible: bool,
    pub notification_panel_open: bool,
}

/// Readings from the input subsystem, consulted when keyboard geometry is
/// not observable (e.g. during transition animations).
#[derive(Debug, Clone, Copy, Default)]
pub struct ImeHints {
    pub accepting_text: bool,
    pub focus_active: bool,
    pub last_event_age_ms: Option<u64>,
}

/// Maps window-list snapshots to boolean signals. Pure apart from two small
/// caches: the learned bottom-bar thickness and whether the previous pass
/// saw a keyboard window at all.
pub struct WindowStateClassifier {
    shell_package: String,
    gesture_only_threshold_px: i32,
    min_bar_height_px: i32,
    min_ime_height_px: i32,
    min_panel_height_px: i32,
    ime_event_recency_ms: u64,
    default_ime: Option<String>,
    launcher_packages: HashSet<String>,
    bar_height: i32,
    had_ime_window: bool,
}

impl WindowStateClassifier {
    pub fn new(settings: &Settings) -> Self {
        Self {
            shell_package: settings.shell_package.clone(),
            gesture_only_threshold_px: settings.gesture_only_threshold_px,
            min_bar_height_px: settings.min_bar_height_px,
            min_ime_height_px: settings.min_ime_height_px,
            min_panel_height_px: settings.min_panel_height_px,
            ime_event_recency_ms: settings.ime_event_recency_ms,
            default_ime: None,
            launcher_packages: foreground::fallback_launcher_packages(),
            bar_height: settings.min_bar_height_px,
            had_ime_window: false,
        }
    }

    /// Install the platform's resolved launcher set. An empty resolution
    /// keeps the built-in fallback list.
    pub fn set_launcher_packages(&mut self, packages: Vec<String>) {
        if packages.is_empty() {
            tracing::warn!("launcher resolution returned nothing; keeping fallback list");
            return;
        }
        self.launcher_packages = packages.into_iter().collect();
    }

    pub fn set_default_ime(&mut self, id: Option<String>) {
        self.default_ime = id;
    }

    /// Learned full thickness of the bottom bar, in px.
    pub fn bar_height(&self) -> i32 {
        self.bar_height
    }

    pub fn is_home(&self, package: &str) -> bool {
        self.launcher_packages.contains(package)
    }

    /// Run the geometric classifiers over one snapshot.
    pub fn classify(&mut self, snap: &WindowSnapshot, hints: ImeHints) -> Signals {
        let fullscreen = self.classify_fullscreen(snap);

        let ime_visible = match ime::ime_visibility(
            snap,
            self.default_ime.as_deref(),
            self.min_ime_height_px,
            self.bar_height,
        ) {
            Some(visible) => {
                self.had_ime_window = true;
                visible
            }
            None => {
                self.had_ime_window = false;
                ime::fallback_visible(hints, self.ime_event_recency_ms)
            }
        };

        let notification_panel_open =
            bars::notification_panel_open(snap, &self.shell_package, self.min_panel_height_px);

        Signals {
            fullscreen,
            ime_visible,
            notification_panel_open,
        }
    }

    /// Re-evaluate keyboard visibility from input-subsystem hints alone.
    /// Returns `None` while window geometry governs the signal (the last
    /// pass saw a qualifying keyboard window).
    pub fn reevaluate_ime(&self, hints: ImeHints) -> Option<bool> {
        if self.had_ime_window {
            return None;
        }
        Some(ime::fallback_visible(hints, self.ime_event_recency_ms))
    }

    fn classify_fullscreen(&mut self, snap: &WindowSnapshot) -> bool {
        // A window that declares itself fullscreen and actually covers the
        // screen is taken at its word; the bar proxy below covers hosts
        // where no such flag is readable.
        let declared = snap.windows.iter().any(|win| {
            win.fullscreen_hint == Some(true)
                && win
                    .bounds()
                    .map(|r| covers_most_of(&r, &snap.screen))
                    .unwrap_or(false)
        });

        let gesture_only =
            (self.gesture_only_threshold_px as f32 * snap.density_scale).round() as i32;

        let (thickness, reported_hidden) = match snap.nav_inset {
            // The inset query is immune to false positives from round or
            // notched screens, so it wins over geometry whenever present.
            Some(inset) => {
                let thickness = if inset.visible { inset.height } else { 0 };
                (thickness, !inset.visible)
            }
            None => (
                bars::scan_bottom_bar(snap, &self.shell_package).unwrap_or(0),
                false,
            ),
        };

        self.bar_height = self.bar_height.max(thickness);

        let visible_floor = ((self.bar_height as f32) * 0.7)
            .max(self.min_bar_height_px as f32)
            .round() as i32;

        let hidden_or_gesture_only = reported_hidden || thickness <= gesture_only;
        let bar_visible = !reported_hidden && thickness >= visible_floor;

        let fullscreen = declared || hidden_or_gesture_only || !bar_visible;
        tracing::trace!(
            thickness,
            bar_height = self.bar_height,
            gesture_only,
            fullscreen,
            "bottom bar scan"
        );
        fullscreen
    }
}

/// Case-insensitive substring test; `needle` must already be lowercase.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(needle)
}

fn covers_most_of(rect: &crate::geometry::Rect, screen: &crate::geometry::Rect) -> bool {
    let window_area = rect.width() as i64 * rect.height() as i64;
    let screen_area = screen.width() as i64 * screen.height() as i64;
    screen_area > 0 && window_area * 10 >= screen_area * 9
}
