use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::aggregator::SystemState;
use crate::debounce::{DebounceScheduler, TimerKey};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowMethod {
    Normal,
    Gesture,
    Fade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayState {
    Visible(ShowMethod),
    HiddenWithHotspot,
    FullyHidden,
}

/// Debounced, timer-driven visibility state for the control surface.
/// Exactly one state is active; entering `Visible(Gesture)` arms the single
/// auto-hide timer and every transition out of it cancels that timer.
pub struct OverlayStateMachine {
    state: OverlayState,
    gesture_show_at: Option<Instant>,
    last_dark_mode_change: Option<Instant>,
    auto_hide_dwell: Duration,
    dark_mode_veto: Duration,
    scheduler: Arc<dyn DebounceScheduler>,
}

impl OverlayStateMachine {
    pub fn new(settings: &Settings, scheduler: Arc<dyn DebounceScheduler>) -> Self {
        Self {
            state: OverlayState::Visible(ShowMethod::Normal),
            gesture_show_at: None,
            last_dark_mode_change: None,
            auto_hide_dwell: settings.gesture_auto_hide(),
            dark_mode_veto: settings.dark_mode_debounce(),
            scheduler,
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    /// Returns whether the state actually changed.
    pub fn show(&mut self, method: ShowMethod, now: Instant) -> bool {
        let prev = self.state;
        self.cancel_auto_hide();
        self.state = OverlayState::Visible(method);
        if method == ShowMethod::Gesture {
            self.gesture_show_at = Some(now);
            self.scheduler
                .schedule(TimerKey::GestureAutoHide, self.auto_hide_dwell);
        }
        tracing::debug!(from = ?prev, to = ?self.state, "overlay shown");
        prev != self.state
    }

    pub fn hide(&mut self, show_hotspot: bool, _now: Instant) -> bool {
        let prev = self.state;
        self.cancel_auto_hide();
        self.state = if show_hotspot {
            OverlayState::HiddenWithHotspot
        } else {
            OverlayState::FullyHidden
        };
        tracing::debug!(from = ?prev, to = ?self.state, "overlay hidden");
        prev != self.state
    }

    /// A dark-mode flip repaints the whole surface; record it so auto-hide
    /// stays vetoed while that is in flight.
    pub fn note_dark_mode_change(&mut self, now: Instant) {
        self.last_dark_mode_change = Some(now);
    }

    /// Gate for caller-initiated auto-hides. False while a dark-mode change
    /// is settling, and false while a freshly gesture-summoned overlay has
    /// not yet had its dwell.
    pub fn can_auto_hide(&self, now: Instant) -> bool {
        if let Some(at) = self.last_dark_mode_change {
            if now.saturating_duration_since(at) < self.dark_mode_veto {
                return false;
            }
        }
        if self.state == OverlayState::Visible(ShowMethod::Gesture) {
            if let Some(at) = self.gesture_show_at {
                if now.saturating_duration_since(at) < self.auto_hide_dwell {
                    return false;
                }
            }
        }
        true
    }

    /// The armed auto-hide timer expired. A stale fire (the state moved on
    /// between scheduling and expiry) is a no-op, not an error.
    pub fn on_auto_hide_timer(&mut self, _now: Instant) -> bool {
        if self.state != OverlayState::Visible(ShowMethod::Gesture) {
            tracing::debug!(state = ?self.state, "stale auto-hide fire ignored");
            return false;
        }
        self.gesture_show_at = None;
        self.state = OverlayState::HiddenWithHotspot;
        tracing::debug!("gesture overlay auto-hidden");
        true
    }

    fn cancel_auto_hide(&mut self) {
        if self.state == OverlayState::Visible(ShowMethod::Gesture) {
            self.scheduler.cancel(TimerKey::GestureAutoHide);
        }
        self.gesture_show_at = None;
    }
}

/// Whether the orchestration layer should request a hide for this state.
/// The caller still consults [`OverlayStateMachine::can_auto_hide`].
pub fn should_hide(state: &SystemState, settings: &Settings) -> bool {
    if state.is_lock_screen || state.is_wallpaper_preview_visible {
        return true;
    }
    if state.is_fullscreen && !state.is_on_home_screen && state.foreground_package.is_some() {
        return true;
    }
    app_filter_blocks(settings, state.foreground_package.as_deref())
}

/// Per-app visibility filter: a block-list hit hides, and a non-empty
/// allow-list hides everything outside it. Entries match as normalized
/// case-insensitive substrings.
pub fn app_filter_blocks(settings: &Settings, package: Option<&str>) -> bool {
    let Some(package) = package else {
        return false;
    };
    let normalized = package.trim().to_lowercase();
    if normalized.is_empty() {
        return false;
    }
    let matches = |entry: &String| {
        let entry = entry.trim().to_lowercase();
        !entry.is_empty() && normalized.contains(&entry)
    };
    if settings.hidden_apps.iter().any(matches) {
        return true;
    }
    if !settings.allowed_apps.is_empty() && !settings.allowed_apps.iter().any(matches) {
        return true;
    }
    false
}

/// Side effects a panel or home control asks the host to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelAction {
    ShowNotifications,
    DismissShade,
    ShowQuickSettings,
    Assist,
}

/// Press/long-press semantics of the single panel control. Two booleans,
/// with only the combinations the transitions below can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelToggle {
    pub notification_open: bool,
    pub quick_settings_open: bool,
}

impl PanelToggle {
    pub fn press(&mut self) -> PanelAction {
        if self.quick_settings_open {
            self.notification_open = true;
            self.quick_settings_open = false;
            PanelAction::ShowNotifications
        } else if self.notification_open {
            self.notification_open = false;
            PanelAction::DismissShade
        } else {
            self.notification_open = true;
            PanelAction::ShowNotifications
        }
    }

    pub fn long_press(&mut self) -> PanelAction {
        if self.quick_settings_open {
            self.notification_open = false;
            self.quick_settings_open = false;
            PanelAction::DismissShade
        } else {
            self.notification_open = true;
            self.quick_settings_open = true;
            PanelAction::ShowQuickSettings
        }
    }

    /// Reconcile with the observed shade state; the user can close the shade
    /// without going through this control.
    pub fn sync_panel_open(&mut self, open: bool) {
        if !open {
            *self = Self::default();
        } else {
            self.notification_open = true;
        }
    }
}

/// The home-action control's long-press always requests assist.
pub fn home_long_press_action() -> PanelAction {
    PanelAction::Assist
}
