use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::debounce::{DebounceScheduler, TimerKey};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Immutable snapshot of every accepted signal. Replaced wholesale on each
/// acceptance so consumers never observe a partially updated state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct SystemState {
    pub is_on_home_screen: bool,
    pub is_recents_visible: bool,
    pub is_fullscreen: bool,
    pub is_lock_screen: bool,
    pub is_ime_visible: bool,
    pub is_notification_panel_open: bool,
    pub is_wallpaper_preview_visible: bool,
    pub foreground_package: Option<String>,
    pub orientation: Orientation,
    pub is_dark_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKey {
    HomeScreen,
    RecentsVisible,
    Fullscreen,
    LockScreen,
    ImeVisible,
    NotificationPanel,
    WallpaperPreview,
    ForegroundPackage,
    Orientation,
    DarkMode,
}

/// Emitted for every acceptance, in acceptance order. `key` names the field
/// that changed; `state` is the full snapshot after the change.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub key: SignalKey,
    pub state: SystemState,
}

/// A signal change waiting out its debounce delay. At most one per key;
/// superseded or cancelled by later observations.
#[derive(Debug, Clone, Copy)]
pub struct PendingDebounce {
    pub scheduled_at: Instant,
    pub delay: Duration,
    pub value: bool,
}

/// Applies the per-key acceptance policy to candidate signal changes. Most
/// keys accept immediately; home and recents debounce their "losing"
/// direction to absorb the window-event bursts that activity transitions
/// produce.
pub struct Aggregator {
    current: SystemState,
    pending: HashMap<TimerKey, PendingDebounce>,
    scheduler: Arc<dyn DebounceScheduler>,
    home_off_delay: Duration,
    recents_on_delay: Duration,
}

impl Aggregator {
    pub fn new(settings: &Settings, scheduler: Arc<dyn DebounceScheduler>) -> Self {
        Self {
            current: SystemState::default(),
            pending: HashMap::new(),
            scheduler,
            home_off_delay: settings.home_off_debounce(),
            recents_on_delay: settings.recents_on_debounce(),
        }
    }

    pub fn current(&self) -> &SystemState {
        &self.current
    }

    pub fn pending(&self, key: TimerKey) -> Option<&PendingDebounce> {
        self.pending.get(&key)
    }

    /// Home on is immediate; home off waits out the debounce and dies if
    /// home comes back first.
    pub fn offer_home(&mut self, value: bool, now: Instant) -> Option<StateChange> {
        if value {
            if self.pending.remove(&TimerKey::HomeOff).is_some() {
                self.scheduler.cancel(TimerKey::HomeOff);
                tracing::debug!("home returned before debounce expired; exit suppressed");
            }
            return self.accept(SignalKey::HomeScreen, |s| s.is_on_home_screen = true);
        }
        if !self.current.is_on_home_screen || self.pending.contains_key(&TimerKey::HomeOff) {
            return None;
        }
        self.pending.insert(
            TimerKey::HomeOff,
            PendingDebounce {
                scheduled_at: now,
                delay: self.home_off_delay,
                value: false,
            },
        );
        self.scheduler.schedule(TimerKey::HomeOff, self.home_off_delay);
        None
    }

    /// Recents off is immediate; recents on is delayed only while home is
    /// still current, guarding against transient flicker when leaving home.
    pub fn offer_recents(&mut self, value: bool, now: Instant) -> Option<StateChange> {
        if !value {
            if self.pending.remove(&TimerKey::RecentsOn).is_some() {
                self.scheduler.cancel(TimerKey::RecentsOn);
            }
            return self.accept(SignalKey::RecentsVisible, |s| s.is_recents_visible = false);
        }
        if self.current.is_recents_visible {
            return None;
        }
        if self.current.is_on_home_screen {
            if !self.pending.contains_key(&TimerKey::RecentsOn) {
                self.pending.insert(
                    TimerKey::RecentsOn,
                    PendingDebounce {
                        scheduled_at: now,
                        delay: self.recents_on_delay,
                        value: true,
                    },
                );
                self.scheduler
                    .schedule(TimerKey::RecentsOn, self.recents_on_delay);
            }
            return None;
        }
        self.accept(SignalKey::RecentsVisible, |s| s.is_recents_visible = true)
    }

    /// Apply a debounced change whose delay has expired. A fire with no
    /// matching pending entry (superseded, cancelled, torn down) is a no-op.
    pub fn fire(&mut self, key: TimerKey, _now: Instant) -> Option<StateChange> {
        let pending = self.pending.remove(&key)?;
        match key {
            TimerKey::HomeOff => {
                self.accept(SignalKey::HomeScreen, |s| s.is_on_home_screen = pending.value)
            }
            TimerKey::RecentsOn => self.accept(SignalKey::RecentsVisible, |s| {
                s.is_recents_visible = pending.value
            }),
            TimerKey::GestureAutoHide => None,
        }
    }

    pub fn offer_fullscreen(&mut self, value: bool) -> Option<StateChange> {
        self.accept(SignalKey::Fullscreen, |s| s.is_fullscreen = value)
    }

    pub fn offer_lock_screen(&mut self, value: bool) -> Option<StateChange> {
        self.accept(SignalKey::LockScreen, |s| s.is_lock_screen = value)
    }

    pub fn offer_ime_visible(&mut self, value: bool) -> Option<StateChange> {
        self.accept(SignalKey::ImeVisible, |s| s.is_ime_visible = value)
    }

    pub fn offer_notification_panel(&mut self, value: bool) -> Option<StateChange> {
        self.accept(SignalKey::NotificationPanel, |s| {
            s.is_notification_panel_open = value
        })
    }

    pub fn offer_wallpaper_preview(&mut self, value: bool) -> Option<StateChange> {
        self.accept(SignalKey::WallpaperPreview, |s| {
            s.is_wallpaper_preview_visible = value
        })
    }

    pub fn offer_foreground_package(&mut self, package: Option<String>) -> Option<StateChange> {
        self.accept(SignalKey::ForegroundPackage, |s| {
            s.foreground_package = package
        })
    }

    pub fn offer_orientation(&mut self, orientation: Orientation) -> Option<StateChange> {
        self.accept(SignalKey::Orientation, |s| s.orientation = orientation)
    }

    pub fn offer_dark_mode(&mut self, value: bool) -> Option<StateChange> {
        self.accept(SignalKey::DarkMode, |s| s.is_dark_mode = value)
    }

    /// Cancel all pending debounces; called at subsystem teardown.
    pub fn clear_pending(&mut self) {
        for key in self.pending.drain().map(|(key, _)| key) {
            self.scheduler.cancel(key);
        }
    }

    fn accept(
        &mut self,
        key: SignalKey,
        mutate: impl FnOnce(&mut SystemState),
    ) -> Option<StateChange> {
        let mut next = self.current.clone();
        mutate(&mut next);
        if next == self.current {
            return None;
        }
        self.current = next.clone();
        tracing::debug!(?key, "signal change accepted");
        Some(StateChange { key, state: next })
    }
}
