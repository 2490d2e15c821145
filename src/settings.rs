use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Package that owns the platform's bars and panels. Windows from this
    /// owner are the geometric proxies for the navigation bar and shade.
    #[serde(default = "default_shell_package")]
    pub shell_package: String,
    /// Bar thickness at or below which the bar counts as hidden or
    /// gesture-only, in px at density 1.0.
    #[serde(default = "default_gesture_only_threshold")]
    pub gesture_only_threshold_px: i32,
    /// Floor for the "bar is visible" height test.
    #[serde(default = "default_min_bar_height")]
    pub min_bar_height_px: i32,
    /// Minimum height for a window to count as a visible on-screen keyboard.
    #[serde(default = "default_min_ime_height")]
    pub min_ime_height_px: i32,
    /// Minimum height for a shell window to count as an open notification
    /// panel.
    #[serde(default = "default_min_panel_height")]
    pub min_panel_height_px: i32,
    /// Vertical travel required before a touch sequence resolves as a swipe.
    #[serde(default = "default_swipe_threshold")]
    pub swipe_threshold_px: f32,
    /// Delay before a home-screen exit is accepted.
    #[serde(default = "default_home_off_debounce")]
    pub home_off_debounce_ms: u64,
    /// Delay before recents-entered is accepted while still on home.
    #[serde(default = "default_recents_on_debounce")]
    pub recents_on_debounce_ms: u64,
    /// Dwell before a gesture-summoned overlay re-hides on its own.
    #[serde(default = "default_gesture_auto_hide")]
    pub gesture_auto_hide_ms: u64,
    /// Window after a dark-mode change during which auto-hide is vetoed.
    #[serde(default = "default_dark_mode_debounce")]
    pub dark_mode_debounce_ms: u64,
    /// How recent the last input event must be for the keyboard fallback
    /// path to treat the IME as visible.
    #[serde(default = "default_ime_event_recency")]
    pub ime_event_recency_ms: u64,
    /// Packages in front of which the overlay is always hidden. Matched as
    /// case-insensitive substrings.
    #[serde(default)]
    pub hidden_apps: Vec<String>,
    /// If non-empty, the overlay is only shown in front of these packages.
    #[serde(default)]
    pub allowed_apps: Vec<String>,
    /// Ignore stylus touch sequences on both gesture surfaces.
    #[serde(default)]
    pub ignore_stylus_input: bool,
    /// When enabled the subsystem initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_shell_package() -> String {
    "com.android.systemui".to_string()
}

fn default_gesture_only_threshold() -> i32 {
    8
}

fn default_min_bar_height() -> i32 {
    24
}

fn default_min_ime_height() -> i32 {
    120
}

fn default_min_panel_height() -> i32 {
    160
}

fn default_swipe_threshold() -> f32 {
    48.0
}

fn default_home_off_debounce() -> u64 {
    350
}

fn default_recents_on_debounce() -> u64 {
    150
}

fn default_gesture_auto_hide() -> u64 {
    3_000
}

fn default_dark_mode_debounce() -> u64 {
    1_000
}

fn default_ime_event_recency() -> u64 {
    500
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shell_package: default_shell_package(),
            gesture_only_threshold_px: default_gesture_only_threshold(),
            min_bar_height_px: default_min_bar_height(),
            min_ime_height_px: default_min_ime_height(),
            min_panel_height_px: default_min_panel_height(),
            swipe_threshold_px: default_swipe_threshold(),
            home_off_debounce_ms: default_home_off_debounce(),
            recents_on_debounce_ms: default_recents_on_debounce(),
            gesture_auto_hide_ms: default_gesture_auto_hide(),
            dark_mode_debounce_ms: default_dark_mode_debounce(),
            ime_event_recency_ms: default_ime_event_recency(),
            hidden_apps: Vec::new(),
            allowed_apps: Vec::new(),
            ignore_stylus_input: false,
            debug_logging: false,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn home_off_debounce(&self) -> Duration {
        Duration::from_millis(self.home_off_debounce_ms)
    }

    pub fn recents_on_debounce(&self) -> Duration {
        Duration::from_millis(self.recents_on_debounce_ms)
    }

    pub fn gesture_auto_hide(&self) -> Duration {
        Duration::from_millis(self.gesture_auto_hide_ms)
    }

    pub fn dark_mode_debounce(&self) -> Duration {
        Duration::from_millis(self.dark_mode_debounce_ms)
    }
}
