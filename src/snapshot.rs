use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

/// Declared role of an observed window, as reported by the host shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Application,
    InputMethod,
    SystemOverlay,
    Wallpaper,
    Other,
}

/// A window vanished between enumeration and the bounds query. Carried as
/// data so one bad window never aborts a classification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundsUnavailable {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    pub kind: WindowKind,
    pub owner_package: String,
    pub title: Option<String>,
    /// Set when the host-side fullscreen flag was readable for this window.
    pub fullscreen_hint: Option<bool>,
    bounds: Result<Rect, BoundsUnavailable>,
}

impl WindowDescriptor {
    pub fn new(kind: WindowKind, owner_package: impl Into<String>, bounds: Rect) -> Self {
        Self {
            kind,
            owner_package: owner_package.into(),
            title: None,
            fullscreen_hint: None,
            bounds: Ok(bounds),
        }
    }

    /// A descriptor whose bounds query failed mid-enumeration.
    pub fn unreadable(
        kind: WindowKind,
        owner_package: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            owner_package: owner_package.into(),
            title: None,
            fullscreen_hint: None,
            bounds: Err(BoundsUnavailable {
                reason: reason.into(),
            }),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_fullscreen_hint(mut self, hint: bool) -> Self {
        self.fullscreen_hint = Some(hint);
        self
    }

    /// Screen bounds of this window. Callers must skip the window on `Err`
    /// rather than failing the pass.
    pub fn bounds(&self) -> Result<Rect, &BoundsUnavailable> {
        self.bounds.as_ref().map(|r| *r)
    }
}

/// Navigation-bar inset as reported by the host's inset query, when one is
/// available. Takes precedence over geometry in fullscreen detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsetReport {
    pub visible: bool,
    pub height: i32,
}

/// One observation of the foreign window environment. Transient: recomputed
/// on every observation and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub windows: Vec<WindowDescriptor>,
    pub screen: Rect,
    /// Display density relative to the baseline density; scales pixel
    /// thresholds that were tuned at 1.0.
    pub density_scale: f32,
    pub nav_inset: Option<InsetReport>,
}

impl WindowSnapshot {
    pub fn new(screen: Rect) -> Self {
        Self {
            windows: Vec::new(),
            screen,
            density_scale: 1.0,
            nav_inset: None,
        }
    }

    pub fn with_windows(mut self, windows: Vec<WindowDescriptor>) -> Self {
        self.windows = windows;
        self
    }

    pub fn with_density(mut self, scale: f32) -> Self {
        self.density_scale = scale;
        self
    }

    pub fn with_nav_inset(mut self, inset: InsetReport) -> Self {
        self.nav_inset = Some(inset);
        self
    }
}
