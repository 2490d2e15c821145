use serde::{Deserialize, Serialize};

/// Which touch surface a pointer sequence arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchSurface {
    /// Narrow strip at the screen edge used to re-summon a hidden overlay.
    Summon,
    /// Covers the overlay while it is shown via gesture.
    Dismiss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerSource {
    Finger,
    Stylus,
    Mouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureEvent {
    SwipeUp,
    SwipeDown,
    /// Release below the swipe threshold on the dismiss surface; passed
    /// through so the control underneath still receives the tap.
    Tap,
}

/// Per-surface swipe recogniser. One instance tracks one surface across
/// touch sequences; sequence state lives only between down and up/cancel.
#[derive(Debug)]
pub struct SwipeTracker {
    surface: TouchSurface,
    threshold_px: f32,
    ignore_stylus: bool,
    start_y: Option<f32>,
    down_y: f32,
    swiped: bool,
}

impl SwipeTracker {
    pub fn new(surface: TouchSurface, threshold_px: f32, ignore_stylus: bool) -> Self {
        Self {
            surface,
            threshold_px,
            ignore_stylus,
            start_y: None,
            down_y: 0.0,
            swiped: false,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.start_y.is_some()
    }

    /// Begin a sequence. A filtered input source makes the whole sequence
    /// invisible to the recogniser.
    pub fn feed_down(&mut self, y: f32, source: PointerSource) {
        if self.ignore_stylus && source == PointerSource::Stylus {
            tracing::debug!(surface = ?self.surface, "ignoring stylus sequence");
            self.start_y = None;
            return;
        }
        self.start_y = Some(y);
        self.down_y = y;
        self.swiped = false;
    }

    pub fn feed_move(&mut self, y: f32) -> Option<GestureEvent> {
        let start = self.start_y?;
        match self.surface {
            TouchSurface::Summon => {
                if start - y >= self.threshold_px {
                    // Rebase so one long continuous drag can trigger again.
                    self.start_y = Some(y);
                    self.swiped = true;
                    return Some(GestureEvent::SwipeUp);
                }
            }
            TouchSurface::Dismiss => {
                if y - start >= self.threshold_px {
                    self.start_y = Some(y);
                    self.swiped = true;
                    return Some(GestureEvent::SwipeDown);
                }
            }
        }
        None
    }

    pub fn feed_up(&mut self, y: f32) -> Option<GestureEvent> {
        let start = self.start_y.take()?;
        let swiped = self.swiped;
        self.swiped = false;
        match self.surface {
            TouchSurface::Summon => {
                (start - y >= self.threshold_px).then_some(GestureEvent::SwipeUp)
            }
            TouchSurface::Dismiss => {
                // Total travel below threshold and no swipe resolved earlier:
                // the sequence was a tap, not a failed swipe.
                (!swiped && (y - self.down_y).abs() < self.threshold_px)
                    .then_some(GestureEvent::Tap)
            }
        }
    }

    pub fn cancel(&mut self) {
        self.start_y = None;
        self.swiped = false;
    }
}
