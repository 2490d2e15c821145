use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::anyhow;

use crate::aggregator::{Aggregator, Orientation, SignalKey, StateChange, SystemState};
use crate::classify::{self, ImeHints, WindowStateClassifier};
use crate::debounce::{DebounceScheduler, TimerEngine, TimerKey};
use crate::gesture::{GestureEvent, PointerSource, SwipeTracker, TouchSurface};
use crate::overlay::{
    self, OverlayState, OverlayStateMachine, PanelAction, PanelToggle, ShowMethod,
};
use crate::settings::Settings;
use crate::snapshot::WindowSnapshot;

/// Everything the control loop reacts to. Events are processed strictly in
/// arrival order; one event's full effect completes before the next is
/// taken.
#[derive(Debug)]
pub enum ControlEvent {
    WindowObservation(WindowSnapshot),
    ContentChanged,
    Touch {
        surface: TouchSurface,
        action: TouchAction,
        y: f32,
        source: PointerSource,
    },
    ConfigurationChanged {
        orientation: Orientation,
        is_dark: bool,
    },
    ForegroundChanged {
        package: String,
        class_name: Option<String>,
    },
    PanelButton {
        long_press: bool,
    },
    HomeButton {
        long_press: bool,
    },
    TimerFired(TimerKey),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    Down,
    Move,
    Up,
    Cancel,
}

/// Read-only queries against the host platform.
pub trait SystemProbe: Send {
    /// Device locked or keyguard showing.
    fn is_locked(&self) -> bool;
    fn ime_accepting_text(&self) -> bool;
    fn ime_focus_active(&self) -> bool;
    fn last_input_event_age_ms(&self) -> Option<u64>;
    /// Component id of the configured input method, e.g.
    /// "com.pkg/.ServiceClass".
    fn default_input_method(&self) -> Option<String>;
    /// Packages the platform resolves for the home intent. May be empty when
    /// resolution fails; a fallback list is used then.
    fn launcher_packages(&self) -> Vec<String>;
}

/// Fire-and-forget side effects on the control surface. No return values are
/// consumed; absence of a visible effect is the contract.
pub trait OverlayHost: Send {
    fn show_overlay(&self, method: ShowMethod);
    fn hide_overlay(&self, show_hotspot: bool);
    fn refresh_background(&self);
    fn recolor_buttons(&self, is_dark: bool);
    fn perform_panel_action(&self, action: PanelAction);
}

struct Shared {
    system: Mutex<SystemState>,
    overlay: Mutex<OverlayState>,
}

/// Owns the control loop: observations, touch input and timer expiries all
/// funnel into one worker thread, so classification, aggregation and state
/// transitions never race each other.
pub struct WatchService {
    settings: Settings,
    event_tx: Sender<ControlEvent>,
    event_rx: Option<Receiver<ControlEvent>>,
    probe: Option<Box<dyn SystemProbe>>,
    host: Option<Box<dyn OverlayHost>>,
    worker: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl WatchService {
    pub fn new(settings: Settings, probe: Box<dyn SystemProbe>, host: Box<dyn OverlayHost>) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            settings,
            event_tx,
            event_rx: Some(event_rx),
            probe: Some(probe),
            host: Some(host),
            worker: None,
            shared: Arc::new(Shared {
                system: Mutex::new(SystemState::default()),
                overlay: Mutex::new(OverlayState::Visible(ShowMethod::Normal)),
            }),
        }
    }

    pub fn start(&mut self) -> anyhow::Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let event_rx = self
            .event_rx
            .take()
            .ok_or_else(|| anyhow!("service was already started once"))?;
        let probe = self.probe.take().ok_or_else(|| anyhow!("probe consumed"))?;
        let host = self.host.take().ok_or_else(|| anyhow!("host consumed"))?;

        let settings = self.settings.clone();
        let event_tx = self.event_tx.clone();
        let shared = Arc::clone(&self.shared);
        self.worker = Some(thread::spawn(move || {
            Worker::new(settings, probe, host, event_tx, shared).run(event_rx)
        }));
        Ok(())
    }

    /// Tear down the control loop. Pending debounce timers are cancelled,
    /// the worker is joined.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.event_tx.send(ControlEvent::Shutdown);
            let _ = worker.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn handle(&self) -> ServiceHandle {
        ServiceHandle {
            tx: self.event_tx.clone(),
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn current_system_state(&self) -> SystemState {
        self.shared.system.lock().unwrap().clone()
    }

    pub fn current_overlay_state(&self) -> OverlayState {
        *self.shared.overlay.lock().unwrap()
    }
}

impl Drop for WatchService {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cloneable entry-point surface for host callbacks. All methods enqueue
/// onto the control loop; callers on any thread are marshalled through the
/// channel before shared state is touched.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: Sender<ControlEvent>,
    shared: Arc<Shared>,
}

impl ServiceHandle {
    /// Deliver one window-list observation. Hosts whose enumeration API is
    /// unavailable must skip the call entirely: an empty window list is a
    /// valid observation, not a failure marker.
    pub fn on_window_observation(&self, snapshot: WindowSnapshot) {
        let _ = self.tx.send(ControlEvent::WindowObservation(snapshot));
    }

    pub fn on_content_changed(&self) {
        let _ = self.tx.send(ControlEvent::ContentChanged);
    }

    pub fn on_touch_event(
        &self,
        surface: TouchSurface,
        action: TouchAction,
        y: f32,
        source: PointerSource,
    ) {
        let _ = self.tx.send(ControlEvent::Touch {
            surface,
            action,
            y,
            source,
        });
    }

    pub fn on_configuration_changed(&self, orientation: Orientation, is_dark: bool) {
        let _ = self.tx.send(ControlEvent::ConfigurationChanged {
            orientation,
            is_dark,
        });
    }

    pub fn on_foreground_changed(&self, package: impl Into<String>, class_name: Option<String>) {
        let _ = self.tx.send(ControlEvent::ForegroundChanged {
            package: package.into(),
            class_name,
        });
    }

    pub fn on_panel_button(&self, long_press: bool) {
        let _ = self.tx.send(ControlEvent::PanelButton { long_press });
    }

    pub fn on_home_button(&self, long_press: bool) {
        let _ = self.tx.send(ControlEvent::HomeButton { long_press });
    }

    pub fn current_system_state(&self) -> SystemState {
        self.shared.system.lock().unwrap().clone()
    }

    pub fn current_overlay_state(&self) -> OverlayState {
        *self.shared.overlay.lock().unwrap()
    }
}

struct Worker {
    settings: Settings,
    probe: Box<dyn SystemProbe>,
    host: Box<dyn OverlayHost>,
    shared: Arc<Shared>,
    _engine: Arc<TimerEngine<ControlEvent>>,
    classifier: WindowStateClassifier,
    aggregator: Aggregator,
    machine: OverlayStateMachine,
    panel: PanelToggle,
    summon: SwipeTracker,
    dismiss: SwipeTracker,
    hidden_by_policy: bool,
}

impl Worker {
    fn new(
        settings: Settings,
        probe: Box<dyn SystemProbe>,
        host: Box<dyn OverlayHost>,
        event_tx: Sender<ControlEvent>,
        shared: Arc<Shared>,
    ) -> Self {
        let engine = Arc::new(TimerEngine::new(event_tx, ControlEvent::TimerFired));
        let scheduler: Arc<dyn DebounceScheduler> = engine.clone();

        let mut classifier = WindowStateClassifier::new(&settings);
        classifier.set_default_ime(probe.default_input_method());
        classifier.set_launcher_packages(probe.launcher_packages());

        let aggregator = Aggregator::new(&settings, Arc::clone(&scheduler));
        let machine = OverlayStateMachine::new(&settings, Arc::clone(&scheduler));
        let summon = SwipeTracker::new(
            TouchSurface::Summon,
            settings.swipe_threshold_px,
            settings.ignore_stylus_input,
        );
        let dismiss = SwipeTracker::new(
            TouchSurface::Dismiss,
            settings.swipe_threshold_px,
            settings.ignore_stylus_input,
        );

        Self {
            settings,
            probe,
            host,
            shared,
            _engine: engine,
            classifier,
            aggregator,
            machine,
            panel: PanelToggle::default(),
            summon,
            dismiss,
            hidden_by_policy: false,
        }
    }

    fn run(mut self, event_rx: Receiver<ControlEvent>) {
        tracing::debug!("control loop started");
        while let Ok(event) = event_rx.recv() {
            let now = Instant::now();
            match event {
                ControlEvent::Shutdown => break,
                ControlEvent::WindowObservation(snapshot) => {
                    self.handle_observation(&snapshot, now)
                }
                ControlEvent::ContentChanged => self.handle_content_changed(now),
                ControlEvent::ConfigurationChanged {
                    orientation,
                    is_dark,
                } => {
                    let changes = [
                        self.aggregator.offer_orientation(orientation),
                        self.aggregator.offer_dark_mode(is_dark),
                    ];
                    for change in changes.into_iter().flatten() {
                        self.route_change(change, now);
                    }
                }
                ControlEvent::ForegroundChanged {
                    package,
                    class_name,
                } => self.handle_foreground_changed(package, class_name.as_deref(), now),
                ControlEvent::Touch {
                    surface,
                    action,
                    y,
                    source,
                } => self.handle_touch(surface, action, y, source, now),
                ControlEvent::PanelButton { long_press } => {
                    let action = if long_press {
                        self.panel.long_press()
                    } else {
                        self.panel.press()
                    };
                    self.host.perform_panel_action(action);
                }
                ControlEvent::HomeButton { long_press } => {
                    // A plain home press is executed by the host directly;
                    // only the assist long-press flows through here.
                    if long_press {
                        self.host
                            .perform_panel_action(overlay::home_long_press_action());
                    }
                }
                ControlEvent::TimerFired(TimerKey::GestureAutoHide) => {
                    if self.machine.on_auto_hide_timer(now) {
                        self.publish_overlay();
                        self.host.hide_overlay(true);
                    }
                }
                ControlEvent::TimerFired(key) => {
                    if let Some(change) = self.aggregator.fire(key, now) {
                        self.route_change(change, now);
                    }
                }
            }
        }
        self.aggregator.clear_pending();
        tracing::debug!("control loop stopped");
        // The timer engine is dropped with the worker; pending entries die
        // with it.
    }

    fn handle_observation(&mut self, snapshot: &WindowSnapshot, now: Instant) {
        let hints = self.ime_hints();
        let signals = self.classifier.classify(snapshot, hints);
        let changes = [
            self.aggregator.offer_fullscreen(signals.fullscreen),
            self.aggregator.offer_ime_visible(signals.ime_visible),
            self.aggregator
                .offer_notification_panel(signals.notification_panel_open),
            self.aggregator.offer_lock_screen(self.probe.is_locked()),
        ];
        for change in changes.into_iter().flatten() {
            self.route_change(change, now);
        }
    }

    fn handle_content_changed(&mut self, now: Instant) {
        let mut changes = Vec::new();
        changes.extend(self.aggregator.offer_lock_screen(self.probe.is_locked()));
        if let Some(visible) = self.classifier.reevaluate_ime(self.ime_hints()) {
            changes.extend(self.aggregator.offer_ime_visible(visible));
        }
        for change in changes {
            self.route_change(change, now);
        }
    }

    fn handle_foreground_changed(
        &mut self,
        package: String,
        class_name: Option<&str>,
        now: Instant,
    ) {
        let home = self.classifier.is_home(&package);
        let recents = class_name.map(classify::is_recents_class).unwrap_or(false);
        let wallpaper = class_name
            .map(classify::is_wallpaper_preview_class)
            .unwrap_or(false);

        let changes = [
            self.aggregator.offer_foreground_package(Some(package)),
            self.aggregator.offer_home(home, now),
            self.aggregator.offer_recents(recents, now),
            self.aggregator.offer_wallpaper_preview(wallpaper),
        ];
        for change in changes.into_iter().flatten() {
            self.route_change(change, now);
        }
    }

    fn handle_touch(
        &mut self,
        surface: TouchSurface,
        action: TouchAction,
        y: f32,
        source: PointerSource,
        now: Instant,
    ) {
        let tracker = match surface {
            TouchSurface::Summon => &mut self.summon,
            TouchSurface::Dismiss => &mut self.dismiss,
        };
        let gesture = match action {
            TouchAction::Down => {
                tracker.feed_down(y, source);
                None
            }
            TouchAction::Move => tracker.feed_move(y),
            TouchAction::Up => tracker.feed_up(y),
            TouchAction::Cancel => {
                tracker.cancel();
                None
            }
        };
        if let Some(gesture) = gesture {
            self.handle_gesture(gesture, now);
        }
    }

    fn handle_gesture(&mut self, gesture: GestureEvent, now: Instant) {
        match gesture {
            GestureEvent::SwipeUp => {
                self.hidden_by_policy = false;
                self.machine.show(ShowMethod::Gesture, now);
                self.publish_overlay();
                self.host.show_overlay(ShowMethod::Gesture);
            }
            GestureEvent::SwipeDown => {
                self.machine.hide(true, now);
                self.publish_overlay();
                self.host.hide_overlay(true);
            }
            GestureEvent::Tap => {
                // Passed through to the control underneath; nothing to do
                // here.
                tracing::debug!("tap passed through dismiss surface");
            }
        }
    }

    fn route_change(&mut self, change: StateChange, now: Instant) {
        *self.shared.system.lock().unwrap() = change.state.clone();

        match change.key {
            SignalKey::DarkMode => {
                self.machine.note_dark_mode_change(now);
                self.host.recolor_buttons(change.state.is_dark_mode);
            }
            SignalKey::HomeScreen | SignalKey::RecentsVisible => {
                self.host.refresh_background();
            }
            SignalKey::NotificationPanel => {
                self.panel
                    .sync_panel_open(change.state.is_notification_panel_open);
            }
            _ => {}
        }

        self.apply_hide_policy(&change.state, now);
    }

    fn apply_hide_policy(&mut self, state: &SystemState, now: Instant) {
        if overlay::should_hide(state, &self.settings) {
            let visible = matches!(self.machine.state(), OverlayState::Visible(_));
            if visible && self.machine.can_auto_hide(now) {
                // No hotspot on the lock screen or over a wallpaper preview;
                // everywhere else the edge strip stays armed.
                let show_hotspot = !state.is_lock_screen && !state.is_wallpaper_preview_visible;
                self.machine.hide(show_hotspot, now);
                self.hidden_by_policy = true;
                self.publish_overlay();
                self.host.hide_overlay(show_hotspot);
            }
        } else if self.hidden_by_policy
            && !matches!(self.machine.state(), OverlayState::Visible(_))
        {
            self.machine.show(ShowMethod::Fade, now);
            self.hidden_by_policy = false;
            self.publish_overlay();
            self.host.show_overlay(ShowMethod::Fade);
        }
    }

    fn ime_hints(&self) -> ImeHints {
        ImeHints {
            accepting_text: self.probe.ime_accepting_text(),
            focus_active: self.probe.ime_focus_active(),
            last_event_age_ms: self.probe.last_input_event_age_ms(),
        }
    }

    fn publish_overlay(&self) {
        *self.shared.overlay.lock().unwrap() = self.machine.state();
    }
}

/// Probe whose answers are plain fields, adjustable from tests through a
/// shared handle.
#[derive(Clone, Default)]
pub struct FixedProbe {
    state: Arc<Mutex<FixedProbeState>>,
}

#[derive(Default)]
struct FixedProbeState {
    locked: bool,
    accepting_text: bool,
    focus_active: bool,
    last_input_event_age_ms: Option<u64>,
    default_input_method: Option<String>,
    launcher_packages: Vec<String>,
}

impl FixedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_locked(&self, locked: bool) {
        self.state.lock().unwrap().locked = locked;
    }

    pub fn set_ime_accepting_text(&self, accepting: bool) {
        self.state.lock().unwrap().accepting_text = accepting;
    }

    pub fn set_ime_focus_active(&self, focused: bool) {
        self.state.lock().unwrap().focus_active = focused;
    }

    pub fn set_last_input_event_age_ms(&self, age: Option<u64>) {
        self.state.lock().unwrap().last_input_event_age_ms = age;
    }

    pub fn set_default_input_method(&self, id: Option<String>) {
        self.state.lock().unwrap().default_input_method = id;
    }

    pub fn set_launcher_packages(&self, packages: Vec<String>) {
        self.state.lock().unwrap().launcher_packages = packages;
    }
}

impl SystemProbe for FixedProbe {
    fn is_locked(&self) -> bool {
        self.state.lock().unwrap().locked
    }

    fn ime_accepting_text(&self) -> bool {
        self.state.lock().unwrap().accepting_text
    }

    fn ime_focus_active(&self) -> bool {
        self.state.lock().unwrap().focus_active
    }

    fn last_input_event_age_ms(&self) -> Option<u64> {
        self.state.lock().unwrap().last_input_event_age_ms
    }

    fn default_input_method(&self) -> Option<String> {
        self.state.lock().unwrap().default_input_method.clone()
    }

    fn launcher_packages(&self) -> Vec<String> {
        self.state.lock().unwrap().launcher_packages.clone()
    }
}

/// Host that records every side-effect request for assertion.
#[derive(Clone, Default)]
pub struct RecordingHost {
    requests: Arc<Mutex<Vec<HostRequest>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    Show(ShowMethod),
    Hide { show_hotspot: bool },
    RefreshBackground,
    Recolor { is_dark: bool },
    Panel(PanelAction),
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_requests(&self) -> Vec<HostRequest> {
        std::mem::take(&mut *self.requests.lock().unwrap())
    }

    pub fn requests(&self) -> Vec<HostRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl OverlayHost for RecordingHost {
    fn show_overlay(&self, method: ShowMethod) {
        self.requests.lock().unwrap().push(HostRequest::Show(method));
    }

    fn hide_overlay(&self, show_hotspot: bool) {
        self.requests
            .lock()
            .unwrap()
            .push(HostRequest::Hide { show_hotspot });
    }

    fn refresh_background(&self) {
        self.requests.lock().unwrap().push(HostRequest::RefreshBackground);
    }

    fn recolor_buttons(&self, is_dark: bool) {
        self.requests
            .lock()
            .unwrap()
            .push(HostRequest::Recolor { is_dark });
    }

    fn perform_panel_action(&self, action: PanelAction) {
        self.requests.lock().unwrap().push(HostRequest::Panel(action));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_twice_is_idempotent() {
        let mut service = WatchService::new(
            Settings::default(),
            Box::new(FixedProbe::new()),
            Box::new(RecordingHost::new()),
        );
        service.start().unwrap();
        assert!(service.is_running());
        service.start().unwrap();
        service.stop();
        assert!(!service.is_running());
    }

    #[test]
    fn initial_snapshots_are_defaults() {
        let service = WatchService::new(
            Settings::default(),
            Box::new(FixedProbe::new()),
            Box::new(RecordingHost::new()),
        );
        assert_eq!(service.current_system_state(), SystemState::default());
        assert_eq!(
            service.current_overlay_state(),
            OverlayState::Visible(ShowMethod::Normal)
        );
    }

    #[test]
    fn recording_host_takes_and_clears() {
        let host = RecordingHost::new();
        host.show_overlay(ShowMethod::Normal);
        host.hide_overlay(true);
        assert_eq!(
            host.take_requests(),
            vec![
                HostRequest::Show(ShowMethod::Normal),
                HostRequest::Hide { show_hotspot: true },
            ]
        );
        assert!(host.take_requests().is_empty());
    }
}
