use overlay_watch::gesture::{PointerSource, TouchSurface};
use overlay_watch::overlay::{OverlayState, ShowMethod};
use overlay_watch::service::{FixedProbe, HostRequest, RecordingHost, TouchAction, WatchService};
use overlay_watch::settings::Settings;
use serial_test::serial;
use std::time::{Duration, Instant};

fn start_service(settings: Settings) -> (WatchService, RecordingHost) {
    let host = RecordingHost::new();
    let mut service = WatchService::new(
        settings,
        Box::new(FixedProbe::new()),
        Box::new(host.clone()),
    );
    service.start().unwrap();
    (service, host)
}

fn wait_for(cond: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn edge_swipe_summons_by_gesture() {
    let (service, host) = start_service(Settings::default());
    let handle = service.handle();

    handle.on_touch_event(TouchSurface::Summon, TouchAction::Down, 2100.0, PointerSource::Finger);
    handle.on_touch_event(TouchSurface::Summon, TouchAction::Move, 2040.0, PointerSource::Finger);
    handle.on_touch_event(TouchSurface::Summon, TouchAction::Up, 2040.0, PointerSource::Finger);

    assert!(wait_for(
        || handle.current_overlay_state() == OverlayState::Visible(ShowMethod::Gesture),
        Duration::from_secs(1)
    ));
    assert!(host.take_requests().contains(&HostRequest::Show(ShowMethod::Gesture)));
}

#[test]
#[serial]
fn gesture_summon_auto_hides_after_the_dwell() {
    let mut settings = Settings::default();
    settings.gesture_auto_hide_ms = 150;
    let (service, host) = start_service(settings);
    let handle = service.handle();

    handle.on_touch_event(TouchSurface::Summon, TouchAction::Down, 2100.0, PointerSource::Finger);
    handle.on_touch_event(TouchSurface::Summon, TouchAction::Move, 2000.0, PointerSource::Finger);
    assert!(wait_for(
        || handle.current_overlay_state() == OverlayState::Visible(ShowMethod::Gesture),
        Duration::from_secs(1)
    ));
    host.take_requests();

    assert!(wait_for(
        || handle.current_overlay_state() == OverlayState::HiddenWithHotspot,
        Duration::from_secs(2)
    ));
    assert!(host.take_requests().contains(&HostRequest::Hide { show_hotspot: true }));
}

#[test]
#[serial]
fn dismissing_first_cancels_the_auto_hide() {
    let mut settings = Settings::default();
    settings.gesture_auto_hide_ms = 200;
    let (service, host) = start_service(settings);
    let handle = service.handle();

    handle.on_touch_event(TouchSurface::Summon, TouchAction::Down, 2100.0, PointerSource::Finger);
    handle.on_touch_event(TouchSurface::Summon, TouchAction::Move, 2000.0, PointerSource::Finger);
    assert!(wait_for(
        || handle.current_overlay_state() == OverlayState::Visible(ShowMethod::Gesture),
        Duration::from_secs(1)
    ));

    // Swipe down on the dismiss surface well before the dwell expires.
    handle.on_touch_event(TouchSurface::Dismiss, TouchAction::Down, 100.0, PointerSource::Finger);
    handle.on_touch_event(TouchSurface::Dismiss, TouchAction::Move, 160.0, PointerSource::Finger);
    assert!(wait_for(
        || handle.current_overlay_state() == OverlayState::HiddenWithHotspot,
        Duration::from_secs(1)
    ));
    host.take_requests();

    // Past the original dwell: the cancelled timer must not hide again or
    // emit another request.
    std::thread::sleep(Duration::from_millis(400));
    assert!(host.take_requests().is_empty());
}

#[test]
fn short_release_on_dismiss_surface_is_a_tap_through() {
    let (service, host) = start_service(Settings::default());
    let handle = service.handle();

    handle.on_touch_event(TouchSurface::Summon, TouchAction::Down, 2100.0, PointerSource::Finger);
    handle.on_touch_event(TouchSurface::Summon, TouchAction::Move, 2000.0, PointerSource::Finger);
    assert!(wait_for(
        || handle.current_overlay_state() == OverlayState::Visible(ShowMethod::Gesture),
        Duration::from_secs(1)
    ));
    host.take_requests();

    handle.on_touch_event(TouchSurface::Dismiss, TouchAction::Down, 100.0, PointerSource::Finger);
    handle.on_touch_event(TouchSurface::Dismiss, TouchAction::Up, 110.0, PointerSource::Finger);
    std::thread::sleep(Duration::from_millis(100));

    // A tap is passed through, not consumed as a dismissal.
    assert_eq!(
        handle.current_overlay_state(),
        OverlayState::Visible(ShowMethod::Gesture)
    );
    assert!(host.take_requests().is_empty());
}

#[test]
fn stylus_input_is_ignored_when_filtered() {
    let mut settings = Settings::default();
    settings.ignore_stylus_input = true;
    let (service, host) = start_service(settings);
    let handle = service.handle();

    handle.on_touch_event(TouchSurface::Summon, TouchAction::Down, 2100.0, PointerSource::Stylus);
    handle.on_touch_event(TouchSurface::Summon, TouchAction::Move, 1900.0, PointerSource::Stylus);
    handle.on_touch_event(TouchSurface::Summon, TouchAction::Up, 1900.0, PointerSource::Stylus);
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(
        handle.current_overlay_state(),
        OverlayState::Visible(ShowMethod::Normal)
    );
    assert!(host.take_requests().is_empty());
}
