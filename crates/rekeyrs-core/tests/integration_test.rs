// Rekeyrs Integration Tests
//
// These tests verify the complete pipeline:
// TOML profile -> Config -> KeyEventRouter -> EventLoop -> injector
//
// Run with: cargo test --test integration_test

use std::thread;
use std::time::Duration;

use rekeyrs_core::config::{Config, ConfigError, KeyExpression};
use rekeyrs_core::event::{join_loop, load_script, replay, EventLoop};
use rekeyrs_core::output::{KeyStroke, RecordingInjector};
use rekeyrs_core::state::TrackedKeyState;
use rekeyrs_core::{RawKeyEvent, VirtualKey};

const PROFILE: &str = r#"
[registration]
device_filter = "*"
intercept = true

[alt_code]
modifier = "alt"

[alt_code.table]
"65" = "A"

[[double_tap]]
trigger = "5"
window_ms = 1000
single = "numpad5"
double = "burst"

[chords.nav]
modifier = "ctrl+alt"
members = { numpad8 = "up", numpad2 = "down" }

[handlers.caps]
toggle = "caps_lock"
on = "shift+tab"
off = "tab"

[keymap]
"A" = { text = "A" }
numpad5 = "5"
burst = { text = "55" }
numpad8 = { chord = "nav" }
numpad2 = { chord = "nav" }
tab = { delegate = "caps" }
"#;

fn expr(s: &str) -> KeyExpression {
    KeyExpression::parse(s).unwrap()
}

fn vk(name: &str) -> VirtualKey {
    name.parse().unwrap()
}

#[test]
fn test_profile_round_trip_through_event_loop() {
    let config = Config::from_toml(PROFILE).unwrap();
    let injector = RecordingInjector::new();
    let event_loop = EventLoop::new(
        config.build_router(),
        config.registration.clone(),
        injector.clone(),
        TrackedKeyState::new(),
    );
    let (handle, join) = event_loop.spawn().unwrap();

    // alt + 6 5 composes 'A'
    for event in [
        RawKeyEvent::down(VirtualKey::ALT),
        RawKeyEvent::down(vk("numpad6")),
        RawKeyEvent::down(vk("numpad5")),
        RawKeyEvent::up(VirtualKey::ALT),
        RawKeyEvent::up(vk("numpad6")),
        RawKeyEvent::up(vk("numpad5")),
    ] {
        assert!(handle.send_key(event).unwrap());
    }

    // Two fives well inside the window
    assert!(handle.send_key(RawKeyEvent::down(vk("numpad5"))).unwrap());
    assert!(handle.send_key(RawKeyEvent::down(vk("numpad5"))).unwrap());

    // Chord across two members
    handle.post_key(RawKeyEvent::down(vk("numpad8"))).unwrap();
    handle.post_key(RawKeyEvent::down(vk("numpad2"))).unwrap();
    handle.post_key(RawKeyEvent::up(vk("numpad8"))).unwrap();
    handle.post_key(RawKeyEvent::up(vk("numpad2"))).unwrap();

    // Unmapped keys pass through
    assert!(!handle.send_key(RawKeyEvent::down(vk("f12"))).unwrap());

    handle.shutdown();
    let stats = join_loop(join).unwrap();
    assert_eq!(stats.events, 13);
    assert_eq!(stats.suppressed, 12);

    let five = KeyStroke::tap(KeyExpression::key("5"));
    assert_eq!(
        injector.sent(),
        vec![
            KeyStroke::tap(KeyExpression::key("A")),
            five.clone(),
            five,
            KeyStroke::down(expr("ctrl+alt")),
            KeyStroke::down(expr("up")),
            KeyStroke::down(expr("down")),
            KeyStroke::up(expr("up")),
            KeyStroke::up(expr("down")),
            KeyStroke::up(expr("ctrl+alt")),
        ]
    );
}

#[test]
fn test_single_tap_fires_on_loop_timer() {
    let profile = PROFILE.replace("window_ms = 1000", "window_ms = 15");
    let config = Config::from_toml(&profile).unwrap();
    let injector = RecordingInjector::new();
    let event_loop = EventLoop::new(
        config.build_router(),
        config.registration.clone(),
        injector.clone(),
        TrackedKeyState::new(),
    );
    let (handle, join) = event_loop.spawn().unwrap();

    assert!(handle.send_key(RawKeyEvent::down(vk("numpad5"))).unwrap());
    thread::sleep(Duration::from_millis(200));
    assert!(handle.send_key(RawKeyEvent::up(vk("numpad5"))).unwrap());
    handle.shutdown();
    join_loop(join).unwrap();

    assert_eq!(
        injector.sent(),
        vec![KeyStroke::down(expr("5")), KeyStroke::up(expr("5"))]
    );
}

#[test]
fn test_delegate_uses_live_key_state() {
    let config = Config::from_toml(PROFILE).unwrap();
    let injector = RecordingInjector::new();
    let event_loop = EventLoop::new(
        config.build_router(),
        config.registration.clone(),
        injector.clone(),
        TrackedKeyState::new(),
    );
    let (handle, join) = event_loop.spawn().unwrap();

    handle.post_key(RawKeyEvent::down(vk("tab"))).unwrap();
    handle.post_key(RawKeyEvent::up(vk("tab"))).unwrap();
    // Caps Lock is not mapped, but the loop still tracks its toggle
    handle.post_key(RawKeyEvent::down(vk("caps_lock"))).unwrap();
    handle.post_key(RawKeyEvent::up(vk("caps_lock"))).unwrap();
    handle.post_key(RawKeyEvent::down(vk("tab"))).unwrap();
    handle.post_key(RawKeyEvent::up(vk("tab"))).unwrap();
    handle.shutdown();
    join_loop(join).unwrap();

    assert_eq!(
        injector.sent(),
        vec![
            KeyStroke::down(expr("tab")),
            KeyStroke::up(expr("tab")),
            KeyStroke::down(expr("shift+tab")),
            KeyStroke::up(expr("shift+tab")),
        ]
    );
}

#[test]
fn test_replay_script_from_file() {
    let path = std::env::temp_dir().join(format!("rekeyrs-replay-{}.txt", std::process::id()));
    std::fs::write(
        &path,
        "# compose A, then a lone five\n\
         0   down alt\n\
         1   down numpad6\n\
         2   down numpad5\n\
         3   up   alt\n\
         4   up   numpad6\n\
         5   up   numpad5\n\
         100 down numpad5\n",
    )
    .unwrap();
    let script = load_script(&path);
    std::fs::remove_file(&path).ok();
    let script = script.unwrap();

    let config = Config::from_toml(PROFILE).unwrap();
    let mut router = config.build_router();
    let mut keys = TrackedKeyState::new();
    let mut injector = RecordingInjector::new();
    let summary = replay(&mut router, &config.registration, &mut keys, &script, &mut injector);

    assert_eq!(summary.events, 7);
    assert!(summary.diagnostics.is_empty());
    assert_eq!(
        injector.sent(),
        vec![
            KeyStroke::tap(KeyExpression::key("A")),
            KeyStroke::down(expr("5")),
            KeyStroke::up(expr("5")),
        ]
    );
}

#[test]
fn test_missing_config_file_is_io_error() {
    let err = Config::from_toml_path("/nonexistent/rekeyrs/config.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
