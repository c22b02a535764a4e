// Rekeyrs Key Event Router
// Entry point for every raw event: alt-code -> double-tap -> direct mapping
//
// The router is a pure state machine over explicit time. Each call returns
// the strokes to send and the diagnostics to log; nothing here touches the
// host directly.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::config::KeyExpression;
use crate::mapping::{KeyMapping, MappedAction, SubHandler};
use crate::output::{ChordDefinition, ChordSequencer, KeyStroke};
use crate::state::KeyStateQuery;
use crate::timer::TimerQueue;
use crate::transform::altcode::{AltCodeComposer, ComposeOutcome};
use crate::transform::double_tap::{DoubleTapConfig, DoubleTapDisambiguator, TapOutcome};
use crate::transform::Diagnostic;
use crate::{Direction, RawKeyEvent, VirtualKey};

/// Static configuration for the router
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    /// Alt-code stage; `None` disables it
    pub composer: Option<AltCodeComposer>,
    /// Double-tap stages, tried in this order
    pub double_taps: Vec<DoubleTapConfig>,
    /// Chords available to `MappedAction::Chord`
    pub chords: Vec<ChordDefinition>,
    /// Direct logical key table
    pub mapping: KeyMapping,
}

/// Result of routing one event or firing timers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    /// Whether some stage consumed the raw event
    pub handled: bool,
    /// Strokes for the output injector, in order
    pub strokes: Vec<KeyStroke>,
    /// Conditions to log
    pub diagnostics: Vec<Diagnostic>,
}

impl RouteOutcome {
    /// Check if there is nothing to send or log
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.diagnostics.is_empty()
    }
}

/// Routes raw events through the interpreters and the key mapping.
///
/// Dispatch discipline: mapped logical keys are dispatched on both Down
/// and Up. `Key` actions mirror the direction, `Text` types on Down only,
/// and logical keys produced by the composer or a double tap are
/// dispatched as a synthesized Down+Up. Releases of a double-tap trigger
/// are consumed, since its press was already turned into a tap.
#[derive(Debug)]
pub struct KeyEventRouter {
    composer: Option<AltCodeComposer>,
    double_taps: Vec<DoubleTapDisambiguator>,
    chords: ChordSequencer,
    mapping: KeyMapping,
    handlers: HashMap<String, Box<dyn SubHandler>>,
    /// Action a delegated key resolved to on Down, reused for its Up
    held_delegations: HashMap<String, MappedAction>,
    /// Digit keys pressed into the composer whose release is still due
    composed_presses: HashSet<VirtualKey>,
    /// Timer owner is the index into `double_taps`
    timers: TimerQueue<usize>,
}

impl Default for KeyEventRouter {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl KeyEventRouter {
    pub fn new(config: RouterConfig) -> Self {
        let mut chords = ChordSequencer::new();
        for chord in config.chords {
            chords.add_chord(chord);
        }
        Self {
            composer: config.composer,
            double_taps: config
                .double_taps
                .into_iter()
                .map(DoubleTapDisambiguator::new)
                .collect(),
            chords,
            mapping: config.mapping,
            handlers: HashMap::new(),
            held_delegations: HashMap::new(),
            composed_presses: HashSet::new(),
            timers: TimerQueue::new(),
        }
    }

    /// Register a named sub-handler for `MappedAction::Delegate`
    pub fn register_handler(&mut self, name: impl Into<String>, handler: Box<dyn SubHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn composer(&self) -> Option<&AltCodeComposer> {
        self.composer.as_ref()
    }

    pub fn double_taps(&self) -> &[DoubleTapDisambiguator] {
        &self.double_taps
    }

    pub fn chords(&self) -> &ChordSequencer {
        &self.chords
    }

    pub fn mapping(&self) -> &KeyMapping {
        &self.mapping
    }

    /// Earliest time at which [`fire_due`](Self::fire_due) has work
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Route one raw event at time `now`.
    ///
    /// Timers that are already due fire first, so their output precedes the
    /// event's own output.
    pub fn route(
        &mut self,
        event: &RawKeyEvent,
        now: Duration,
        keys: &dyn KeyStateQuery,
    ) -> RouteOutcome {
        let mut out = self.fire_due(now, keys);
        out.handled = self.route_event(event, now, keys, &mut out);
        log::debug!(
            "route {} -> handled={} strokes={} diagnostics={}",
            event,
            out.handled,
            out.strokes.len(),
            out.diagnostics.len()
        );
        out
    }

    /// Fire every timer due at `now`
    pub fn fire_due(&mut self, now: Duration, keys: &dyn KeyStateQuery) -> RouteOutcome {
        let mut out = RouteOutcome::default();
        for (handle, index) in self.timers.pop_due(now) {
            let single = self
                .double_taps
                .get_mut(index)
                .and_then(|tap| tap.on_timer(handle))
                .map(str::to_string);
            if let Some(single) = single {
                log::debug!("double tap window elapsed -> {}", single);
                self.dispatch_tap(&single, keys, &mut out);
            }
        }
        out
    }

    /// Drop in-flight interpretation and release held chords
    pub fn reset(&mut self) -> Vec<KeyStroke> {
        if let Some(composer) = self.composer.as_mut() {
            composer.reset();
        }
        for tap in &mut self.double_taps {
            tap.reset(&mut self.timers);
        }
        self.timers.clear();
        self.held_delegations.clear();
        self.composed_presses.clear();
        self.chords.release_all()
    }

    fn route_event(
        &mut self,
        event: &RawKeyEvent,
        now: Duration,
        keys: &dyn KeyStateQuery,
        out: &mut RouteOutcome,
    ) -> bool {
        if let Some(composer) = self.composer.as_mut() {
            let outcome = composer.on_event(event);
            if outcome.is_handled() {
                if event.digit().is_some() {
                    match event.direction {
                        Direction::Down => self.composed_presses.insert(event.vkey),
                        Direction::Up => self.composed_presses.remove(&event.vkey),
                    };
                }
                match outcome {
                    ComposeOutcome::Composed(ch) => self.dispatch_tap(&ch.to_string(), keys, out),
                    ComposeOutcome::Unrecognized(code) => out
                        .diagnostics
                        .push(Diagnostic::UnrecognizedAltCode { code }),
                    ComposeOutcome::Handled | ComposeOutcome::Pass => {}
                }
                return true;
            }

            // Release of a digit whose press went into an aborted composition
            if event.direction.is_up() && self.composed_presses.remove(&event.vkey) {
                return true;
            }
        }

        for index in 0..self.double_taps.len() {
            match self.double_taps[index].on_event(event, now, &mut self.timers, index) {
                TapOutcome::Pass => {}
                TapOutcome::Armed(_) => return true,
                TapOutcome::Double(double) => {
                    self.dispatch_tap(&double, keys, out);
                    return true;
                }
            }
        }

        if event.direction.is_up() && self.double_taps.iter().any(|tap| tap.is_trigger(event)) {
            return true;
        }

        let Some(logical) = event.logical_name.as_deref() else {
            out.diagnostics.push(Diagnostic::MissingKeyName {
                event: event.clone(),
            });
            return false;
        };

        if !self.mapping.contains(logical) {
            out.diagnostics.push(Diagnostic::UnmappedKey {
                key: logical.to_string(),
                event: event.clone(),
            });
            return false;
        }

        self.dispatch(logical, event.direction, keys, out);
        true
    }

    /// Dispatch a synthesized press and release of a logical key
    fn dispatch_tap(&mut self, logical: &str, keys: &dyn KeyStateQuery, out: &mut RouteOutcome) {
        if !self.mapping.contains(logical) {
            out.diagnostics.push(Diagnostic::UnmappedLogicalKey {
                key: logical.to_string(),
            });
            return;
        }
        self.dispatch(logical, Direction::Down, keys, out);
        self.dispatch(logical, Direction::Up, keys, out);
    }

    fn dispatch(
        &mut self,
        logical: &str,
        direction: Direction,
        keys: &dyn KeyStateQuery,
        out: &mut RouteOutcome,
    ) {
        let Some(action) = self.mapping.get(logical).cloned() else {
            return;
        };

        let action = match action {
            MappedAction::Delegate(handler) => {
                match self.resolve_delegate(&handler, logical, direction, keys, out) {
                    Some(action) => action,
                    None => return,
                }
            }
            action => action,
        };

        self.perform(&action, logical, direction, out);
    }

    fn resolve_delegate(
        &mut self,
        handler_name: &str,
        logical: &str,
        direction: Direction,
        keys: &dyn KeyStateQuery,
        out: &mut RouteOutcome,
    ) -> Option<MappedAction> {
        // A release follows whatever its press resolved to
        if direction.is_up() {
            if let Some(action) = self.held_delegations.remove(logical) {
                return Some(action);
            }
        }

        let Some(handler) = self.handlers.get(handler_name) else {
            out.diagnostics.push(Diagnostic::SubHandler {
                handler: handler_name.to_string(),
                key: logical.to_string(),
                reason: "no handler registered".to_string(),
            });
            return None;
        };

        let resolved = handler.resolve(logical, direction, keys)?;
        if let MappedAction::Delegate(_) = resolved {
            out.diagnostics.push(Diagnostic::SubHandler {
                handler: handler_name.to_string(),
                key: logical.to_string(),
                reason: "handlers cannot delegate again".to_string(),
            });
            return None;
        }

        if direction.is_down() {
            self.held_delegations
                .insert(logical.to_string(), resolved.clone());
        }
        Some(resolved)
    }

    fn perform(
        &mut self,
        action: &MappedAction,
        logical: &str,
        direction: Direction,
        out: &mut RouteOutcome,
    ) {
        match action {
            MappedAction::Key(expr) => {
                out.strokes.push(KeyStroke::new(expr.clone(), Some(direction)));
            }
            MappedAction::Text(text) => {
                if direction.is_down() {
                    out.strokes.extend(
                        text.chars()
                            .map(|ch| KeyStroke::tap(KeyExpression::key(ch.to_string()))),
                    );
                }
            }
            MappedAction::Chord(chord) => match self.chords.emit(chord, logical, direction) {
                Ok(strokes) => out.strokes.extend(strokes),
                Err(err) => out.diagnostics.push(Diagnostic::Chord {
                    key: logical.to_string(),
                    reason: err.to_string(),
                }),
            },
            MappedAction::Noop => {}
            MappedAction::Delegate(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ToggleHandler;
    use crate::state::TrackedKeyState;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn expr(s: &str) -> KeyExpression {
        KeyExpression::parse(s).unwrap()
    }

    fn key(s: &str) -> MappedAction {
        MappedAction::Key(expr(s))
    }

    fn test_router() -> KeyEventRouter {
        let mapping = KeyMapping::new()
            .with("$", MappedAction::Text("$".to_string()))
            .with("numpad0", key("0"))
            .with("double_zero", MappedAction::Text("00".to_string()))
            .with("numpad8", MappedAction::Chord("nav".to_string()))
            .with("numpad2", MappedAction::Chord("nav".to_string()))
            .with("num_lock", MappedAction::Noop)
            .with("subtract", MappedAction::Delegate("numlock".to_string()))
            .with("enter", key("enter"));
        let mut router = KeyEventRouter::new(RouterConfig {
            composer: Some(AltCodeComposer::default()),
            double_taps: vec![DoubleTapConfig::new('0', "numpad0", "double_zero")],
            chords: vec![ChordDefinition::new("nav", expr("ctrl+alt"))
                .with_member("numpad8", expr("up"))
                .with_member("numpad2", expr("down"))],
            mapping,
        });
        router.register_handler(
            "numlock",
            Box::new(ToggleHandler::new(
                VirtualKey::NUM_LOCK,
                key("subtract"),
                key("ctrl+z"),
            )),
        );
        router
    }

    fn vk(name: &str) -> VirtualKey {
        crate::key::vkey_from_name(name).unwrap()
    }

    #[test]
    fn test_alt_code_emits_mapped_character() {
        let mut router = test_router();
        let keys = TrackedKeyState::new();
        let mut strokes = Vec::new();
        for event in [
            RawKeyEvent::down(VirtualKey::ALT),
            RawKeyEvent::down(vk("numpad3")),
            RawKeyEvent::down(vk("numpad6")),
            RawKeyEvent::up(VirtualKey::ALT),
            RawKeyEvent::up(vk("numpad3")),
            RawKeyEvent::up(vk("numpad6")),
        ] {
            let out = router.route(&event, ms(0), &keys);
            assert!(out.handled, "{} should be handled", event);
            assert!(out.diagnostics.is_empty());
            strokes.extend(out.strokes);
        }
        assert_eq!(strokes, vec![KeyStroke::tap(KeyExpression::key("$"))]);
    }

    #[test]
    fn test_unknown_alt_code_logs_once() {
        let mut router = test_router();
        let keys = TrackedKeyState::new();
        router.route(&RawKeyEvent::down(VirtualKey::ALT), ms(0), &keys);
        router.route(&RawKeyEvent::down(vk("numpad9")), ms(0), &keys);
        let out = router.route(&RawKeyEvent::up(VirtualKey::ALT), ms(0), &keys);
        assert!(out.handled);
        assert!(out.strokes.is_empty());
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic::UnrecognizedAltCode {
                code: "9".to_string()
            }]
        );
    }

    #[test]
    fn test_digit_release_after_aborted_composition_is_swallowed() {
        let mut router = test_router();
        let keys = TrackedKeyState::new();
        router.route(&RawKeyEvent::down(VirtualKey::ALT), ms(0), &keys);
        router.route(&RawKeyEvent::down(vk("numpad3")), ms(0), &keys);
        router.route(&RawKeyEvent::up(VirtualKey::ALT), ms(0), &keys);

        // Enter aborts release tracking before numpad3 comes up
        let enter = router.route(&RawKeyEvent::down(vk("enter")), ms(5), &keys);
        assert_eq!(enter.strokes, vec![KeyStroke::down(expr("enter"))]);

        let release = router.route(&RawKeyEvent::up(vk("numpad3")), ms(10), &keys);
        assert!(release.handled);
        assert!(release.is_empty());

        // Only the one pending release is swallowed
        let again = router.route(&RawKeyEvent::up(vk("numpad3")), ms(15), &keys);
        assert!(!again.handled);
    }

    #[test]
    fn test_double_tap_window() {
        let mut router = test_router();
        let keys = TrackedKeyState::new();
        let zero = RawKeyEvent::down(VirtualKey::NUMPAD0);

        let out = router.route(&zero, ms(0), &keys);
        assert!(out.handled);
        assert!(out.strokes.is_empty());
        assert_eq!(router.next_deadline(), Some(ms(20)));

        let out = router.route(&zero, ms(10), &keys);
        assert_eq!(
            out.strokes,
            vec![
                KeyStroke::tap(KeyExpression::key("0")),
                KeyStroke::tap(KeyExpression::key("0"))
            ]
        );
        assert_eq!(router.next_deadline(), None);
    }

    #[test]
    fn test_single_tap_fires_from_timer_and_release_is_consumed() {
        let mut router = test_router();
        let keys = TrackedKeyState::new();
        router.route(&RawKeyEvent::down(VirtualKey::NUMPAD0), ms(0), &keys);

        let out = router.fire_due(ms(25), &keys);
        assert_eq!(
            out.strokes,
            vec![KeyStroke::down(expr("0")), KeyStroke::up(expr("0"))]
        );

        let out = router.route(&RawKeyEvent::up(VirtualKey::NUMPAD0), ms(40), &keys);
        assert!(out.handled);
        assert!(out.is_empty());
    }

    #[test]
    fn test_overdue_timer_fires_before_next_event() {
        let mut router = test_router();
        let keys = TrackedKeyState::new();
        let zero = RawKeyEvent::down(VirtualKey::NUMPAD0);
        router.route(&zero, ms(0), &keys);

        // The host never polled; a late second press is a new first tap
        let out = router.route(&zero, ms(50), &keys);
        assert_eq!(
            out.strokes,
            vec![KeyStroke::down(expr("0")), KeyStroke::up(expr("0"))]
        );
        assert_eq!(router.next_deadline(), Some(ms(70)));
    }

    #[test]
    fn test_direct_mapping_mirrors_direction() {
        let mut router = test_router();
        let keys = TrackedKeyState::new();
        let down = router.route(&RawKeyEvent::down(vk("enter")), ms(0), &keys);
        let up = router.route(&RawKeyEvent::up(vk("enter")), ms(5), &keys);
        assert_eq!(down.strokes, vec![KeyStroke::down(expr("enter"))]);
        assert_eq!(up.strokes, vec![KeyStroke::up(expr("enter"))]);
    }

    #[test]
    fn test_chord_member_hold_and_release() {
        let mut router = test_router();
        let keys = TrackedKeyState::new();
        let mut strokes = Vec::new();
        for _ in 0..3 {
            strokes.extend(
                router
                    .route(&RawKeyEvent::down(vk("numpad8")), ms(0), &keys)
                    .strokes,
            );
        }
        strokes.extend(
            router
                .route(&RawKeyEvent::up(vk("numpad8")), ms(0), &keys)
                .strokes,
        );
        assert_eq!(
            strokes,
            vec![
                KeyStroke::down(expr("ctrl+alt")),
                KeyStroke::down(expr("up")),
                KeyStroke::down(expr("up")),
                KeyStroke::down(expr("up")),
                KeyStroke::up(expr("up")),
                KeyStroke::up(expr("ctrl+alt")),
            ]
        );
        assert!(!router.chords().is_asserted("nav"));
    }

    #[test]
    fn test_delegate_release_follows_press() {
        let mut router = test_router();
        let mut keys = TrackedKeyState::new();
        let down = router.route(&RawKeyEvent::down(vk("subtract")), ms(0), &keys);
        assert_eq!(down.strokes, vec![KeyStroke::down(expr("ctrl+z"))]);

        // Num Lock flips while subtract is held
        keys.set_toggled(VirtualKey::NUM_LOCK, true);
        let up = router.route(&RawKeyEvent::up(vk("subtract")), ms(5), &keys);
        assert_eq!(up.strokes, vec![KeyStroke::up(expr("ctrl+z"))]);

        let down = router.route(&RawKeyEvent::down(vk("subtract")), ms(10), &keys);
        assert_eq!(down.strokes, vec![KeyStroke::down(expr("subtract"))]);
    }

    #[test]
    fn test_missing_handler_is_a_diagnostic() {
        let mut router = KeyEventRouter::new(RouterConfig {
            mapping: KeyMapping::new().with("add", MappedAction::Delegate("nope".into())),
            ..Default::default()
        });
        let keys = TrackedKeyState::new();
        let out = router.route(&RawKeyEvent::down(vk("add")), ms(0), &keys);
        assert!(out.handled);
        assert!(out.strokes.is_empty());
        assert!(matches!(
            out.diagnostics.as_slice(),
            [Diagnostic::SubHandler { .. }]
        ));
    }

    #[test]
    fn test_unmapped_key_passes_through_with_diagnostic() {
        let mut router = test_router();
        let keys = TrackedKeyState::new();
        let event = RawKeyEvent::down(vk("f5"));
        let out = router.route(&event, ms(0), &keys);
        assert!(!out.handled);
        assert!(out.strokes.is_empty());
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic::UnmappedKey {
                key: "f5".to_string(),
                event
            }]
        );
    }

    #[test]
    fn test_event_without_name_is_not_handled() {
        let mut router = test_router();
        let keys = TrackedKeyState::new();
        let out = router.route(&RawKeyEvent::down(VirtualKey(0xE8)), ms(0), &keys);
        assert!(!out.handled);
        assert!(matches!(
            out.diagnostics.as_slice(),
            [Diagnostic::MissingKeyName { .. }]
        ));
    }

    #[test]
    fn test_reset_releases_chords_and_timers() {
        let mut router = test_router();
        let keys = TrackedKeyState::new();
        router.route(&RawKeyEvent::down(vk("numpad2")), ms(0), &keys);
        router.route(&RawKeyEvent::down(VirtualKey::NUMPAD0), ms(0), &keys);
        let strokes = router.reset();
        assert_eq!(
            strokes,
            vec![KeyStroke::up(expr("down")), KeyStroke::up(expr("ctrl+alt"))]
        );
        assert_eq!(router.next_deadline(), None);
        assert!(router.fire_due(ms(100), &keys).is_empty());
    }
}
