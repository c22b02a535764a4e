// Rekeyrs Key State
// Synchronous getKeyState() seam and a tracked stand-in for hosts without one

use std::collections::HashMap;

use crate::{Direction, RawKeyEvent, VirtualKey};

/// Result of a key-state query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyState {
    pub down: bool,
    pub toggled: bool,
}

/// Host key-state query (`getKeyState`).
pub trait KeyStateQuery {
    fn key_state(&self, key: VirtualKey) -> KeyState;

    /// Called with every raw event before it is routed. Hosts that read
    /// real OS state ignore it.
    fn observe(&mut self, _event: &RawKeyEvent) {}
}

/// Lock keys whose toggle flips on every press
const LOCK_KEYS: [VirtualKey; 3] = [VirtualKey(0x14), VirtualKey(0x90), VirtualKey(0x91)];

/// Key state rebuilt from the events it observes.
///
/// Lock keys toggle on each press that is not a repeat.
#[derive(Debug, Clone, Default)]
pub struct TrackedKeyState {
    states: HashMap<VirtualKey, KeyState>,
}

impl TrackedKeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a lock key already toggled on
    pub fn with_toggled(mut self, key: VirtualKey) -> Self {
        self.states.entry(key).or_default().toggled = true;
        self
    }

    pub fn set_toggled(&mut self, key: VirtualKey, toggled: bool) {
        self.states.entry(key).or_default().toggled = toggled;
    }
}

impl KeyStateQuery for TrackedKeyState {
    fn key_state(&self, key: VirtualKey) -> KeyState {
        self.states.get(&key).copied().unwrap_or_default()
    }

    fn observe(&mut self, event: &RawKeyEvent) {
        let state = self.states.entry(event.vkey).or_default();
        match event.direction {
            Direction::Down => {
                if !state.down && LOCK_KEYS.contains(&event.vkey) {
                    state.toggled = !state.toggled;
                }
                state.down = true;
            }
            Direction::Up => state.down = false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_is_up_and_untoggled() {
        let state = TrackedKeyState::new();
        assert_eq!(state.key_state(VirtualKey::NUM_LOCK), KeyState::default());
    }

    #[test]
    fn test_num_lock_toggles_once_per_press() {
        let mut state = TrackedKeyState::new();
        state.observe(&RawKeyEvent::down(VirtualKey::NUM_LOCK));
        // Auto-repeat must not flip it back
        state.observe(&RawKeyEvent::down(VirtualKey::NUM_LOCK));
        assert_eq!(
            state.key_state(VirtualKey::NUM_LOCK),
            KeyState {
                down: true,
                toggled: true
            }
        );

        state.observe(&RawKeyEvent::up(VirtualKey::NUM_LOCK));
        state.observe(&RawKeyEvent::down(VirtualKey::NUM_LOCK));
        assert!(!state.key_state(VirtualKey::NUM_LOCK).toggled);
    }

    #[test]
    fn test_regular_keys_track_down_only() {
        let mut state = TrackedKeyState::new();
        state.observe(&RawKeyEvent::down(VirtualKey::ALT));
        assert!(state.key_state(VirtualKey::ALT).down);
        assert!(!state.key_state(VirtualKey::ALT).toggled);
        state.observe(&RawKeyEvent::up(VirtualKey::ALT));
        assert!(!state.key_state(VirtualKey::ALT).down);
    }

    #[test]
    fn test_with_toggled() {
        let state = TrackedKeyState::new().with_toggled(VirtualKey::NUM_LOCK);
        assert!(state.key_state(VirtualKey::NUM_LOCK).toggled);
    }
}
