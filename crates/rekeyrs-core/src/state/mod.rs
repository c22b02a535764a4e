// Rekeyrs State
// Host key-state queries

mod key_state;

pub use key_state::{KeyState, KeyStateQuery, TrackedKeyState};
