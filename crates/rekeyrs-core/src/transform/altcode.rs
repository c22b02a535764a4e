// Rekeyrs Alt-Code Composition
// Digits typed while a modifier is held compose one character on release

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{Direction, RawKeyEvent, VirtualKey};

/// What the composer did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeOutcome {
    /// Not ours; later stages should see the event
    Pass,
    /// Consumed with nothing to emit
    Handled,
    /// Modifier released over a known code
    Composed(char),
    /// Modifier released over a code missing from the table
    Unrecognized(String),
}

impl ComposeOutcome {
    pub fn is_handled(&self) -> bool {
        !matches!(self, ComposeOutcome::Pass)
    }
}

/// Composer state, owned by one [`AltCodeComposer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposerState {
    modifier_held: bool,
    /// Digits of the composition in progress
    digit_buffer: SmallVec<[char; 4]>,
    /// Digits pressed during the composition whose release is still due
    unreleased: SmallVec<[char; 4]>,
}

impl ComposerState {
    pub fn modifier_held(&self) -> bool {
        self.modifier_held
    }

    pub fn digits(&self) -> String {
        self.digit_buffer.iter().collect()
    }

    pub fn unreleased(&self) -> String {
        self.unreleased.iter().collect()
    }

    /// Check if no composition or release tracking is in flight
    pub fn is_idle(&self) -> bool {
        self.digit_buffer.is_empty() && self.unreleased.is_empty()
    }

    fn clear_digits(&mut self) {
        self.digit_buffer.clear();
        self.unreleased.clear();
    }
}

/// Remove the first occurrence of `digit`, reporting whether one existed.
///
/// Key-repeat can deliver releases out of press order, so the earliest
/// matching digit is the one retired.
fn remove_first(digits: &mut SmallVec<[char; 4]>, digit: char) -> bool {
    match digits.iter().position(|&d| d == digit) {
        Some(pos) => {
            digits.remove(pos);
            true
        }
        None => false,
    }
}

/// Default codes of the number-pad profile
pub fn default_alt_codes() -> IndexMap<String, char> {
    [
        ("36", '$'),
        ("40", '('),
        ("41", ')'),
        ("61", '='),
        ("0128", '€'),
        ("0165", '¥'),
    ]
    .into_iter()
    .map(|(code, ch)| (code.to_string(), ch))
    .collect()
}

/// Numeric character composition while a designated modifier is held.
#[derive(Debug, Clone)]
pub struct AltCodeComposer {
    modifier: VirtualKey,
    table: IndexMap<String, char>,
    state: ComposerState,
}

impl Default for AltCodeComposer {
    fn default() -> Self {
        Self::new(VirtualKey::ALT, default_alt_codes())
    }
}

impl AltCodeComposer {
    pub fn new(modifier: VirtualKey, table: IndexMap<String, char>) -> Self {
        Self {
            modifier,
            table,
            state: ComposerState::default(),
        }
    }

    pub fn modifier(&self) -> VirtualKey {
        self.modifier
    }

    pub fn table(&self) -> &IndexMap<String, char> {
        &self.table
    }

    pub fn state(&self) -> &ComposerState {
        &self.state
    }

    /// Forget any composition in progress
    pub fn reset(&mut self) {
        self.state = ComposerState::default();
    }

    pub fn on_event(&mut self, event: &RawKeyEvent) -> ComposeOutcome {
        if event.vkey == self.modifier {
            return self.on_modifier(event.direction);
        }

        if let Some(digit) = event.digit() {
            if self.state.modifier_held {
                match event.direction {
                    Direction::Down => {
                        self.state.digit_buffer.push(digit);
                        self.state.unreleased.push(digit);
                    }
                    Direction::Up => {
                        remove_first(&mut self.state.unreleased, digit);
                    }
                }
                return ComposeOutcome::Handled;
            }

            if remove_first(&mut self.state.unreleased, digit) {
                return ComposeOutcome::Handled;
            }
        }

        if !self.state.is_idle() {
            log::debug!(
                "alt code aborted by {} (digits: '{}')",
                event,
                self.state.digits()
            );
            self.state.clear_digits();
        }
        ComposeOutcome::Pass
    }

    fn on_modifier(&mut self, direction: Direction) -> ComposeOutcome {
        match direction {
            Direction::Down => {
                // Every press starts over, repeats included
                self.state.clear_digits();
                self.state.modifier_held = true;
                ComposeOutcome::Handled
            }
            Direction::Up => {
                self.state.modifier_held = false;
                if self.state.digit_buffer.is_empty() {
                    return ComposeOutcome::Handled;
                }
                let code: String = self.state.digit_buffer.drain(..).collect();
                match self.table.get(&code) {
                    Some(&ch) => {
                        log::debug!("alt code {} -> {}", code, ch);
                        ComposeOutcome::Composed(ch)
                    }
                    None => ComposeOutcome::Unrecognized(code),
                }
            }
        }
    }
}
