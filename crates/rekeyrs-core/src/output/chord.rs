// Rekeyrs Chord Sequencing
// Holds a shared modifier chord around bursts of member keys

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::KeyStroke;
use crate::config::KeyExpression;
use crate::Direction;

/// Errors from [`ChordSequencer::emit`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChordError {
    #[error("unknown chord '{0}'")]
    UnknownChord(String),

    #[error("'{member}' is not a member of chord '{chord}'")]
    NotAMember { chord: String, member: String },
}

/// A modifier chord and the logical keys that share it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordDefinition {
    pub name: String,
    /// Held while any member is down (e.g. `ctrl+alt`)
    pub modifier: KeyExpression,
    /// Logical key name -> key sent inside the chord
    pub members: IndexMap<String, KeyExpression>,
}

impl ChordDefinition {
    pub fn new(name: impl Into<String>, modifier: KeyExpression) -> Self {
        Self {
            name: name.into(),
            modifier,
            members: IndexMap::new(),
        }
    }

    /// Add a member key
    pub fn with_member(mut self, logical: impl Into<String>, key: KeyExpression) -> Self {
        self.members.insert(logical.into(), key);
        self
    }
}

/// Runtime assertion state of one chord.
///
/// `asserted` is true exactly while `open` is non-empty.
#[derive(Debug, Clone, Default)]
struct ChordState {
    asserted: bool,
    open: SmallVec<[String; 4]>,
}

#[derive(Debug, Clone)]
struct Chord {
    definition: ChordDefinition,
    state: ChordState,
}

/// Emits member keys wrapped in their chord's modifier.
///
/// The modifier goes down before the first member Down of a burst and up
/// after the last open member is released. Repeated Downs of a member that
/// is already open re-send the member only.
#[derive(Debug, Clone, Default)]
pub struct ChordSequencer {
    chords: IndexMap<String, Chord>,
}

impl ChordSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chord, replacing any chord with the same name
    pub fn add_chord(&mut self, definition: ChordDefinition) {
        self.chords.insert(
            definition.name.clone(),
            Chord {
                definition,
                state: ChordState::default(),
            },
        );
    }

    /// Look up a chord definition
    pub fn chord(&self, name: &str) -> Option<&ChordDefinition> {
        self.chords.get(name).map(|c| &c.definition)
    }

    /// Check if the chord modifier is currently held
    pub fn is_asserted(&self, name: &str) -> bool {
        self.chords
            .get(name)
            .map(|c| c.state.asserted)
            .unwrap_or(false)
    }

    /// Emit a member transition, returning the strokes to send in order
    pub fn emit(
        &mut self,
        chord_name: &str,
        member: &str,
        direction: Direction,
    ) -> Result<SmallVec<[KeyStroke; 2]>, ChordError> {
        let chord = self
            .chords
            .get_mut(chord_name)
            .ok_or_else(|| ChordError::UnknownChord(chord_name.to_string()))?;
        let key = chord
            .definition
            .members
            .get(member)
            .ok_or_else(|| ChordError::NotAMember {
                chord: chord_name.to_string(),
                member: member.to_string(),
            })?
            .clone();

        let state = &mut chord.state;
        let mut strokes = SmallVec::new();
        match direction {
            Direction::Down => {
                if !state.asserted {
                    strokes.push(KeyStroke::down(chord.definition.modifier.clone()));
                    state.asserted = true;
                }
                strokes.push(KeyStroke::down(key));
                if !state.open.iter().any(|m| m == member) {
                    state.open.push(member.to_string());
                }
            }
            Direction::Up => {
                strokes.push(KeyStroke::up(key));
                if let Some(pos) = state.open.iter().position(|m| m == member) {
                    state.open.remove(pos);
                    if state.open.is_empty() && state.asserted {
                        strokes.push(KeyStroke::up(chord.definition.modifier.clone()));
                        state.asserted = false;
                    }
                }
            }
        }

        log::trace!(
            "chord {} {} {} -> {} stroke(s)",
            chord_name,
            member,
            direction,
            strokes.len()
        );
        Ok(strokes)
    }

    /// Release every asserted chord, returning the strokes to send
    pub fn release_all(&mut self) -> Vec<KeyStroke> {
        let mut strokes = Vec::new();
        for chord in self.chords.values_mut() {
            for member in chord.state.open.drain(..) {
                if let Some(key) = chord.definition.members.get(&member) {
                    strokes.push(KeyStroke::up(key.clone()));
                }
            }
            if chord.state.asserted {
                strokes.push(KeyStroke::up(chord.definition.modifier.clone()));
                chord.state.asserted = false;
            }
        }
        strokes
    }
}
