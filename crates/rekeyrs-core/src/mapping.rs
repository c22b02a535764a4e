// Rekeyrs Key Mapping
// Logical key name -> action table and named sub-handlers

use std::fmt;

use indexmap::IndexMap;

use crate::config::KeyExpression;
use crate::state::KeyStateQuery;
use crate::{Direction, VirtualKey};

/// What a logical key does when it reaches the mapping stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedAction {
    /// Send a key expression, mirroring the logical key's direction
    Key(KeyExpression),
    /// Type a character once per press
    Text(String),
    /// Send the chord member of this name through the chord sequencer
    Chord(String),
    /// Consume the key without output
    Noop,
    /// Ask the named sub-handler which action to perform
    Delegate(String),
}

impl fmt::Display for MappedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappedAction::Key(expr) => write!(f, "key({})", expr),
            MappedAction::Text(text) => write!(f, "text({})", text),
            MappedAction::Chord(name) => write!(f, "chord({})", name),
            MappedAction::Noop => write!(f, "noop"),
            MappedAction::Delegate(name) => write!(f, "delegate({})", name),
        }
    }
}

/// Static logical key table. Read-only once the router is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMapping {
    entries: IndexMap<String, MappedAction>,
}

impl KeyMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a mapping
    pub fn insert(&mut self, logical: impl Into<String>, action: MappedAction) {
        self.entries.insert(logical.into(), action);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, logical: impl Into<String>, action: MappedAction) -> Self {
        self.insert(logical, action);
        self
    }

    pub fn get(&self, logical: &str) -> Option<&MappedAction> {
        self.entries.get(logical)
    }

    pub fn contains(&self, logical: &str) -> bool {
        self.entries.contains_key(logical)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MappedAction)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A named handler that picks an action at dispatch time.
///
/// Returning `None` consumes the key without output.
pub trait SubHandler: Send + fmt::Debug {
    fn resolve(
        &self,
        logical: &str,
        direction: Direction,
        keys: &dyn KeyStateQuery,
    ) -> Option<MappedAction>;
}

/// Branches on a lock key's toggle state, e.g. Num Lock on/off layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleHandler {
    pub toggle: VirtualKey,
    pub on: MappedAction,
    pub off: MappedAction,
}

impl ToggleHandler {
    pub fn new(toggle: VirtualKey, on: MappedAction, off: MappedAction) -> Self {
        Self { toggle, on, off }
    }
}

impl SubHandler for ToggleHandler {
    fn resolve(
        &self,
        _logical: &str,
        _direction: Direction,
        keys: &dyn KeyStateQuery,
    ) -> Option<MappedAction> {
        if keys.key_state(self.toggle).toggled {
            Some(self.on.clone())
        } else {
            Some(self.off.clone())
        }
    }
}
