// Rekeyrs Config - Key Expression Parser
// Parses key expressions like "ctrl+alt+t" into modifiers and a key token

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use smallvec::SmallVec;
use strum_macros::{Display, EnumString};

use crate::key::vkey_from_name;

/// Modifier prefix of a key expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ModifierKey {
    #[strum(to_string = "ctrl", serialize = "control")]
    Ctrl,
    #[strum(to_string = "alt", serialize = "menu")]
    Alt,
    #[strum(to_string = "shift")]
    Shift,
    #[strum(to_string = "win", serialize = "windows", serialize = "super")]
    Win,
}

/// Errors that can occur while parsing a key expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyExprError {
    /// Empty input string
    EmptyInput,
    /// Input ends with `+` (e.g. "ctrl+")
    TrailingPlus,
    /// Key token is neither a table name nor a single character
    UnknownKey(String),
    /// Modifier token not recognized
    UnknownModifier(String),
}

impl fmt::Display for KeyExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyExprError::EmptyInput => write!(f, "key expression cannot be empty"),
            KeyExprError::TrailingPlus => write!(f, "key expression cannot end with '+'"),
            KeyExprError::UnknownKey(name) => write!(f, "unknown key name: '{}'", name),
            KeyExprError::UnknownModifier(name) => write!(f, "unknown modifier: '{}'", name),
        }
    }
}

impl std::error::Error for KeyExprError {}

/// A key to send plus the modifiers held around it.
///
/// The key token is either a virtual-key table name (`"page_up"`) or a
/// single character (`"$"`, `"€"`) that the injector resolves itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyExpression {
    modifiers: SmallVec<[ModifierKey; 4]>,
    key: String,
}

impl KeyExpression {
    /// Expression for a bare key token, without validation
    pub fn key(token: impl Into<String>) -> Self {
        Self {
            modifiers: SmallVec::new(),
            key: token.into(),
        }
    }

    /// Parse an expression like `"ctrl+alt+t"`
    ///
    /// # Examples
    /// ```
    /// use rekeyrs_core::config::KeyExpression;
    /// let expr = KeyExpression::parse("ctrl+alt+t").unwrap();
    /// assert_eq!(expr.modifiers().len(), 2);
    /// assert_eq!(expr.key_token(), "t");
    /// ```
    pub fn parse(exp: &str) -> Result<Self, KeyExprError> {
        let trimmed = exp.trim();
        if trimmed.is_empty() {
            return Err(KeyExprError::EmptyInput);
        }

        // The plus key on its own
        if trimmed == "+" {
            return Ok(Self::key("+"));
        }

        if trimmed.ends_with('+') && !trimmed.ends_with("++") {
            return Err(KeyExprError::TrailingPlus);
        }

        // "shift++" names the plus key with a modifier
        let (modifier_part, key_str) = match trimmed.strip_suffix("++") {
            Some(rest) => (Some(rest), "+"),
            None => match trimmed.rsplit_once('+') {
                Some((rest, key)) => (Some(rest), key),
                None => (None, trimmed),
            },
        };

        let key = normalize_key_token(key_str.trim())?;

        let mut modifiers: SmallVec<[ModifierKey; 4]> = SmallVec::new();
        if let Some(part) = modifier_part {
            for modifier_str in part.split('+') {
                let modifier_str = modifier_str.trim();
                if modifier_str.is_empty() {
                    return Err(KeyExprError::EmptyInput);
                }
                let modifier = ModifierKey::from_str(modifier_str)
                    .map_err(|_| KeyExprError::UnknownModifier(modifier_str.to_string()))?;
                // Avoid duplicate modifiers
                if !modifiers.contains(&modifier) {
                    modifiers.push(modifier);
                }
            }
        }

        Ok(Self { modifiers, key })
    }

    /// Modifiers in the order they are pressed
    pub fn modifiers(&self) -> &[ModifierKey] {
        &self.modifiers
    }

    /// The main key token
    pub fn key_token(&self) -> &str {
        &self.key
    }

    /// Tokens in press order: modifiers first, then the key
    pub fn down_sequence(&self) -> SmallVec<[String; 4]> {
        self.modifiers
            .iter()
            .map(|m| m.to_string())
            .chain(std::iter::once(self.key.clone()))
            .collect()
    }

    /// Tokens in release order: the key first, then modifiers reversed
    pub fn up_sequence(&self) -> SmallVec<[String; 4]> {
        std::iter::once(self.key.clone())
            .chain(self.modifiers.iter().rev().map(|m| m.to_string()))
            .collect()
    }
}

fn normalize_key_token(token: &str) -> Result<String, KeyExprError> {
    if token.is_empty() {
        return Err(KeyExprError::TrailingPlus);
    }
    if let Some(vkey) = vkey_from_name(token) {
        // Canonical table name, or the literal hex form for unnamed codes
        return Ok(vkey
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| token.to_ascii_lowercase()));
    }
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch.to_string()),
        _ => Err(KeyExprError::UnknownKey(token.to_string())),
    }
}

impl FromStr for KeyExpression {
    type Err = KeyExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier)?;
        }
        write!(f, "{}", self.key)
    }
}

impl<'de> Deserialize<'de> for KeyExpression {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        KeyExpression::parse(&raw).map_err(serde::de::Error::custom)
    }
}
