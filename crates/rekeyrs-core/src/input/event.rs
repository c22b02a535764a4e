// Rekeyrs Input Layer - Raw Key Events
// The immutable event value delivered by the host for every key transition

use std::fmt;

use crate::key::{char_from_vkey, VirtualKey};
use crate::Direction;

/// One hardware key transition as reported by the host.
///
/// `character` and `logical_name` are optional: the router treats a missing
/// field as "this stage does not apply" rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub vkey: VirtualKey,
    pub character: Option<char>,
    pub logical_name: Option<String>,
    pub direction: Direction,
    pub device: Option<String>,
}

impl RawKeyEvent {
    /// Build an event from a bare virtual-key code, deriving the character
    /// and logical name from the key tables.
    pub fn from_vkey(vkey: VirtualKey, direction: Direction, device: Option<String>) -> Self {
        Self {
            vkey,
            character: char_from_vkey(vkey),
            logical_name: vkey.name().map(str::to_string),
            direction,
            device,
        }
    }

    /// Shorthand for a press of `vkey` with no device
    pub fn down(vkey: VirtualKey) -> Self {
        Self::from_vkey(vkey, Direction::Down, None)
    }

    /// Shorthand for a release of `vkey` with no device
    pub fn up(vkey: VirtualKey) -> Self {
        Self::from_vkey(vkey, Direction::Up, None)
    }

    /// Attach a source device id
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Character if it is a decimal digit
    pub fn digit(&self) -> Option<char> {
        self.character.filter(char::is_ascii_digit)
    }
}

impl fmt::Display for RawKeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{vkey: 0x{:02x}, key: {}, ch: {}, direction: {}, device: {}}}",
            self.vkey.code(),
            self.logical_name.as_deref().unwrap_or("-"),
            self.character.map(String::from).as_deref().unwrap_or("-"),
            self.direction,
            self.device.as_deref().unwrap_or("-"),
        )
    }
}
