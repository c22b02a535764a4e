// Rekeyrs Key Direction
// Press/release state carried by raw events and output strokes

use serde::Deserialize;
use strum_macros::{Display, EnumString};

/// Direction of a key transition.
///
/// The host reports one `Down` per press (repeats arrive as further
/// `Down`s) and one `Up` per release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Down,
    Up,
}

impl Direction {
    /// Returns true for a press (or repeat)
    pub fn is_down(self) -> bool {
        matches!(self, Direction::Down)
    }

    /// Returns true for a release
    pub fn is_up(self) -> bool {
        matches!(self, Direction::Up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_properties() {
        assert!(Direction::Down.is_down());
        assert!(!Direction::Down.is_up());
        assert!(Direction::Up.is_up());
        assert!(!Direction::Up.is_down());
    }

    #[test]
    fn test_direction_strings() {
        assert_eq!(Direction::Down.to_string(), "down");
        assert_eq!(Direction::Up.to_string(), "up");
        assert_eq!("DOWN".parse::<Direction>().unwrap(), Direction::Down);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
