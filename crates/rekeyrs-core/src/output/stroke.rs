// Rekeyrs Output - Key Strokes
// A single request to the output injector

use std::fmt;

use crate::config::KeyExpression;
use crate::Direction;

/// One `sendKey` request: a key expression and an optional direction.
///
/// `direction: None` asks the injector for a full down+up tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStroke {
    pub expr: KeyExpression,
    pub direction: Option<Direction>,
}

impl KeyStroke {
    pub fn new(expr: KeyExpression, direction: Option<Direction>) -> Self {
        Self { expr, direction }
    }

    pub fn down(expr: KeyExpression) -> Self {
        Self::new(expr, Some(Direction::Down))
    }

    pub fn up(expr: KeyExpression) -> Self {
        Self::new(expr, Some(Direction::Up))
    }

    pub fn tap(expr: KeyExpression) -> Self {
        Self::new(expr, None)
    }

    /// Individual host key presses for this stroke.
    ///
    /// Modifiers go down before the key and come up after it; a tap is the
    /// down half followed by the up half.
    pub fn host_presses(&self) -> Vec<(String, Direction)> {
        let downs = self
            .expr
            .down_sequence()
            .into_iter()
            .map(|token| (token, Direction::Down));
        let ups = self
            .expr
            .up_sequence()
            .into_iter()
            .map(|token| (token, Direction::Up));
        match self.direction {
            Some(Direction::Down) => downs.collect(),
            Some(Direction::Up) => ups.collect(),
            None => downs.chain(ups).collect(),
        }
    }
}

impl fmt::Display for KeyStroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Some(direction) => write!(f, "{} {}", self.expr, direction),
            None => write!(f, "{}", self.expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let expr = KeyExpression::parse("ctrl+z").unwrap();
        assert_eq!(KeyStroke::down(expr.clone()).to_string(), "ctrl+z down");
        assert_eq!(KeyStroke::up(expr.clone()).to_string(), "ctrl+z up");
        assert_eq!(KeyStroke::tap(expr).to_string(), "ctrl+z");
    }

    fn presses(items: &[(&str, Direction)]) -> Vec<(String, Direction)> {
        items
            .iter()
            .map(|(token, direction)| (token.to_string(), *direction))
            .collect()
    }

    #[test]
    fn test_host_presses_bracket_modifiers() {
        let expr = KeyExpression::parse("ctrl+shift+z").unwrap();
        assert_eq!(
            KeyStroke::down(expr.clone()).host_presses(),
            presses(&[
                ("ctrl", Direction::Down),
                ("shift", Direction::Down),
                ("z", Direction::Down),
            ])
        );
        assert_eq!(
            KeyStroke::up(expr).host_presses(),
            presses(&[
                ("z", Direction::Up),
                ("shift", Direction::Up),
                ("ctrl", Direction::Up),
            ])
        );
    }

    #[test]
    fn test_host_presses_tap() {
        let stroke = KeyStroke::tap(KeyExpression::parse("alt+a").unwrap());
        assert_eq!(
            stroke.host_presses(),
            presses(&[
                ("alt", Direction::Down),
                ("a", Direction::Down),
                ("a", Direction::Up),
                ("alt", Direction::Up),
            ])
        );
    }
}
