// Rekeyrs Output - Injector Seam
// Where routed strokes leave the core

use std::sync::Arc;

use parking_lot::Mutex;

use super::KeyStroke;
use crate::config::KeyExpression;
use crate::Direction;

/// Host-side key injector (`sendKey`). Fire-and-forget.
pub trait KeyInjector {
    fn send_key(&mut self, expr: &KeyExpression, direction: Option<Direction>);

    /// Send every stroke in order
    fn send_all(&mut self, strokes: &[KeyStroke]) {
        for stroke in strokes {
            self.send_key(&stroke.expr, stroke.direction);
        }
    }
}

/// Injector that records strokes, shareable across threads.
///
/// Clones share the same buffer, so a test can keep one clone while the
/// event loop owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingInjector {
    sent: Arc<Mutex<Vec<KeyStroke>>>,
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far
    pub fn sent(&self) -> Vec<KeyStroke> {
        self.sent.lock().clone()
    }
}

impl KeyInjector for RecordingInjector {
    fn send_key(&mut self, expr: &KeyExpression, direction: Option<Direction>) {
        self.sent.lock().push(KeyStroke::new(expr.clone(), direction));
    }
}
