// Rekeyrs Double-Tap Disambiguation
// Single press vs. fast double press of one trigger key

use std::time::Duration;

use crate::timer::{TimerHandle, TimerQueue};
use crate::{Direction, RawKeyEvent};

/// Default wait window for a second tap
pub const DEFAULT_DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(20);

/// Trigger and outputs of one disambiguator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleTapConfig {
    /// Character of the watched key
    pub trigger: char,
    /// How long to wait for the second tap
    pub window: Duration,
    /// Logical key emitted when the window elapses
    pub single: String,
    /// Logical key emitted on a second tap inside the window
    pub double: String,
}

impl DoubleTapConfig {
    pub fn new(trigger: char, single: impl Into<String>, double: impl Into<String>) -> Self {
        Self {
            trigger,
            window: DEFAULT_DOUBLE_TAP_WINDOW,
            single: single.into(),
            double: double.into(),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// What the disambiguator did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    /// Not a press of the trigger
    Pass,
    /// First tap; a timer is now pending
    Armed(TimerHandle),
    /// Second tap inside the window; emit this logical key now
    Double(String),
}

impl TapOutcome {
    pub fn is_handled(&self) -> bool {
        !matches!(self, TapOutcome::Pass)
    }
}

/// The one pending first tap, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTap {
    handle: TimerHandle,
}

/// Idle/Armed state machine for one trigger key.
///
/// Arming and cancelling go through the caller's [`TimerQueue`], so a
/// cancelled tap can never also fire: the queue drops it, and a handle that
/// is no longer the pending one is ignored by [`on_timer`](Self::on_timer).
#[derive(Debug, Clone)]
pub struct DoubleTapDisambiguator {
    config: DoubleTapConfig,
    pending: Option<PendingTap>,
}

impl DoubleTapDisambiguator {
    pub fn new(config: DoubleTapConfig) -> Self {
        Self {
            config,
            pending: None,
        }
    }

    pub fn config(&self) -> &DoubleTapConfig {
        &self.config
    }

    /// Check if a first tap is waiting for its window
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Check if an event is a press or release of the trigger key
    pub fn is_trigger(&self, event: &RawKeyEvent) -> bool {
        event.character == Some(self.config.trigger)
    }

    pub fn on_event<O>(
        &mut self,
        event: &RawKeyEvent,
        now: Duration,
        timers: &mut TimerQueue<O>,
        owner: O,
    ) -> TapOutcome {
        if !self.is_trigger(event) || event.direction != Direction::Down {
            return TapOutcome::Pass;
        }

        match self.pending.take() {
            None => {
                let handle = timers.arm(now, self.config.window, owner);
                self.pending = Some(PendingTap { handle });
                log::trace!("double tap '{}' armed ({})", self.config.trigger, handle);
                TapOutcome::Armed(handle)
            }
            Some(pending) => {
                if !timers.cancel(pending.handle) {
                    log::debug!(
                        "double tap '{}': {} was no longer pending",
                        self.config.trigger,
                        pending.handle
                    );
                }
                TapOutcome::Double(self.config.double.clone())
            }
        }
    }

    /// Deliver a fired timer. Returns the "single" logical key when the
    /// handle is the pending tap; stale handles return `None`.
    pub fn on_timer(&mut self, handle: TimerHandle) -> Option<&str> {
        match self.pending {
            Some(pending) if pending.handle == handle => {
                self.pending = None;
                Some(self.config.single.as_str())
            }
            _ => None,
        }
    }

    /// Drop the pending tap without emitting anything
    pub fn reset<O>(&mut self, timers: &mut TimerQueue<O>) {
        if let Some(pending) = self.pending.take() {
            timers.cancel(pending.handle);
        }
    }
}
