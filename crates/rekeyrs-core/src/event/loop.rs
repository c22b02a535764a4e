// Rekeyrs Event Loop
// Serializes host events and timer expiries onto one routing thread

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::input::Registration;
use crate::output::KeyInjector;
use crate::state::KeyStateQuery;
use crate::transform::{KeyEventRouter, RouteOutcome};
use crate::RawKeyEvent;

/// Result type for event loop operations
pub type EventLoopResult<T> = Result<T, EventLoopError>;

/// Errors that can occur in event loop
#[derive(Debug, thiserror::Error)]
pub enum EventLoopError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event loop is no longer running")]
    Disconnected,

    #[error("Event loop thread panicked")]
    Panicked,
}

/// Send an outcome's strokes and log its diagnostics
pub(crate) fn apply_outcome(outcome: &RouteOutcome, injector: &mut dyn KeyInjector) {
    injector.send_all(&outcome.strokes);
    for diagnostic in &outcome.diagnostics {
        diagnostic.log();
    }
}

enum Message {
    Key {
        event: RawKeyEvent,
        reply: Option<Sender<bool>>,
    },
    Shutdown,
}

/// Counters reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub events: usize,
    pub routed: usize,
    pub suppressed: usize,
    /// Timer wakeups that produced strokes or diagnostics
    pub timer_outputs: usize,
}

/// Cloneable handle for delivering events to a running loop
#[derive(Debug, Clone)]
pub struct LoopHandle {
    tx: Sender<Message>,
}

impl LoopHandle {
    /// Deliver an event and wait for the suppression decision
    pub fn send_key(&self, event: RawKeyEvent) -> EventLoopResult<bool> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(Message::Key {
                event,
                reply: Some(reply_tx),
            })
            .map_err(|_| EventLoopError::Disconnected)?;
        reply_rx.recv().map_err(|_| EventLoopError::Disconnected)
    }

    /// Deliver an event without waiting
    pub fn post_key(&self, event: RawKeyEvent) -> EventLoopResult<()> {
        self.tx
            .send(Message::Key { event, reply: None })
            .map_err(|_| EventLoopError::Disconnected)
    }

    /// Ask the loop to release held chords and exit
    pub fn shutdown(&self) {
        // Already gone is fine
        let _ = self.tx.send(Message::Shutdown);
    }
}

/// Owns the router and everything it talks to.
///
/// Routing, timer expiry and key-state tracking all happen on the loop
/// thread, so a timer can never fire while an event is half processed.
pub struct EventLoop<I, K> {
    router: KeyEventRouter,
    registration: Registration,
    injector: I,
    keys: K,
}

impl<I, K> EventLoop<I, K>
where
    I: KeyInjector + Send + 'static,
    K: KeyStateQuery + Send + 'static,
{
    pub fn new(router: KeyEventRouter, registration: Registration, injector: I, keys: K) -> Self {
        Self {
            router,
            registration,
            injector,
            keys,
        }
    }

    /// Start the loop thread
    pub fn spawn(self) -> EventLoopResult<(LoopHandle, JoinHandle<LoopStats>)> {
        let (tx, rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name("rekeyrs-loop".to_string())
            .spawn(move || self.run(rx))?;
        Ok((LoopHandle { tx }, join))
    }

    fn run(mut self, rx: Receiver<Message>) -> LoopStats {
        let epoch = Instant::now();
        let mut stats = LoopStats::default();
        log::debug!("Event loop started");

        loop {
            let message = match self.router.next_deadline() {
                Some(deadline) => {
                    let wait = deadline.saturating_sub(epoch.elapsed());
                    match rx.recv_timeout(wait) {
                        Ok(message) => Some(message),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match rx.recv() {
                    Ok(message) => Some(message),
                    Err(_) => break,
                },
            };

            let now = epoch.elapsed();
            match message {
                None => {
                    let outcome = self.router.fire_due(now, &self.keys);
                    if !outcome.is_empty() {
                        stats.timer_outputs += 1;
                    }
                    apply_outcome(&outcome, &mut self.injector);
                }
                Some(Message::Key { event, reply }) => {
                    stats.events += 1;
                    self.keys.observe(&event);
                    let suppress = if self.registration.matches(&event) {
                        stats.routed += 1;
                        let outcome = self.router.route(&event, now, &self.keys);
                        apply_outcome(&outcome, &mut self.injector);
                        self.registration.suppress(outcome.handled)
                    } else {
                        false
                    };
                    if suppress {
                        stats.suppressed += 1;
                    }
                    if let Some(reply) = reply {
                        // The sender may have stopped waiting
                        let _ = reply.send(suppress);
                    }
                }
                Some(Message::Shutdown) => break,
            }
        }

        let released = self.router.reset();
        if !released.is_empty() {
            log::debug!("Releasing {} held stroke(s) on exit", released.len());
            self.injector.send_all(&released);
        }
        log::debug!("Event loop stopped: {:?}", stats);
        stats
    }
}

/// Wait for a loop thread and collect its stats
pub fn join_loop(join: JoinHandle<LoopStats>) -> EventLoopResult<LoopStats> {
    join.join().map_err(|_| EventLoopError::Panicked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::KeyExpression;
    use crate::mapping::{KeyMapping, MappedAction};
    use crate::output::{ChordDefinition, KeyStroke, RecordingInjector};
    use crate::state::TrackedKeyState;
    use crate::transform::{DoubleTapConfig, RouterConfig};
    use crate::VirtualKey;

    fn expr(s: &str) -> KeyExpression {
        KeyExpression::parse(s).unwrap()
    }

    fn spawn_loop(window: Duration) -> (LoopHandle, JoinHandle<LoopStats>, RecordingInjector) {
        let router = KeyEventRouter::new(RouterConfig {
            composer: None,
            double_taps: vec![
                DoubleTapConfig::new('0', "numpad0", "double_zero").with_window(window)
            ],
            chords: vec![ChordDefinition::new("jog", expr("shift")).with_member("up", expr("up"))],
            mapping: KeyMapping::new()
                .with("numpad0", MappedAction::Key(expr("0")))
                .with("double_zero", MappedAction::Text("00".to_string()))
                .with("up", MappedAction::Chord("jog".to_string())),
        });
        let injector = RecordingInjector::new();
        let registration = Registration {
            intercept: true,
            ..Default::default()
        };
        let event_loop = EventLoop::new(router, registration, injector.clone(), TrackedKeyState::new());
        let (handle, join) = event_loop.spawn().unwrap();
        (handle, join, injector)
    }

    #[test]
    fn test_send_key_reports_suppression() {
        let (handle, join, _injector) = spawn_loop(Duration::from_millis(20));
        assert!(handle.send_key(RawKeyEvent::down(VirtualKey(0x26))).unwrap());
        assert!(!handle.send_key(RawKeyEvent::down(VirtualKey(0x70))).unwrap());
        handle.shutdown();
        let stats = join_loop(join).unwrap();
        assert_eq!(stats.events, 2);
        assert_eq!(stats.suppressed, 1);
    }

    #[test]
    fn test_timer_fires_without_further_events() {
        let (handle, join, injector) = spawn_loop(Duration::from_millis(10));
        assert!(handle.send_key(RawKeyEvent::down(VirtualKey::NUMPAD0)).unwrap());
        thread::sleep(Duration::from_millis(200));
        handle.shutdown();
        let stats = join_loop(join).unwrap();

        assert_eq!(stats.timer_outputs, 1);
        assert_eq!(
            injector.sent(),
            vec![KeyStroke::down(expr("0")), KeyStroke::up(expr("0"))]
        );
    }

    #[test]
    fn test_double_tap_through_loop() {
        let (handle, join, injector) = spawn_loop(Duration::from_millis(1000));
        handle.post_key(RawKeyEvent::down(VirtualKey::NUMPAD0)).unwrap();
        handle.post_key(RawKeyEvent::down(VirtualKey::NUMPAD0)).unwrap();
        handle.shutdown();
        join_loop(join).unwrap();

        let zero = KeyStroke::tap(KeyExpression::key("0"));
        assert_eq!(injector.sent(), vec![zero.clone(), zero]);
    }

    #[test]
    fn test_shutdown_releases_held_chord() {
        let (handle, join, injector) = spawn_loop(Duration::from_millis(20));
        handle.post_key(RawKeyEvent::down(VirtualKey(0x26))).unwrap();
        drop(handle);
        join_loop(join).unwrap();

        assert_eq!(
            injector.sent(),
            vec![
                KeyStroke::down(expr("shift")),
                KeyStroke::down(expr("up")),
                KeyStroke::up(expr("up")),
                KeyStroke::up(expr("shift")),
            ]
        );
    }

    #[test]
    fn test_handle_after_exit_is_disconnected() {
        let (handle, join, _injector) = spawn_loop(Duration::from_millis(20));
        handle.shutdown();
        join_loop(join).unwrap();
        assert!(matches!(
            handle.post_key(RawKeyEvent::down(VirtualKey(0x26))),
            Err(EventLoopError::Disconnected)
        ));
    }
}
