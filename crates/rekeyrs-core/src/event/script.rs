// Rekeyrs Replay Scripts
// Timestamped key transitions for driving the router without a host

use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::event::r#loop::apply_outcome;
use crate::input::Registration;
use crate::output::KeyInjector;
use crate::state::KeyStateQuery;
use crate::transform::{Diagnostic, KeyEventRouter};
use crate::{Direction, RawKeyEvent, VirtualKey};

/// Errors while reading a replay script or a live event line
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected '<at_ms> <down|up> <key> [device]', got '{text}'")]
    Syntax { line: usize, text: String },

    #[error("line {line}: unknown key '{key}'")]
    UnknownKey { line: usize, key: String },

    #[error("line {line}: time {at_ms}ms is before the previous event at {previous_ms}ms")]
    TimeWentBackwards {
        line: usize,
        at_ms: u64,
        previous_ms: u64,
    },
}

/// One scripted transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedEvent {
    /// Time since the start of the script
    pub at: Duration,
    pub event: RawKeyEvent,
}

fn script_line_regex() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| {
        Regex::new(r"(?i)^(\d+)\s+(down|up)\s+(\S+)(?:\s+(\S+))?$")
            .expect("script line pattern is valid")
    })
}

fn live_line_regex() -> &'static Regex {
    static LINE: OnceLock<Regex> = OnceLock::new();
    LINE.get_or_init(|| {
        Regex::new(r"(?i)^(down|up)\s+(\S+)(?:\s+(\S+))?$")
            .expect("live line pattern is valid")
    })
}

/// Strip comments and whitespace; `None` for lines with nothing left
fn content_of(line: &str) -> Option<&str> {
    let text = match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}

fn build_event(
    line: usize,
    direction: &str,
    key: &str,
    device: Option<&str>,
) -> Result<RawKeyEvent, ScriptError> {
    let direction: Direction = direction.parse().map_err(|_| ScriptError::Syntax {
        line,
        text: direction.to_string(),
    })?;
    let vkey: VirtualKey = key.parse().map_err(|_| ScriptError::UnknownKey {
        line,
        key: key.to_string(),
    })?;
    Ok(RawKeyEvent::from_vkey(
        vkey,
        direction,
        device.map(str::to_string),
    ))
}

/// Parse a replay script.
///
/// ```text
/// # alt code 36
/// 0   down alt
/// 5   down numpad3 PID_026C
/// ```
pub fn parse_script(content: &str) -> Result<Vec<ScriptedEvent>, ScriptError> {
    let mut events = Vec::new();
    let mut previous_ms = 0u64;

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let Some(text) = content_of(raw) else {
            continue;
        };
        let caps = script_line_regex()
            .captures(text)
            .ok_or_else(|| ScriptError::Syntax {
                line,
                text: text.to_string(),
            })?;

        let at_ms: u64 = caps[1].parse().map_err(|_| ScriptError::Syntax {
            line,
            text: text.to_string(),
        })?;
        if at_ms < previous_ms {
            return Err(ScriptError::TimeWentBackwards {
                line,
                at_ms,
                previous_ms,
            });
        }
        previous_ms = at_ms;

        let event = build_event(line, &caps[2], &caps[3], caps.get(4).map(|m| m.as_str()))?;
        events.push(ScriptedEvent {
            at: Duration::from_millis(at_ms),
            event,
        });
    }

    Ok(events)
}

/// Read and parse a replay script file
pub fn load_script<P: AsRef<Path>>(path: P) -> Result<Vec<ScriptedEvent>, ScriptError> {
    let content = fs::read_to_string(path)?;
    parse_script(&content)
}

/// Parse one live input line such as `down numpad3`.
///
/// Blank and comment-only lines yield `Ok(None)`.
pub fn parse_live_line(line: usize, raw: &str) -> Result<Option<RawKeyEvent>, ScriptError> {
    let Some(text) = content_of(raw) else {
        return Ok(None);
    };
    let caps = live_line_regex()
        .captures(text)
        .ok_or_else(|| ScriptError::Syntax {
            line,
            text: text.to_string(),
        })?;
    build_event(line, &caps[1], &caps[2], caps.get(3).map(|m| m.as_str())).map(Some)
}

/// Counters and diagnostics collected by [`replay`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Events in the script
    pub events: usize,
    /// Events that matched the registration and reached the router
    pub routed: usize,
    /// Events the host would have suppressed
    pub suppressed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Drive `router` through `script` in simulated time.
///
/// Timers still pending after the last event are fired at their deadlines.
pub fn replay<K: KeyStateQuery>(
    router: &mut KeyEventRouter,
    registration: &Registration,
    keys: &mut K,
    script: &[ScriptedEvent],
    injector: &mut dyn KeyInjector,
) -> ReplaySummary {
    let mut summary = ReplaySummary {
        events: script.len(),
        ..Default::default()
    };

    for scripted in script {
        keys.observe(&scripted.event);
        if !registration.matches(&scripted.event) {
            log::trace!("replay: {} filtered by registration", scripted.event);
            continue;
        }
        summary.routed += 1;

        let outcome = router.route(&scripted.event, scripted.at, &*keys);
        if registration.suppress(outcome.handled) {
            summary.suppressed += 1;
        }
        apply_outcome(&outcome, injector);
        summary.diagnostics.extend(outcome.diagnostics);
    }

    while let Some(deadline) = router.next_deadline() {
        let outcome = router.fire_due(deadline, &*keys);
        apply_outcome(&outcome, injector);
        summary.diagnostics.extend(outcome.diagnostics);
    }

    summary
}
