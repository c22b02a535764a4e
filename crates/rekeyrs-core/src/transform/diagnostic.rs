// Rekeyrs Transform - Diagnostics
// Non-fatal conditions reported while routing events

use crate::RawKeyEvent;

/// A condition worth logging that never changes control flow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    #[error("unhandled alt code {code}")]
    UnrecognizedAltCode { code: String },

    #[error("unhandled key {key}: {event}")]
    UnmappedKey { key: String, event: RawKeyEvent },

    #[error("unhandled key {key}")]
    UnmappedLogicalKey { key: String },

    #[error("event has no logical key name: {event}")]
    MissingKeyName { event: RawKeyEvent },

    #[error("chord error for {key}: {reason}")]
    Chord { key: String, reason: String },

    #[error("sub-handler '{handler}' for {key}: {reason}")]
    SubHandler {
        handler: String,
        key: String,
        reason: String,
    },
}

impl Diagnostic {
    /// Log this diagnostic at warn level
    pub fn log(&self) {
        log::warn!("{}", self);
    }
}
