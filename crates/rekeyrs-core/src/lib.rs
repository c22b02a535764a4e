// Rekeyrs Core Library
// Key event remapping: alt codes, double taps, chords and logical key mapping

pub mod action;
pub mod config;
pub mod event;
pub mod input;
pub mod key;
pub mod mapping;
pub mod output;
pub mod state;
pub mod timer;
pub mod transform;

pub use action::Direction;
pub use config::{Config, ConfigError, KeyExprError, KeyExpression, ModifierKey};
pub use event::{EventLoop, EventLoopError, EventLoopResult, LoopHandle, ScriptError, ScriptedEvent};
pub use input::{DeviceFilter, KeyFilter, RawKeyEvent, Registration};
pub use key::VirtualKey;
pub use mapping::{KeyMapping, MappedAction, SubHandler, ToggleHandler};
pub use output::{ChordDefinition, ChordError, ChordSequencer, KeyInjector, KeyStroke, RecordingInjector};
pub use state::{KeyState, KeyStateQuery, TrackedKeyState};
pub use timer::{TimerHandle, TimerQueue};
pub use transform::{
    AltCodeComposer, ComposeOutcome, Diagnostic, DoubleTapConfig, DoubleTapDisambiguator,
    KeyEventRouter, RouteOutcome, RouterConfig, TapOutcome,
};
