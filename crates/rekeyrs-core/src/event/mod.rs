// Rekeyrs Event Handling
// Threaded event loop and replay scripts

pub mod r#loop;
pub mod script;

pub use r#loop::{join_loop, EventLoop, EventLoopError, EventLoopResult, LoopHandle, LoopStats};
pub use script::{
    load_script, parse_live_line, parse_script, replay, ReplaySummary, ScriptError,
    ScriptedEvent,
};
