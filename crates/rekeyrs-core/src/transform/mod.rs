// Rekeyrs Transform Module
// Event interpretation: alt-code composition, double taps and routing

pub mod altcode;
pub mod diagnostic;
pub mod double_tap;
pub mod router;

pub use altcode::{default_alt_codes, AltCodeComposer, ComposeOutcome, ComposerState};
pub use diagnostic::Diagnostic;
pub use double_tap::{DoubleTapConfig, DoubleTapDisambiguator, TapOutcome, DEFAULT_DOUBLE_TAP_WINDOW};
pub use router::{KeyEventRouter, RouteOutcome, RouterConfig};
