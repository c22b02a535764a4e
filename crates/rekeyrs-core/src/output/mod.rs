// Rekeyrs Output Layer
// Key strokes, chord sequencing and the injector seam

mod chord;
mod injector;
mod stroke;

pub use chord::{ChordDefinition, ChordError, ChordSequencer};
pub use injector::{KeyInjector, RecordingInjector};
pub use stroke::KeyStroke;
