// Rekeyrs Input Layer
// Raw events and registration filtering

mod event;
mod filter;

pub use event::RawKeyEvent;
pub use filter::{DeviceFilter, KeyFilter, Registration};
