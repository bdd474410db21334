// Purpose - external interfaces: the event byte stream

pub mod midi;

pub use midi::{EventParser, MidiEvent};
