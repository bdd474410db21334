use std::sync::Arc;

use rtrb::Consumer;

use crate::io::midi::MidiEvent;
use crate::patch::{GlobalParams, Patch, PatchBank};

/// Controller -> render thread commands. Everything heap-allocated arrives
/// already built and wrapped in an `Arc`.
#[derive(Debug, Clone)]
pub enum Command {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    /// `-8192..=8191`.
    PitchBend { channel: u8, value: i16 },
    SelectPatch { channel: u8, patch: Arc<Patch> },
    LoadBank(Arc<PatchBank>),
    SetGlobals(GlobalParams),
    /// Release every sounding voice.
    StopAll,
}

impl From<MidiEvent> for Command {
    fn from(event: MidiEvent) -> Self {
        match event {
            MidiEvent::NoteOn {
                channel,
                key,
                velocity,
            } => Command::NoteOn {
                channel,
                note: key,
                velocity,
            },
            MidiEvent::NoteOff { channel, key, .. } => Command::NoteOff { channel, note: key },
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => Command::ControlChange {
                channel,
                controller,
                value,
            },
            MidiEvent::ProgramChange { channel, program } => {
                Command::ProgramChange { channel, program }
            }
            MidiEvent::PitchBend { channel, value } => Command::PitchBend { channel, value },
        }
    }
}

/// Render thread -> controller: shared data the render thread no longer
/// references. Dropping it there would free memory on the audio thread.
#[derive(Debug)]
pub enum Retired {
    Patch(Arc<Patch>),
    Bank(Arc<PatchBank>),
}

pub trait MessageReceiver {
    fn receive(&mut self) -> Option<Command>;
}

impl MessageReceiver for Consumer<Command> {
    fn receive(&mut self) -> Option<Command> {
        Consumer::pop(self).ok()
    }
}
