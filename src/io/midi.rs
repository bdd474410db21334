//! MIDI-style event byte stream parsing.

/// A decoded channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    /// `-8192..=8191`, 0 is centred.
    PitchBend { channel: u8, value: i16 },
}

/// Ends an event buffer early.
pub const END_OF_BUFFER: u8 = 0xFD;

/// Number of data bytes that follow a channel status nibble.
fn data_len(status: u8) -> usize {
    match status >> 4 {
        0xC | 0xD => 1,
        _ => 2,
    }
}

/// Running-status parser. Status survives between calls, so a message may
/// be split across buffers and later buffers may omit the status byte.
#[derive(Debug, Clone, Default)]
pub struct EventParser {
    running: Option<u8>,
    data: [u8; 2],
    count: usize,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget running status and any partial message.
    pub fn reset(&mut self) {
        self.running = None;
        self.count = 0;
    }

    /// Feed `bytes`, calling `emit` for each complete message. Returns the
    /// number of bytes consumed; parsing stops after [`END_OF_BUFFER`].
    pub fn parse<F>(&mut self, bytes: &[u8], mut emit: F) -> usize
    where
        F: FnMut(MidiEvent),
    {
        for (i, &byte) in bytes.iter().enumerate() {
            match byte {
                END_OF_BUFFER => return i + 1,
                0xF8..=0xFF => {}
                0xF0..=0xF7 => self.reset(),
                0x80..=0xEF => {
                    self.running = Some(byte);
                    self.count = 0;
                }
                _ => {
                    let Some(status) = self.running else {
                        continue;
                    };
                    self.data[self.count] = byte;
                    self.count += 1;
                    if self.count == data_len(status) {
                        self.count = 0;
                        if let Some(event) = decode(status, self.data) {
                            emit(event);
                        }
                    }
                }
            }
        }
        bytes.len()
    }
}

fn decode(status: u8, data: [u8; 2]) -> Option<MidiEvent> {
    let channel = status & 0x0F;
    let [a, b] = data;
    Some(match status >> 4 {
        0x8 => MidiEvent::NoteOff {
            channel,
            key: a,
            velocity: b,
        },
        0x9 => MidiEvent::NoteOn {
            channel,
            key: a,
            velocity: b,
        },
        0xB => MidiEvent::ControlChange {
            channel,
            controller: a,
            value: b,
        },
        0xC => MidiEvent::ProgramChange { channel, program: a },
        0xE => MidiEvent::PitchBend {
            channel,
            value: ((b as i16) << 7 | a as i16) - 8192,
        },
        // Polyphonic and channel pressure are consumed and dropped.
        _ => return None,
    })
}
