use std::sync::Arc;

use rtrb::{Consumer, Producer};

use crate::error::{SynthError, SynthResult};
use crate::io::midi::EventParser;
use crate::patch::{GlobalParams, Patch, PatchBank};
use crate::synth::message::{Command, Retired};
use crate::NUM_CHANNELS;

use super::meter::Meters;

/// Controller half of the engine. Lives on any non-audio thread.
///
/// Everything that can fail is checked here before a command is queued, so
/// the render side never sees invalid data. Patches and banks replaced on
/// the render side come back through [`SynthController::collect_garbage`]
/// and are dropped here.
pub struct SynthController {
    commands: Producer<Command>,
    retired: Consumer<Retired>,
    parser: EventParser,
    meters: Arc<Meters>,
    globals: GlobalParams,
}

fn check_channel(channel: u8) -> SynthResult<()> {
    if (channel as usize) < NUM_CHANNELS {
        Ok(())
    } else {
        log::warn!("rejected command for channel {channel}");
        Err(SynthError::InvalidChannel(channel))
    }
}

impl SynthController {
    pub(crate) fn new(
        commands: Producer<Command>,
        retired: Consumer<Retired>,
        meters: Arc<Meters>,
    ) -> Self {
        Self {
            commands,
            retired,
            parser: EventParser::new(),
            meters,
            globals: GlobalParams::default(),
        }
    }

    fn send(&mut self, command: Command) -> SynthResult<()> {
        self.collect_garbage();
        self.commands.push(command).map_err(|_| {
            log::warn!("command queue full, dropping command");
            SynthError::QueueFull {
                queued: 0,
                total: 1,
            }
        })
    }

    /// Parse and install a patch on `channel`.
    pub fn select_patch(&mut self, channel: u8, bytes: &[u8]) -> SynthResult<()> {
        check_channel(channel)?;
        let patch = Patch::from_bytes(bytes).inspect_err(|e| {
            log::warn!("rejected patch for channel {channel}: {e}");
        })?;
        self.select_parsed(channel, patch)
    }

    /// Install an already parsed patch on `channel`.
    pub fn select_parsed(&mut self, channel: u8, patch: Patch) -> SynthResult<()> {
        check_channel(channel)?;
        log::debug!(
            "channel {channel}: patch selected ({} routings, {} voices)",
            patch.routings().len(),
            patch.max_poly()
        );
        self.send(Command::SelectPatch {
            channel,
            patch: Arc::new(patch),
        })
    }

    /// Replace the program-change bank. Entry `n` answers program `n`.
    pub fn load_bank<B: AsRef<[u8]>>(&mut self, entries: &[B]) -> SynthResult<()> {
        let bank = PatchBank::from_bytes(entries).inspect_err(|e| {
            log::warn!("rejected patch bank: {e}");
        })?;
        log::debug!("patch bank loaded with {} programs", bank.len());
        self.send(Command::LoadBank(Arc::new(bank)))
    }

    /// Parse and apply a master bus parameter block.
    pub fn set_globals(&mut self, bytes: &[u8]) -> SynthResult<()> {
        let globals = GlobalParams::from_bytes(bytes).inspect_err(|e| {
            log::warn!("rejected global parameters: {e}");
        })?;
        self.set_global_params(globals)
    }

    pub fn set_global_params(&mut self, globals: GlobalParams) -> SynthResult<()> {
        log::debug!("global parameters selected");
        self.send(Command::SetGlobals(globals))?;
        self.globals = globals;
        Ok(())
    }

    /// Last master parameters accepted by the queue.
    pub fn global_params(&self) -> &GlobalParams {
        &self.globals
    }

    /// Feed a MIDI-style byte stream. Returns the number of events queued.
    ///
    /// Parsing always consumes the whole buffer so running status stays in
    /// step; events that do not fit in the queue are dropped and reported.
    pub fn submit_events(&mut self, bytes: &[u8]) -> SynthResult<usize> {
        self.collect_garbage();

        let commands = &mut self.commands;
        let mut queued = 0;
        let mut total = 0;
        self.parser.parse(bytes, |event| {
            total += 1;
            if commands.push(Command::from(event)).is_ok() {
                queued += 1;
            }
        });

        if queued < total {
            log::warn!("event queue full, dropped {} of {total} events", total - queued);
            return Err(SynthError::QueueFull { queued, total });
        }
        Ok(queued)
    }

    pub fn note_on(&mut self, channel: u8, note: u8, velocity: u8) -> SynthResult<()> {
        check_channel(channel)?;
        self.send(Command::NoteOn {
            channel,
            note: note.min(127),
            velocity: velocity.min(127),
        })
    }

    pub fn note_off(&mut self, channel: u8, note: u8) -> SynthResult<()> {
        check_channel(channel)?;
        self.send(Command::NoteOff { channel, note })
    }

    pub fn control_change(&mut self, channel: u8, controller: u8, value: u8) -> SynthResult<()> {
        check_channel(channel)?;
        self.send(Command::ControlChange {
            channel,
            controller,
            value: value.min(127),
        })
    }

    /// `value` in `-8192..=8191`, 0 centred.
    pub fn pitch_bend(&mut self, channel: u8, value: i16) -> SynthResult<()> {
        check_channel(channel)?;
        self.send(Command::PitchBend {
            channel,
            value: value.clamp(-8192, 8191),
        })
    }

    pub fn program_change(&mut self, channel: u8, program: u8) -> SynthResult<()> {
        check_channel(channel)?;
        self.send(Command::ProgramChange { channel, program })
    }

    /// Release every sounding voice.
    pub fn stop_all(&mut self) -> SynthResult<()> {
        self.send(Command::StopAll)
    }

    /// Held output peaks of `channel`.
    pub fn query_levels(&self, channel: u8) -> SynthResult<(f32, f32)> {
        self.meters.channel(channel)
    }

    pub fn master_levels(&self) -> (f32, f32) {
        self.meters.master.load()
    }

    /// Drop everything the render side has retired. Returns how many.
    pub fn collect_garbage(&mut self) -> usize {
        let mut count = 0;
        while let Ok(retired) = self.retired.pop() {
            drop(retired);
            count += 1;
        }
        count
    }

    /// Commands that still fit in the queue.
    pub fn queue_space(&self) -> usize {
        self.commands.slots()
    }
}
