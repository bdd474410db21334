// Purpose: the render-thread engine, its controller handle and frame scheduling

pub mod allocator;
pub mod controller;
pub mod meter;
pub mod scheduler;

use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::config::SynthConfig;
use crate::error::SynthResult;
use crate::patch::{Patch, PatchBank};
use crate::synth::message::{Command, MessageReceiver, Retired};
use crate::synth::{Channel, Master, Voice};
use crate::{FRAME_SIZE, MAX_VOICES, NUM_CHANNELS};

use self::allocator::VoicePool;
use self::meter::Meters;
use self::scheduler::{FrameCursor, FrameRenderer, Output};

pub use self::controller::SynthController;

/// Controller number that silences a channel at once.
pub const CC_ALL_SOUND_OFF: u8 = 120;
/// Controller number that releases every held note on a channel.
pub const CC_ALL_NOTES_OFF: u8 = 123;

/// Build an engine and the controller that drives it.
///
/// Everything the render side will ever need is allocated here.
pub fn initialize(config: SynthConfig) -> SynthResult<(Synth, SynthController)> {
    config.validate().inspect_err(|e| {
        log::warn!("rejected engine configuration: {e}");
    })?;

    let (command_tx, command_rx) = RingBuffer::<Command>::new(config.event_capacity);
    let (retire_tx, retire_rx) = RingBuffer::<Retired>::new(config.retire_capacity);
    let meters = Arc::new(Meters::default());

    let synth = Synth {
        core: SynthCore::new(config.sample_rate, command_rx, retire_tx, meters.clone()),
        cursor: FrameCursor::new(),
    };
    let controller = SynthController::new(command_tx, retire_rx, meters);

    log::info!(
        "engine initialized: {} Hz, {} voices, {} channels, frame {} samples",
        config.sample_rate,
        MAX_VOICES,
        NUM_CHANNELS,
        FRAME_SIZE
    );
    Ok((synth, controller))
}

/// Render half of the engine. Owned by the audio thread.
pub struct Synth {
    core: SynthCore,
    cursor: FrameCursor,
}

impl Synth {
    /// Write `frames` stereo samples. With `right` absent `out` is
    /// interleaved; otherwise `out` is the left channel and `right` the
    /// right. With `accumulate` the output is added instead of written.
    ///
    /// Returns the number of samples produced, clamped to what fits.
    pub fn render(
        &mut self,
        out: &mut [f32],
        frames: usize,
        right: Option<&mut [f32]>,
        accumulate: bool,
    ) -> usize {
        let output = match right {
            None => Output::Interleaved(out),
            Some(right) => Output::Planar { left: out, right },
        };
        self.cursor.render(&mut self.core, output, frames, accumulate)
    }

    /// Held output peaks of `channel`.
    pub fn query_levels(&self, channel: u8) -> SynthResult<(f32, f32)> {
        self.core.meters.channel(channel)
    }

    pub fn master_levels(&self) -> (f32, f32) {
        self.core.meters.master.load()
    }

    /// Voice slots currently owned by a channel.
    pub fn active_voices(&self) -> usize {
        self.core.pool.active_count()
    }

    pub fn sample_rate(&self) -> f32 {
        self.core.sample_rate
    }
}

struct SynthCore {
    sample_rate: f32,
    commands: Consumer<Command>,
    retired: Producer<Retired>,
    bank: Option<Arc<PatchBank>>,

    pool: VoicePool,
    voices: Vec<Voice>,
    channels: Vec<Channel>,
    master: Master,
    meters: Arc<Meters>,
}

impl SynthCore {
    fn new(
        sample_rate: f32,
        commands: Consumer<Command>,
        retired: Producer<Retired>,
        meters: Arc<Meters>,
    ) -> Self {
        Self {
            sample_rate,
            commands,
            retired,
            bank: None,
            pool: VoicePool::new(),
            voices: (0..MAX_VOICES as u32)
                .map(|i| Voice::new(sample_rate, i))
                .collect(),
            channels: (0..NUM_CHANNELS).map(|_| Channel::new(sample_rate)).collect(),
            master: Master::new(sample_rate),
            meters,
        }
    }

    /// Apply queued commands. Stops early while the retire queue is full,
    /// leaving the rest for a later frame.
    fn drain_commands(&mut self) {
        while self.retired.slots() > 0 {
            let Some(command) = self.commands.receive() else {
                break;
            };
            self.apply(command);
        }
    }

    fn retire(&mut self, item: Retired) {
        // Room was checked before the command was taken.
        let _ = self.retired.push(item);
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::NoteOn {
                channel,
                note,
                velocity: 0,
            } => self.note_off(channel, note),
            Command::NoteOn {
                channel,
                note,
                velocity,
            } => self.note_on(channel, note, velocity),
            Command::NoteOff { channel, note } => self.note_off(channel, note),
            Command::ControlChange {
                channel,
                controller,
                value,
            } => self.control_change(channel, controller, value),
            Command::ProgramChange { channel, program } => {
                let patch = self
                    .bank
                    .as_ref()
                    .and_then(|bank| bank.get(program))
                    .cloned();
                if let Some(patch) = patch {
                    self.install_patch(channel, patch);
                }
            }
            Command::PitchBend { channel, value } => {
                if let Some(ch) = self.channels.get_mut(channel as usize) {
                    ch.set_pitch_bend(value);
                }
            }
            Command::SelectPatch { channel, patch } => self.install_patch(channel, patch),
            Command::LoadBank(bank) => {
                if let Some(old) = self.bank.replace(bank) {
                    self.retire(Retired::Bank(old));
                }
            }
            Command::SetGlobals(globals) => self.master.set_globals(&globals),
            Command::StopAll => {
                for slot in 0..MAX_VOICES {
                    if self.pool.records()[slot].channel.is_some() {
                        self.voices[slot].note_off();
                        self.pool.release(slot);
                    }
                }
            }
        }
    }

    fn install_patch(&mut self, channel: u8, patch: Arc<Patch>) {
        let old = match self.channels.get_mut(channel as usize) {
            Some(ch) => ch.set_patch(patch),
            None => Some(patch),
        };
        if let Some(old) = old {
            self.retire(Retired::Patch(old));
        }
    }

    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        let Some(patch) = self
            .channels
            .get(channel as usize)
            .and_then(Channel::patch)
        else {
            return;
        };
        let slot = self.pool.allocate(channel, patch.max_poly());
        self.voices[slot].note_on(note, velocity, patch);
    }

    fn note_off(&mut self, channel: u8, note: u8) {
        for slot in 0..MAX_VOICES {
            let record = self.pool.records()[slot];
            if record.channel == Some(channel)
                && record.gate
                && self.voices[slot].note() == note
            {
                self.voices[slot].note_off();
                self.pool.release(slot);
            }
        }
    }

    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        match controller {
            CC_ALL_SOUND_OFF | CC_ALL_NOTES_OFF => {
                for slot in 0..MAX_VOICES {
                    if self.pool.records()[slot].channel != Some(channel) {
                        continue;
                    }
                    if controller == CC_ALL_SOUND_OFF {
                        // Freed once the amplitude has ramped out this frame.
                        self.voices[slot].kill();
                    } else {
                        self.voices[slot].note_off();
                    }
                    self.pool.release(slot);
                }
            }
            _ => {
                if let Some(ch) = self.channels.get_mut(channel as usize) {
                    ch.control_change(controller, value);
                }
            }
        }
    }

    fn tick_voices(&mut self) {
        for (slot, voice) in self.voices.iter_mut().enumerate() {
            let Some(channel) = self.pool.records()[slot].channel else {
                continue;
            };
            if let Some(input) = self.channels[channel as usize].voice_input() {
                voice.tick(&input);
            }
        }

        for (index, channel) in self.channels.iter_mut().enumerate() {
            let sources = self
                .pool
                .most_recent(index as u8)
                .map(|slot| self.voices[slot].sources());
            channel.tick(sources);
        }
    }

    fn render_voices(&mut self) {
        let aux = self.master.aux_input();
        for (slot, voice) in self.voices.iter_mut().enumerate() {
            let Some(channel) = self.pool.records()[slot].channel else {
                continue;
            };
            let (left, right) = self.channels[channel as usize].buffers_mut();
            voice.render(aux, left, right);
        }

        for (slot, voice) in self.voices.iter().enumerate() {
            if !self.pool.records()[slot].is_free() && !voice.is_active() {
                self.pool.free(slot);
            }
        }
    }
}

impl FrameRenderer for SynthCore {
    fn render_frame(&mut self, left: &mut [f32; FRAME_SIZE], right: &mut [f32; FRAME_SIZE]) {
        self.drain_commands();

        self.master.begin_frame();
        for channel in &mut self.channels {
            channel.begin_frame();
        }

        self.tick_voices();
        self.render_voices();

        for (index, channel) in self.channels.iter_mut().enumerate() {
            channel.process(self.master.buses_mut(), &self.meters.channels[index]);
        }
        self.master.process(&self.meters.master);

        let (out_left, out_right) = self.master.output();
        left.copy_from_slice(out_left);
        right.copy_from_slice(out_right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PatchBuilder;

    fn engine() -> (Synth, SynthController) {
        initialize(SynthConfig::default()).unwrap()
    }

    fn render_frames(synth: &mut Synth, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; 2 * frames * FRAME_SIZE];
        let n = synth.render(&mut out, frames * FRAME_SIZE, None, false);
        assert_eq!(n, frames * FRAME_SIZE);
        out
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(initialize(SynthConfig::with_sample_rate(0.0)).is_err());
    }

    #[test]
    fn notes_without_patch_are_ignored() {
        let (mut synth, mut ctl) = engine();
        ctl.note_on(0, 60, 100).unwrap();
        let out = render_frames(&mut synth, 2);
        assert!(out.iter().all(|&x| x == 0.0));
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn velocity_zero_releases() {
        let (mut synth, mut ctl) = engine();
        ctl.select_patch(0, &PatchBuilder::new().build().unwrap().to_bytes())
            .unwrap();
        ctl.submit_events(&[0x90, 60, 100]).unwrap();
        render_frames(&mut synth, 1);
        assert_eq!(synth.active_voices(), 1);
        assert!(synth.core.pool.records()[0].gate);

        ctl.submit_events(&[60, 0]).unwrap();
        render_frames(&mut synth, 1);
        assert!(!synth.core.pool.records()[0].gate);
    }

    #[test]
    fn all_sound_off_frees_within_a_frame() {
        let (mut synth, mut ctl) = engine();
        ctl.select_patch(1, &PatchBuilder::new().to_bytes()).unwrap();
        ctl.note_on(1, 60, 100).unwrap();
        ctl.note_on(1, 64, 100).unwrap();
        render_frames(&mut synth, 2);
        assert_eq!(synth.active_voices(), 2);

        ctl.control_change(1, CC_ALL_SOUND_OFF, 0).unwrap();
        render_frames(&mut synth, 1);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn patch_swap_retires_old_patch() {
        let (mut synth, mut ctl) = engine();
        ctl.select_patch(0, &PatchBuilder::new().to_bytes()).unwrap();
        render_frames(&mut synth, 1);
        ctl.select_patch(0, &PatchBuilder::new().volume(50).to_bytes())
            .unwrap();
        render_frames(&mut synth, 1);
        assert_eq!(ctl.collect_garbage(), 1);
    }

    #[test]
    fn full_retire_queue_pauses_draining() {
        let config = SynthConfig {
            retire_capacity: 1,
            ..SynthConfig::default()
        };
        let (mut synth, mut ctl) = initialize(config).unwrap();
        let bytes = PatchBuilder::new().to_bytes();
        ctl.select_patch(0, &bytes).unwrap();
        ctl.select_patch(0, &bytes).unwrap();
        ctl.select_patch(0, &bytes).unwrap();

        render_frames(&mut synth, 1);
        // One old patch went back; the third selection waits for room.
        assert_eq!(synth.core.commands.slots(), 1);

        assert_eq!(ctl.collect_garbage(), 1);
        render_frames(&mut synth, 1);
        assert_eq!(synth.core.commands.slots(), 0);
        assert_eq!(ctl.collect_garbage(), 1);
    }

    #[test]
    fn program_change_reads_the_bank() {
        let (mut synth, mut ctl) = engine();
        let quiet = PatchBuilder::new().volume(1).to_bytes();
        let loud = PatchBuilder::new().volume(127).to_bytes();
        ctl.load_bank(&[quiet, loud]).unwrap();
        ctl.program_change(2, 1).unwrap();
        render_frames(&mut synth, 1);
        let patch = synth.core.channels[2].patch().unwrap();
        assert_eq!(patch.channel_params()[0], 127);

        // Unknown programs leave the channel alone.
        ctl.program_change(2, 9).unwrap();
        render_frames(&mut synth, 1);
        assert!(synth.core.channels[2].has_patch());
    }

    #[test]
    fn stop_all_releases_everything() {
        let (mut synth, mut ctl) = engine();
        ctl.select_patch(0, &PatchBuilder::new().to_bytes()).unwrap();
        ctl.select_patch(5, &PatchBuilder::new().to_bytes()).unwrap();
        ctl.note_on(0, 60, 100).unwrap();
        ctl.note_on(5, 62, 100).unwrap();
        render_frames(&mut synth, 1);
        ctl.stop_all().unwrap();
        render_frames(&mut synth, 1);
        assert!(synth.core.pool.records().iter().all(|r| !r.gate));
    }

    #[test]
    fn levels_are_published() {
        let (mut synth, mut ctl) = engine();
        ctl.select_patch(3, &PatchBuilder::new().to_bytes()).unwrap();
        ctl.note_on(3, 57, 127).unwrap();
        render_frames(&mut synth, 4);
        let (left, right) = ctl.query_levels(3).unwrap();
        assert!(left > 0.0 && right > 0.0);
        assert_eq!(synth.query_levels(3).unwrap(), (left, right));
        assert!(synth.master_levels().0 > 0.0);
        assert_eq!(ctl.query_levels(0).unwrap(), (0.0, 0.0));
    }
}
