use std::f32::consts::FRAC_PI_2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::distortion::{Distortion, DistortionMode};
use crate::dsp::envelope::{Envelope, EnvelopeParams};
use crate::dsp::filter::{DcBlocker, Filter, FilterRouting};
use crate::dsp::lfo::{Lfo, LfoParams};
use crate::dsp::oscillator::{AuxInput, OscMode, Oscillator};
use crate::dsp::ramp::Ramp;
use crate::patch::params::{selector, switch, unit, voice};
use crate::patch::{Patch, NUM_VOICE_PARAMS};
use crate::synth::modulation::{apply_voice, ModSources, NUM_SOURCE_CONTROLLERS};
use crate::{FRAME_SIZE, REFERENCE_NOTE};

/*
Voice Signal Path
=================

    osc 1 ─┐
    osc 2 ─┼─→ [filter 1] ─┬─ single / serial / parallel ─→ [distortion] ─→ [dc] ─→ pan ─→ L/R
    osc 3 ─┘   [filter 2] ─┘

Oscillators write into one mono frame buffer in order. Each either adds to
what is already there or, with the ring flag, multiplies it; the FM mode
reads the buffer as its modulator. So oscillator order is part of the
sound: osc 3 can ring-modulate the sum of osc 1 and osc 2.

Control Frame Order
-------------------

Every frame, before any audio:

  1. envelopes and LFOs advance, using last frame's working parameters
  2. the modulation matrix rebuilds the working parameters from the patch
  3. oscillators, filters, distortion and amplitude ramps are configured

Voices do not own a patch. They read their channel's current patch each
frame, so a patch change reshapes notes that are already sounding.
*/

/// What a note-on restarts on a voice.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum KeySync {
    /// Nothing restarts; a stolen voice continues from where it was.
    None = 0,
    /// Oscillator phases restart. Filters and envelope levels carry over.
    #[default]
    Oscillators = 1,
    /// Phases, filter state, distortion state and envelope levels restart.
    Full = 2,
}

impl KeySync {
    pub fn from_param(value: f32) -> Self {
        match selector(value, 3) {
            0 => KeySync::None,
            1 => KeySync::Oscillators,
            _ => KeySync::Full,
        }
    }
}

/// Channel state a voice reads while ticking.
#[derive(Debug, Clone, Copy)]
pub struct VoiceInput<'a> {
    pub patch: &'a Patch,
    pub controllers: &'a [u8; NUM_SOURCE_CONTROLLERS],
    /// Semitones.
    pub pitch_bend: f32,
}

pub struct Voice {
    note: u8,
    velocity: u8,
    gate: bool,

    oscillators: [Oscillator; 3],
    filters: [Filter; 2],
    routing: FilterRouting,
    filter_gains: [Ramp; 2],
    envelopes: [Envelope; 2],
    lfos: [Lfo; 2],
    distortion: Distortion,
    dc: DcBlocker,
    amp_left: Ramp,
    amp_right: Ramp,

    working: [f32; NUM_VOICE_PARAMS],
    sources: ModSources,
    buffer: [f32; FRAME_SIZE],
    scratch: [f32; FRAME_SIZE],
}

impl Voice {
    pub fn new(sample_rate: f32, seed: u32) -> Self {
        Self {
            note: 0,
            velocity: 0,
            gate: false,
            oscillators: [0u32, 1, 2].map(|i| {
                Oscillator::new(sample_rate).with_seed(seed.wrapping_mul(3).wrapping_add(i + 1))
            }),
            filters: [Filter::new(sample_rate), Filter::new(sample_rate)],
            routing: FilterRouting::Single,
            filter_gains: [Ramp::new(1.0), Ramp::new(1.0)],
            envelopes: [Envelope::new(sample_rate), Envelope::new(sample_rate)],
            lfos: [Lfo::new(sample_rate), Lfo::new(sample_rate)],
            distortion: Distortion::new(sample_rate),
            dc: DcBlocker::new(sample_rate),
            amp_left: Ramp::new(0.0),
            amp_right: Ramp::new(0.0),
            working: [0.0; NUM_VOICE_PARAMS],
            sources: ModSources::default(),
            buffer: [0.0; FRAME_SIZE],
            scratch: [0.0; FRAME_SIZE],
        }
    }

    fn load_static(&mut self, patch: &Patch) {
        for (w, &b) in self.working.iter_mut().zip(patch.voice_params()) {
            *w = b as f32;
        }
    }

    /// Start a note, applying the patch's keysync policy.
    pub fn note_on(&mut self, note: u8, velocity: u8, patch: &Patch) {
        self.note = note;
        self.velocity = velocity;
        self.gate = true;
        self.load_static(patch);

        match KeySync::from_param(self.working[voice::KEYSYNC]) {
            KeySync::None => {}
            KeySync::Oscillators => {
                self.oscillators.iter_mut().for_each(Oscillator::reset_phase);
            }
            KeySync::Full => {
                self.oscillators.iter_mut().for_each(Oscillator::reset);
                self.filters.iter_mut().for_each(Filter::reset);
                self.envelopes.iter_mut().for_each(Envelope::reset_level);
                self.distortion.reset();
                self.dc.reset();
            }
        }

        for env in &mut self.envelopes {
            env.gate(true);
        }
        for (i, lfo) in self.lfos.iter_mut().enumerate() {
            let base = voice::lfo(i, 0);
            lfo.trigger(&LfoParams::from_raw(&self.working[base..base + voice::LFO_STRIDE]));
        }
    }

    pub fn note_off(&mut self) {
        self.gate = false;
        for env in &mut self.envelopes {
            env.gate(false);
        }
    }

    /// Silence at once; the amplitude ramps to zero over the next frame.
    pub fn kill(&mut self) {
        self.gate = false;
        for env in &mut self.envelopes {
            env.kill();
        }
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn is_gated(&self) -> bool {
        self.gate
    }

    /// Sounding, as far as the amplitude envelope is concerned.
    pub fn is_active(&self) -> bool {
        self.envelopes[0].is_active()
    }

    /// Source values from the last tick, for channel-level routings.
    pub fn sources(&self) -> &ModSources {
        &self.sources
    }

    pub fn working_params(&self) -> &[f32; NUM_VOICE_PARAMS] {
        &self.working
    }

    fn envelope_params(&self, index: usize) -> EnvelopeParams {
        let w = &self.working;
        EnvelopeParams {
            attack: w[voice::env(index, voice::ENV_ATTACK)],
            decay: w[voice::env(index, voice::ENV_DECAY)],
            sustain: w[voice::env(index, voice::ENV_SUSTAIN)],
            sustain_slope: w[voice::env(index, voice::ENV_SUSTAIN_SLOPE)],
            release: w[voice::env(index, voice::ENV_RELEASE)],
            amplify: w[voice::env(index, voice::ENV_AMPLIFY)],
        }
    }

    /// Control-frame update.
    pub fn tick(&mut self, input: &VoiceInput<'_>) {
        let mut env_out = [0.0; 2];
        for (i, out) in env_out.iter_mut().enumerate() {
            let params = self.envelope_params(i);
            *out = self.envelopes[i].tick(&params);
        }
        let mut lfo_out = [0.0; 2];
        for (i, out) in lfo_out.iter_mut().enumerate() {
            let base = voice::lfo(i, 0);
            let params = LfoParams::from_raw(&self.working[base..base + voice::LFO_STRIDE]);
            *out = self.lfos[i].tick(&params);
        }

        self.sources = ModSources::new(
            self.velocity,
            self.note,
            input.controllers,
            env_out,
            lfo_out,
        );
        apply_voice(
            input.patch.routings(),
            &self.sources,
            input.patch.voice_params(),
            &mut self.working,
        );

        let w = &self.working;
        let base_pitch = self.note as f32 - REFERENCE_NOTE
            + (w[voice::TRANSPOSE] - 64.0)
            + input.pitch_bend;
        for (i, osc) in self.oscillators.iter_mut().enumerate() {
            let pitch = base_pitch
                + (w[voice::osc(i, voice::OSC_TRANSPOSE)] - 64.0)
                + (w[voice::osc(i, voice::OSC_DETUNE)] - 64.0) / 64.0;
            osc.set(
                OscMode::from_param(w[voice::osc(i, voice::OSC_MODE)]),
                switch(w[voice::osc(i, voice::OSC_RING)]),
                pitch,
                unit(w[voice::osc(i, voice::OSC_COLOR)]),
                unit(w[voice::osc(i, voice::OSC_GAIN)]),
                FRAME_SIZE,
            );
        }

        for (i, filter) in self.filters.iter_mut().enumerate() {
            filter.set_params(
                w[voice::filter(i, voice::FILTER_MODE)],
                w[voice::filter(i, voice::FILTER_CUTOFF)],
                w[voice::filter(i, voice::FILTER_RESONANCE)],
            );
        }
        self.routing = FilterRouting::from_param(w[voice::FILTER_ROUTING]);
        self.filter_gains[0].set_target(unit(w[voice::FILTER1_GAIN]), FRAME_SIZE);
        self.filter_gains[1].set_target(unit(w[voice::FILTER2_GAIN]), FRAME_SIZE);

        self.distortion.set(
            DistortionMode::from_param(w[voice::DIST_MODE]),
            w[voice::DIST_DRIVE],
            w[voice::DIST_PARAM],
        );

        // Equal-power pan; envelope 1 output is 0..=128.
        let amplitude = env_out[0] / 128.0;
        let angle = unit(w[voice::PAN]) * FRAC_PI_2;
        self.amp_left.set_target(amplitude * angle.cos(), FRAME_SIZE);
        self.amp_right.set_target(amplitude * angle.sin(), FRAME_SIZE);
    }

    /// Render one frame and add it into `left`/`right`.
    pub fn render(&mut self, aux: AuxInput<'_>, left: &mut [f32], right: &mut [f32]) {
        let len = FRAME_SIZE.min(left.len()).min(right.len());
        let buffer = &mut self.buffer[..len];
        buffer.fill(0.0);

        for osc in &mut self.oscillators {
            osc.render(buffer, aux);
        }

        match self.routing {
            FilterRouting::Single => {
                self.filters[0].render(buffer);
                self.filter_gains.iter_mut().for_each(Ramp::finish);
            }
            FilterRouting::Serial => {
                let [first, second] = &mut self.filters;
                first.render(buffer);
                second.render(buffer);
                self.filter_gains.iter_mut().for_each(Ramp::finish);
            }
            FilterRouting::Parallel => {
                let scratch = &mut self.scratch[..len];
                scratch.copy_from_slice(buffer);
                let [first, second] = &mut self.filters;
                first.render(buffer);
                second.render(scratch);
                let [gain1, gain2] = &mut self.filter_gains;
                for (out, other) in buffer.iter_mut().zip(scratch.iter()) {
                    *out = *out * gain1.next() + *other * gain2.next();
                }
            }
        }

        self.distortion.render(buffer);
        self.dc.render(buffer);

        for ((&sample, l), r) in buffer.iter().zip(left.iter_mut()).zip(right.iter_mut()) {
            *l += sample * self.amp_left.next();
            *r += sample * self.amp_right.next();
        }
    }
}
