//! Typed construction of patch bytes.
//!
//! ```
//! use polycore::dsp::filter::FilterMode;
//! use polycore::dsp::oscillator::OscMode;
//! use polycore::{ModSource, PatchBuilder};
//!
//! let patch = PatchBuilder::new()
//!     .osc(0, OscMode::TriSaw, 127, 110)
//!     .filter(0, FilterMode::LowPass, 70, 40)
//!     .envelope(0, 2, 60, 100, 50)
//!     .route(ModSource::Envelope2, 100, 21)
//!     .build()
//!     .unwrap();
//! assert_eq!(patch.routings().len(), 1);
//! ```

use crate::dsp::distortion::DistortionMode;
use crate::dsp::filter::{FilterMode, FilterRouting};
use crate::dsp::lfo::{LfoWaveform, Polarity};
use crate::dsp::oscillator::OscMode;
use crate::error::PatchError;
use crate::synth::voice::KeySync;

use super::params::{channel, comp, voice};
use super::{ModRouting, ModSource, Patch, NUM_CHANNEL_PARAMS, NUM_VOICE_PARAMS};

const NUM_OSCILLATORS: usize = 3;
const NUM_FILTERS: usize = 2;
const NUM_ENVELOPES: usize = 2;
const NUM_LFOS: usize = 2;
const MAX_ROUTINGS: usize = u8::MAX as usize;

#[inline]
fn byte(value: u8) -> u8 {
    value.min(127)
}

/// Offset a 64-centred parameter by a signed amount.
#[inline]
fn centred(offset: i8) -> u8 {
    (64 + offset as i16).clamp(0, 127) as u8
}

#[inline]
fn flag(on: bool) -> u8 {
    if on {
        127
    } else {
        0
    }
}

/// Builds patch bytes from a playable default: one saw through an open
/// low-pass, organ-style amplitude envelope, everything else off.
#[derive(Debug, Clone)]
pub struct PatchBuilder {
    voice: [u8; NUM_VOICE_PARAMS],
    channel: [u8; NUM_CHANNEL_PARAMS],
    max_poly: u8,
    routings: Vec<ModRouting>,
}

impl Default for PatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchBuilder {
    pub fn new() -> Self {
        let mut v = [0u8; NUM_VOICE_PARAMS];
        v[voice::PAN] = 64;
        v[voice::TRANSPOSE] = 64;
        for i in 0..NUM_OSCILLATORS {
            v[voice::osc(i, voice::OSC_MODE)] = OscMode::Off as u8;
            v[voice::osc(i, voice::OSC_TRANSPOSE)] = 64;
            v[voice::osc(i, voice::OSC_DETUNE)] = 64;
            v[voice::osc(i, voice::OSC_COLOR)] = 64;
            v[voice::osc(i, voice::OSC_GAIN)] = 100;
        }
        v[voice::osc(0, voice::OSC_MODE)] = OscMode::TriSaw as u8;
        v[voice::osc(0, voice::OSC_COLOR)] = 127;

        v[voice::filter(0, voice::FILTER_MODE)] = FilterMode::LowPass as u8;
        v[voice::filter(0, voice::FILTER_CUTOFF)] = 127;
        v[voice::filter(1, voice::FILTER_CUTOFF)] = 127;
        v[voice::FILTER_ROUTING] = FilterRouting::Single as u8;
        v[voice::FILTER1_GAIN] = 127;
        v[voice::FILTER2_GAIN] = 127;

        v[voice::DIST_MODE] = DistortionMode::Off as u8;
        v[voice::DIST_PARAM] = 127;

        for i in 0..NUM_ENVELOPES {
            v[voice::env(i, voice::ENV_DECAY)] = 64;
            v[voice::env(i, voice::ENV_SUSTAIN_SLOPE)] = 64;
            v[voice::env(i, voice::ENV_RELEASE)] = 40;
            v[voice::env(i, voice::ENV_AMPLIFY)] = 127;
        }
        v[voice::env(0, voice::ENV_SUSTAIN)] = 127;

        for i in 0..NUM_LFOS {
            v[voice::lfo(i, voice::LFO_WAVEFORM)] = LfoWaveform::Triangle as u8;
            v[voice::lfo(i, voice::LFO_KEYSYNC)] = 127;
            v[voice::lfo(i, voice::LFO_RATE)] = 64;
            v[voice::lfo(i, voice::LFO_POLARITY)] = Polarity::Bipolar as u8;
            v[voice::lfo(i, voice::LFO_AMPLIFY)] = 127;
        }
        v[voice::KEYSYNC] = KeySync::Oscillators as u8;

        let mut c = [0u8; NUM_CHANNEL_PARAMS];
        c[channel::VOLUME] = 100;
        c[channel::DIST_PARAM] = 127;
        c[channel::CHORUS_FEEDBACK] = 64;
        c[channel::CHORUS_DELAY_L] = 40;
        c[channel::CHORUS_DELAY_R] = 50;
        c[channel::CHORUS_RATE] = 40;
        c[channel::CHORUS_DEPTH] = 20;
        c[channel::CHORUS_PHASE] = 32;
        c[channel::COMP_BASE + comp::STEREO_LINK] = 127;
        c[channel::COMP_BASE + comp::THRESHOLD] = 100;
        c[channel::COMP_BASE + comp::RATIO] = 32;
        c[channel::COMP_BASE + comp::ATTACK] = 20;
        c[channel::COMP_BASE + comp::RELEASE] = 64;
        c[channel::COMP_BASE + comp::OUT_GAIN] = 64;

        Self {
            voice: v,
            channel: c,
            max_poly: 8,
            routings: Vec::new(),
        }
    }

    /// Set any voice parameter by index. Out-of-range indices are ignored.
    pub fn voice_param(mut self, index: usize, value: u8) -> Self {
        if let Some(slot) = self.voice.get_mut(index) {
            *slot = byte(value);
        }
        self
    }

    /// Set any channel parameter by index. Out-of-range indices are ignored.
    pub fn channel_param(mut self, index: usize, value: u8) -> Self {
        if let Some(slot) = self.channel.get_mut(index) {
            *slot = byte(value);
        }
        self
    }

    pub fn osc(self, index: usize, mode: OscMode, color: u8, gain: u8) -> Self {
        if index >= NUM_OSCILLATORS {
            return self;
        }
        self.voice_param(voice::osc(index, voice::OSC_MODE), mode as u8)
            .voice_param(voice::osc(index, voice::OSC_COLOR), color)
            .voice_param(voice::osc(index, voice::OSC_GAIN), gain)
    }

    /// `transpose` in semitones, `detune` in 1/64 semitone steps.
    pub fn osc_pitch(self, index: usize, transpose: i8, detune: i8) -> Self {
        if index >= NUM_OSCILLATORS {
            return self;
        }
        self.voice_param(voice::osc(index, voice::OSC_TRANSPOSE), centred(transpose))
            .voice_param(voice::osc(index, voice::OSC_DETUNE), centred(detune))
    }

    pub fn ring(self, index: usize, on: bool) -> Self {
        if index >= NUM_OSCILLATORS {
            return self;
        }
        self.voice_param(voice::osc(index, voice::OSC_RING), flag(on))
    }

    pub fn filter(self, index: usize, mode: FilterMode, cutoff: u8, resonance: u8) -> Self {
        if index >= NUM_FILTERS {
            return self;
        }
        self.voice_param(voice::filter(index, voice::FILTER_MODE), mode as u8)
            .voice_param(voice::filter(index, voice::FILTER_CUTOFF), cutoff)
            .voice_param(voice::filter(index, voice::FILTER_RESONANCE), resonance)
    }

    pub fn filter_routing(self, routing: FilterRouting, gain1: u8, gain2: u8) -> Self {
        self.voice_param(voice::FILTER_ROUTING, routing as u8)
            .voice_param(voice::FILTER1_GAIN, gain1)
            .voice_param(voice::FILTER2_GAIN, gain2)
    }

    pub fn distortion(self, mode: DistortionMode, drive: u8, param: u8) -> Self {
        self.voice_param(voice::DIST_MODE, mode as u8)
            .voice_param(voice::DIST_DRIVE, drive)
            .voice_param(voice::DIST_PARAM, param)
    }

    pub fn envelope(self, index: usize, attack: u8, decay: u8, sustain: u8, release: u8) -> Self {
        if index >= NUM_ENVELOPES {
            return self;
        }
        self.voice_param(voice::env(index, voice::ENV_ATTACK), attack)
            .voice_param(voice::env(index, voice::ENV_DECAY), decay)
            .voice_param(voice::env(index, voice::ENV_SUSTAIN), sustain)
            .voice_param(voice::env(index, voice::ENV_RELEASE), release)
    }

    pub fn sustain_slope(self, index: usize, slope: u8) -> Self {
        if index >= NUM_ENVELOPES {
            return self;
        }
        self.voice_param(voice::env(index, voice::ENV_SUSTAIN_SLOPE), slope)
    }

    pub fn env_amplify(self, index: usize, amount: u8) -> Self {
        if index >= NUM_ENVELOPES {
            return self;
        }
        self.voice_param(voice::env(index, voice::ENV_AMPLIFY), amount)
    }

    pub fn lfo(self, index: usize, waveform: LfoWaveform, rate: u8, polarity: Polarity) -> Self {
        if index >= NUM_LFOS {
            return self;
        }
        self.voice_param(voice::lfo(index, voice::LFO_WAVEFORM), waveform as u8)
            .voice_param(voice::lfo(index, voice::LFO_RATE), rate)
            .voice_param(voice::lfo(index, voice::LFO_POLARITY), polarity as u8)
    }

    pub fn lfo_sync(self, index: usize, keysync: bool, one_shot: bool) -> Self {
        if index >= NUM_LFOS {
            return self;
        }
        self.voice_param(voice::lfo(index, voice::LFO_KEYSYNC), flag(keysync))
            .voice_param(voice::lfo(index, voice::LFO_ONE_SHOT), flag(one_shot))
    }

    pub fn lfo_phase(self, index: usize, phase: u8) -> Self {
        if index >= NUM_LFOS {
            return self;
        }
        self.voice_param(voice::lfo(index, voice::LFO_PHASE), phase)
    }

    pub fn lfo_amplify(self, index: usize, amount: u8) -> Self {
        if index >= NUM_LFOS {
            return self;
        }
        self.voice_param(voice::lfo(index, voice::LFO_AMPLIFY), amount)
    }

    pub fn pan(self, pan: u8) -> Self {
        self.voice_param(voice::PAN, pan)
    }

    pub fn transpose(self, semitones: i8) -> Self {
        self.voice_param(voice::TRANSPOSE, centred(semitones))
    }

    pub fn keysync(self, policy: KeySync) -> Self {
        self.voice_param(voice::KEYSYNC, policy as u8)
    }

    pub fn volume(self, volume: u8) -> Self {
        self.channel_param(channel::VOLUME, volume)
    }

    /// Aux A feeds the reverb, aux B the delay.
    pub fn sends(self, aux_a: u8, aux_b: u8) -> Self {
        self.channel_param(channel::AUX_A_SEND, aux_a)
            .channel_param(channel::AUX_B_SEND, aux_b)
    }

    pub fn bass_boost(self, amount: u8) -> Self {
        self.channel_param(channel::BOOST, amount)
    }

    pub fn chorus_first(self, chorus_first: bool) -> Self {
        self.channel_param(channel::FX_ORDER, flag(chorus_first))
    }

    pub fn channel_distortion(self, mode: DistortionMode, drive: u8, param: u8) -> Self {
        self.channel_param(channel::DIST_MODE, mode as u8)
            .channel_param(channel::DIST_DRIVE, drive)
            .channel_param(channel::DIST_PARAM, param)
    }

    /// Dry/wet amount, feedback, left and right delay, sweep rate and depth.
    pub fn chorus(
        self,
        amount: u8,
        feedback: u8,
        delay_left: u8,
        delay_right: u8,
        rate: u8,
        depth: u8,
    ) -> Self {
        self.channel_param(channel::CHORUS_AMOUNT, amount)
            .channel_param(channel::CHORUS_FEEDBACK, feedback)
            .channel_param(channel::CHORUS_DELAY_L, delay_left)
            .channel_param(channel::CHORUS_DELAY_R, delay_right)
            .channel_param(channel::CHORUS_RATE, rate)
            .channel_param(channel::CHORUS_DEPTH, depth)
    }

    /// Raw nine-byte compressor block, in `params::comp` order.
    pub fn compressor(mut self, block: [u8; comp::COUNT]) -> Self {
        for (i, value) in block.into_iter().enumerate() {
            self = self.channel_param(channel::COMP_BASE + i, value);
        }
        self
    }

    pub fn max_poly(mut self, voices: u8) -> Self {
        self.max_poly = voices;
        self
    }

    /// Append a modulation routing. Amount 64 is neutral.
    pub fn route(mut self, source: ModSource, amount: u8, destination: u8) -> Self {
        self.routings
            .push(ModRouting::new(source, byte(amount), destination));
        self
    }

    /// Serialize to the wire layout. Only the first 255 routings fit the
    /// count byte; [`PatchBuilder::build`] reports any beyond that.
    pub fn to_bytes(&self) -> Vec<u8> {
        let routings = &self.routings[..self.routings.len().min(MAX_ROUTINGS)];
        let mut bytes = Vec::with_capacity(NUM_VOICE_PARAMS + NUM_CHANNEL_PARAMS + 2);
        bytes.extend_from_slice(&self.voice);
        bytes.extend_from_slice(&self.channel);
        bytes.push(self.max_poly);
        bytes.push(routings.len() as u8);
        for routing in routings {
            bytes.extend_from_slice(&[routing.source.id(), routing.amount, routing.destination]);
        }
        bytes
    }

    /// Validate and parse, exactly as bytes from any other source would be.
    pub fn build(&self) -> Result<Patch, PatchError> {
        if self.routings.len() > MAX_ROUTINGS {
            return Err(PatchError::TooManyRoutings {
                count: self.routings.len(),
                max: MAX_ROUTINGS,
            });
        }
        Patch::from_bytes(&self.to_bytes())
    }
}
