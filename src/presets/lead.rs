//! Lead patch.
//!
//! A bright, cutting lead from two slightly detuned saws. Saws carry every
//! harmonic, so a lead built on them cuts through a mix.
//!
//! # How It Works
//!
//! 1. Two saws, the second detuned a few cents, for width
//! 2. Ladder low-pass with moderate resonance
//! 3. Envelope 2 opens the filter on each note
//! 4. Mod wheel adds vibrato through LFO 1
//! 5. A little delay send for space

use crate::dsp::filter::FilterMode;
use crate::dsp::lfo::{LfoWaveform, Polarity};
use crate::dsp::oscillator::OscMode;
use crate::patch::params::voice;
use crate::{ModSource, PatchBuilder};

pub fn lead() -> Vec<u8> {
    PatchBuilder::new()
        .osc(0, OscMode::TriSaw, 127, 90)
        .osc(1, OscMode::TriSaw, 127, 90)
        .osc_pitch(1, 0, 6)
        .filter(0, FilterMode::LadderLow, 80, 50)
        .envelope(0, 4, 70, 110, 50)
        .envelope(1, 0, 60, 0, 50)
        .lfo(0, LfoWaveform::Sine, 80, Polarity::Bipolar)
        .sends(10, 30)
        .route(ModSource::Envelope2, 90, voice::filter(0, voice::FILTER_CUTOFF) as u8)
        .route(ModSource::ModWheel, 96, voice::osc(0, voice::OSC_DETUNE) as u8)
        .route(ModSource::ModWheel, 96, voice::osc(1, voice::OSC_DETUNE) as u8)
        .route(ModSource::Lfo1, 66, voice::TRANSPOSE as u8)
        .to_bytes()
}
