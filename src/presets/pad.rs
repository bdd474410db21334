//! Pad patch - sustained, atmospheric texture.
//!
//! # How It Works
//!
//! 1. Two saws detuned against each other for width and movement
//! 2. Slow attack and long release
//! 3. A slow LFO sweeps the filter
//! 4. Chorus on the channel and a heavy reverb send
//!
//! # Variations
//!
//! - More detune = wider, more dramatic
//! - Lower cutoff = darker, more ambient

use crate::dsp::filter::FilterMode;
use crate::dsp::lfo::{LfoWaveform, Polarity};
use crate::dsp::oscillator::OscMode;
use crate::patch::params::voice;
use crate::{ModSource, PatchBuilder};

pub fn pad() -> Vec<u8> {
    PatchBuilder::new()
        .osc(0, OscMode::TriSaw, 120, 80)
        .osc(1, OscMode::TriSaw, 120, 80)
        .osc_pitch(0, 0, -8)
        .osc_pitch(1, 0, 8)
        .filter(0, FilterMode::LowPass, 70, 20)
        .envelope(0, 90, 64, 110, 100)
        .lfo(0, LfoWaveform::Triangle, 30, Polarity::Bipolar)
        .lfo_sync(0, false, false)
        .chorus(80, 64, 30, 45, 30, 40)
        .sends(70, 20)
        .max_poly(12)
        .route(ModSource::Lfo1, 80, voice::filter(0, voice::FILTER_CUTOFF) as u8)
        .to_bytes()
}
