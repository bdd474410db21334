//! Bass patch.
//!
//! A classic subtractive bass: a pulse plus a sub octave, filtered down.
//!
//! # How It Works
//!
//! 1. Square-ish pulse for a hollow, woody tone
//! 2. Sine one octave down for weight
//! 3. Low cutoff with an envelope sweep, velocity deepens it
//! 4. Bass boost on the channel strip
//!
//! # Variations
//!
//! - More resonance and envelope amount = acid bass
//! - Saw instead of pulse = brighter, more present

use crate::dsp::filter::FilterMode;
use crate::dsp::oscillator::OscMode;
use crate::patch::params::voice;
use crate::synth::voice::KeySync;
use crate::{ModSource, PatchBuilder};

pub fn bass() -> Vec<u8> {
    PatchBuilder::new()
        .osc(0, OscMode::Pulse, 64, 90)
        .osc(1, OscMode::Sine, 64, 80)
        .osc_pitch(1, -12, 0)
        .filter(0, FilterMode::LowPass, 45, 40)
        .envelope(0, 2, 60, 100, 30)
        .envelope(1, 0, 50, 10, 30)
        .keysync(KeySync::Full)
        .bass_boost(40)
        .max_poly(4)
        .route(ModSource::Envelope2, 100, voice::filter(0, voice::FILTER_CUTOFF) as u8)
        .route(ModSource::Velocity, 80, voice::filter(0, voice::FILTER_CUTOFF) as u8)
        .to_bytes()
}
