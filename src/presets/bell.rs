//! Bell patch.
//!
//! Two-operator FM: a sine modulates a second sine a non-integer ratio away,
//! which gives the inharmonic partials of struck metal.
//!
//! # How It Works
//!
//! 1. Osc 1 sine, 19 semitones up, is the modulator and a faint partial
//! 2. Osc 2 reads the buffer as its phase input; color sets the depth
//! 3. Envelope 2 lets the brightness die away faster than the tone
//! 4. Long release and reverb for the ring-out

use crate::dsp::filter::FilterMode;
use crate::dsp::oscillator::OscMode;
use crate::patch::params::voice;
use crate::{ModSource, PatchBuilder};

pub fn bell() -> Vec<u8> {
    PatchBuilder::new()
        .osc(0, OscMode::Sine, 64, 70)
        .osc_pitch(0, 19, 3)
        .osc(1, OscMode::FmSine, 90, 100)
        .filter(0, FilterMode::Off, 127, 0)
        .envelope(0, 0, 30, 40, 30)
        .sustain_slope(0, 40)
        .envelope(1, 0, 40, 0, 40)
        .sends(60, 0)
        .route(ModSource::Envelope2, 127, voice::osc(1, voice::OSC_COLOR) as u8)
        .route(ModSource::Velocity, 90, voice::osc(0, voice::OSC_GAIN) as u8)
        .to_bytes()
}
