//! Pluck patch - percussive, quickly decaying note.
//!
//! Good for arpeggios and rhythmic parts. Think kalimba or harp.
//!
//! # How It Works
//!
//! 1. Triangle for a soft tone
//! 2. Instant attack, medium decay, no sustain
//! 3. Filter closes with the amplitude
//!
//! # Variations
//!
//! - Shorter decay = more staccato
//! - Sine = purer, more mellow

use crate::dsp::filter::FilterMode;
use crate::dsp::oscillator::OscMode;
use crate::patch::params::voice;
use crate::{ModSource, PatchBuilder};

pub fn pluck() -> Vec<u8> {
    PatchBuilder::new()
        .osc(0, OscMode::TriSaw, 64, 110)
        .filter(0, FilterMode::LowPass, 60, 30)
        .envelope(0, 0, 50, 0, 40)
        .envelope(1, 0, 40, 0, 40)
        .sends(30, 40)
        .route(ModSource::Envelope2, 110, voice::filter(0, voice::FILTER_CUTOFF) as u8)
        .to_bytes()
}
