//! Realtime-safe polyphonic synthesis core.
//!
//! A fixed pool of voices renders note events into a stereo signal. Patches
//! are compact byte blocks; every buffer is allocated once in [`initialize`]
//! and reused for the lifetime of the engine.
//!
//! ```no_run
//! use polycore::{initialize, presets, SynthConfig};
//!
//! let (mut synth, mut controller) = initialize(SynthConfig::default()).unwrap();
//! controller.select_patch(0, &presets::lead()).unwrap();
//! controller.submit_events(&[0x90, 60, 100]).unwrap();
//!
//! let mut out = vec![0.0f32; 2 * 256];
//! synth.render(&mut out, 256, None, false);
//! ```

pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod io;
pub mod patch;
pub mod presets;
pub mod synth;

pub use config::SynthConfig;
pub use engine::{initialize, Synth, SynthController};
pub use error::{PatchError, SynthError};
pub use patch::{GlobalParams, ModRouting, ModSource, Patch, PatchBuilder};

/// Samples per control frame. Modulation runs once per frame, audio per sample.
pub const FRAME_SIZE: usize = 128;
/// Size of the voice pool.
pub const MAX_VOICES: usize = 64;
/// Number of addressable channels (one per MIDI channel).
pub const NUM_CHANNELS: usize = 16;
/// Note number whose pitch is 440 Hz.
pub const REFERENCE_NOTE: f32 = 69.0;
/// Sample rate at which envelope and LFO rates are defined.
pub const REFERENCE_RATE: f32 = 44_100.0;
