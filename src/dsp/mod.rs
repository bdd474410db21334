//! Low-level DSP primitives used by voices, channels and the master bus.
//!
//! Everything here is allocation-free after construction and safe to run on
//! the audio thread. Parameters arrive on the `0..=127` patch scale or in
//! physical units; state is plain `f32` with denormals flushed.

/// Cookbook biquads for shelving and cut filters.
pub mod biquad;
/// Stereo chorus/flanger built on the modulated delay.
pub mod chorus;
/// Feed-forward compressor with lookahead.
pub mod compressor;
/// Delay lines and the modulated stereo delay.
pub mod delay;
/// Waveshapers and the mode-switched distortion stage.
pub mod distortion;
/// Exponential control-rate envelope.
pub mod envelope;
/// State-variable and ladder filters, DC blocker.
pub mod filter;
/// Control-rate LFO.
pub mod lfo;
/// Phase-accumulator oscillators.
pub mod oscillator;
/// Per-frame linear smoothing.
pub mod ramp;
/// Stereo Schroeder reverb.
pub mod reverb;

pub use envelope::{Envelope, EnvelopeStage};
pub use ramp::Ramp;
