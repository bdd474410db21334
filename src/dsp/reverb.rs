//! Reverb - Room Simulation via Delay Networks
//!
//! The master bus runs a stereo Schroeder reverb on aux bus A. Each side has
//! its own bank of comb filters, slightly detuned against the other side so
//! the tail decorrelates into a wide stereo image.
//!
//! # Schroeder Reverb Architecture
//!
//! ```text
//! Input ─[low cut]─┬──→ [Comb 1] ──┐
//!                  ├──→ [Comb 2] ──┤
//!                  ├──→ [Comb 3] ──┼──→ (+) ──→ [Allpass 1] ──→ [Allpass 2] ──→ Output
//!                  └──→ [Comb 4] ──┘
//! ```
//!
//! ## Comb Filters
//!
//! ```text
//! y[n] = x[n] + feedback * lowpass(y[n - delay])
//! ```
//!
//! The delay times are mutually prime to avoid resonant buildup at specific
//! frequencies. The one-pole low-pass in the loop absorbs highs on every
//! pass, which is what "damping" controls.
//!
//! ## Allpass Filters
//!
//! ```text
//! y[n] = -g * x[n] + x[n - delay] + g * y[n - delay]
//! ```
//!
//! # Parameters (0..=127)
//!
//! - **Time**: comb feedback, 0.7 to 0.98
//! - **Damping**: high-frequency absorption (higher = darker)
//! - **Low cut**: one-pole high-pass on the input, 20 Hz to 2 kHz
//! - **Volume**: return level

use std::f32::consts::PI;

use crate::dsp::filter::flush_denormal;
use crate::dsp::ramp::Ramp;
use crate::patch::params::{exp_range, unit};
use crate::FRAME_SIZE;

/// Max comb filter delay: 50ms at 192kHz = 9600 samples
const MAX_COMB_DELAY: usize = 9600;
/// Max allpass filter delay: 10ms at 192kHz = 1920 samples
const MAX_ALLPASS_DELAY: usize = 1920;

const COMB_DELAYS_MS: [f32; 4] = [29.7, 37.1, 41.1, 43.7];
const ALLPASS_DELAYS_MS: [f32; 2] = [5.0, 1.7];
/// Right-side detune, about 23 samples at 44.1 kHz.
const STEREO_SPREAD_MS: f32 = 0.52;

/// A comb filter for reverb (pre-allocated on the heap, RT-safe)
#[derive(Clone)]
pub struct CombFilter {
    buffer: Box<[f32]>,
    write_pos: usize,
    feedback: f32,
    damp: f32,
    filter_state: f32,
}

impl CombFilter {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.clamp(1, MAX_COMB_DELAY)].into_boxed_slice(),
            write_pos: 0,
            feedback: 0.5,
            damp: 0.5,
            filter_state: 0.0,
        }
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.99);
    }

    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.write_pos];

        self.filter_state =
            flush_denormal(output * (1.0 - self.damp) + self.filter_state * self.damp);
        self.buffer[self.write_pos] = flush_denormal(input + self.filter_state * self.feedback);
        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.write_pos = 0;
    }
}

/// An allpass filter for reverb diffusion (pre-allocated on the heap, RT-safe)
#[derive(Clone)]
pub struct AllpassFilter {
    buffer: Box<[f32]>,
    write_pos: usize,
    feedback: f32,
}

impl AllpassFilter {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.clamp(1, MAX_ALLPASS_DELAY)].into_boxed_slice(),
            write_pos: 0,
            feedback: 0.5,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];
        let output = -self.feedback * input + delayed;
        self.buffer[self.write_pos] = flush_denormal(input + self.feedback * output);
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// One side of the stereo reverb.
#[derive(Clone)]
struct ReverbSide {
    combs: [CombFilter; 4],
    allpasses: [AllpassFilter; 2],
    low_cut_state: f32,
}

impl ReverbSide {
    fn new(sample_rate: f32, spread_ms: f32) -> Self {
        let samples = |ms: f32| ((ms + spread_ms) * sample_rate / 1000.0) as usize;
        Self {
            combs: COMB_DELAYS_MS.map(|ms| CombFilter::new(samples(ms))),
            allpasses: ALLPASS_DELAYS_MS.map(|ms| AllpassFilter::new(samples(ms))),
            low_cut_state: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, low_cut: f32) -> f32 {
        self.low_cut_state = flush_denormal(self.low_cut_state + low_cut * (input - self.low_cut_state));
        let input = input - self.low_cut_state;

        let mut output = 0.0;
        for comb in &mut self.combs {
            output += comb.process(input);
        }
        output *= 0.25;

        for allpass in &mut self.allpasses {
            output = allpass.process(output);
        }
        output
    }

    fn reset(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::reset);
        self.allpasses.iter_mut().for_each(AllpassFilter::reset);
        self.low_cut_state = 0.0;
    }
}

/// Stereo Schroeder reverb used as the aux A return.
#[derive(Clone)]
pub struct StereoReverb {
    left: ReverbSide,
    right: ReverbSide,
    low_cut: f32,
    volume: Ramp,
    sample_rate: f32,
}

impl StereoReverb {
    pub fn new(sample_rate: f32) -> Self {
        let mut reverb = Self {
            left: ReverbSide::new(sample_rate, 0.0),
            right: ReverbSide::new(sample_rate, STEREO_SPREAD_MS),
            low_cut: 0.0,
            volume: Ramp::new(0.0),
            sample_rate,
        };
        reverb.set(64.0, 64.0, 0.0, 0.0);
        reverb
    }

    /// Apply the four master reverb parameters.
    pub fn set(&mut self, time: f32, damping: f32, low_cut: f32, volume: f32) {
        let feedback = 0.7 + unit(time) * 0.28;
        let damp = unit(damping);
        for side in [&mut self.left, &mut self.right] {
            for comb in &mut side.combs {
                comb.set_feedback(feedback);
                comb.set_damp(damp);
            }
        }

        let cutoff = exp_range(low_cut, 20.0, 2_000.0);
        self.low_cut = 1.0 - (-2.0 * PI * cutoff / self.sample_rate).exp();
        self.volume.set_target(unit(volume), FRAME_SIZE);
    }

    /// Wet stereo sample for one stereo input sample.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let wet_left = self.left.process(left, self.low_cut);
        let wet_right = self.right.process(right, self.low_cut);
        let volume = self.volume.next();
        (wet_left * volume, wet_right * volume)
    }

    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (wl, wr) = self.process(*l, *r);
            *l = wl;
            *r = wr;
        }
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}
