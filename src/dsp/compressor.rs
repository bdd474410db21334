//! Compressor - dynamics processing for channels and the master bus.
//!
//! Feed-forward design: a detector measures the input level, an envelope
//! follower smooths it with separate attack and release times, and a soft-knee
//! gain computer turns the level above threshold into gain reduction.
//!
//! ```text
//! in ──┬──────────────[lookahead delay]──────────(×)──[out gain]── out
//!      └─[peak|rms]─[link]─[attack/release]─[gain computer]─┘
//! ```
//!
//! The lookahead delays the audio, not the detector, so gain reduction is
//! already in place when a transient arrives.

use crate::dsp::delay::DelayLine;
use crate::dsp::filter::flush_denormal;
use crate::dsp::ramp::Ramp;
use crate::patch::params::{bipolar, comp, db_to_gain, exp_range, gain_to_db, selector, switch, unit};
use crate::FRAME_SIZE;

const KNEE_DB: f32 = 6.0;
const MAX_LOOKAHEAD_MS: f32 = 10.0;
const RMS_WINDOW_MS: f32 = 10.0;
const MAX_OUT_GAIN_DB: f32 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorMode {
    Off,
    Peak,
    Rms,
}

impl DetectorMode {
    pub fn from_param(value: f32) -> Self {
        match selector(value, 3) {
            0 => DetectorMode::Off,
            1 => DetectorMode::Peak,
            _ => DetectorMode::Rms,
        }
    }
}

/// Decoded compressor settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    pub mode: DetectorMode,
    pub stereo_link: bool,
    pub auto_gain: bool,
    pub lookahead_ms: f32,
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub out_gain_db: f32,
}

impl CompressorParams {
    /// Decode a nine-parameter compressor block on the `0..=127` scale.
    pub fn from_raw(raw: &[f32]) -> Self {
        let get = |i: usize| raw.get(i).copied().unwrap_or(0.0);
        Self {
            mode: DetectorMode::from_param(get(comp::MODE)),
            stereo_link: switch(get(comp::STEREO_LINK)),
            auto_gain: switch(get(comp::AUTO_GAIN)),
            lookahead_ms: unit(get(comp::LOOKAHEAD)) * MAX_LOOKAHEAD_MS,
            threshold_db: -60.0 + 60.0 * unit(get(comp::THRESHOLD)),
            ratio: exp_range(get(comp::RATIO), 1.0, 20.0),
            attack_ms: exp_range(get(comp::ATTACK), 0.1, 100.0),
            release_ms: exp_range(get(comp::RELEASE), 10.0, 2_000.0),
            out_gain_db: bipolar(get(comp::OUT_GAIN)) * MAX_OUT_GAIN_DB,
        }
    }
}

/// Stereo compressor with lookahead.
#[derive(Debug, Clone)]
pub struct Compressor {
    sample_rate: f32,
    mode: DetectorMode,
    stereo_link: bool,
    threshold_db: f32,
    ratio: f32,
    lookahead: usize,
    attack_coef: f32,
    release_coef: f32,
    rms_coef: f32,
    /// Output gain including makeup, gliding over a frame.
    gain: Ramp,

    delay: [DelayLine; 2],
    mean_square: [f32; 2],
    envelope: [f32; 2],
}

impl Compressor {
    pub fn new(sample_rate: f32) -> Self {
        let capacity = (MAX_LOOKAHEAD_MS * sample_rate / 1000.0) as usize + 4;
        let mut compressor = Self {
            sample_rate,
            mode: DetectorMode::Off,
            stereo_link: true,
            threshold_db: 0.0,
            ratio: 1.0,
            lookahead: 0,
            attack_coef: 0.0,
            release_coef: 0.0,
            rms_coef: 0.0,
            gain: Ramp::new(1.0),
            delay: [DelayLine::new(capacity), DelayLine::new(capacity)],
            mean_square: [0.0; 2],
            envelope: [0.0; 2],
        };
        compressor.rms_coef = compressor.coefficient(RMS_WINDOW_MS);
        compressor
    }

    fn coefficient(&self, ms: f32) -> f32 {
        (-1000.0 / (ms.max(0.01) * self.sample_rate)).exp()
    }

    pub fn set(&mut self, params: &CompressorParams) {
        self.mode = params.mode;
        self.stereo_link = params.stereo_link;
        self.threshold_db = params.threshold_db;
        self.ratio = params.ratio.max(1.0);
        self.lookahead = (params.lookahead_ms * self.sample_rate / 1000.0) as usize;
        self.attack_coef = self.coefficient(params.attack_ms);
        self.release_coef = self.coefficient(params.release_ms);

        let makeup = if params.auto_gain {
            -0.5 * self.threshold_db * (1.0 - 1.0 / self.ratio)
        } else {
            0.0
        };
        self.gain
            .set_target(db_to_gain(params.out_gain_db + makeup), FRAME_SIZE);
    }

    /// Gain change in dB for a level in dB. Zero or negative.
    #[inline]
    fn gain_computer(&self, level_db: f32) -> f32 {
        let slope = 1.0 - 1.0 / self.ratio;
        let over = level_db - self.threshold_db;
        if over <= -KNEE_DB / 2.0 {
            0.0
        } else if over >= KNEE_DB / 2.0 {
            -over * slope
        } else {
            let x = over + KNEE_DB / 2.0;
            -slope * x * x / (2.0 * KNEE_DB)
        }
    }

    #[inline]
    fn detect(&mut self, channel: usize, input: f32) -> f32 {
        match self.mode {
            DetectorMode::Rms => {
                let ms = &mut self.mean_square[channel];
                *ms = flush_denormal(input * input + self.rms_coef * (*ms - input * input));
                ms.sqrt()
            }
            _ => input.abs(),
        }
    }

    #[inline]
    fn follow(&mut self, channel: usize, level: f32) -> f32 {
        let env = &mut self.envelope[channel];
        let coef = if level > *env {
            self.attack_coef
        } else {
            self.release_coef
        };
        *env = flush_denormal(level + coef * (*env - level));
        *env
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        if self.mode == DetectorMode::Off {
            return (left, right);
        }

        let level_left = self.detect(0, left);
        let level_right = self.detect(1, right);
        let (level_left, level_right) = if self.stereo_link {
            let linked = level_left.max(level_right);
            (linked, linked)
        } else {
            (level_left, level_right)
        };

        let env_left = self.follow(0, level_left);
        let env_right = self.follow(1, level_right);
        let out_gain = self.gain.next();
        let gain_left = db_to_gain(self.gain_computer(gain_to_db(env_left))) * out_gain;
        let gain_right = db_to_gain(self.gain_computer(gain_to_db(env_right))) * out_gain;

        self.delay[0].write(left);
        self.delay[1].write(right);
        let delayed_left = self.delay[0].read(self.lookahead + 1);
        let delayed_right = self.delay[1].read(self.lookahead + 1);

        (delayed_left * gain_left, delayed_right * gain_right)
    }

    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        if self.mode == DetectorMode::Off {
            self.gain.finish();
            return;
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (out_l, out_r) = self.process(*l, *r);
            *l = out_l;
            *r = out_r;
        }
    }

    /// Current gain reduction in dB (positive), for metering.
    pub fn gain_reduction(&self) -> f32 {
        let env = self.envelope[0].max(self.envelope[1]);
        -self.gain_computer(gain_to_db(env))
    }

    pub fn reset(&mut self) {
        self.delay.iter_mut().for_each(DelayLine::reset);
        self.mean_square = [0.0; 2];
        self.envelope = [0.0; 2];
    }
}
