//! Distortion / Waveshaping
//!
//! Distortion adds harmonics by reshaping the waveform. The "drive" parameter
//! controls how hard the signal is pushed into the nonlinear region.
//!
//! # How Waveshaping Works
//!
//! A waveshaper applies a transfer function to each sample:
//!   output = f(input * drive)
//!
//! When drive is low the signal stays in the linear region of f() and passes
//! through mostly unchanged. As drive increases, the signal hits the
//! nonlinear parts of f(), creating harmonic distortion.
//!
//! # Modes
//!
//! Overdrive:
//!   f(x) = x / (1 + |x|), with an optional bias for even harmonics
//!
//! Clip:
//!   f(x) = clamp(x, -threshold, threshold)
//!
//! Fold:
//!   Past the threshold the signal folds back on itself. Metallic, complex.
//!
//! Bit crush:
//!   Quantize to a small number of levels.
//!
//! Decimate:
//!   Sample-and-hold at a lower rate. Aliasing is the point.
//!
//! # Parameters (0..=127)
//!
//!   drive   0 dB to +36 dB of pre-gain
//!   param   overdrive bias, clip/fold threshold, crush depth or decimation
//!           rate depending on the mode

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::ramp::Ramp;
use crate::patch::params::{bipolar, db_to_gain, exp_range, selector, unit};
use crate::FRAME_SIZE;

const MAX_DRIVE_DB: f32 = 36.0;
const MIN_THRESHOLD: f32 = 1.0 / 64.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DistortionMode {
    Off = 0,
    Overdrive = 1,
    Clip = 2,
    Fold = 3,
    BitCrush = 4,
    Decimate = 5,
}

impl DistortionMode {
    pub const COUNT: usize = 6;

    pub fn from_param(value: f32) -> Self {
        use DistortionMode::*;
        match selector(value, Self::COUNT) {
            0 => Off,
            1 => Overdrive,
            2 => Clip,
            3 => Fold,
            4 => BitCrush,
            _ => Decimate,
        }
    }
}

/// Soft clipping using x / (1 + |x|) transfer function.
///
/// This produces warm, tube-like saturation that gradually
/// compresses peaks without harsh artifacts.
#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    x / (1.0 + x.abs())
}

/// Hard clipping - simply clamps the signal at a threshold.
#[inline]
pub fn hard_clip(sample: f32, drive: f32, threshold: f32) -> f32 {
    let x = sample * drive;
    x.clamp(-threshold, threshold)
}

/// Foldback distortion - signal folds back when exceeding threshold.
///
/// Closed form of repeated reflection, so the cost does not grow with the
/// input level.
#[inline]
pub fn foldback(sample: f32, drive: f32, threshold: f32) -> f32 {
    let x = sample * drive;
    if x.abs() <= threshold {
        return x;
    }
    if !x.is_finite() {
        return 0.0;
    }
    // Triangle wave of period 4·threshold through (0, 0).
    let period = 4.0 * threshold;
    let shifted = (x + threshold).rem_euclid(period);
    if shifted < 2.0 * threshold {
        shifted - threshold
    } else {
        3.0 * threshold - shifted
    }
}

/// Quantize to `levels` steps per polarity.
#[inline]
pub fn bit_crush(sample: f32, drive: f32, levels: f32) -> f32 {
    let x = (sample * drive).clamp(-1.0, 1.0);
    (x * levels).round() / levels
}

/// Stateful waveshaper driven by the `0..=127` parameter scale.
#[derive(Debug, Clone)]
pub struct Distortion {
    mode: DistortionMode,
    /// Linear pre-gain.
    drive: Ramp,
    param: Ramp,
    /// Decimator hold value and phase.
    held: f32,
    counter: f32,
    sample_rate: f32,
}

impl Distortion {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            mode: DistortionMode::Off,
            drive: Ramp::new(1.0),
            param: Ramp::new(0.0),
            held: 0.0,
            counter: 1.0,
            sample_rate,
        }
    }

    /// Control-frame update. Drive and param glide to their new values
    /// over the next frame.
    pub fn set(&mut self, mode: DistortionMode, drive: f32, param: f32) {
        self.mode = mode;
        self.drive
            .set_target(db_to_gain(unit(drive) * MAX_DRIVE_DB), FRAME_SIZE);
        self.param.set_target(param.clamp(0.0, 127.0), FRAME_SIZE);
    }

    pub fn mode(&self) -> DistortionMode {
        self.mode
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        match self.mode {
            DistortionMode::Off => {
                self.drive.finish();
                self.param.finish();
            }
            DistortionMode::Overdrive => {
                for sample in buffer.iter_mut() {
                    let drive = self.drive.next();
                    let bias = bipolar(self.param.next()) * 0.5;
                    *sample = soft_clip(*sample * drive + bias, 1.0) - soft_clip(bias, 1.0);
                }
            }
            DistortionMode::Clip => {
                for sample in buffer.iter_mut() {
                    let threshold = unit(self.param.next()).max(MIN_THRESHOLD);
                    *sample = hard_clip(*sample, self.drive.next(), threshold);
                }
            }
            DistortionMode::Fold => {
                for sample in buffer.iter_mut() {
                    let threshold = unit(self.param.next()).max(MIN_THRESHOLD);
                    *sample = foldback(*sample, self.drive.next(), threshold);
                }
            }
            DistortionMode::BitCrush => {
                // Quantization is stepped anyway; the depth follows the frame's target.
                self.param.finish();
                // 127 is clean-ish (2^15 levels), 0 is one level.
                let levels = (unit(self.param.value()) * 15.0).exp2();
                for sample in buffer.iter_mut() {
                    *sample = bit_crush(*sample, self.drive.next(), levels);
                }
            }
            DistortionMode::Decimate => {
                self.param.finish();
                let rate = exp_range(self.param.value(), 100.0, self.sample_rate);
                let step = (rate / self.sample_rate).min(1.0);
                for sample in buffer.iter_mut() {
                    let drive = self.drive.next();
                    self.counter += step;
                    if self.counter >= 1.0 {
                        self.counter -= 1.0;
                        self.held = *sample * drive;
                    }
                    *sample = self.held;
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.held = 0.0;
        self.counter = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_clip_unity_drive() {
        // f(0.1) = 0.1 / 1.1 ≈ 0.0909
        let output = soft_clip(0.1, 1.0);
        assert!((output - 0.0909).abs() < 0.01);
    }

    #[test]
    fn test_soft_clip_high_drive() {
        // At high drive, output approaches ±1 asymptotically
        let output = soft_clip(1.0, 10.0);
        assert!(output > 0.9 && output < 1.0);
    }

    #[test]
    fn test_hard_clip_above_threshold() {
        // 0.8 * 2 = 1.6, clamped to 1.0
        let output = hard_clip(0.8, 2.0, 1.0);
        assert!((output - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_foldback_below_threshold() {
        let output = foldback(0.3, 1.0, 1.0);
        assert!((output - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_foldback_above_threshold() {
        // 0.7 * 2 = 1.4, folds to 2*1 - 1.4 = 0.6
        let output = foldback(0.7, 2.0, 1.0);
        assert!((output - 0.6).abs() < 1e-6);
        // -1.4 folds to -0.6
        let output = foldback(-0.7, 2.0, 1.0);
        assert!((output + 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_foldback_is_bounded_for_huge_input() {
        let output = foldback(1.0e9, 1.0, 0.5);
        assert!(output.abs() <= 0.5 + 1e-3);
        assert_eq!(foldback(f32::INFINITY, 1.0, 0.5), 0.0);
    }

    #[test]
    fn test_bit_crush_quantizes() {
        assert_eq!(bit_crush(0.3, 1.0, 2.0), 0.5);
        assert_eq!(bit_crush(-0.2, 1.0, 2.0), 0.0);
    }

    #[test]
    fn test_overdrive_keeps_silence_silent() {
        let mut dist = Distortion::new(48_000.0);
        dist.set(DistortionMode::Overdrive, 100.0, 100.0);
        let mut buffer = vec![0.0; 16];
        dist.render(&mut buffer);
        assert!(buffer.iter().all(|x| x.abs() < 1e-6));
    }

    #[test]
    fn test_decimate_holds_samples() {
        let mut dist = Distortion::new(48_000.0);
        dist.set(DistortionMode::Decimate, 0.0, 0.0);
        let mut buffer: Vec<f32> = (0..64).map(|i| i as f32 / 64.0).collect();
        dist.render(&mut buffer);
        assert!(buffer.iter().all(|&x| x == buffer[0]));
    }

    #[test]
    fn test_drive_change_glides_across_the_frame() {
        let mut dist = Distortion::new(48_000.0);
        dist.set(DistortionMode::Clip, 0.0, 127.0);
        let mut buffer = vec![0.01; FRAME_SIZE];
        dist.render(&mut buffer);
        let mut previous = buffer[FRAME_SIZE - 1];
        assert!((previous - 0.01).abs() < 1e-6);

        // 0 dB to 36 dB in one frame.
        dist.set(DistortionMode::Clip, 127.0, 127.0);
        let mut buffer = vec![0.01; FRAME_SIZE];
        dist.render(&mut buffer);
        for &sample in &buffer {
            assert!((sample - previous).abs() < 0.006, "jump to {sample} from {previous}");
            previous = sample;
        }
        assert!((buffer[FRAME_SIZE - 1] - 0.631).abs() < 1e-3);
    }
}
