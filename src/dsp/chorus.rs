use crate::dsp::delay::{ModDelayParams, ModulatedDelay};
use crate::dsp::ramp::Ramp;
use crate::patch::params::unit;
use crate::FRAME_SIZE;

/*
Chorus Effect
=============

Chorus thickens a sound by mixing the dry signal with a slightly delayed,
pitch-modulated copy. The modulation creates subtle detuning that makes
one voice sound like several playing together.

How It Works
------------

1. Input signal passes through (dry)
2. A copy is sent through a short delay (up to 50 ms)
3. A sine sweeps the delay time, creating pitch variation
4. Dry and wet signals are mixed together

Left and right have their own delay time and their sweeps can be offset in
phase, which spreads a mono channel across the stereo field. With very short
delays and feedback the same structure becomes a flanger.

Parameters (0..=127)
--------------------

  amount     dry/wet mix, 0 bypasses the effect
  feedback   64 none, above adds, below subtracts (flanger "negative" sweep)
  delay L/R  0 to 50 ms
  rate       sweep speed, same curve as the LFOs
  depth      0 to 10 ms of sweep
  phase      right sweep offset, one full cycle across the range
*/

const MAX_DELAY_MS: f32 = 50.0;
const MAX_DEPTH_MS: f32 = 10.0;

/// Stereo chorus/flanger for the channel effect chain.
#[derive(Debug, Clone)]
pub struct Chorus {
    delay: ModulatedDelay,
    mix: Ramp,
}

impl Chorus {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            delay: ModulatedDelay::new(sample_rate, MAX_DELAY_MS, MAX_DEPTH_MS),
            mix: Ramp::new(0.0),
        }
    }

    pub fn set(&mut self, params: &ModDelayParams) {
        self.mix.set_target(unit(params.amount), FRAME_SIZE);
        self.delay.set(params);
    }

    /// No wet signal now or at the end of the frame.
    pub fn is_bypassed(&self) -> bool {
        self.mix.value() <= 0.0 && self.mix.target() <= 0.0
    }

    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        if self.is_bypassed() {
            self.mix.finish();
            return;
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.next();
            let (wet_l, wet_r) = self.delay.process(*l, *r);
            *l = *l * (1.0 - mix) + wet_l * mix;
            *r = *r * (1.0 - mix) + wet_r * mix;
        }
    }

    pub fn reset(&mut self) {
        self.delay.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(amount: f32) -> ModDelayParams {
        ModDelayParams {
            amount,
            feedback: 64.0,
            delay_left: 40.0,
            delay_right: 50.0,
            rate: 60.0,
            depth: 40.0,
            phase: 32.0,
        }
    }

    #[test]
    fn zero_amount_bypasses() {
        let mut chorus = Chorus::new(48_000.0);
        chorus.set(&params(0.0));
        let mut left = vec![0.5; 64];
        let mut right = vec![-0.5; 64];
        chorus.render(&mut left, &mut right);
        assert!(left.iter().all(|&x| x == 0.5));
        assert!(right.iter().all(|&x| x == -0.5));
    }

    #[test]
    fn widens_a_mono_signal() {
        let mut chorus = Chorus::new(48_000.0);
        chorus.set(&params(64.0));
        let input: Vec<f32> = (0..48_000).map(|n| (n as f32 * 0.05).sin()).collect();
        let mut left = input.clone();
        let mut right = input;
        chorus.render(&mut left, &mut right);
        let differs = left
            .iter()
            .zip(&right)
            .skip(4_800)
            .any(|(l, r)| (l - r).abs() > 1e-3);
        assert!(differs);
        assert!(left.iter().chain(&right).all(|x| x.is_finite() && x.abs() < 2.0));
    }

    #[test]
    fn mix_fades_in_over_a_frame() {
        let mut chorus = Chorus::new(48_000.0);
        chorus.set(&params(0.0));
        let mut left = vec![0.5; FRAME_SIZE];
        let mut right = vec![0.5; FRAME_SIZE];
        chorus.render(&mut left, &mut right);

        // Wet is silent for the first delay period, so the dry part alone
        // shows the mix glide.
        chorus.set(&params(127.0));
        let mut left = vec![0.5; FRAME_SIZE];
        let mut right = vec![0.5; FRAME_SIZE];
        chorus.render(&mut left, &mut right);
        let mut previous = 0.5;
        for &sample in &left {
            assert!((sample - previous).abs() < 0.01, "jump to {sample} from {previous}");
            previous = sample;
        }
        assert!(left[FRAME_SIZE - 1] < 0.01);
    }
}
