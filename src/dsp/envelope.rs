#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{FRAME_SIZE, REFERENCE_RATE};

/*
Exponential Envelope
====================

The envelope runs once per control frame and produces a level between 0 and
128. Envelope 1 drives voice amplitude and decides when a voice is finished;
envelope 2 is free for the modulation matrix.

Vocabulary
----------

  level     Current output before amplify, 0.0 to 128.0.

  stage     Off, Attack, Decay, Sustain or Release.

  gate      Note held. Gate on enters Attack from the current level; gate
            off enters Release unless the envelope is already Off.

  frame     One control tick. Rates below are defined per frame at the
            reference rate (44.1 kHz, 128 samples) and rescaled so a patch
            sounds the same length at any sample rate.


The Shape
---------

  level
   128 ┤   ╱╲
       │  ╱  ╲___________          sustain slope tilts this segment
     S ┤ ╱                ╲
       │╱                   ╲___
     0 └──────────────────────────→ frames
        A    D      S        R

Attack is linear, everything else is exponential:

    Attack   level += 2^(7 - 11·a/127)              until 128
    Decay    level *= 1 - 2^(-10·d/127)             until 128·s/127
    Sustain  level *= 2^((slope - 64) / 4096)       capped at 128
    Release  level *= 1 - 2^(-10·r/127)

A parameter of 0 makes its stage instant at every sample rate: a
full-scale attack step is never scaled down by the frame rate. Once the level drops under
128·2^-20 (about -120 dB) the envelope turns Off and the voice can be freed.
*/

/// Level below which the envelope is considered finished.
pub const OFF_THRESHOLD: f32 = 128.0 / 1_048_576.0;
pub const MAX_LEVEL: f32 = 128.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Off,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Envelope settings for one frame, on the `0..=127` parameter scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub sustain_slope: f32,
    pub release: f32,
    pub amplify: f32,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            attack: 0.0,
            decay: 64.0,
            sustain: 127.0,
            sustain_slope: 64.0,
            release: 64.0,
            amplify: 127.0,
        }
    }
}

#[inline]
fn attack_step(attack: f32) -> f32 {
    (7.0 - 11.0 * attack / 127.0).exp2()
}

#[inline]
fn falloff(value: f32) -> f32 {
    1.0 - (-10.0 * value / 127.0).exp2()
}

/// Seconds for a release to fall by `drop_db`, independent of sample rate.
pub fn release_time(release: f32, drop_db: f32) -> f32 {
    let factor = falloff(release.clamp(0.0, 127.0));
    if factor <= 0.0 {
        return FRAME_SIZE as f32 / REFERENCE_RATE;
    }
    let frames = (-drop_db / 20.0 * std::f32::consts::LN_10) / factor.ln();
    frames.max(1.0) * FRAME_SIZE as f32 / REFERENCE_RATE
}

#[derive(Debug, Clone)]
pub struct Envelope {
    stage: EnvelopeStage,
    level: f32,
    /// Reference frames covered by one actual frame.
    frame_scale: f32,
}

impl Envelope {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            stage: EnvelopeStage::Off,
            level: 0.0,
            frame_scale: REFERENCE_RATE / sample_rate,
        }
    }

    pub fn gate(&mut self, on: bool) {
        if on {
            self.stage = EnvelopeStage::Attack;
        } else if self.stage != EnvelopeStage::Off {
            self.stage = EnvelopeStage::Release;
        }
    }

    /// Drop the level to zero without changing the stage.
    pub fn reset_level(&mut self) {
        self.level = 0.0;
    }

    /// Silence immediately.
    pub fn kill(&mut self) {
        self.stage = EnvelopeStage::Off;
        self.level = 0.0;
    }

    /// Advance one control frame and return `level * amplify / 127`.
    pub fn tick(&mut self, params: &EnvelopeParams) -> f32 {
        let scale = self.frame_scale;

        match self.stage {
            EnvelopeStage::Off => self.level = 0.0,
            EnvelopeStage::Attack => {
                let step = attack_step(params.attack);
                self.level += if step >= MAX_LEVEL { step } else { step * scale };
                if self.level >= MAX_LEVEL {
                    self.level = MAX_LEVEL;
                    self.stage = EnvelopeStage::Decay;
                }
            }
            EnvelopeStage::Decay => {
                let sustain = MAX_LEVEL * params.sustain.clamp(0.0, 127.0) / 127.0;
                self.level *= falloff(params.decay).powf(scale);
                if self.level <= sustain {
                    self.level = sustain;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => {
                let slope = ((params.sustain_slope - 64.0) / 4096.0).exp2();
                self.level = (self.level * slope.powf(scale)).min(MAX_LEVEL);
            }
            EnvelopeStage::Release => {
                self.level *= falloff(params.release).powf(scale);
            }
        }

        if self.stage != EnvelopeStage::Attack && self.level < OFF_THRESHOLD {
            self.stage = EnvelopeStage::Off;
            self.level = 0.0;
        }

        self.level * params.amplify.clamp(0.0, 127.0) / 127.0
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Off
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(attack: f32, decay: f32, sustain: f32, release: f32) -> EnvelopeParams {
        EnvelopeParams {
            attack,
            decay,
            sustain,
            sustain_slope: 64.0,
            release,
            amplify: 127.0,
        }
    }

    #[test]
    fn starts_off_and_silent() {
        let mut env = Envelope::new(48_000.0);
        assert_eq!(env.stage(), EnvelopeStage::Off);
        assert_eq!(env.tick(&EnvelopeParams::default()), 0.0);
    }

    #[test]
    fn zero_attack_peaks_in_one_frame() {
        let mut env = Envelope::new(REFERENCE_RATE);
        env.gate(true);
        let out = env.tick(&params(0.0, 64.0, 64.0, 64.0));
        assert_eq!(out, MAX_LEVEL);
        assert_eq!(env.stage(), EnvelopeStage::Decay);
    }

    #[test]
    fn zero_attack_peaks_in_one_frame_at_high_rates() {
        for rate in [48_000.0, 96_000.0, 192_000.0] {
            let mut env = Envelope::new(rate);
            env.gate(true);
            assert_eq!(env.tick(&params(0.0, 64.0, 64.0, 64.0)), MAX_LEVEL, "at {rate} Hz");
            assert_eq!(env.stage(), EnvelopeStage::Decay);
        }
    }

    #[test]
    fn stages_are_monotonic_and_bounded() {
        let p = params(60.0, 70.0, 80.0, 70.0);
        let mut env = Envelope::new(48_000.0);
        env.gate(true);

        let mut last = 0.0;
        while env.stage() == EnvelopeStage::Attack {
            let level = env.tick(&p);
            assert!(level >= last && level <= MAX_LEVEL);
            last = level;
        }
        while env.stage() == EnvelopeStage::Decay {
            let level = env.tick(&p);
            assert!(level <= last && level >= 0.0);
            last = level;
        }
        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((last - 128.0 * 80.0 / 127.0).abs() < 1e-3);

        env.gate(false);
        while env.is_active() {
            let level = env.tick(&p);
            assert!(level <= last && level >= 0.0);
            last = level;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn release_starts_from_current_level() {
        let p = params(100.0, 64.0, 127.0, 64.0);
        let mut env = Envelope::new(48_000.0);
        env.gate(true);
        for _ in 0..10 {
            env.tick(&p);
        }
        let before = env.level();
        assert!(before > 0.0 && before < MAX_LEVEL);
        env.gate(false);
        let after = env.tick(&p);
        assert!(after < before);
    }

    #[test]
    fn gate_off_while_off_stays_off() {
        let mut env = Envelope::new(48_000.0);
        env.gate(false);
        assert_eq!(env.stage(), EnvelopeStage::Off);
    }

    #[test]
    fn sustain_slope_grows_capped() {
        let mut p = params(0.0, 0.0, 64.0, 64.0);
        p.sustain_slope = 127.0;
        let mut env = Envelope::new(48_000.0);
        env.gate(true);
        for _ in 0..2_000 {
            assert!(env.tick(&p) <= MAX_LEVEL);
        }
        assert_eq!(env.level(), MAX_LEVEL);
    }

    #[test]
    fn release_length_is_sample_rate_independent() {
        let p = params(0.0, 0.0, 127.0, 80.0);
        let frames_to_off = |rate: f32| {
            let mut env = Envelope::new(rate);
            env.gate(true);
            env.tick(&p);
            env.gate(false);
            let mut frames = 0;
            while env.is_active() {
                env.tick(&p);
                frames += 1;
            }
            frames as f32 * FRAME_SIZE as f32 / rate
        };
        let slow = frames_to_off(22_050.0);
        let fast = frames_to_off(96_000.0);
        assert!((slow - fast).abs() < 0.02, "slow={slow}, fast={fast}");
    }

    #[test]
    fn release_time_matches_ticks() {
        let p = params(0.0, 0.0, 127.0, 70.0);
        let mut env = Envelope::new(REFERENCE_RATE);
        env.gate(true);
        env.tick(&p);
        env.gate(false);
        let mut frames = 0;
        while env.tick(&p) > MAX_LEVEL * 1.0e-3 {
            frames += 1;
        }
        let expected = release_time(70.0, 60.0) * REFERENCE_RATE / FRAME_SIZE as f32;
        assert!((frames as f32 - expected).abs() <= 1.5);
    }
}
