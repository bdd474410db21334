//! Control-rate low frequency oscillator.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::{sine, PHASE_SCALE};
use crate::patch::params::{selector, switch, unit};
use crate::FRAME_SIZE;

/*
Low Frequency Oscillators
=========================

An LFO is an oscillator running below the audio range. Here it ticks once per
control frame rather than once per sample, and its output feeds the
modulation matrix, never the audio path directly.

Vocabulary
----------

  rate        0.01 Hz at 0, doubling every 127/14 steps, ~164 Hz at 127.

  keysync     Restart from the start phase on every note-on. Without it the
              LFO free-runs across notes.

  one-shot    Run a single cycle and then hold the final value. Useful as an
              extra envelope.

  polarity    Positive [0, 1], negative [-1, 0] or bipolar [-1, 1].

  amplify     Scales the output; the result is multiplied by 128 so a full
              LFO covers the whole parameter range.


Shapes (positive polarity)
--------------------------

    saw        ╱│╱│     triangle  ╱╲╱╲     pulse  ┌┐┌┐
                                                  ┘└┘└
    sine       ∿∿       s&h       new random value each cycle
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LfoWaveform {
    Saw = 0,
    Triangle = 1,
    Pulse = 2,
    Sine = 3,
    SampleHold = 4,
}

impl LfoWaveform {
    pub const COUNT: usize = 5;

    pub fn from_param(value: f32) -> Self {
        match selector(value, Self::COUNT) {
            0 => LfoWaveform::Saw,
            1 => LfoWaveform::Triangle,
            2 => LfoWaveform::Pulse,
            3 => LfoWaveform::Sine,
            _ => LfoWaveform::SampleHold,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Polarity {
    Positive = 0,
    Negative = 1,
    Bipolar = 2,
}

impl Polarity {
    pub fn from_param(value: f32) -> Self {
        match selector(value, 3) {
            0 => Polarity::Positive,
            1 => Polarity::Negative,
            _ => Polarity::Bipolar,
        }
    }

    #[inline]
    pub fn apply(self, unipolar: f32) -> f32 {
        match self {
            Polarity::Positive => unipolar,
            Polarity::Negative => unipolar - 1.0,
            Polarity::Bipolar => unipolar * 2.0 - 1.0,
        }
    }
}

/// LFO settings for one frame, decoded from the `0..=127` parameter scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoParams {
    pub waveform: LfoWaveform,
    pub keysync: bool,
    pub one_shot: bool,
    pub rate: f32,
    /// Start phase, `0..=127` mapping onto one cycle.
    pub phase: f32,
    pub polarity: Polarity,
    pub amplify: f32,
}

impl LfoParams {
    pub fn from_raw(raw: &[f32]) -> Self {
        use crate::patch::params::voice::*;
        let get = |field: usize| raw.get(field).copied().unwrap_or(0.0);
        Self {
            waveform: LfoWaveform::from_param(get(LFO_WAVEFORM)),
            keysync: switch(get(LFO_KEYSYNC)),
            one_shot: switch(get(LFO_ONE_SHOT)),
            rate: get(LFO_RATE),
            phase: get(LFO_PHASE),
            polarity: Polarity::from_param(get(LFO_POLARITY)),
            amplify: get(LFO_AMPLIFY),
        }
    }
}

impl Default for LfoParams {
    fn default() -> Self {
        Self {
            waveform: LfoWaveform::Triangle,
            keysync: true,
            one_shot: false,
            rate: 64.0,
            phase: 0.0,
            polarity: Polarity::Bipolar,
            amplify: 127.0,
        }
    }
}

/// LFO rate parameter to Hz.
#[inline]
pub fn rate_hz(value: f32) -> f32 {
    0.01 * (14.0 * value.clamp(0.0, 127.0) / 127.0).exp2()
}

#[derive(Debug, Clone)]
pub struct Lfo {
    phase: u32,
    held: f32,
    seed: u32,
    finished: bool,
    frames_per_second: f32,
}

impl Lfo {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0,
            held: 0.5,
            seed: 0x9E37_79B9,
            finished: false,
            frames_per_second: sample_rate / FRAME_SIZE as f32,
        }
    }

    /// Note-on. Restarts from the start phase when keysync is set.
    pub fn trigger(&mut self, params: &LfoParams) {
        if params.keysync {
            self.restart(params);
        }
    }

    pub fn restart(&mut self, params: &LfoParams) {
        self.phase = (unit(params.phase) as f64 * (PHASE_SCALE - 1.0)) as u32;
        self.finished = false;
        self.held = self.next_random();
    }

    fn next_random(&mut self) -> f32 {
        let mut x = self.seed;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.seed = x;
        x as f32 / u32::MAX as f32
    }

    fn shape(&self, waveform: LfoWaveform) -> f32 {
        let p = self.phase as f32 / PHASE_SCALE as f32;
        match waveform {
            LfoWaveform::Saw => p,
            LfoWaveform::Triangle => {
                if p < 0.5 {
                    2.0 * p
                } else {
                    2.0 - 2.0 * p
                }
            }
            LfoWaveform::Pulse => {
                if p < 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            LfoWaveform::Sine => 0.5 + 0.5 * sine(self.phase),
            LfoWaveform::SampleHold => self.held,
        }
    }

    /// Output for this frame, then advance one frame.
    pub fn tick(&mut self, params: &LfoParams) -> f32 {
        let value = params.polarity.apply(self.shape(params.waveform))
            * unit(params.amplify)
            * 128.0;

        if !self.finished {
            let increment = (rate_hz(params.rate) as f64 / self.frames_per_second as f64
                * PHASE_SCALE)
                .min(u32::MAX as f64) as u32;
            let (next, wrapped) = self.phase.overflowing_add(increment);
            if wrapped && params.one_shot {
                self.phase = u32::MAX;
                self.finished = true;
            } else {
                self.phase = next;
                if wrapped {
                    self.held = self.next_random();
                }
            }
        }

        value
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn params(waveform: LfoWaveform, polarity: Polarity) -> LfoParams {
        LfoParams {
            waveform,
            polarity,
            ..LfoParams::default()
        }
    }

    #[test]
    fn rate_covers_its_range() {
        assert!((rate_hz(0.0) - 0.01).abs() < 1e-6);
        assert!((rate_hz(127.0) - 163.84).abs() < 0.01);
    }

    #[test]
    fn polarity_bounds_output() {
        let cases = [
            (Polarity::Positive, 0.0, 128.0),
            (Polarity::Negative, -128.0, 0.0),
            (Polarity::Bipolar, -128.0, 128.0),
        ];
        for (polarity, min, max) in cases {
            for waveform in [
                LfoWaveform::Saw,
                LfoWaveform::Triangle,
                LfoWaveform::Pulse,
                LfoWaveform::Sine,
                LfoWaveform::SampleHold,
            ] {
                let mut p = params(waveform, polarity);
                p.rate = 100.0;
                let mut lfo = Lfo::new(SAMPLE_RATE);
                lfo.restart(&p);
                for _ in 0..2_000 {
                    let v = lfo.tick(&p);
                    assert!(v >= min - 1e-3 && v <= max + 1e-3, "{waveform:?} {v}");
                }
            }
        }
    }

    #[test]
    fn keysync_restarts_at_start_phase() {
        let mut p = params(LfoWaveform::Saw, Polarity::Positive);
        p.phase = 0.0;
        let mut lfo = Lfo::new(SAMPLE_RATE);
        for _ in 0..37 {
            lfo.tick(&p);
        }
        assert_ne!(lfo.phase(), 0);
        lfo.trigger(&p);
        assert_eq!(lfo.phase(), 0);

        p.keysync = false;
        lfo.tick(&p);
        let running = lfo.phase();
        lfo.trigger(&p);
        assert_eq!(lfo.phase(), running);
    }

    #[test]
    fn one_shot_holds_final_value() {
        let mut p = params(LfoWaveform::Saw, Polarity::Positive);
        p.one_shot = true;
        p.rate = 127.0;
        let mut lfo = Lfo::new(SAMPLE_RATE);
        lfo.restart(&p);
        for _ in 0..1_000 {
            lfo.tick(&p);
        }
        assert!(lfo.is_finished());
        let held = lfo.tick(&p);
        assert!((held - 128.0).abs() < 1e-3);
        assert_eq!(lfo.tick(&p), held);
    }

    #[test]
    fn amplify_scales_output() {
        let mut p = params(LfoWaveform::Pulse, Polarity::Positive);
        p.amplify = 0.0;
        let mut lfo = Lfo::new(SAMPLE_RATE);
        lfo.restart(&p);
        assert_eq!(lfo.tick(&p), 0.0);
    }
}
