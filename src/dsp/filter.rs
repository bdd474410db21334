use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::patch::params::{exp_range, selector, unit};

/*
| mode        | topology       | passes            | output                 |
| ----------- | -------------- | ----------------- | ---------------------- |
| low-pass    | state-variable | below cutoff      | low integrator         |
| band-pass   | state-variable | around cutoff     | band integrator        |
| high-pass   | state-variable | above cutoff      | in - low - q·band      |
| notch       | state-variable | outside cutoff    | low + high             |
| all-pass    | state-variable | everything, phase | low + high - q·band    |
| ladder low  | 4-pole ladder  | below cutoff      | last stage             |
| ladder high | 4-pole ladder  | above cutoff      | in - last stage        |
*/

/// Added and removed around every state update so denormals flush to zero.
pub const DENORMAL_BIAS: f32 = 1.0e-18;

/// Smallest SVF damping. Lower values ring for longer than is useful.
const MIN_DAMPING: f32 = 1.0 / 64.0;
/// Margin under the SVF stability bound `f² + 2fq < 4`.
const SVF_BOUND: f32 = 3.9;
/// Ladder feedback at full resonance.
const MAX_LADDER_FEEDBACK: f32 = 4.0;
/// Both topologies run twice per output sample.
const OVERSAMPLE: f32 = 2.0;

#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    (x + DENORMAL_BIAS) - DENORMAL_BIAS
}

/// Cutoff parameter (`0..=127`) to Hz, 20 Hz to 20.48 kHz.
#[inline]
pub fn cutoff_hz(value: f32) -> f32 {
    exp_range(value, 20.0, 20_480.0)
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FilterMode {
    Off = 0,
    LowPass = 1,
    BandPass = 2,
    HighPass = 3,
    Notch = 4,
    AllPass = 5,
    LadderLow = 6,
    LadderHigh = 7,
}

impl FilterMode {
    pub const COUNT: usize = 8;

    pub fn from_param(value: f32) -> Self {
        use FilterMode::*;
        match selector(value, Self::COUNT) {
            0 => Off,
            1 => LowPass,
            2 => BandPass,
            3 => HighPass,
            4 => Notch,
            5 => AllPass,
            6 => LadderLow,
            _ => LadderHigh,
        }
    }

    fn is_ladder(self) -> bool {
        matches!(self, FilterMode::LadderLow | FilterMode::LadderHigh)
    }
}

/// How a voice combines its two filters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FilterRouting {
    /// Only the first filter is used.
    Single = 0,
    /// Filter 1 feeds filter 2.
    Serial = 1,
    /// Both filters see the same input; outputs are mixed by two gains.
    Parallel = 2,
}

impl FilterRouting {
    pub fn from_param(value: f32) -> Self {
        match selector(value, 3) {
            0 => FilterRouting::Single,
            1 => FilterRouting::Serial,
            _ => FilterRouting::Parallel,
        }
    }
}

/// Every response of the state-variable filter from one update.
#[derive(Debug, Clone, Copy)]
pub struct SvfOutputs {
    pub low: f32,
    pub band: f32,
    pub high: f32,
    pub notch: f32,
    pub all: f32,
}

/// Chamberlin state-variable filter, oversampled 2x.
///
/// The update matrix has determinant `1 - fq` and trace `2 - f² - fq`, so it
/// is stable while `fq < 2` and `f² + 2fq < 4`. `set` clamps `f` under that
/// bound for the current damping.
#[derive(Debug, Clone, Copy)]
pub struct StateVariable {
    low: f32,
    band: f32,
    f: f32,
    q: f32,
}

impl StateVariable {
    pub fn new() -> Self {
        Self {
            low: 0.0,
            band: 0.0,
            f: 0.1,
            q: 1.0,
        }
    }

    /// `resonance` in `0..=1`.
    pub fn set(&mut self, cutoff_hz: f32, resonance: f32, sample_rate: f32) {
        let q = (2.0 * (1.0 - resonance.clamp(0.0, 1.0))).max(MIN_DAMPING);
        let nyquist = 0.5 * sample_rate;
        let cutoff = cutoff_hz.clamp(1.0, nyquist);
        let f = 2.0 * (PI * cutoff / (OVERSAMPLE * sample_rate)).sin();
        let f_max = (q * q + SVF_BOUND).sqrt() - q;

        self.q = q;
        self.f = f.clamp(0.0, f_max);
    }

    #[inline]
    fn step(&mut self, input: f32) -> f32 {
        self.low += self.f * self.band;
        let high = input - self.low - self.q * self.band;
        self.band += self.f * high;
        high
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> SvfOutputs {
        self.step(input);
        let high = self.step(input);

        self.low = flush_denormal(self.low);
        self.band = flush_denormal(self.band);

        let low = self.low;
        let band = self.band;
        SvfOutputs {
            low,
            band,
            high,
            notch: low + high,
            all: low + high - self.q * band,
        }
    }

    pub fn reset(&mut self) {
        self.low = 0.0;
        self.band = 0.0;
    }
}

impl Default for StateVariable {
    fn default() -> Self {
        Self::new()
    }
}

/// Cubic soft clip: unity slope at zero, saturating at ±2/3.
#[inline]
pub fn cubic_clip(x: f32) -> f32 {
    let x = x.clamp(-1.0, 1.0);
    x - x * x * x / 3.0
}

/// Four cascaded one-pole low-passes with saturated feedback from the last
/// stage, oversampled 2x.
///
/// Each stage moves towards its input by `g ∈ [0, 1]`, so it never leaves the
/// range spanned by its own state and its input. The feedback term is bounded
/// by the clip, which bounds the whole structure.
#[derive(Debug, Clone, Copy)]
pub struct Ladder {
    stages: [f32; 4],
    g: f32,
    k: f32,
}

impl Ladder {
    pub fn new() -> Self {
        Self {
            stages: [0.0; 4],
            g: 0.1,
            k: 0.0,
        }
    }

    pub fn set(&mut self, cutoff_hz: f32, resonance: f32, sample_rate: f32) {
        let cutoff = cutoff_hz.clamp(1.0, 0.5 * sample_rate);
        let g = 1.0 - (-2.0 * PI * cutoff / (OVERSAMPLE * sample_rate)).exp();
        self.g = g.clamp(0.0, 1.0);
        self.k = (resonance * MAX_LADDER_FEEDBACK).clamp(0.0, MAX_LADDER_FEEDBACK);
    }

    /// Returns `(low, high)`.
    #[inline]
    pub fn process(&mut self, input: f32) -> (f32, f32) {
        for _ in 0..2 {
            let x = input - self.k * cubic_clip(self.stages[3]);
            self.stages[0] += self.g * (x - self.stages[0]);
            self.stages[1] += self.g * (self.stages[0] - self.stages[1]);
            self.stages[2] += self.g * (self.stages[1] - self.stages[2]);
            self.stages[3] += self.g * (self.stages[2] - self.stages[3]);
        }
        for stage in &mut self.stages {
            *stage = flush_denormal(*stage);
        }

        let low = self.stages[3];
        (low, input - low)
    }

    pub fn reset(&mut self) {
        self.stages = [0.0; 4];
    }
}

impl Default for Ladder {
    fn default() -> Self {
        Self::new()
    }
}

/// One voice filter slot: a mode plus the state of both topologies.
#[derive(Debug, Clone)]
pub struct Filter {
    mode: FilterMode,
    svf: StateVariable,
    ladder: Ladder,
    sample_rate: f32,
}

impl Filter {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            mode: FilterMode::Off,
            svf: StateVariable::new(),
            ladder: Ladder::new(),
            sample_rate,
        }
    }

    /// Recompute coefficients. Called once per control frame.
    pub fn set(&mut self, mode: FilterMode, cutoff_hz: f32, resonance: f32) {
        if mode.is_ladder() != self.mode.is_ladder() {
            self.reset();
        }
        self.mode = mode;
        match mode {
            FilterMode::Off => {}
            FilterMode::LadderLow | FilterMode::LadderHigh => {
                self.ladder.set(cutoff_hz, resonance, self.sample_rate)
            }
            _ => self.svf.set(cutoff_hz, resonance, self.sample_rate),
        }
    }

    /// Set from raw parameter values (`0..=127`).
    pub fn set_params(&mut self, mode: f32, cutoff: f32, resonance: f32) {
        self.set(
            FilterMode::from_param(mode),
            cutoff_hz(cutoff),
            unit(resonance),
        );
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        match self.mode {
            FilterMode::Off => input,
            FilterMode::LowPass => self.svf.process(input).low,
            FilterMode::BandPass => self.svf.process(input).band,
            FilterMode::HighPass => self.svf.process(input).high,
            FilterMode::Notch => self.svf.process(input).notch,
            FilterMode::AllPass => self.svf.process(input).all,
            FilterMode::LadderLow => self.ladder.process(input).0,
            FilterMode::LadderHigh => self.ladder.process(input).1,
        }
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        if self.mode == FilterMode::Off {
            return;
        }
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn reset(&mut self) {
        self.svf.reset();
        self.ladder.reset();
    }
}

/// One-pole DC blocker: `y[n] = x[n] - x[n-1] + r·y[n-1]`.
#[derive(Debug, Clone, Copy)]
pub struct DcBlocker {
    x1: f32,
    y1: f32,
    r: f32,
}

impl DcBlocker {
    pub fn new(sample_rate: f32) -> Self {
        // ~10 Hz corner
        let r = 1.0 - (2.0 * PI * 10.0 / sample_rate);
        Self {
            x1: 0.0,
            y1: 0.0,
            r: r.clamp(0.9, 0.99999),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let y = input - self.x1 + self.r * self.y1;
        self.x1 = input;
        self.y1 = flush_denormal(y);
        self.y1
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}
