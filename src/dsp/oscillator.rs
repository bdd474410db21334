//! Per-voice oscillators over a 32-bit phase accumulator.

use std::f32::consts::FRAC_PI_2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::filter::StateVariable;
use crate::dsp::ramp::Ramp;
use crate::patch::params::selector;

/*
Phase Accumulator
=================

The phase of every oscillator is a `u32` covering one cycle: 0 is the start
of the cycle and 2^32 wraps back to it. Each sample adds an increment with
wrapping arithmetic, so after N samples the phase is exactly
`start + N * increment (mod 2^32)`. No rounding error builds up, no matter
how long a note is held.

    increment = 440 / sample_rate * 2^32 * 2^((note - 69) / 12)

The increment is capped just below half a cycle (Nyquist).

Box Filtering
=============

A naive saw or pulse samples a discontinuous function and aliases badly. The
triangle/saw and pulse modes instead output the exact AVERAGE of the ideal
waveform over the interval one sample covers. The interval starts at phase p
and ends at p + inc, and the waveform has two pieces per cycle split at a
breakpoint b:

    +1 ┤    /\                 +1 ┤ ┌──┐
       │   /  \                   │ │  │
    -1 ┤  /    \___            -1 ┤─┘  └───
       0    b    1                0  b    1
        tri / saw                   pulse

The interval can touch one, two or three pieces depending on where it starts
and whether it wraps, so each sample is classified into a span state and the
closed-form integral of each touched piece is summed.
*/

/// One full cycle as a float.
pub const PHASE_SCALE: f64 = 4_294_967_296.0;
/// Largest increment: just under half a cycle per sample.
pub const MAX_INCREMENT: u32 = 0x7FFF_FFFF;

const PHASE_TO_UNIT: f32 = 1.0 / 4_294_967_296.0;
/// Keeps box-filter breakpoints off the cycle edges.
const MIN_BREAKPOINT: f32 = 1.0 / 1024.0;
/// Narrowest averaging window, for near-zero increments.
const MIN_BOX_WIDTH: f32 = 1.0e-6;
const NOISE_RESONANCE: f32 = 0.25;
/// Largest FM index, in cycles per unit of input.
const MAX_FM_DEPTH: f32 = 2.0;
/// FM input is clamped to this magnitude before scaling.
const MAX_FM_INPUT: f32 = 4.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OscMode {
    Off = 0,
    /// Triangle through saw; color moves the peak.
    TriSaw = 1,
    /// Color sets the duty cycle.
    Pulse = 2,
    Sine = 3,
    /// Filtered white noise; color blends low-pass to high-pass.
    Noise = 4,
    /// Sine phase-modulated by whatever is already in the voice buffer.
    FmSine = 5,
    /// Previous frame of aux bus A.
    AuxA = 6,
    /// Previous frame of aux bus B.
    AuxB = 7,
}

impl OscMode {
    pub const COUNT: usize = 8;

    pub fn from_param(value: f32) -> Self {
        use OscMode::*;
        match selector(value, Self::COUNT) {
            0 => Off,
            1 => TriSaw,
            2 => Pulse,
            3 => Sine,
            4 => Noise,
            5 => FmSine,
            6 => AuxA,
            _ => AuxB,
        }
    }
}

/// Mono views of the aux buses as they were one control frame ago.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuxInput<'a> {
    pub a: &'a [f32],
    pub b: &'a [f32],
}

/// Phase increment for a pitch `offset` semitones from the reference note.
pub fn pitch_increment(offset: f32, sample_rate: f32) -> u32 {
    let base = 440.0 / sample_rate as f64 * PHASE_SCALE;
    let increment = base * (offset as f64 / 12.0).exp2();
    if increment.is_nan() || increment <= 0.0 {
        return 0;
    }
    increment.min(MAX_INCREMENT as f64) as u32
}

/// Frequency in Hz of a phase increment.
#[inline]
pub fn increment_to_hz(increment: u32, sample_rate: f32) -> f32 {
    increment as f32 * PHASE_TO_UNIT * sample_rate
}

/// Sine of a full-cycle phase, from a quarter-wave polynomial.
#[inline]
pub fn sine(phase: u32) -> f32 {
    let quadrant = phase >> 30;
    let fraction = (phase & 0x3FFF_FFFF) as f32 / (1u32 << 30) as f32;
    let t = if quadrant & 1 == 0 { fraction } else { 1.0 - fraction };

    let x = t * FRAC_PI_2;
    let x2 = x * x;
    let s = x
        * (1.0
            + x2 * (-1.0 / 6.0
                + x2 * (1.0 / 120.0 + x2 * (-1.0 / 5040.0 + x2 * (1.0 / 362_880.0)))));

    if quadrant >= 2 {
        -s
    } else {
        s
    }
}

/// Which pieces of a two-piece cycle one sample interval touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    Rising,
    Falling,
    RisingFalling,
    FallingRising,
    RisingFallingRising,
    FallingRisingFalling,
}

impl Span {
    /// `start` in `[0, 1)`, `end = start + width` with `width < 0.5`.
    fn classify(start: f32, end: f32, breakpoint: f32) -> Self {
        if start < breakpoint {
            if end <= breakpoint {
                Span::Rising
            } else if end <= 1.0 {
                Span::RisingFalling
            } else {
                Span::RisingFallingRising
            }
        } else if end <= 1.0 {
            Span::Falling
        } else if end - 1.0 <= breakpoint {
            Span::FallingRising
        } else {
            Span::FallingRisingFalling
        }
    }
}

/// Average of a two-piece waveform over `[start, start + width]`.
///
/// `first(a, c)` integrates the piece before the breakpoint over `[a, c]`,
/// `second(a, c)` the piece after it.
#[inline]
fn box_average<F, S>(start: f32, width: f32, breakpoint: f32, first: F, second: S) -> f32
where
    F: Fn(f32, f32) -> f32,
    S: Fn(f32, f32) -> f32,
{
    let end = start + width;
    let sum = match Span::classify(start, end, breakpoint) {
        Span::Rising => first(start, end),
        Span::RisingFalling => first(start, breakpoint) + second(breakpoint, end),
        Span::RisingFallingRising => {
            first(start, breakpoint) + second(breakpoint, 1.0) + first(0.0, end - 1.0)
        }
        Span::Falling => second(start, end),
        Span::FallingRising => second(start, 1.0) + first(0.0, end - 1.0),
        Span::FallingRisingFalling => {
            second(start, 1.0) + first(0.0, breakpoint) + second(breakpoint, end - 1.0)
        }
    };
    sum / width
}

/// Box-filtered triangle/saw: -1 at phase 0, +1 at the breakpoint.
#[inline]
pub fn tri_saw(start: f32, width: f32, breakpoint: f32) -> f32 {
    let b = breakpoint;
    box_average(
        start,
        width,
        b,
        |a, c| (c - a) * (-1.0 + (c + a) / b),
        |a, c| (c - a) * (1.0 - ((c - b) + (a - b)) / (1.0 - b)),
    )
}

/// Box-filtered pulse: +1 before the duty point, -1 after.
#[inline]
pub fn pulse(start: f32, width: f32, duty: f32) -> f32 {
    box_average(start, width, duty, |a, c| c - a, |a, c| a - c)
}

#[inline]
fn breakpoint(color: f32) -> f32 {
    color.clamp(MIN_BREAKPOINT, 1.0 - MIN_BREAKPOINT)
}

#[derive(Debug, Clone)]
pub struct Oscillator {
    mode: OscMode,
    ring: bool,
    phase: u32,
    increment: u32,
    /// `0..=1`.
    color: f32,
    gain: Ramp,
    noise_seed: u32,
    noise_filter: StateVariable,
    sample_rate: f32,
}

impl Oscillator {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            mode: OscMode::Off,
            ring: false,
            phase: 0,
            increment: 0,
            color: 0.5,
            gain: Ramp::new(0.0),
            noise_seed: 0x1234_5678,
            noise_filter: StateVariable::new(),
            sample_rate,
        }
    }

    /// Give each oscillator its own noise sequence.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.noise_seed = seed.max(1);
        self
    }

    /// Control-frame update. `pitch` is in semitones from the reference
    /// note; `color` and `gain` are in `0..=1`.
    pub fn set(
        &mut self,
        mode: OscMode,
        ring: bool,
        pitch: f32,
        color: f32,
        gain: f32,
        frame_len: usize,
    ) {
        self.mode = mode;
        self.ring = ring;
        self.increment = pitch_increment(pitch, self.sample_rate);
        self.color = color.clamp(0.0, 1.0);
        self.gain.set_target(gain, frame_len);

        if mode == OscMode::Noise {
            let cutoff = increment_to_hz(self.increment, self.sample_rate);
            self.noise_filter
                .set(cutoff, NOISE_RESONANCE, self.sample_rate);
        }
    }

    /// Restart the cycle.
    pub fn reset_phase(&mut self) {
        self.phase = 0;
    }

    pub fn reset(&mut self) {
        self.phase = 0;
        self.noise_filter.reset();
        self.gain.finish();
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn increment(&self) -> u32 {
        self.increment
    }

    pub fn mode(&self) -> OscMode {
        self.mode
    }

    #[inline]
    fn next_noise(&mut self) -> f32 {
        let mut x = self.noise_seed;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_seed = x;
        (x as i32) as f32 * (1.0 / 2_147_483_648.0)
    }

    /// Add this oscillator into `buffer`, or multiply into it when the ring
    /// flag is set. Off does nothing.
    pub fn render(&mut self, buffer: &mut [f32], aux: AuxInput<'_>) {
        match self.mode {
            OscMode::Off => self.gain.finish(),
            OscMode::TriSaw => {
                let b = breakpoint(self.color);
                self.render_phased(buffer, |start, width| tri_saw(start, width, b));
            }
            OscMode::Pulse => {
                let duty = breakpoint(self.color);
                self.render_phased(buffer, |start, width| pulse(start, width, duty));
            }
            OscMode::Sine => {
                for sample in buffer.iter_mut() {
                    let value = sine(self.phase);
                    self.phase = self.phase.wrapping_add(self.increment);
                    let gain = self.gain.next();
                    *sample = mix(*sample, value * gain, self.ring);
                }
            }
            OscMode::Noise => {
                let color = self.color;
                for sample in buffer.iter_mut() {
                    let white = self.next_noise();
                    let out = self.noise_filter.process(white);
                    let value = if color < 0.5 {
                        let t = color * 2.0;
                        out.low + (out.band - out.low) * t
                    } else {
                        let t = color * 2.0 - 1.0;
                        out.band + (out.high - out.band) * t
                    };
                    let gain = self.gain.next();
                    *sample = mix(*sample, value * gain, self.ring);
                }
            }
            OscMode::FmSine => {
                let depth = self.color * MAX_FM_DEPTH * PHASE_SCALE as f32;
                for sample in buffer.iter_mut() {
                    let input = sample.clamp(-MAX_FM_INPUT, MAX_FM_INPUT);
                    let offset = (input * depth) as i64 as u32;
                    let value = sine(self.phase.wrapping_add(offset));
                    self.phase = self.phase.wrapping_add(self.increment);
                    let gain = self.gain.next();
                    *sample = mix(*sample, value * gain, self.ring);
                }
            }
            OscMode::AuxA => self.render_aux(buffer, aux.a),
            OscMode::AuxB => self.render_aux(buffer, aux.b),
        }
    }

    #[inline]
    fn render_phased<W>(&mut self, buffer: &mut [f32], waveform: W)
    where
        W: Fn(f32, f32) -> f32,
    {
        let width = (self.increment as f32 * PHASE_TO_UNIT).max(MIN_BOX_WIDTH);
        for sample in buffer.iter_mut() {
            let start = self.phase as f32 * PHASE_TO_UNIT;
            // f32 rounding can land exactly on 1.0 for phases near the wrap.
            let start = if start >= 1.0 { 0.0 } else { start };
            let value = waveform(start, width);
            self.phase = self.phase.wrapping_add(self.increment);
            let gain = self.gain.next();
            *sample = mix(*sample, value * gain, self.ring);
        }
    }

    fn render_aux(&mut self, buffer: &mut [f32], source: &[f32]) {
        for (i, sample) in buffer.iter_mut().enumerate() {
            let value = source.get(i).copied().unwrap_or(0.0);
            let gain = self.gain.next();
            *sample = mix(*sample, value * gain, self.ring);
        }
    }
}

#[inline]
fn mix(existing: f32, value: f32, ring: bool) -> f32 {
    if ring {
        existing * value
    } else {
        existing + value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn rendered(mode: OscMode, pitch: f32, color: f32, len: usize) -> Vec<f32> {
        let mut osc = Oscillator::new(SAMPLE_RATE);
        osc.set(mode, false, pitch, color, 1.0, 1);
        let mut buffer = vec![0.0; len];
        osc.render(&mut buffer, AuxInput::default());
        buffer
    }

    #[test]
    fn reference_note_is_440() {
        let inc = pitch_increment(0.0, SAMPLE_RATE);
        assert!((increment_to_hz(inc, SAMPLE_RATE) - 440.0).abs() < 0.01);
        let octave = pitch_increment(12.0, SAMPLE_RATE);
        assert!((octave as i64 - 2 * inc as i64).abs() <= 2);
    }

    #[test]
    fn increment_is_clamped_to_nyquist() {
        assert_eq!(pitch_increment(400.0, SAMPLE_RATE), MAX_INCREMENT);
        assert_eq!(pitch_increment(f32::NAN, SAMPLE_RATE), 0);
    }

    #[test]
    fn phase_is_exact_after_many_samples() {
        let mut osc = Oscillator::new(SAMPLE_RATE);
        osc.set(OscMode::Sine, false, 7.3, 0.5, 1.0, 1);
        let increment = osc.increment();
        let mut buffer = vec![0.0; 128];
        let frames = 10_000u32;
        for _ in 0..frames {
            osc.render(&mut buffer, AuxInput::default());
        }
        let expected = increment.wrapping_mul(128 * frames);
        assert_eq!(osc.phase(), expected);
    }

    #[test]
    fn sine_matches_std() {
        for i in 0..1024u32 {
            let phase = i.wrapping_mul(4_194_304);
            let expected = (phase as f64 / PHASE_SCALE * std::f64::consts::TAU).sin() as f32;
            assert!((sine(phase) - expected).abs() < 1e-4, "phase {phase}");
        }
    }

    #[test]
    fn span_classification_covers_wraps() {
        assert_eq!(Span::classify(0.1, 0.2, 0.5), Span::Rising);
        assert_eq!(Span::classify(0.4, 0.6, 0.5), Span::RisingFalling);
        assert_eq!(Span::classify(0.8, 1.1, 0.9), Span::RisingFallingRising);
        assert_eq!(Span::classify(0.6, 0.7, 0.5), Span::Falling);
        assert_eq!(Span::classify(0.9, 1.05, 0.5), Span::FallingRising);
        assert_eq!(Span::classify(0.9, 1.2, 0.1), Span::FallingRisingFalling);
    }

    #[test]
    fn box_filter_matches_midpoint_on_linear_pieces() {
        // Entirely on the rising piece the average equals the midpoint value.
        let avg = tri_saw(0.1, 0.1, 0.5);
        let mid = -1.0 + 2.0 * 0.15 / 0.5;
        assert!((avg - mid).abs() < 1e-5);

        // Across the peak of a triangle the average is below the peak.
        let peak = tri_saw(0.45, 0.1, 0.5);
        assert!(peak < 1.0 && peak > 0.7);
    }

    #[test]
    fn pulse_average_tracks_duty() {
        let buffer = rendered(OscMode::Pulse, -12.0, 0.25, 48_000);
        let mean: f32 = buffer.iter().sum::<f32>() / buffer.len() as f32;
        assert!((mean + 0.5).abs() < 0.01, "mean {mean}");
    }

    #[test]
    fn saw_has_no_dc_and_stays_bounded() {
        let buffer = rendered(OscMode::TriSaw, 24.0, 1.0, 48_000);
        let mean: f32 = buffer.iter().sum::<f32>() / buffer.len() as f32;
        assert!(mean.abs() < 0.01, "mean {mean}");
        assert!(buffer.iter().all(|x| x.abs() <= 1.0 + 1e-4));
    }

    #[test]
    fn noise_is_bounded_and_not_silent() {
        let buffer = rendered(OscMode::Noise, 24.0, 0.5, 4_800);
        let energy: f32 = buffer.iter().map(|x| x * x).sum();
        assert!(energy > 0.0);
        assert!(buffer.iter().all(|x| x.is_finite() && x.abs() < 16.0));
    }

    #[test]
    fn ring_multiplies_existing_signal() {
        let mut osc = Oscillator::new(SAMPLE_RATE);
        osc.set(OscMode::Sine, true, 0.0, 0.5, 1.0, 1);
        let mut buffer = vec![0.0; 64];
        osc.render(&mut buffer, AuxInput::default());
        assert!(buffer.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn off_leaves_buffer_untouched() {
        let mut osc = Oscillator::new(SAMPLE_RATE);
        osc.set(OscMode::Off, false, 0.0, 0.5, 1.0, 1);
        let mut buffer = vec![0.25; 64];
        osc.render(&mut buffer, AuxInput::default());
        assert!(buffer.iter().all(|&x| x == 0.25));
        assert_eq!(osc.phase(), 0);
    }

    #[test]
    fn fm_changes_the_waveform() {
        let plain = rendered(OscMode::FmSine, 0.0, 1.0, 256);

        let mut osc = Oscillator::new(SAMPLE_RATE);
        osc.set(OscMode::FmSine, false, 0.0, 1.0, 1.0, 1);
        let mut buffer: Vec<f32> = (0..256).map(|i| (i as f32 * 0.05).sin()).collect();
        let carrier_input = buffer.clone();
        osc.render(&mut buffer, AuxInput::default());

        let differs = buffer
            .iter()
            .zip(&carrier_input)
            .zip(&plain)
            .any(|((out, input), plain)| (out - input - plain).abs() > 1e-3);
        assert!(differs);
    }

    #[test]
    fn aux_modes_read_their_bus() {
        let a = vec![0.5; 32];
        let b = vec![-0.25; 32];
        let mut osc = Oscillator::new(SAMPLE_RATE);
        osc.set(OscMode::AuxB, false, 0.0, 0.5, 1.0, 1);
        let mut buffer = vec![0.0; 32];
        osc.render(&mut buffer, AuxInput { a: &a, b: &b });
        assert!(buffer.iter().all(|&x| (x + 0.25).abs() < 1e-6));
    }
}
