use crate::dsp::filter::flush_denormal;
use crate::dsp::lfo::rate_hz;
use crate::dsp::oscillator::{sine, PHASE_SCALE};
use crate::patch::params::{bipolar, unit};

/// Circular delay buffer, allocated once at construction.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(4)],
            write_pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Sample written `delay_samples` writes ago.
    pub fn read(&self, delay_samples: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.clamp(1, len);
        self.buffer[(self.write_pos + len - delay) % len]
    }

    /// Linearly interpolated read for fractional, modulated delays.
    pub fn read_interpolated(&self, delay_samples: f32) -> f32 {
        let max = (self.buffer.len() - 1) as f32;
        let delay = delay_samples.clamp(1.0, max - 1.0);
        let whole = delay as usize;
        let frac = delay - whole as f32;
        let a = self.read(whole);
        let b = self.read(whole + 1);
        a + (b - a) * frac
    }

    pub fn next_sample(&mut self, sample: f32, delay_samples: usize) -> f32 {
        self.write(sample);
        self.read(delay_samples.max(1) + 1)
    }

    pub fn render(&mut self, buffer: &mut [f32], delay_samples: usize) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample, delay_samples);
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Parameter set shared by the channel chorus and the master delay, on the
/// `0..=127` scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModDelayParams {
    pub amount: f32,
    /// 64 is no feedback; below inverts.
    pub feedback: f32,
    pub delay_left: f32,
    pub delay_right: f32,
    pub rate: f32,
    pub depth: f32,
    /// Offset of the right modulator against the left.
    pub phase: f32,
}

impl ModDelayParams {
    pub fn from_raw(raw: &[f32]) -> Self {
        let get = |i: usize| raw.get(i).copied().unwrap_or(0.0);
        Self {
            amount: get(0),
            feedback: get(1),
            delay_left: get(2),
            delay_right: get(3),
            rate: get(4),
            depth: get(5),
            phase: get(6),
        }
    }
}

const MAX_FEEDBACK: f32 = 0.95;

/// Stereo delay whose read heads are swept by a sine.
///
/// Short delays with depth make a chorus or flanger; long delays with no
/// depth make an echo. Returns only the wet signal.
#[derive(Debug, Clone)]
pub struct ModulatedDelay {
    left: DelayLine,
    right: DelayLine,
    sample_rate: f32,
    max_delay: f32,
    max_depth: f32,
    base: [f32; 2],
    depth: f32,
    feedback: f32,
    lfo_phase: u32,
    lfo_increment: u32,
    phase_offset: u32,
}

impl ModulatedDelay {
    /// `max_delay_ms` bounds the base delay and `max_depth_ms` the sweep.
    pub fn new(sample_rate: f32, max_delay_ms: f32, max_depth_ms: f32) -> Self {
        let max_delay = max_delay_ms * sample_rate / 1000.0;
        let max_depth = max_depth_ms * sample_rate / 1000.0;
        let capacity = (max_delay + max_depth) as usize + 4;
        Self {
            left: DelayLine::new(capacity),
            right: DelayLine::new(capacity),
            sample_rate,
            max_delay,
            max_depth,
            base: [1.0; 2],
            depth: 0.0,
            feedback: 0.0,
            lfo_phase: 0,
            lfo_increment: 0,
            phase_offset: 0,
        }
    }

    pub fn set(&mut self, params: &ModDelayParams) {
        self.base = [
            (unit(params.delay_left) * self.max_delay).max(1.0),
            (unit(params.delay_right) * self.max_delay).max(1.0),
        ];
        self.depth = unit(params.depth) * self.max_depth;
        self.feedback = (bipolar(params.feedback) * MAX_FEEDBACK).clamp(-MAX_FEEDBACK, MAX_FEEDBACK);
        self.lfo_increment =
            (rate_hz(params.rate) as f64 / self.sample_rate as f64 * PHASE_SCALE) as u32;
        self.phase_offset = (unit(params.phase) as f64 * (PHASE_SCALE - 1.0)) as u32;
    }

    /// One stereo sample in, wet stereo sample out.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mod_left = 0.5 + 0.5 * sine(self.lfo_phase);
        let mod_right = 0.5 + 0.5 * sine(self.lfo_phase.wrapping_add(self.phase_offset));
        self.lfo_phase = self.lfo_phase.wrapping_add(self.lfo_increment);

        let wet_left = self
            .left
            .read_interpolated(self.base[0] + self.depth * mod_left);
        let wet_right = self
            .right
            .read_interpolated(self.base[1] + self.depth * mod_right);

        self.left.write(flush_denormal(left + wet_left * self.feedback));
        self.right.write(flush_denormal(right + wet_right * self.feedback));

        (wet_left, wet_right)
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.lfo_phase = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_line_returns_impulse_after_delay() {
        let mut line = DelayLine::new(64);
        let mut out = Vec::new();
        out.push(line.next_sample(1.0, 10));
        for _ in 0..20 {
            out.push(line.next_sample(0.0, 10));
        }
        let pos = out.iter().position(|&x| x == 1.0).unwrap();
        assert_eq!(pos, 10);
    }

    #[test]
    fn interpolated_read_blends_neighbours() {
        let mut line = DelayLine::new(16);
        line.write(1.0);
        line.write(0.0);
        // delay 1 is the 0.0, delay 2 is the 1.0
        assert!((line.read_interpolated(1.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn echo_arrives_at_base_delay() {
        let sample_rate = 48_000.0;
        let mut delay = ModulatedDelay::new(sample_rate, 1_000.0, 0.0);
        let params = ModDelayParams {
            amount: 127.0,
            feedback: 64.0,
            delay_left: 127.0 * 0.1,
            delay_right: 127.0 * 0.1,
            rate: 0.0,
            depth: 0.0,
            phase: 0.0,
        };
        delay.set(&params);
        let mut first = None;
        for n in 0..10_000 {
            let input = if n == 0 { 1.0 } else { 0.0 };
            let (l, _) = delay.process(input, input);
            if first.is_none() && l.abs() > 0.5 {
                first = Some(n);
            }
        }
        let expected = 4_800;
        let got = first.unwrap();
        assert!((got as i32 - expected).abs() <= 1, "echo at {got}");
    }

    #[test]
    fn full_feedback_stays_bounded() {
        let mut delay = ModulatedDelay::new(48_000.0, 50.0, 5.0);
        delay.set(&ModDelayParams {
            amount: 127.0,
            feedback: 127.0,
            delay_left: 20.0,
            delay_right: 30.0,
            rate: 80.0,
            depth: 127.0,
            phase: 64.0,
        });
        for n in 0..200_000 {
            let x = if n % 100 == 0 { 1.0 } else { 0.0 };
            let (l, r) = delay.process(x, x);
            assert!(l.is_finite() && l.abs() < 100.0);
            assert!(r.is_finite() && r.abs() < 100.0);
        }
    }
}
