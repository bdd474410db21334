//! Linear parameter smoothing across a control frame.

/*
Control-Rate to Audio-Rate
==========================

Envelopes, LFOs and the modulation matrix update once per control frame.
Multiplying audio by a value that jumps once every 128 samples produces a
staircase, heard as zipper noise or clicks. A ramp spreads each jump over the
frame:

    value
      │            ______ target(n+1)
      │      _____/
      │_____/             ← one straight line per frame
      └─────────────────→ samples
       frame n   frame n+1

The step is chosen so the frame's last sample lands exactly on the target.
The first sample of the next frame is then `target + next_step`, so the
largest jump anywhere is one per-sample step.
*/

#[derive(Debug, Clone, Copy)]
pub struct Ramp {
    current: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl Ramp {
    pub fn new(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Aim at `target`, reaching it after `samples` calls to [`Ramp::next`].
    pub fn set_target(&mut self, target: f32, samples: usize) {
        let samples = samples.max(1);
        self.target = target;
        self.step = (target - self.current) / samples as f32;
        self.remaining = samples as u32;
    }

    /// Jump straight to `value` with no interpolation.
    pub fn snap(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.remaining = 0;
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        match self.remaining {
            0 => {}
            1 => {
                self.remaining = 0;
                self.current = self.target;
            }
            _ => {
                self.remaining -= 1;
                self.current += self.step;
            }
        }
        self.current
    }

    /// Skip the rest of the ramp.
    pub fn finish(&mut self) {
        self.snap(self.target);
    }

    pub fn value(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn is_settled(&self) -> bool {
        self.remaining == 0
    }
}

impl Default for Ramp {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaches_target_on_last_sample() {
        let mut ramp = Ramp::new(0.0);
        ramp.set_target(1.0, 4);
        let values: Vec<f32> = (0..4).map(|_| ramp.next()).collect();
        assert_eq!(values[3], 1.0);
        assert!((values[0] - 0.25).abs() < 1e-6);
        assert!(ramp.is_settled());
        assert_eq!(ramp.next(), 1.0);
    }

    #[test]
    fn frame_boundary_jump_is_one_step() {
        let mut ramp = Ramp::new(0.0);
        let targets = [0.8, 0.2, 0.9, 0.0, 0.5];
        let mut last = ramp.value();
        for &target in &targets {
            ramp.set_target(target, 128);
            let step = ramp.step().abs();
            let first = ramp.next();
            assert!(
                (first - last).abs() <= step + 1e-6,
                "jump {} exceeds step {}",
                (first - last).abs(),
                step
            );
            for _ in 1..128 {
                last = ramp.next();
            }
            assert_eq!(last, target);
        }
    }
}
