//! Peak levels published from the render thread.
//!
//! Each value is an `f32` stored as bits in an `AtomicU32`. Readers may see a
//! level one frame old, which is fine for a meter, so every access is
//! `Relaxed`.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{SynthError, SynthResult};
use crate::NUM_CHANNELS;

#[derive(Debug, Default)]
pub struct StereoMeter {
    left: AtomicU32,
    right: AtomicU32,
}

impl StereoMeter {
    pub fn store(&self, left: f32, right: f32) {
        self.left.store(left.to_bits(), Ordering::Relaxed);
        self.right.store(right.to_bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> (f32, f32) {
        (
            f32::from_bits(self.left.load(Ordering::Relaxed)),
            f32::from_bits(self.right.load(Ordering::Relaxed)),
        )
    }
}

/// Every meter the engine writes, shared between both halves.
#[derive(Debug, Default)]
pub struct Meters {
    pub channels: [StereoMeter; NUM_CHANNELS],
    pub master: StereoMeter,
}

impl Meters {
    /// Held peaks of one channel.
    pub fn channel(&self, channel: u8) -> SynthResult<(f32, f32)> {
        self.channels
            .get(channel as usize)
            .map(StereoMeter::load)
            .ok_or(SynthError::InvalidChannel(channel))
    }
}

/// Peak follower: jumps up to a new peak, falls at a fixed rate otherwise.
#[derive(Debug, Clone, Copy)]
pub struct PeakHold {
    peak: [f32; 2],
    decay: f32,
}

/// Fall rate of a held peak.
const PEAK_FALL_DB_PER_SEC: f32 = 20.0;

impl PeakHold {
    /// `frame_len` samples pass between updates.
    pub fn new(sample_rate: f32, frame_len: usize) -> Self {
        let seconds = frame_len as f32 / sample_rate;
        Self {
            peak: [0.0; 2],
            decay: 10.0_f32.powf(-PEAK_FALL_DB_PER_SEC * seconds / 20.0),
        }
    }

    /// Fold one frame's peaks in and publish the held values.
    pub fn update(&mut self, left: f32, right: f32, meter: &StereoMeter) {
        for (held, new) in self.peak.iter_mut().zip([left, right]) {
            *held = new.max(*held * self.decay);
        }
        meter.store(self.peak[0], self.peak[1]);
    }

    pub fn reset(&mut self) {
        self.peak = [0.0; 2];
    }
}

/// Largest absolute sample in a buffer.
#[inline]
pub fn frame_peak(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0_f32, |peak, x| peak.max(x.abs()))
}
