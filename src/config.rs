//! Engine construction settings.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{SynthError, SynthResult};

/// Lowest sample rate the engine accepts.
pub const MIN_SAMPLE_RATE: f32 = 8_000.0;
/// Highest sample rate the engine accepts. Delay lines are sized for it.
pub const MAX_SAMPLE_RATE: f32 = 192_000.0;

/// Settings fixed at [`crate::initialize`] time.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthConfig {
    /// Output sample rate in Hz.
    pub sample_rate: f32,
    /// Capacity of the controller -> render command queue.
    pub event_capacity: usize,
    /// Capacity of the render -> controller queue that hands back retired
    /// patches so they are freed off the audio thread.
    pub retire_capacity: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            event_capacity: 1024,
            retire_capacity: 64,
        }
    }
}

impl SynthConfig {
    pub fn with_sample_rate(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Check every field, returning the first problem found.
    pub fn validate(&self) -> SynthResult<()> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(SynthError::InvalidSampleRate(self.sample_rate));
        }
        if self.event_capacity == 0 {
            return Err(SynthError::InvalidCapacity {
                name: "event_capacity",
                value: self.event_capacity,
            });
        }
        // Each command retires at most one shared value.
        if self.retire_capacity == 0 {
            return Err(SynthError::InvalidCapacity {
                name: "retire_capacity",
                value: self.retire_capacity,
            });
        }
        Ok(())
    }
}
