//! Error types reported synchronously on the controller side.
//!
//! The render path has no error path at all; everything that can be rejected
//! is rejected before it reaches the audio thread.

use thiserror::Error;

/// Result type for controller operations.
pub type SynthResult<T> = Result<T, SynthError>;

/// Malformed patch or global parameter data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// Input ended before the fixed-size blocks were read.
    #[error("patch data truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    /// Input continued past the last routing record.
    #[error("patch data has {extra} trailing bytes")]
    TrailingBytes { extra: usize },

    /// A parameter byte exceeded 127.
    #[error("{block} parameter {index} out of range: {value}")]
    ParamOutOfRange {
        block: &'static str,
        index: usize,
        value: u8,
    },

    /// Polyphony limit was zero or larger than the voice pool.
    #[error("polyphony limit {limit} outside 1..={max}")]
    InvalidPolyphony { limit: u8, max: usize },

    /// Routing names a source outside the closed source set.
    #[error("routing {routing}: unknown modulation source {source_id}")]
    UnknownSource { routing: usize, source_id: u8 },

    /// Routing destination does not address a voice or channel parameter.
    #[error("routing {routing}: destination {destination} out of range (max {max})")]
    DestinationOutOfRange {
        routing: usize,
        destination: u8,
        max: usize,
    },

    /// More routings than the count byte can describe.
    #[error("{count} routings, at most {max} fit in a patch")]
    TooManyRoutings { count: usize, max: usize },
}

/// Errors returned by [`crate::SynthController`] and [`crate::initialize`].
#[derive(Debug, Error)]
pub enum SynthError {
    /// Sample rate outside the supported range.
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f32),

    /// Queue capacities must be non-zero.
    #[error("invalid queue capacity for {name}: {value}")]
    InvalidCapacity { name: &'static str, value: usize },

    /// Channel index outside `0..NUM_CHANNELS`.
    #[error("invalid channel: {0}")]
    InvalidChannel(u8),

    /// The command queue to the render thread is full.
    #[error("event queue full, {queued} of {total} messages queued")]
    QueueFull { queued: usize, total: usize },

    /// Patch data was rejected.
    #[error(transparent)]
    Patch(#[from] PatchError),
}
