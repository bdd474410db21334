//! Real-world scenario benchmarks.
//!
//! These benchmarks model actual usage patterns: single voices built from
//! the presets, and the whole engine under growing polyphony.

mod engine;
mod voices;

pub use engine::bench_engine;
pub use voices::bench_voices;
