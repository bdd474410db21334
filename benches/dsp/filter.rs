//! Benchmarks for the voice filters.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polycore::dsp::filter::{Filter, FilterMode};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // Sawtooth-like ramp
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        for (name, mode) in [
            ("svf_lowpass", FilterMode::LowPass),
            ("svf_bandpass", FilterMode::BandPass),
            ("svf_notch", FilterMode::Notch),
            ("ladder_lowpass", FilterMode::LadderLow),
            ("ladder_highpass", FilterMode::LadderHigh),
        ] {
            let mut filter = Filter::new(SAMPLE_RATE);
            filter.set(mode, 1_000.0, 0.5);
            let mut buffer = input.clone();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    filter.render(black_box(&mut buffer));
                })
            });
        }
    }

    group.finish();
}
