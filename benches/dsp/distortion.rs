//! Benchmarks for waveshaping distortion.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polycore::dsp::distortion::{self, Distortion, DistortionMode};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_distortion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/distortion");

    for &size in BLOCK_SIZES {
        // Generate a test signal (sine-like values)
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        // Bare shaper, no stage state
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("soft_clip_fn", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                for x in buffer.iter_mut() {
                    *x = distortion::soft_clip(black_box(*x), 4.0);
                }
            })
        });

        for (name, mode) in [
            ("overdrive", DistortionMode::Overdrive),
            ("clip", DistortionMode::Clip),
            ("fold", DistortionMode::Fold),
            ("bit_crush", DistortionMode::BitCrush),
            ("decimate", DistortionMode::Decimate),
        ] {
            let mut stage = Distortion::new(SAMPLE_RATE);
            stage.set(mode, 90.0, 64.0);
            let mut buffer = input.clone();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    stage.render(black_box(&mut buffer));
                })
            });
        }
    }

    group.finish();
}
