//! Benchmarks for the master reverb and the channel compressor.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polycore::dsp::compressor::{Compressor, CompressorParams, DetectorMode};
use polycore::dsp::reverb::StereoReverb;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/reverb");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.07).sin() * 0.5).collect();
        let mut left = input.clone();
        let mut right = input.clone();

        // Eight combs and four allpasses per side
        let mut reverb = StereoReverb::new(SAMPLE_RATE);
        reverb.set(100.0, 40.0, 20.0, 100.0);
        group.bench_with_input(BenchmarkId::new("schroeder", size), &size, |b, _| {
            b.iter(|| {
                left.copy_from_slice(&input);
                right.copy_from_slice(&input);
                reverb.render(black_box(&mut left), black_box(&mut right));
            })
        });

        for (name, mode) in [("comp_peak", DetectorMode::Peak), ("comp_rms", DetectorMode::Rms)] {
            let mut comp = Compressor::new(SAMPLE_RATE);
            comp.set(&CompressorParams {
                mode,
                stereo_link: true,
                auto_gain: false,
                lookahead_ms: 5.0,
                threshold_db: -24.0,
                ratio: 4.0,
                attack_ms: 5.0,
                release_ms: 100.0,
                out_gain_db: 0.0,
            });
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    left.copy_from_slice(&input);
                    right.copy_from_slice(&input);
                    comp.render(black_box(&mut left), black_box(&mut right));
                })
            });
        }
    }

    group.finish();
}
