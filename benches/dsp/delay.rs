//! Benchmarks for the modulated delay in its echo and chorus shapes.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polycore::dsp::chorus::Chorus;
use polycore::dsp::delay::{ModDelayParams, ModulatedDelay};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    let echo = ModDelayParams {
        amount: 127.0,
        feedback: 96.0,
        delay_left: 40.0,
        delay_right: 52.0,
        rate: 0.0,
        depth: 0.0,
        phase: 0.0,
    };
    let chorus = ModDelayParams {
        amount: 90.0,
        feedback: 64.0,
        delay_left: 20.0,
        delay_right: 24.0,
        rate: 40.0,
        depth: 80.0,
        phase: 64.0,
    };

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut left = input.clone();
        let mut right = input.clone();

        // Long fixed read heads
        let mut delay = ModulatedDelay::new(SAMPLE_RATE, 1_000.0, 10.0);
        delay.set(&echo);
        group.bench_with_input(BenchmarkId::new("echo", size), &size, |b, _| {
            b.iter(|| {
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    let (wl, wr) = delay.process(black_box(*l), black_box(*r));
                    *l = wl;
                    *r = wr;
                }
            })
        });

        // Short swept read heads with dry mix
        let mut stage = Chorus::new(SAMPLE_RATE);
        stage.set(&chorus);
        group.bench_with_input(BenchmarkId::new("chorus", size), &size, |b, _| {
            b.iter(|| {
                left.copy_from_slice(&input);
                right.copy_from_slice(&input);
                stage.render(black_box(&mut left), black_box(&mut right));
            })
        });
    }

    group.finish();
}
