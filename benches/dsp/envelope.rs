//! Benchmarks for the control-rate envelope.
//!
//! The envelope ticks once per frame, so these measure a run of ticks
//! rather than a sample block.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polycore::dsp::envelope::{Envelope, EnvelopeParams};

use crate::SAMPLE_RATE;

const TICKS: &[usize] = &[16, 128, 1024];

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &ticks in TICKS {
        // Attack phase (ramping up)
        let slow = EnvelopeParams {
            attack: 100.0,
            ..EnvelopeParams::default()
        };
        group.bench_with_input(BenchmarkId::new("attack", ticks), &ticks, |b, &n| {
            b.iter(|| {
                let mut env = Envelope::new(SAMPLE_RATE);
                env.gate(true);
                for _ in 0..n {
                    black_box(env.tick(black_box(&slow)));
                }
            })
        });

        // Sustain with a slope keeps the decay math running
        let params = EnvelopeParams {
            sustain: 90.0,
            sustain_slope: 40.0,
            ..EnvelopeParams::default()
        };
        let mut env = Envelope::new(SAMPLE_RATE);
        env.gate(true);
        for _ in 0..200 {
            env.tick(&params);
        }
        group.bench_with_input(BenchmarkId::new("sustain", ticks), &ticks, |b, &n| {
            b.iter(|| {
                for _ in 0..n {
                    black_box(env.tick(black_box(&params)));
                }
            })
        });

        // Release phase (falling to off)
        group.bench_with_input(BenchmarkId::new("release", ticks), &ticks, |b, &n| {
            b.iter(|| {
                let mut env = Envelope::new(SAMPLE_RATE);
                env.gate(true);
                env.tick(&params);
                env.gate(false);
                for _ in 0..n {
                    black_box(env.tick(black_box(&params)));
                }
            })
        });
    }

    group.finish();
}
