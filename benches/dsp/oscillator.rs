//! Benchmarks for oscillator waveform generation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polycore::dsp::oscillator::{AuxInput, OscMode, Oscillator};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, mode) in [
            // Table-free sine approximation
            ("sine", OscMode::Sine),
            // Integrated spans, branch at the breakpoint
            ("tri_saw", OscMode::TriSaw),
            ("pulse", OscMode::Pulse),
            // PRNG into a state-variable filter
            ("noise", OscMode::Noise),
            // Reads the buffer as phase offset
            ("fm_sine", OscMode::FmSine),
        ] {
            let mut osc = Oscillator::new(SAMPLE_RATE);
            osc.set(mode, false, 0.0, 0.5, 1.0, size);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    osc.render(black_box(&mut buffer), AuxInput::default());
                })
            });
        }

        // Ring modulation multiplies into the buffer
        let mut osc = Oscillator::new(SAMPLE_RATE);
        osc.set(OscMode::TriSaw, true, 7.0, 0.2, 1.0, size);
        buffer.fill(0.5);
        group.bench_with_input(BenchmarkId::new("ring", size), &size, |b, _| {
            b.iter(|| {
                osc.render(black_box(&mut buffer), AuxInput::default());
            })
        });
    }

    group.finish();
}
