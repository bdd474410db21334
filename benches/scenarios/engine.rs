//! Benchmarks for the full engine: command drain, voices, channel strips
//! and the master bus.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polycore::{initialize, presets, Synth, SynthConfig};

use crate::SAMPLE_RATE;

const VOICE_COUNTS: &[usize] = &[1, 8, 32, 64];
const BLOCK: usize = 256;

/// Engine with a preset on each of five channels and `voices` notes held.
fn playing_engine(voices: usize) -> Option<Synth> {
    let (mut synth, mut controller) = initialize(SynthConfig::with_sample_rate(SAMPLE_RATE)).ok()?;
    for (channel, bytes) in presets::bank().iter().enumerate() {
        controller.select_patch(channel as u8, bytes).ok()?;
    }
    for i in 0..voices {
        let channel = (i % 5) as u8;
        let note = 36 + (i * 7 % 48) as u8;
        controller.note_on(channel, note, 100).ok()?;
    }
    Some(synth)
}

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/engine");

    for &voices in VOICE_COUNTS {
        let Some(mut synth) = playing_engine(voices) else {
            continue;
        };
        let mut out = vec![0.0f32; 2 * BLOCK];

        group.bench_with_input(BenchmarkId::new("interleaved", voices), &voices, |b, _| {
            b.iter(|| {
                synth.render(black_box(&mut out), BLOCK, None, false);
            })
        });
    }

    group.finish();
}
