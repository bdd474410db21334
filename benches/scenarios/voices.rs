//! Benchmarks for complete voice chains built from the presets.
//!
//! One iteration is one control frame: modulation, oscillators, filters,
//! distortion and panning.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polycore::dsp::oscillator::AuxInput;
use polycore::synth::modulation::NUM_SOURCE_CONTROLLERS;
use polycore::synth::{Voice, VoiceInput};
use polycore::{presets, Patch, FRAME_SIZE};

use crate::SAMPLE_RATE;

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");
    let controllers = [0u8; NUM_SOURCE_CONTROLLERS];

    for (name, bytes) in [
        ("lead", presets::lead()),
        ("bass", presets::bass()),
        ("pad", presets::pad()),
        ("pluck", presets::pluck()),
        ("bell", presets::bell()),
    ] {
        let Ok(patch) = Patch::from_bytes(&bytes) else {
            continue;
        };
        let input = VoiceInput {
            patch: &patch,
            controllers: &controllers,
            pitch_bend: 0.0,
        };

        let mut voice = Voice::new(SAMPLE_RATE, 1);
        voice.note_on(60, 100, &patch);
        let mut left = [0.0f32; FRAME_SIZE];
        let mut right = [0.0f32; FRAME_SIZE];

        group.bench_with_input(BenchmarkId::new(name, FRAME_SIZE), &FRAME_SIZE, |b, _| {
            b.iter(|| {
                voice.tick(black_box(&input));
                voice.render(AuxInput::default(), &mut left, &mut right);
                black_box((&left, &right));
            })
        });
    }

    group.finish();
}
