//! Benchmarks for the ADSR and breath envelopes.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use waveguide_dsp::dsp::envelope::{Adsr, BreathEnvelope};

use crate::BLOCK_SIZES;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Attack phase (ramping up)
        let mut env = Adsr::new();
        env.set_times(10.0, 0.1, 0.7, 0.3, 44_100.0);
        env.key_on();
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer));
            })
        });

        // Settled at the target
        let mut env = Adsr::new();
        env.set_times(0.001, 0.001, 0.7, 0.3, 44_100.0);
        env.set_target(env.sustain_level());
        for _ in 0..200 {
            env.tick();
        }
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| {
                env.render(black_box(&mut buffer));
            })
        });

        // Breath pressure ramp, one sample at a time as the clarinet runs it
        let mut breath = BreathEnvelope::new();
        breath.start(0.7, 1e-6);
        group.bench_with_input(BenchmarkId::new("breath", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for _ in 0..size {
                    sum += breath.tick();
                }
                black_box(sum)
            })
        });
    }

    group.finish();
}
