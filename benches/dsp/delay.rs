//! Benchmarks for the waveguide delay lines.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use waveguide_dsp::dsp::delay::{AllpassDelay, DelayLine, LinearDelay};

use crate::BLOCK_SIZES;

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        // Integer delay, one bar band at 440 Hz
        let mut delay = DelayLine::new(101);
        delay.set_delay(100);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("integer", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                delay.render(black_box(&mut buffer));
            })
        });

        // Linear interpolation with the read point swept every sample
        // (bowed string under vibrato)
        let mut delay = LinearDelay::new(200);
        group.bench_with_input(BenchmarkId::new("linear_swept", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for (i, &x) in input.iter().enumerate() {
                    delay.set_delay(black_box(100.0 + (i as f32 * 0.01).sin() * 2.0));
                    sum += delay.tick(x);
                }
                sum
            })
        });

        // All-pass interpolation at a fixed fractional delay (brass bore)
        let mut delay = AllpassDelay::new(404);
        let _ = delay.set_delay(203.45);
        group.bench_with_input(BenchmarkId::new("allpass", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &x in &input {
                    sum += delay.tick(black_box(x));
                }
                sum
            })
        });
    }

    group.finish();
}
