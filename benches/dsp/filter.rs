//! Benchmarks for the loop filters.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use waveguide_dsp::dsp::filter::{Biquad, DcBlocker, OnePole, OneZero};

use crate::BLOCK_SIZES;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // Generate a test signal (sawtooth-like ramp)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        // Resonant bandpass, as used by the bar bands and bowed body
        let mut filter = Biquad::new();
        filter.set_freq_and_reson(500.0, 0.85, 44_100.0);
        filter.set_equal_gain_zeros();
        filter.set_gain(0.2);
        group.bench_with_input(BenchmarkId::new("biquad", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &x in &input {
                    sum += filter.tick(black_box(x));
                }
                sum
            })
        });

        let mut filter = OneZero::new();
        group.bench_with_input(BenchmarkId::new("one_zero", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &x in &input {
                    sum += filter.tick(black_box(x));
                }
                sum
            })
        });

        let mut filter = OnePole::new();
        filter.set_coefficient(0.6);
        group.bench_with_input(BenchmarkId::new("one_pole", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &x in &input {
                    sum += filter.tick(black_box(x));
                }
                sum
            })
        });

        let mut filter = DcBlocker::new();
        group.bench_with_input(BenchmarkId::new("dc_blocker", size), &size, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for &x in &input {
                    sum += filter.tick(black_box(x));
                }
                sum
            })
        });
    }

    group.finish();
}
