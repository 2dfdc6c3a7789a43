//! Benchmarks for the excitation nonlinearities.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use waveguide_dsp::dsp::tables::{BowTable, JetTable, ReedTable};

use crate::BLOCK_SIZES;

pub fn bench_tables(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/tables");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 4.0 - 2.0)
            .collect();

        let bow = BowTable::default();
        group.bench_with_input(BenchmarkId::new("bow", size), &size, |b, _| {
            b.iter(|| input.iter().map(|&x| bow.lookup(black_box(x))).sum::<f32>())
        });

        let reed = ReedTable::default();
        group.bench_with_input(BenchmarkId::new("reed", size), &size, |b, _| {
            b.iter(|| input.iter().map(|&x| reed.lookup(black_box(x))).sum::<f32>())
        });

        let jet = JetTable;
        group.bench_with_input(BenchmarkId::new("jet", size), &size, |b, _| {
            b.iter(|| input.iter().map(|&x| jet.lookup(black_box(x))).sum::<f32>())
        });
    }

    group.finish();
}
