//! Benchmarks for complete instrument models.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use waveguide_dsp::{
    instruments::{
        Bar, BarControls, Bowed, BowedControls, Brass, BrassControls, Clarinet, ClarinetControls,
        Flute, FluteControls,
    },
    HostCtx, Instrument, NoteInfo, TableBank, WaveTable,
};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 44_100.0;

fn bench_model<I: Instrument>(
    group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>,
    bank: &TableBank,
    size: usize,
    controls: I::Controls,
) {
    let ctx = HostCtx::new(SAMPLE_RATE, size, bank);
    let Ok(mut instrument) = I::new(&ctx, &controls, NoteInfo::held()) else {
        return;
    };
    let mut buffer = vec![0.0f32; size];

    // Past the attack, into the steady tone
    for _ in 0..(SAMPLE_RATE as usize / 2 / size) {
        instrument.render_block(&ctx, &controls, &mut buffer);
    }

    group.bench_with_input(BenchmarkId::new(I::NAME, size), &size, |b, _| {
        b.iter(|| {
            instrument.render_block(black_box(&ctx), black_box(&controls), &mut buffer);
        })
    });
}

pub fn bench_instruments(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/instruments");
    let bank = TableBank::new().with_table(1, WaveTable::sine(1024));

    for &size in BLOCK_SIZES {
        bench_model::<Bar>(&mut group, &bank, size, BarControls::default());
        bench_model::<Bowed>(
            &mut group,
            &bank,
            size,
            BowedControls {
                vibrato_amount: 0.01,
                ..BowedControls::default()
            },
        );
        bench_model::<Brass>(&mut group, &bank, size, BrassControls::default());
        bench_model::<Clarinet>(&mut group, &bank, size, ClarinetControls::default());
        bench_model::<Flute>(&mut group, &bank, size, FluteControls::default());
    }

    group.finish();
}
