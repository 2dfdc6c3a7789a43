//! Benchmarks for DSP primitives and complete instrument models.
//!
//! Run with: cargo bench
//!
//! These benchmarks measure the per-block cost of the waveguide building
//! blocks and of each instrument, to keep them well within real-time audio
//! deadlines.
//!
//! Reference timing at 44.1kHz sample rate:
//!   - 64 samples  = 1.45ms deadline
//!   - 128 samples = 2.90ms deadline
//!   - 256 samples = 5.80ms deadline
//!   - 512 samples = 11.61ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Low-level primitives (delay, filter, envelope, tables)
//!   - scenarios/*  Full instrument models rendering a sustained note

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    // Low-level DSP primitives
    dsp::bench_delay,
    dsp::bench_filter,
    dsp::bench_envelope,
    dsp::bench_tables,
    // Instrument models
    scenarios::bench_instruments,
);
criterion_main!(benches);
