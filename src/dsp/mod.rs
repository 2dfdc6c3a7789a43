//! Low-level DSP primitives the instrument models are built from.
//!
//! These components are allocation-free after construction and
//! realtime-safe, making them safe to embed directly inside instrument
//! structs. They stay focused on the signal-processing math; tuning,
//! control handling and note lifetime live in the models.

/// Integer, linear and all-pass waveguide delay lines.
pub mod delay;
/// Ramp-to-target ADSR and breath pressure envelopes.
pub mod envelope;
/// Biquad, one-pole, one-zero and DC blocking filters.
pub mod filter;
/// Seeded white noise.
pub mod noise;
/// Bow, reed and jet nonlinearities.
pub mod tables;
/// Table-lookup vibrato oscillator.
pub mod vibrato;

pub use envelope::EnvelopeState;
