//! Physically modeled wind, string, brass and bar instruments built from
//! digital and banded waveguides.
//!
//! Each instrument is a small state machine driven one block at a time by a
//! host: the host owns timing, note allocation and output, the models own
//! the sound.

pub mod dsp; // Delay lines, filters, envelopes, excitation tables
pub mod error;
pub mod host; // Services an instrument borrows from its host
pub mod instruments; // The five instrument models
pub mod player; // Block-rendering host with a control queue

pub use error::{Result, WaveguideError};
pub use host::{HostCtx, NoteInfo, TableBank, TableLookup, WaveTable};
pub use instruments::{EnvelopeSnapshot, Instrument};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;

/// Sample rate the models' rate constants were tuned at.
pub const RATE_NORM_BASE: f32 = 22_050.0;
