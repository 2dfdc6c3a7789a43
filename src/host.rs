use std::{collections::HashMap, f32::consts::TAU, sync::Arc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::RATE_NORM_BASE;

/// Read-only services the host hands to every instrument call.
///
/// - sample_rate: audio sample rate (e.g. 44100.0)
/// - control_rate: control periods per second (one per `render_block`)
/// - full_scale: the host's 0 dBFS value; amplitudes are divided by it
///   before they reach the models and outputs are multiplied back
/// - tables: waveform lookup used at note start (vibrato shapes)
pub struct HostCtx<'a> {
    pub sample_rate: f32,
    pub control_rate: f32,
    pub full_scale: f32,
    pub tables: &'a dyn TableLookup,
}

impl<'a> HostCtx<'a> {
    /// Context for a host rendering `block_size` samples per control period.
    pub fn new(sample_rate: f32, block_size: usize, tables: &'a dyn TableLookup) -> Self {
        Self {
            sample_rate,
            control_rate: sample_rate / block_size.max(1) as f32,
            full_scale: 1.0,
            tables,
        }
    }

    pub fn with_full_scale(mut self, full_scale: f32) -> Self {
        self.full_scale = full_scale;
        self
    }

    /// Scale factor that keeps rates tuned at 22.05 kHz sounding the same at
    /// any sample rate.
    #[inline]
    pub fn rate_norm(&self) -> f32 {
        RATE_NORM_BASE / self.sample_rate
    }

    /// Host amplitude mapped into the models' 0..1 range.
    #[inline]
    pub fn normalize_amplitude(&self, amplitude: f32) -> f32 {
        amplitude / self.full_scale
    }
}

/// Per-note facts known when the note starts.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteInfo {
    /// Scheduled length in seconds, `None` when the note is held until the
    /// host releases it.
    pub duration: Option<f32>,
    /// Seed for the breath/bow noise source.
    pub noise_seed: u64,
}

impl NoteInfo {
    pub fn held() -> Self {
        Self {
            duration: None,
            noise_seed: 0,
        }
    }

    pub fn timed(duration: f32) -> Self {
        Self {
            duration: Some(duration),
            noise_seed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.noise_seed = seed;
        self
    }
}

impl Default for NoteInfo {
    fn default() -> Self {
        Self::held()
    }
}

/// A single-cycle waveform with one guard point appended, so linear
/// interpolation at the last index never needs to wrap.
#[derive(Debug, Clone)]
pub struct WaveTable {
    data: Vec<f32>,
}

impl WaveTable {
    /// Build a table from one period of samples. The guard point repeats the
    /// first sample. An empty period becomes a single silent sample.
    pub fn from_samples(mut samples: Vec<f32>) -> Self {
        if samples.is_empty() {
            samples.push(0.0);
        }
        let guard = samples[0];
        samples.push(guard);
        Self { data: samples }
    }

    pub fn sine(len: usize) -> Self {
        let len = len.max(1);
        let samples = (0..len)
            .map(|i| (TAU * i as f32 / len as f32).sin())
            .collect();
        Self::from_samples(samples)
    }

    /// Number of samples in one period (guard point excluded).
    pub fn len(&self) -> usize {
        self.data.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear interpolation at a phase in `[0, len)`.
    #[inline]
    pub fn interpolate(&self, phase: f32) -> f32 {
        let index = (phase as usize).min(self.len() - 1);
        let alpha = phase - index as f32;
        let current = self.data[index];
        current + alpha * (self.data[index + 1] - current)
    }
}

/// Waveform lookup service offered by the host.
pub trait TableLookup {
    fn find(&self, id: u32) -> Option<Arc<WaveTable>>;
}

/// In-memory table registry.
#[derive(Default)]
pub struct TableBank {
    tables: HashMap<u32, Arc<WaveTable>>,
}

impl TableBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u32, table: WaveTable) {
        self.tables.insert(id, Arc::new(table));
    }

    pub fn with_table(mut self, id: u32, table: WaveTable) -> Self {
        self.insert(id, table);
        self
    }
}

impl TableLookup for TableBank {
    fn find(&self, id: u32) -> Option<Arc<WaveTable>> {
        self.tables.get(&id).cloned()
    }
}
