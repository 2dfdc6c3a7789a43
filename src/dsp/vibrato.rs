use std::sync::Arc;

use crate::host::WaveTable;

/// Table-lookup LFO used for vibrato.
///
/// The phase counts table samples, not radians: `rate = hz · len / sr`, so
/// one trip around `[0, len)` is one vibrato cycle.
pub struct Vibrato {
    table: Arc<WaveTable>,
    phase: f32,
    rate: f32,
}

impl Vibrato {
    pub fn new(table: Arc<WaveTable>) -> Self {
        Self {
            table,
            phase: 0.0,
            rate: 0.0,
        }
    }

    pub fn set_frequency(&mut self, hz: f32, sample_rate: f32) {
        self.rate = hz * self.table.len() as f32 / sample_rate;
    }

    #[inline]
    pub fn tick(&mut self) -> f32 {
        let len = self.table.len() as f32;
        self.phase += self.rate;
        if self.phase >= len || self.phase < 0.0 {
            self.phase = self.phase.rem_euclid(len);
            // rem_euclid can round up to len itself
            if self.phase >= len {
                self.phase = 0.0;
            }
        }
        self.table.interpolate(self.phase)
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }
}
