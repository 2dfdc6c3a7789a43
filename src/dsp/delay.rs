use tracing::warn;

use crate::error::{Result, WaveguideError};

/*
Waveguide Delay Lines
=====================

A digital waveguide models a travelling wave as a delay line: whatever goes in
comes out N samples later. Three flavors are used by the instruments:

  DelayLine       integer delay, truncating (banded bar branches)
  LinearDelay     fractional delay, linear interpolation (clarinet, flute,
                  bowed string)
  AllpassDelay    fractional delay, first-order all-pass interpolation
                  (brass bore)


Storage and Indices
-------------------

Every line owns a circular buffer of `max_delay + 1` slots. The extra slot is
what makes the whole range [0, max_delay] reachable, because of the tick
contract below.

    capacity = max_delay + 1

      write ──┐         ┌── read chases write
              ↓         ↓
    [ x x x x W . . . . R x x x ]
              └── lag ──┘  (measured backwards, modulo capacity)


Write Before Read
-----------------

Each tick FIRST stores the incoming sample, THEN reads. A lag of 0 therefore
returns the sample just written, and an impulse written at tick t reappears
at tick t + lag. Swapping the order shifts every loop in every instrument by
one sample and retunes them audibly, so the order is part of the contract.


Fractional Delays
-----------------

Linear: read position = write - lag, split into integer index r and
fraction a:

    y = buf[r] * (1 - a) + buf[r + 1] * a

All-pass: read position = write - lag + 2, split into index r and
alpha = 1 - fraction. The integer read feeds a first-order all-pass

    coeff = (1 - alpha) / (1 + alpha)
    y[n]  = coeff * x[n] + x[n-1] - coeff * y[n-1]

whose low-frequency phase delay is alpha. Alpha below 0.1 puts the pole and
zero almost on top of each other, so the read index moves one sample and
alpha gains one, keeping it inside [0.1, 1.1). Total delay is lag - 1
samples. Magnitude response stays flat, which is why the brass bore uses it.


Clamping
--------

Lags beyond the capacity are clamped to the longest delay the buffer holds
and reported through `tracing`. Fractional lines may be retuned every sample
(bowed-string vibrato), so they only warn on entering the clamped state.
*/

/// Shortest lag the all-pass line accepts (two samples of interpolator
/// headroom).
const MIN_ALLPASS_LAG: f32 = 2.0;

#[inline]
fn wrap(index: usize, capacity: usize) -> usize {
    if index >= capacity {
        index - capacity
    } else {
        index
    }
}

/// Integer (truncating) delay line.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
    read_pos: usize,
    last_out: f32,
}

impl DelayLine {
    /// Allocate a zeroed line able to delay by up to `max_delay` samples.
    pub fn new(max_delay: usize) -> Self {
        let capacity = max_delay + 1;
        Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
            read_pos: capacity >> 1,
            last_out: 0.0,
        }
    }

    pub fn max_delay(&self) -> usize {
        self.buffer.len() - 1
    }

    /// Set the delay in whole samples. Too-long lags clamp to `max_delay`.
    pub fn set_delay(&mut self, lag: usize) {
        let capacity = self.buffer.len();
        if lag > capacity - 1 {
            warn!(
                lag,
                max = capacity - 1,
                "delay length too big, setting to maximum"
            );
            self.read_pos = wrap(self.write_pos + 1, capacity);
        } else {
            self.read_pos = (self.write_pos + capacity - lag) % capacity;
        }
    }

    /// Take one sample, yield one sample.
    #[inline]
    pub fn tick(&mut self, sample: f32) -> f32 {
        let capacity = self.buffer.len();
        self.buffer[self.write_pos] = sample;
        self.write_pos = wrap(self.write_pos + 1, capacity);

        self.last_out = self.buffer[self.read_pos];
        self.read_pos = wrap(self.read_pos + 1, capacity);

        self.last_out
    }

    #[inline]
    pub fn last_out(&self) -> f32 {
        self.last_out
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.tick(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.last_out = 0.0;
    }
}

/// Fractional delay line with linear interpolation.
pub struct LinearDelay {
    buffer: Vec<f32>,
    write_pos: usize,
    read_pos: usize,
    alpha: f32,
    last_out: f32,
    clamped: bool,
}

impl LinearDelay {
    pub fn new(max_delay: usize) -> Self {
        let capacity = max_delay + 1;
        Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
            read_pos: capacity >> 1,
            alpha: 0.0,
            last_out: 0.0,
            clamped: false,
        }
    }

    pub fn max_delay(&self) -> usize {
        self.buffer.len() - 1
    }

    pub fn set_delay(&mut self, lag: f32) {
        let capacity = self.buffer.len();
        let max = (capacity - 1) as f32;

        let lag = if lag > max {
            if !self.clamped {
                warn!(lag, max, "delay length too big, setting to maximum");
                self.clamped = true;
            }
            max
        } else {
            self.clamped = false;
            lag.max(0.0)
        };

        let mut position = self.write_pos as f32 - lag;
        while position < 0.0 {
            position += capacity as f32;
        }

        let index = position as usize;
        self.alpha = position - index as f32;
        self.read_pos = index % capacity;
    }

    #[inline]
    pub fn tick(&mut self, sample: f32) -> f32 {
        let capacity = self.buffer.len();
        self.buffer[self.write_pos] = sample;
        self.write_pos = wrap(self.write_pos + 1, capacity);

        let next = wrap(self.read_pos + 1, capacity);
        self.last_out =
            self.buffer[self.read_pos] * (1.0 - self.alpha) + self.buffer[next] * self.alpha;
        self.read_pos = next;

        self.last_out
    }

    /// Output of the previous tick. Models read this to decide what to feed
    /// back before ticking the line again in the same sample.
    #[inline]
    pub fn last_out(&self) -> f32 {
        self.last_out
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.last_out = 0.0;
    }
}

/// Fractional delay line with all-pass interpolation.
///
/// `Default` gives an unsized line; retuning it reports
/// [`WaveguideError::DelayNotSized`].
#[derive(Default)]
pub struct AllpassDelay {
    buffer: Vec<f32>,
    write_pos: usize,
    read_pos: usize,
    alpha: f32,
    coeff: f32,
    last_in: f32,
    last_out: f32,
    clamped: bool,
}

impl AllpassDelay {
    pub fn new(max_delay: usize) -> Self {
        let capacity = max_delay + 1;
        Self {
            buffer: vec![0.0; capacity],
            read_pos: capacity >> 1,
            ..Self::default()
        }
    }

    pub fn max_delay(&self) -> usize {
        self.buffer.len().saturating_sub(1)
    }

    pub fn set_delay(&mut self, lag: f32) -> Result<()> {
        if self.buffer.is_empty() {
            return Err(WaveguideError::DelayNotSized);
        }

        let capacity = self.buffer.len();
        let max = (capacity - 1) as f32;

        let lag = if lag > max {
            if !self.clamped {
                warn!(lag, max, "all-pass delay length too big, setting to maximum");
                self.clamped = true;
            }
            max
        } else {
            self.clamped = false;
            lag.max(MIN_ALLPASS_LAG)
        };

        let mut position = self.write_pos as f32 - lag + 2.0;
        while position < 0.0 {
            position += capacity as f32;
        }
        while position >= capacity as f32 {
            position -= capacity as f32;
        }

        let mut index = position as usize;
        let mut alpha = 1.0 + index as f32 - position;
        if alpha < 0.1 {
            index += 1;
            alpha += 1.0;
        }

        self.read_pos = index % capacity;
        self.alpha = alpha;
        self.coeff = (1.0 - alpha) / (1.0 + alpha);
        Ok(())
    }

    #[inline]
    pub fn tick(&mut self, sample: f32) -> f32 {
        let capacity = self.buffer.len();
        self.buffer[self.write_pos] = sample;
        self.write_pos = wrap(self.write_pos + 1, capacity);

        let delayed = self.buffer[self.read_pos];
        self.read_pos = wrap(self.read_pos + 1, capacity);

        self.last_out = -self.coeff * self.last_out + self.last_in + self.coeff * delayed;
        self.last_in = delayed;

        self.last_out
    }

    #[inline]
    pub fn last_out(&self) -> f32 {
        self.last_out
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.last_in = 0.0;
        self.last_out = 0.0;
    }
}
