use std::f32::consts::TAU;

/*
Waveguide Filters
=================

| type       | used by                        | job                              |
| ---------- | ------------------------------ | -------------------------------- |
| Biquad     | bar branches, bowed body, lips | resonance at a chosen frequency  |
| OneZero    | clarinet bore                  | gentle low-pass reflection loss  |
| OnePole    | flute bore, bowed bridge       | reflection loss with sign flip   |
| DcBlocker  | flute, brass                   | keeps feedback loops off DC      |


Biquad (Direct Form I)
----------------------

    y[n] = g·(x[n] + b1·x[n-1] + b2·x[n-2]) + a1·y[n-1] + a2·y[n-2]

Note the sign convention: the feedback coefficients are ADDED. A resonance
at frequency f with pole radius R is

    a1 = 2·R·cos(2π·f / sr)
    a2 = -R²

R close to 1 means a long ring. The "equal gain zeros" (b1 = 0, b2 = -1)
put zeros at DC and Nyquist so the peak gain stays roughly the same whatever
the centre frequency. Gain is applied to the input BEFORE the zeros, so the
stored input history is the scaled input.


One-Zero / One-Pole
-------------------

    one-zero:  y[n] = scaled·x[n] + c·scaled·x[n-1]     scaled = g / (1 + |c|)
    one-pole:  y[n] = scaled·x[n] + p·y[n-1]             scaled = g·(1 - |p|)

Both normalize so the peak of the magnitude response (DC or Nyquist) equals
the configured gain g. A negative g inverts the reflection, which is how an
open pipe end is modeled.


DC Blocker
----------

    y[n] = x[n] - x[n-1] + 0.99·y[n-1]

Zero at DC, pole just inside it: everything above a few tens of hertz passes.
*/

/// Two-pole, two-zero resonator.
pub struct Biquad {
    a1: f32,
    a2: f32,
    b1: f32,
    b2: f32,
    gain: f32,

    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

impl Biquad {
    /// Pass-through until coefficients are set.
    pub fn new() -> Self {
        Self {
            a1: 0.0,
            a2: 0.0,
            b1: 0.0,
            b2: 0.0,
            gain: 1.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Place a pole pair at `freq` Hz with radius `reson`.
    pub fn set_freq_and_reson(&mut self, freq: f32, reson: f32, sample_rate: f32) {
        self.a1 = 2.0 * reson * (TAU * freq / sample_rate).cos();
        self.a2 = -(reson * reson);
    }

    pub fn set_pole_coefficients(&mut self, a1: f32, a2: f32) {
        self.a1 = a1;
        self.a2 = a2;
    }

    /// Zeros at DC and Nyquist.
    pub fn set_equal_gain_zeros(&mut self) {
        self.b1 = 0.0;
        self.b2 = -1.0;
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    #[inline]
    pub fn tick(&mut self, sample: f32) -> f32 {
        let input = self.gain * sample;
        let output =
            input + self.b1 * self.x1 + self.b2 * self.x2 + self.a1 * self.y1 + self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    #[inline]
    pub fn last_out(&self) -> f32 {
        self.y1
    }

    /// Zero the input and output history, keeping the coefficients.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

pub struct OneZero {
    coefficient: f32,
    gain: f32,
    scaled_gain: f32,
    last_in: f32,
}

impl Default for OneZero {
    fn default() -> Self {
        Self::new()
    }
}

impl OneZero {
    /// Two-point average: zero at Nyquist, unity gain at DC.
    pub fn new() -> Self {
        Self {
            coefficient: 1.0,
            gain: 1.0,
            scaled_gain: 0.5,
            last_in: 0.0,
        }
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
        self.update_scale();
    }

    pub fn set_coefficient(&mut self, coefficient: f32) {
        self.coefficient = coefficient;
        self.update_scale();
    }

    fn update_scale(&mut self) {
        self.scaled_gain = self.gain / (1.0 + self.coefficient.abs());
    }

    #[inline]
    pub fn tick(&mut self, sample: f32) -> f32 {
        let input = self.scaled_gain * sample;
        let output = self.coefficient * self.last_in + input;
        self.last_in = input;
        output
    }
}

/// One-pole low-pass (or high-pass, for a negative pole).
///
/// The input is scaled by `gain · (1 - |pole|)`, so the peak of the
/// response is exactly `gain`: at DC for a positive pole, at Nyquist for a
/// negative one. Scaling by `1 / (1 + |pole|)` instead would leave the
/// peak below `gain` for any nonzero pole.
pub struct OnePole {
    pole: f32,
    gain: f32,
    scaled_gain: f32,
    last_out: f32,
}

impl Default for OnePole {
    fn default() -> Self {
        Self::new()
    }
}

impl OnePole {
    pub fn new() -> Self {
        let pole = 0.9;
        Self {
            pole,
            gain: 1.0,
            scaled_gain: 1.0 - pole,
            last_out: 0.0,
        }
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
        self.update_scale();
    }

    pub fn set_coefficient(&mut self, pole: f32) {
        self.pole = pole;
        self.update_scale();
    }

    fn update_scale(&mut self) {
        self.scaled_gain = self.gain * (1.0 - self.pole.abs());
    }

    #[inline]
    pub fn tick(&mut self, sample: f32) -> f32 {
        self.last_out = self.scaled_gain * sample + self.pole * self.last_out;
        self.last_out
    }

    #[inline]
    pub fn last_out(&self) -> f32 {
        self.last_out
    }
}

#[derive(Default)]
pub struct DcBlocker {
    last_in: f32,
    last_out: f32,
}

impl DcBlocker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn tick(&mut self, sample: f32) -> f32 {
        self.last_out = sample - self.last_in + 0.99 * self.last_out;
        self.last_in = sample;
        self.last_out
    }
}
