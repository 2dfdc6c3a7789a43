use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::{delay::DelayLine, envelope::Adsr, filter::Biquad, tables::BowTable},
    error::Result,
    host::{HostCtx, NoteInfo},
    instruments::{
        base_frequency, EnvelopeSnapshot, Instrument, ReleaseCountdown, ReleaseLimiter, Tracked,
    },
};

/*
Banded Waveguide Bar
====================

A bar does not have harmonic overtones, so a single delay loop cannot model
it. Instead each mode of vibration gets its own band: a delay line as long as
one period of that mode, closed through a bandpass tuned to it.

    mode ratios   1, 2.756, 5.404, 8.933   (uniform bar, free ends)

          ┌──────────────────────────────┐
          │   ┌────────┐   ┌─────────┐   │
    in·g0 ┴─→ │ biquad │─→ │ delay 0 │ ──┴──→ Σ ─→ out
              └────────┘   └─────────┘
    in·g1 ─→  ...band 1...
    in·g2 ─→  ...band 2...
    in·g3 ─→  ...band 3...

Each band's biquad sits on f·ratio with pole radius R = 1 - f·ratio·π/sr, so
higher modes ring shorter. Their delays are period / ratio samples; bands
whose delay would be 4 samples or less are dropped, together with every band
above them.


The Bow
-------

The bar's velocity under the bow is estimated from the band outputs:

    v = integration · v_prev + Σ gain · delay_k

The bow pushes with velocity b, either from the envelope (b = adsr · maxVel)
or, with velocity tracking, from a leaky integrator fed by moves of the bow
target. The friction table then gives the force each band receives:

    input = (b - v) · bow(b - v) / active_modes

Strike position p weights the bands by how much each mode moves at that
point of the bar: |sin(p·π·k/2)| · 0.9^(k-1).
*/

pub const OUTPUT_SCALE: f32 = 80.0;

/// Highest fundamental the bands can be tuned to.
pub const MAX_FREQUENCY: f32 = 1568.0;

const MODES: [f32; 4] = [1.0, 2.756, 5.404, 8.933];

/// Floor on the release step so full-amplitude notes still die away.
const MIN_RELEASE_RATE: f32 = 0.0005;

/// Bands with this many samples of delay or fewer are dropped.
const MIN_BAND_DELAY: usize = 4;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct BarControls {
    pub amplitude: f32,
    pub frequency: f32,
    pub lowest_frequency: f32,
    /// Strike position along the bar in `[0, 1]`.
    pub position: f32,
    /// Bow force, sets the width of the friction curve.
    pub bow_pressure: f32,
    /// Loop gain of every band.
    pub gain: f32,
    /// Leak of the velocity estimate. 0 uses the current band outputs only.
    pub integration: f32,
    /// Drive the bow from moves of `bow_target` instead of the envelope.
    pub track_velocity: bool,
    /// Bow speed the envelope heads for.
    pub bow_target: f32,
}

impl Default for BarControls {
    fn default() -> Self {
        Self {
            amplitude: 0.5,
            frequency: 440.0,
            lowest_frequency: 0.0,
            position: 0.5,
            bow_pressure: 3.0,
            gain: 0.809,
            integration: 0.0,
            track_velocity: false,
            bow_target: 1.0,
        }
    }
}

struct Band {
    delay: DelayLine,
    filter: Biquad,
    gain: f32,
}

pub struct Bar {
    bands: [Band; 4],
    active_modes: usize,
    bow_table: BowTable,
    adsr: Adsr,

    frequency: f32,
    velocity_input: f32,
    bow_velocity: f32,
    bow_push: f32,

    pressure: Tracked,
    tuning: Tracked,
    position: Tracked,
    target: Tracked,
    release: ReleaseCountdown,
    limiter: ReleaseLimiter,
}

impl Bar {
    /// Number of bands currently sounding.
    pub fn active_modes(&self) -> usize {
        self.active_modes
    }

    /// Fundamental after clamping, 0 before the first tuning.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    fn tune(&mut self, frequency: f32, sample_rate: f32) {
        let frequency = frequency.min(MAX_FREQUENCY);
        self.frequency = frequency;
        let length = (sample_rate / frequency) as usize;

        self.active_modes = MODES
            .iter()
            .position(|&ratio| (length as f32 / ratio) as usize <= MIN_BAND_DELAY)
            .unwrap_or(MODES.len());

        for (band, &ratio) in self.bands.iter_mut().zip(&MODES).take(self.active_modes) {
            band.delay.set_delay((length as f32 / ratio) as usize);

            let reson = 1.0 - frequency * ratio * PI / sample_rate;
            band.filter.clear();
            band.filter
                .set_freq_and_reson(frequency * ratio, reson, sample_rate);
            band.filter.set_equal_gain_zeros();
            band.filter.set_gain((1.0 - reson * reson) * 0.5);
        }
    }

    fn strike_at(&mut self, position: f32) {
        let angle = position * PI;
        let weights = [
            (angle * 0.5).sin(),
            angle.sin() * 0.9,
            (angle * 1.5).sin() * 0.81,
            (angle * 2.0).sin() * 0.729,
        ];
        for (band, weight) in self.bands.iter_mut().zip(weights) {
            band.gain = weight.abs();
        }
    }
}

impl Instrument for Bar {
    type Controls = BarControls;

    const NAME: &'static str = "bar";

    fn new(ctx: &HostCtx, controls: &BarControls, note: NoteInfo) -> Result<Self> {
        let base = base_frequency(controls.lowest_frequency, controls.frequency, Self::NAME);
        let length = (ctx.sample_rate / base + 1.0) as usize;

        let bands = MODES.map(|ratio| {
            let mut delay = DelayLine::new(length);
            delay.set_delay((length as f32 / ratio) as usize);
            Band {
                delay,
                filter: Biquad::new(),
                gain: 0.0,
            }
        });

        let mut adsr = Adsr::new();
        adsr.set_times(0.02, 0.005, 0.9, 0.01, ctx.sample_rate);

        Ok(Self {
            bands,
            active_modes: MODES.len(),
            bow_table: BowTable {
                offset: 0.0,
                slope: 0.0,
            },
            adsr,
            frequency: 0.0,
            velocity_input: 0.0,
            bow_velocity: 0.0,
            bow_push: 0.0,
            pressure: Tracked::default(),
            tuning: Tracked::default(),
            position: Tracked::default(),
            target: Tracked::default(),
            release: ReleaseCountdown::new(ctx, &note, 0.0),
            limiter: ReleaseLimiter::new(ctx.sample_rate),
        })
    }

    fn render_block(&mut self, ctx: &HostCtx, controls: &BarControls, out: &mut [f32]) {
        let amplitude = ctx.normalize_amplitude(controls.amplitude);

        if self.pressure.update(controls.bow_pressure) {
            self.bow_table.slope = controls.bow_pressure;
        }
        if controls.frequency > 0.0 && self.tuning.update(controls.frequency) {
            self.tune(controls.frequency, ctx.sample_rate);
        }
        if self.position.update(controls.position) {
            self.strike_at(controls.position);
        }

        let previous_target = self.target.get().unwrap_or(0.0);
        if self.target.update(controls.bow_target) {
            self.bow_push += 0.02 * (controls.bow_target - previous_target);
            self.adsr.set_target(controls.bow_target);
        }

        if self.release.poll() {
            let rate = ((1.0 - amplitude) * 0.005).max(MIN_RELEASE_RATE);
            self.adsr.set_release_rate(rate * ctx.rate_norm());
            self.adsr.key_off();
            self.limiter.start(self.adsr.value());
        }

        if self.active_modes == 0 || self.frequency == 0.0 {
            out.fill(0.0);
            return;
        }

        let max_velocity = 0.03 + 0.5 * amplitude;
        let gain = controls.gain;
        let integration = controls.integration;
        let modes = self.active_modes as f32;
        let scale = ctx.full_scale * OUTPUT_SCALE;

        for sample in out.iter_mut() {
            let active = &mut self.bands[..self.active_modes];

            let leak = if integration == 0.0 {
                0.0
            } else {
                integration * self.velocity_input
            };
            self.velocity_input =
                leak + active.iter().map(|band| gain * band.delay.last_out()).sum::<f32>();

            // Ticked in both drives: the release fade follows it
            let envelope = self.adsr.tick();
            if controls.track_velocity {
                self.bow_velocity *= 0.9995;
                self.bow_velocity += self.bow_push;
                self.bow_push *= 0.995;
            } else {
                self.bow_velocity = envelope * max_velocity;
            }

            let difference = self.bow_velocity - self.velocity_input;
            let input = difference * self.bow_table.lookup(difference) / modes;

            let mut data = 0.0;
            for band in active.iter_mut() {
                let filtered = band
                    .filter
                    .tick(input * band.gain + gain * band.delay.last_out());
                band.delay.tick(filtered);
                data += filtered;
            }

            *sample = self.limiter.tick(data * scale, envelope);
        }
    }

    fn release(&mut self) {
        self.release.rearm();
    }

    fn is_releasing(&self) -> bool {
        self.release.fired() || self.release.pending()
    }

    fn envelope(&self) -> EnvelopeSnapshot {
        EnvelopeSnapshot {
            level: self.adsr.value(),
            target: self.adsr.target(),
            state: self.adsr.state(),
        }
    }
}
