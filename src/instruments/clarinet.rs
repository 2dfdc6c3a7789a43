#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::{
        delay::LinearDelay, envelope::BreathEnvelope, filter::OneZero, noise::Noise,
        tables::ReedTable, vibrato::Vibrato,
    },
    error::Result,
    host::{HostCtx, NoteInfo},
    instruments::{
        base_frequency, ramp_rate, vibrato_table, EnvelopeSnapshot, Instrument, ReleaseCountdown,
        ReleaseLimiter, Tracked,
    },
};

/*
Clarinet
========

A single reed at the closed end of a cylindrical bore.

    breath ──┐
             ↓
          ┌──────┐  next   ┌──────────────────┐
          │ reed │ ──────→ │ bore (LinearDelay)│──┬──→ out
          └──────┘         └──────────────────┘  │
             ↑                                    │
             └── -0.95 · OneZero ←────────────────┘

The bell reflects the pressure wave inverted and slightly low-passed. At the
reed the difference between that reflection and the mouth pressure sets how
far the reed opens, and the reed table turns the opening into a reflection
coefficient:

    diff = -0.95 · lowpass(bore_out) - breath
    next = breath + diff · reed(diff)

The inverted reflection makes the round trip two bore lengths, which is why
the bore is tuned to half a period:

    delay = sr / (2 · freq) - 1.5

(the 1.5 samples come back from the one-zero filter and interpolation).

Breath pressure ramps from zero to 0.55 + 0.3·amp over the attack time. Noise
and vibrato both scale with the breath itself, so they fade in and out with
it.
*/

/// Output multiplier applied on top of `full_scale`.
pub const OUTPUT_SCALE: f32 = 1.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct ClarinetControls {
    pub amplitude: f32,
    pub frequency: f32,
    /// Lowest frequency the note will reach; sizes the bore. 0 uses `frequency`.
    pub lowest_frequency: f32,
    /// Reed stiffness in `[0, 1]`. 0 keeps the default reed.
    pub stiffness: f32,
    /// Breath attack in seconds (read at note start).
    pub attack: f32,
    /// Breath release in seconds (read at note start).
    pub decay: f32,
    pub noise_gain: f32,
    pub vibrato_frequency: f32,
    pub vibrato_amount: f32,
    pub vibrato_table: u32,
}

impl Default for ClarinetControls {
    fn default() -> Self {
        Self {
            amplitude: 0.5,
            frequency: 220.0,
            lowest_frequency: 0.0,
            stiffness: 0.0,
            attack: 0.1,
            decay: 0.1,
            noise_gain: 0.2,
            vibrato_frequency: 5.735,
            vibrato_amount: 0.1,
            vibrato_table: 1,
        }
    }
}

pub struct Clarinet {
    bore: LinearDelay,
    reed: ReedTable,
    filter: OneZero,
    breath: BreathEnvelope,
    noise: Noise,
    vibrato: Vibrato,

    output_gain: f32,
    decay: f32,

    frequency: Tracked,
    stiffness: Tracked,
    vibrato_frequency: Tracked,
    release: ReleaseCountdown,
    limiter: ReleaseLimiter,
}

impl Clarinet {
    fn reed_slope(stiffness: f32) -> f32 {
        if stiffness == 0.0 {
            ReedTable::default().slope
        } else {
            -0.44 + 0.26 * stiffness.clamp(0.0, 1.0)
        }
    }
}

impl Instrument for Clarinet {
    type Controls = ClarinetControls;

    const NAME: &'static str = "clarinet";

    fn new(ctx: &HostCtx, controls: &ClarinetControls, note: NoteInfo) -> Result<Self> {
        let table = vibrato_table(ctx, controls.vibrato_table, Self::NAME)?;
        let base = base_frequency(controls.lowest_frequency, controls.frequency, Self::NAME);
        let length = (ctx.sample_rate / base + 1.0) as usize;

        let amplitude = ctx.normalize_amplitude(controls.amplitude);
        let pressure = 0.55 + amplitude * 0.3;
        let mut breath = BreathEnvelope::new();
        breath.start(pressure, ramp_rate(pressure, controls.attack, ctx.sample_rate));

        Ok(Self {
            bore: LinearDelay::new(length),
            reed: ReedTable::default(),
            filter: OneZero::new(),
            breath,
            noise: Noise::new(note.noise_seed),
            vibrato: Vibrato::new(table),
            output_gain: amplitude + 0.001,
            decay: controls.decay,
            frequency: Tracked::default(),
            stiffness: Tracked::default(),
            vibrato_frequency: Tracked::default(),
            release: ReleaseCountdown::new(ctx, &note, controls.decay),
            limiter: ReleaseLimiter::new(ctx.sample_rate),
        })
    }

    fn render_block(&mut self, ctx: &HostCtx, controls: &ClarinetControls, out: &mut [f32]) {
        let amplitude = ctx.normalize_amplitude(controls.amplitude);
        self.output_gain = amplitude + 0.001;

        if controls.frequency > 0.0 && self.frequency.update(controls.frequency) {
            self.bore
                .set_delay(ctx.sample_rate / controls.frequency * 0.5 - 1.5);
        }
        if self.stiffness.update(controls.stiffness) {
            self.reed.slope = Self::reed_slope(controls.stiffness);
        }
        if self.vibrato_frequency.update(controls.vibrato_frequency) {
            self.vibrato
                .set_frequency(controls.vibrato_frequency, ctx.sample_rate);
        }

        if self.release.poll() {
            let rate = ramp_rate(self.breath.value(), self.decay, ctx.sample_rate);
            self.breath.release(rate);
            self.limiter.start(self.breath.value());
        }

        let noise_gain = controls.noise_gain;
        let vibrato_amount = controls.vibrato_amount;
        let scale = self.output_gain * ctx.full_scale * OUTPUT_SCALE;

        for sample in out.iter_mut() {
            let envelope = self.breath.tick();
            let mut breath = envelope;
            breath += breath * noise_gain * self.noise.tick();
            breath += breath * vibrato_amount * self.vibrato.tick();

            let diff = -0.95 * self.filter.tick(self.bore.last_out()) - breath;
            let next = breath + diff * self.reed.lookup(diff);

            *sample = self.limiter.tick(self.bore.tick(next) * scale, envelope);
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
            level: self.breath.value(),
            target: self.breath.target(),
            state: self.breath.state(),
        }
    }
}
