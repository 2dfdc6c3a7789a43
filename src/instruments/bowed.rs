#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::{
        delay::LinearDelay,
        envelope::Adsr,
        filter::{Biquad, OnePole},
        tables::BowTable,
        vibrato::Vibrato,
    },
    error::Result,
    host::{HostCtx, NoteInfo},
    instruments::{
        base_frequency, vibrato_table, EnvelopeSnapshot, Instrument, ReleaseCountdown,
        ReleaseLimiter, Tracked,
    },
};

/*
Bowed String
============

The bow splits the string in two: a short stretch to the bridge and a long
one to the nut (or finger). Each stretch is a delay line carrying velocity
waves; both ends reflect inverted, the bridge end through a lossy one-pole.

        nut                 bow                      bridge
         │←──── neck (1-β) ───→│←── bridge (β) ──→│
         │                     │                  │
   -neck_out ─────────────→  (Δv) ←───── -onepole(bridge_out)
                               │
                         Δv · bow(Δv)
                          ↙         ↘
                 neck += bridgeRefl    bridge += nutRefl

At the bow:

    string = bridgeRefl + nutRefl
    Δv     = bow_velocity - string
    new    = Δv · bow(Δv)

Small Δv means the bow grips and drags the string along; large Δv means it
slips. The result is the stick-slip sawtooth of a bowed string. What reaches
the bridge drives a body resonance (biquad at 500 Hz) which is the output.

Tuning: both stretches together make half a period of round trip minus four
samples of filter delay.

    base   = sr / freq - 4
    bridge = base · β
    neck   = base · (1 - β)

Vibrato moves the finger: the neck length is modulated every sample.
*/

pub const OUTPUT_SCALE: f32 = 1.8;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct BowedControls {
    pub amplitude: f32,
    pub frequency: f32,
    pub lowest_frequency: f32,
    /// Bow force, sets the width of the friction curve.
    pub bow_pressure: f32,
    /// Bow position β as a fraction of the string from the bridge.
    pub bow_position: f32,
    pub vibrato_frequency: f32,
    pub vibrato_amount: f32,
    pub vibrato_table: u32,
}

impl Default for BowedControls {
    fn default() -> Self {
        Self {
            amplitude: 0.5,
            frequency: 440.0,
            lowest_frequency: 0.0,
            bow_pressure: 3.0,
            bow_position: 0.127236,
            vibrato_frequency: 6.12723,
            vibrato_amount: 0.0,
            vibrato_table: 1,
        }
    }
}

pub struct Bowed {
    neck: LinearDelay,
    bridge: LinearDelay,
    bow_table: BowTable,
    reflection: OnePole,
    body: Biquad,
    adsr: Adsr,
    vibrato: Vibrato,

    max_velocity: f32,
    base_delay: f32,
    beta: f32,

    amplitude: Tracked,
    pressure: Tracked,
    frequency: Tracked,
    position: Tracked,
    vibrato_frequency: Tracked,
    release: ReleaseCountdown,
    limiter: ReleaseLimiter,
}

impl Instrument for Bowed {
    type Controls = BowedControls;

    const NAME: &'static str = "bowed string";

    fn new(ctx: &HostCtx, controls: &BowedControls, note: NoteInfo) -> Result<Self> {
        let table = vibrato_table(ctx, controls.vibrato_table, Self::NAME)?;
        let base = base_frequency(controls.lowest_frequency, controls.frequency, Self::NAME);
        let length = (ctx.sample_rate / base + 1.0) as usize;

        let mut reflection = OnePole::new();
        reflection.set_coefficient(0.6 - 0.1 * ctx.rate_norm());
        reflection.set_gain(0.95);

        let mut body = Biquad::new();
        body.set_freq_and_reson(500.0, 0.85, ctx.sample_rate);
        body.set_equal_gain_zeros();
        body.set_gain(0.2);

        let mut adsr = Adsr::new();
        adsr.set_times(0.02, 0.005, 0.9, 0.01, ctx.sample_rate);
        adsr.key_on();

        let amplitude = ctx.normalize_amplitude(controls.amplitude);

        Ok(Self {
            neck: LinearDelay::new(length),
            bridge: LinearDelay::new(length >> 1),
            bow_table: BowTable::default(),
            reflection,
            body,
            adsr,
            vibrato: Vibrato::new(table),
            max_velocity: 0.03 + 0.2 * amplitude,
            base_delay: 0.0,
            beta: 0.0,
            amplitude: Tracked::default(),
            pressure: Tracked::default(),
            frequency: Tracked::default(),
            position: Tracked::default(),
            vibrato_frequency: Tracked::default(),
            release: ReleaseCountdown::new(ctx, &note, 0.0),
            limiter: ReleaseLimiter::new(ctx.sample_rate),
        })
    }

    fn render_block(&mut self, ctx: &HostCtx, controls: &BowedControls, out: &mut [f32]) {
        let amplitude = ctx.normalize_amplitude(controls.amplitude);
        if self.amplitude.update(amplitude) {
            self.max_velocity = 0.03 + 0.2 * amplitude;
        }
        if self.pressure.update(controls.bow_pressure) {
            self.bow_table.slope = controls.bow_pressure;
        }

        let frequency_changed =
            controls.frequency > 0.0 && self.frequency.update(controls.frequency);
        if frequency_changed {
            self.base_delay = ctx.sample_rate / controls.frequency - 4.0;
        }
        let position_changed = self.position.update(controls.bow_position);
        if (frequency_changed || position_changed) && self.frequency.get().is_some() {
            self.beta = controls.bow_position;
            self.bridge.set_delay(self.base_delay * self.beta);
            self.neck.set_delay(self.base_delay * (1.0 - self.beta));
        }

        if self.vibrato_frequency.update(controls.vibrato_frequency) {
            self.vibrato
                .set_frequency(controls.vibrato_frequency, ctx.sample_rate);
        }

        if self.release.poll() {
            self.adsr.key_off();
            self.limiter.start(self.adsr.value());
        }

        let vibrato_amount = controls.vibrato_amount;
        let neck_length = self.base_delay * (1.0 - self.beta);
        let scale = ctx.full_scale * amplitude * OUTPUT_SCALE;

        for sample in out.iter_mut() {
            let envelope = self.adsr.tick();
            let bow_velocity = self.max_velocity * envelope;

            let bridge_reflection = -self.reflection.tick(self.bridge.last_out());
            let nut_reflection = -self.neck.last_out();
            let string_velocity = bridge_reflection + nut_reflection;
            let difference = bow_velocity - string_velocity;
            let new_velocity = difference * self.bow_table.lookup(difference);

            self.neck.tick(bridge_reflection + new_velocity);
            self.bridge.tick(nut_reflection + new_velocity);

            if vibrato_amount > 0.0 {
                let wobble = self.base_delay * vibrato_amount * self.vibrato.tick();
                self.neck.set_delay(neck_length + wobble);
            }

            let body = self.body.tick(self.bridge.last_out());
            *sample = self.limiter.tick(body * scale, envelope);
        }

        // Vibrato switched off: park the finger back where it belongs
        if vibrato_amount <= 0.0 && self.frequency.get().is_some() {
            self.neck.set_delay(neck_length);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{TableBank, WaveTable};

    #[test]
    fn bow_pressure_reaches_the_friction_curve() {
        let bank = TableBank::new().with_table(1, WaveTable::sine(256));
        let ctx = HostCtx::new(44_100.0, 64, &bank);
        let controls = BowedControls {
            bow_pressure: 4.5,
            ..BowedControls::default()
        };
        let mut bowed = Bowed::new(&ctx, &controls, NoteInfo::held()).unwrap();
        let mut out = [0.0; 64];
        bowed.render_block(&ctx, &controls, &mut out);
        assert_eq!(bowed.bow_table.slope, 4.5);
    }

    #[test]
    fn vibrato_keeps_output_finite() {
        let bank = TableBank::new().with_table(1, WaveTable::sine(1024));
        let ctx = HostCtx::new(44_100.0, 64, &bank);
        let controls = BowedControls {
            frequency: 196.0,
            vibrato_amount: 0.01,
            vibrato_frequency: 6.0,
            ..BowedControls::default()
        };
        let mut bowed = Bowed::new(&ctx, &controls, NoteInfo::held()).unwrap();
        let mut out = [0.0; 64];
        for _ in 0..200 {
            bowed.render_block(&ctx, &controls, &mut out);
            assert!(out.iter().all(|x| x.is_finite()));
        }
    }
}
