#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::{
        delay::LinearDelay,
        envelope::Adsr,
        filter::{DcBlocker, OnePole},
        noise::Noise,
        tables::JetTable,
        vibrato::Vibrato,
    },
    error::Result,
    host::{HostCtx, NoteInfo},
    instruments::{
        base_frequency, ramp_rate, vibrato_table, EnvelopeSnapshot, Instrument, ReleaseCountdown,
        ReleaseLimiter, Tracked,
    },
};

/*
Flute
=====

An air jet blown across an embouchure hole into an open bore.

                    ┌─────────────────────────┐
    breath ──(+)──→ │ jet (LinearDelay)       │──→ jet table ──(+)──→ bore ──┬──→ out
              ↑     └─────────────────────────┘                  ↑           │
              │                                                  │           │
              └── -jetRefl · r          r = dc(onepole(bore)) ───┴ endRefl·r ┘

The jet takes a moment to cross from the lip to the labium (the jet delay),
then the jet table decides which side of the edge it lands on. The bore
returns an inverted, low-passed reflection (one-pole with gain -1), which
both disturbs the jet and adds directly into the bore.

Tuning is for an overblown note: the bore is 1.5 periods long, so the
second mode sounds at the requested pitch.

    bore = 1.5 · sr / freq - 2
    jet  = bore · jet_ratio
*/

pub const OUTPUT_SCALE: f32 = 1.4;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct FluteControls {
    pub amplitude: f32,
    pub frequency: f32,
    pub lowest_frequency: f32,
    /// Jet length as a fraction of the bore.
    pub jet_ratio: f32,
    pub end_reflection: f32,
    pub jet_reflection: f32,
    pub noise_gain: f32,
    /// Release time in seconds (read at note start).
    pub decay: f32,
    pub vibrato_frequency: f32,
    pub vibrato_amount: f32,
    pub vibrato_table: u32,
}

impl Default for FluteControls {
    fn default() -> Self {
        Self {
            amplitude: 0.5,
            frequency: 440.0,
            lowest_frequency: 0.0,
            jet_ratio: 0.32,
            end_reflection: 0.5,
            jet_reflection: 0.5,
            noise_gain: 0.15,
            decay: 0.1,
            vibrato_frequency: 5.925,
            vibrato_amount: 0.05,
            vibrato_table: 1,
        }
    }
}

pub struct Flute {
    bore: LinearDelay,
    jet: LinearDelay,
    jet_table: JetTable,
    filter: OnePole,
    dc_block: DcBlocker,
    adsr: Adsr,
    noise: Noise,
    vibrato: Vibrato,

    max_pressure: f32,
    output_gain: f32,
    decay: f32,

    amplitude: Tracked,
    frequency: Tracked,
    jet_ratio: Tracked,
    vibrato_frequency: Tracked,
    release: ReleaseCountdown,
    limiter: ReleaseLimiter,
}

impl Instrument for Flute {
    type Controls = FluteControls;

    const NAME: &'static str = "flute";

    fn new(ctx: &HostCtx, controls: &FluteControls, note: NoteInfo) -> Result<Self> {
        let table = vibrato_table(ctx, controls.vibrato_table, Self::NAME)?;
        let base = base_frequency(controls.lowest_frequency, controls.frequency, Self::NAME);
        // Overblown: the bore holds 1.5 periods of the base frequency
        let length = (1.5 * ctx.sample_rate / base + 1.0) as usize;

        let mut filter = OnePole::new();
        filter.set_coefficient(0.7 - 0.1 * ctx.rate_norm());
        filter.set_gain(-1.0);

        let amplitude = ctx.normalize_amplitude(controls.amplitude);
        let mut adsr = Adsr::new();
        adsr.set_times(0.005, 0.01, 0.8, 0.01, ctx.sample_rate);
        adsr.set_attack_rate(attack_rate(ctx, amplitude));
        adsr.key_on();

        Ok(Self {
            bore: LinearDelay::new(length),
            jet: LinearDelay::new(length >> 1),
            jet_table: JetTable,
            filter,
            dc_block: DcBlocker::new(),
            adsr,
            noise: Noise::new(note.noise_seed),
            vibrato: Vibrato::new(table),
            max_pressure: 2.3 / 0.8,
            output_gain: 1.001,
            decay: controls.decay,
            amplitude: Tracked::default(),
            frequency: Tracked::default(),
            jet_ratio: Tracked::default(),
            vibrato_frequency: Tracked::default(),
            release: ReleaseCountdown::new(ctx, &note, controls.decay),
            limiter: ReleaseLimiter::new(ctx.sample_rate),
        })
    }

    fn render_block(&mut self, ctx: &HostCtx, controls: &FluteControls, out: &mut [f32]) {
        let amplitude = ctx.normalize_amplitude(controls.amplitude);
        if self.amplitude.update(amplitude) {
            self.adsr.set_attack_rate(attack_rate(ctx, amplitude));
            self.max_pressure = (1.1 + amplitude * 0.2) / 0.8;
            self.output_gain = amplitude + 0.001;
        }

        let frequency_changed = controls.frequency > 0.0 && self.frequency.update(controls.frequency);
        let jet_changed = self.jet_ratio.update(controls.jet_ratio);
        if let Some(frequency) = self.frequency.get().filter(|_| frequency_changed || jet_changed) {
            let length = 1.5 * ctx.sample_rate / frequency - 2.0;
            if frequency_changed {
                self.bore.set_delay(length);
            }
            self.jet.set_delay(length * controls.jet_ratio);
        }

        if self.vibrato_frequency.update(controls.vibrato_frequency) {
            self.vibrato
                .set_frequency(controls.vibrato_frequency, ctx.sample_rate);
        }

        if self.release.poll() {
            let rate = ramp_rate(self.adsr.value(), self.decay, ctx.sample_rate);
            self.adsr.set_release_rate(rate);
            self.adsr.key_off();
            self.limiter.start(self.adsr.value());
        }

        let noise_gain = controls.noise_gain;
        let vibrato_amount = controls.vibrato_amount;
        let jet_reflection = controls.jet_reflection;
        let end_reflection = controls.end_reflection;
        let scale = 0.3 * self.output_gain * ctx.full_scale * OUTPUT_SCALE;

        for sample in out.iter_mut() {
            let envelope = self.adsr.tick();
            let breath = self.max_pressure * envelope;
            let random = (noise_gain * self.noise.tick() + vibrato_amount * self.vibrato.tick())
                * breath;

            let reflection = self.dc_block.tick(self.filter.tick(self.bore.last_out()));

            let jet_in = breath + random - jet_reflection * reflection;
            let jet_out = self.jet.tick(jet_in);
            let bore_in = self.jet_table.lookup(jet_out) + end_reflection * reflection;

            *sample = self.limiter.tick(self.bore.tick(bore_in) * scale, envelope);
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

/// Louder notes speak faster.
fn attack_rate(ctx: &HostCtx, amplitude: f32) -> f32 {
    amplitude * 0.02 * ctx.rate_norm()
}
