use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    dsp::{
        delay::AllpassDelay,
        envelope::Adsr,
        filter::{Biquad, DcBlocker},
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
Brass
=====

The player's lips are a mass on a spring, buzzing at a frequency set by lip
tension. Mouth pressure pushes them open, the bore's reflected pressure
pushes back.

    breath ──→ ┌─────┐      ┌────┐      ┌─────────────────────┐
               │ lip │ ───→ │ dc │ ───→ │ bore (AllpassDelay) │──┬──→ out
    0.85 · ──→ └─────┘      └────┘      └─────────────────────┘  │
    bore_out ↑                                                   │
             └───────────────────────────────────────────────────┘

Lip filter:

    force    = mouth - bore
    position = resonator(force)             (poles at lip frequency, R 0.997)
    area     = min(position², 1)
    out      = area · mouth + (1 - area) · bore

An open lip lets the mouth through, a closed lip reflects the bore.

The bore is tuned to two periods (the instrument plays its second harmonic)
plus three samples of filter delay, using the all-pass line so the tuning
stays exact without low-passing the loop:

    bore = 2 · sr / freq + 3
    lip  = freq · 4^(2·tension - 1)

Tension 0.5 puts the lips right on the note; 0 and 1 are two octaves below
and above.
*/

pub const OUTPUT_SCALE: f32 = 3.5;

/// Pole radius of the lip resonance.
const LIP_DAMPING: f32 = 0.997;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct BrassControls {
    pub amplitude: f32,
    pub frequency: f32,
    pub lowest_frequency: f32,
    /// Lip tension in `[0, 1]`.
    pub lip_tension: f32,
    /// Seconds before the end of a timed note that the release starts.
    pub decay: f32,
    pub vibrato_frequency: f32,
    pub vibrato_amount: f32,
    pub vibrato_table: u32,
}

impl Default for BrassControls {
    fn default() -> Self {
        Self {
            amplitude: 0.5,
            frequency: 220.0,
            lowest_frequency: 0.0,
            lip_tension: 0.4,
            decay: 0.1,
            vibrato_frequency: 6.137,
            vibrato_amount: 0.0,
            vibrato_table: 1,
        }
    }
}

/// Lip valve: a resonant filter from pressure difference to opening.
pub struct LipFilter {
    resonator: Biquad,
}

impl Default for LipFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl LipFilter {
    pub fn new() -> Self {
        Self {
            resonator: Biquad::new(),
        }
    }

    pub fn set_frequency(&mut self, frequency: f32, sample_rate: f32) {
        self.resonator.set_pole_coefficients(
            2.0 * LIP_DAMPING * (TAU * frequency / sample_rate).cos(),
            -(LIP_DAMPING * LIP_DAMPING),
        );
        self.resonator.set_gain(0.03);
    }

    #[inline]
    pub fn tick(&mut self, mouth: f32, bore: f32) -> f32 {
        let position = self.resonator.tick(mouth - bore);
        let area = (position * position).min(1.0);
        area * mouth + (1.0 - area) * bore
    }
}

pub struct Brass {
    bore: AllpassDelay,
    lip: LipFilter,
    dc_block: DcBlocker,
    adsr: Adsr,
    vibrato: Vibrato,

    max_pressure: f32,
    lip_target: f32,
    /// Bore retuned; the lips have to follow even if tension did not move.
    lip_stale: bool,

    frequency: Tracked,
    tension: Tracked,
    vibrato_frequency: Tracked,
    release: ReleaseCountdown,
    limiter: ReleaseLimiter,
}

impl Instrument for Brass {
    type Controls = BrassControls;

    const NAME: &'static str = "brass";

    fn new(ctx: &HostCtx, controls: &BrassControls, note: NoteInfo) -> Result<Self> {
        let table = vibrato_table(ctx, controls.vibrato_table, Self::NAME)?;
        let base = base_frequency(controls.lowest_frequency, controls.frequency, Self::NAME);
        // Two periods plus filter headroom
        let length = (2.0 * ctx.sample_rate / base + 4.0) as usize;

        let amplitude = ctx.normalize_amplitude(controls.amplitude);
        let mut adsr = Adsr::new();
        adsr.set_times(0.005, 0.001, 1.0, 0.01, ctx.sample_rate);
        adsr.set_attack_rate(amplitude * 0.001 * ctx.rate_norm());
        adsr.key_on();

        Ok(Self {
            bore: AllpassDelay::new(length),
            lip: LipFilter::new(),
            dc_block: DcBlocker::new(),
            adsr,
            vibrato: Vibrato::new(table),
            max_pressure: amplitude,
            lip_target: 0.0,
            lip_stale: false,
            frequency: Tracked::default(),
            tension: Tracked::default(),
            vibrato_frequency: Tracked::default(),
            release: ReleaseCountdown::new(ctx, &note, controls.decay),
            limiter: ReleaseLimiter::new(ctx.sample_rate),
        })
    }

    fn render_block(&mut self, ctx: &HostCtx, controls: &BrassControls, out: &mut [f32]) {
        let amplitude = ctx.normalize_amplitude(controls.amplitude);
        self.max_pressure = amplitude;

        if self.release.poll() {
            self.adsr
                .set_release_rate(amplitude * 0.005 * ctx.rate_norm());
            self.adsr.key_off();
            self.limiter.start(self.adsr.value());
        }

        if controls.frequency > 0.0 && self.frequency.update(controls.frequency) {
            let slide = 2.0 * ctx.sample_rate / controls.frequency + 3.0;
            if let Err(err) = self.bore.set_delay(slide) {
                error!(%err, "brass bore cannot be tuned, rendering silence");
                out.fill(0.0);
                return;
            }
            self.lip_target = controls.frequency;
            self.lip_stale = true;
        }

        if self.tension.update(controls.lip_tension) || self.lip_stale {
            let lip = self.lip_target * 4.0f32.powf(2.0 * controls.lip_tension - 1.0);
            self.lip.set_frequency(lip, ctx.sample_rate);
            self.lip_stale = false;
        }

        if self.vibrato_frequency.update(controls.vibrato_frequency) {
            self.vibrato
                .set_frequency(controls.vibrato_frequency, ctx.sample_rate);
        }

        let vibrato_amount = controls.vibrato_amount;
        let scale = ctx.full_scale * OUTPUT_SCALE;

        for sample in out.iter_mut() {
            let envelope = self.adsr.tick();
            let breath = self.max_pressure * envelope + vibrato_amount * self.vibrato.tick();

            let lips = self.lip.tick(0.3 * breath, 0.85 * self.bore.last_out());
            let blocked = self.dc_block.tick(lips);

            *sample = self.limiter.tick(self.bore.tick(blocked) * scale, envelope);
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
    fn closed_lip_reflects_bore() {
        let mut lip = LipFilter::new();
        lip.set_frequency(220.0, 44_100.0);
        // No pressure difference: resonator stays at rest, area 0
        assert_eq!(lip.tick(0.5, 0.5), 0.5);
    }

    #[test]
    fn lip_area_saturates() {
        let mut lip = LipFilter::new();
        lip.set_frequency(220.0, 44_100.0);
        for _ in 0..10_000 {
            let y = lip.tick(1.0, -1.0);
            // area in [0, 1] keeps the output between the two inputs
            assert!((-1.0..=1.0).contains(&y), "lip output {y}");
        }
    }

    #[test]
    fn brass_renders_finite_bounded_output() {
        let bank = TableBank::new().with_table(1, WaveTable::sine(256));
        let ctx = HostCtx::new(44_100.0, 64, &bank);
        let controls = BrassControls {
            amplitude: 0.8,
            vibrato_amount: 0.02,
            ..BrassControls::default()
        };
        let mut brass = Brass::new(&ctx, &controls, NoteInfo::timed(0.5)).unwrap();

        let mut out = [0.0; 64];
        let mut peak = 0.0f32;
        for _ in 0..400 {
            brass.render_block(&ctx, &controls, &mut out);
            for &x in &out {
                assert!(x.is_finite());
                peak = peak.max(x.abs());
            }
        }
        println!("brass peak {peak}");
        assert!(peak <= 20.0 * OUTPUT_SCALE, "runaway brass output {peak}");
        assert!(brass.is_releasing());
    }
}
