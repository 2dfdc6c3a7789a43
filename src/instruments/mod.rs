//! Instrument models and the contract a host drives them through.
//!
//! A host creates one instance per note with [`Instrument::new`], then calls
//! [`Instrument::render_block`] once per control period with that period's
//! controls. Each call writes exactly `out.len()` samples. When the host
//! wants the note to end it calls [`Instrument::release`]; the model lets its
//! envelope fall to silence and the host decides when to drop the instance.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    dsp::EnvelopeState,
    error::{Result, WaveguideError},
    host::{HostCtx, NoteInfo, WaveTable},
};

pub mod bar;
pub mod bowed;
pub mod brass;
pub mod clarinet;
pub mod flute;

pub use bar::{Bar, BarControls};
pub use bowed::{Bowed, BowedControls};
pub use brass::{Brass, BrassControls};
pub use clarinet::{Clarinet, ClarinetControls};
pub use flute::{Flute, FluteControls};

/// Base frequency used to size delay lines when the note gives none.
pub const FALLBACK_FREQUENCY: f32 = 50.0;

/// Controls every model shares, so a host can retune or rebalance a note
/// without knowing which instrument it is.
pub trait NoteControls {
    fn set_amplitude(&mut self, amplitude: f32);
    fn set_frequency(&mut self, frequency: f32);
}

macro_rules! note_controls {
    ($($controls:ty),+ $(,)?) => {
        $(
            impl NoteControls for $controls {
                fn set_amplitude(&mut self, amplitude: f32) {
                    self.amplitude = amplitude;
                }

                fn set_frequency(&mut self, frequency: f32) {
                    self.frequency = frequency;
                }
            }
        )+
    };
}

note_controls!(
    BarControls,
    BowedControls,
    BrassControls,
    ClarinetControls,
    FluteControls,
);

pub trait Instrument: Send + Sized {
    /// Per-control-period inputs.
    type Controls: NoteControls;

    const NAME: &'static str;

    /// Set up a note. Looks up the vibrato table and sizes delay lines, so
    /// this is the only call that allocates.
    fn new(ctx: &HostCtx, controls: &Self::Controls, note: NoteInfo) -> Result<Self>;

    /// Render one control period. Never allocates, blocks or fails.
    fn render_block(&mut self, ctx: &HostCtx, controls: &Self::Controls, out: &mut [f32]);

    /// The host is releasing the note: start the release on the next block.
    fn release(&mut self);

    fn is_releasing(&self) -> bool;

    fn envelope(&self) -> EnvelopeSnapshot;
}

/// Where a model's amplitude envelope is right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSnapshot {
    pub level: f32,
    pub target: f32,
    pub state: EnvelopeState,
}

/// Last seen value of a control, for recomputing coefficients only when the
/// control actually moves. Starts empty so the first block always counts as a
/// change.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Tracked {
    last: Option<f32>,
}

impl Tracked {
    pub(crate) fn update(&mut self, value: f32) -> bool {
        if self.last == Some(value) {
            return false;
        }
        self.last = Some(value);
        true
    }

    pub(crate) fn get(&self) -> Option<f32> {
        self.last
    }
}

/// Control periods left before a timed note starts its release.
///
/// Fires once, on the period the count reaches zero. A host release re-arms
/// the count to a single period.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReleaseCountdown {
    remaining: u32,
    fired: bool,
}

impl ReleaseCountdown {
    /// `lead` is how many seconds before the end of the note the release
    /// should begin.
    pub(crate) fn new(ctx: &HostCtx, note: &NoteInfo, lead: f32) -> Self {
        let remaining = match note.duration {
            None => u32::MAX,
            Some(duration) => {
                let periods = ((duration - lead) * ctx.control_rate).floor();
                if periods <= 1.0 {
                    1
                } else {
                    periods.min(u32::MAX as f32) as u32
                }
            }
        };
        Self {
            remaining,
            fired: false,
        }
    }

    pub(crate) fn rearm(&mut self) {
        if !self.fired {
            self.remaining = 1;
        }
    }

    /// Count one control period. True exactly once, when the release is due.
    pub(crate) fn poll(&mut self) -> bool {
        if self.fired {
            return false;
        }
        if self.remaining <= 1 {
            self.fired = true;
            debug!("release countdown expired");
            return true;
        }
        self.remaining -= 1;
        false
    }

    pub(crate) fn pending(&self) -> bool {
        !self.fired && self.remaining == 1
    }

    pub(crate) fn fired(&self) -> bool {
        self.fired
    }
}

/// Time constant of the held-note peak follower, in seconds.
const HELD_PEAK_TIME: f32 = 0.05;

/// Output stage that keeps a released note from swelling.
///
/// While the note is held it follows the output's recent peak. Once the
/// release starts, every sample is clamped to that peak and scaled by the
/// square of how far the envelope has fallen, so the output reaches exactly
/// zero with the envelope.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReleaseLimiter {
    held_peak: f32,
    decay: f32,
    start_level: Option<f32>,
}

impl ReleaseLimiter {
    pub(crate) fn new(sample_rate: f32) -> Self {
        Self {
            held_peak: 0.0,
            decay: (-1.0 / (HELD_PEAK_TIME * sample_rate)).exp(),
            start_level: None,
        }
    }

    /// Freeze the held peak. `level` is the envelope value the release
    /// falls from. Later calls are ignored.
    pub(crate) fn start(&mut self, level: f32) {
        if self.start_level.is_none() {
            self.start_level = Some(level);
        }
    }

    #[inline]
    pub(crate) fn tick(&mut self, sample: f32, level: f32) -> f32 {
        match self.start_level {
            None => {
                self.held_peak = sample.abs().max(self.held_peak * self.decay);
                sample
            }
            Some(start) => {
                let fall = if start > 0.0 {
                    (level / start).max(0.0).min(1.0)
                } else {
                    0.0
                };
                // f32::clamp panics on a NaN bound
                sample.max(-self.held_peak).min(self.held_peak) * fall * fall
            }
        }
    }
}

/// Frequency the delay lines are sized for: the lowest expected frequency,
/// else the starting frequency, else [`FALLBACK_FREQUENCY`].
pub(crate) fn base_frequency(lowest: f32, frequency: f32, instrument: &'static str) -> f32 {
    if lowest > 0.0 {
        lowest
    } else if frequency > 0.0 {
        frequency
    } else {
        warn!(
            instrument,
            fallback = FALLBACK_FREQUENCY,
            "no base frequency, sizing delay lines for fallback"
        );
        FALLBACK_FREQUENCY
    }
}

pub(crate) fn vibrato_table(
    ctx: &HostCtx,
    id: u32,
    instrument: &'static str,
) -> Result<Arc<WaveTable>> {
    ctx.tables
        .find(id)
        .ok_or(WaveguideError::MissingTable { instrument, id })
}

/// Per-sample step that covers `distance` in `seconds`. A zero time jumps
/// in one sample.
pub(crate) fn ramp_rate(distance: f32, seconds: f32, sample_rate: f32) -> f32 {
    if seconds > 0.0 {
        distance.abs() / (seconds * sample_rate)
    } else {
        distance.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TableBank;

    #[test]
    fn tracked_reports_first_and_changed_values() {
        let mut tracked = Tracked::default();
        assert!(tracked.update(440.0));
        assert!(!tracked.update(440.0));
        assert!(tracked.update(220.0));
        assert_eq!(tracked.get(), Some(220.0));
    }

    #[test]
    fn countdown_fires_once_on_last_period() {
        let bank = TableBank::new();
        let ctx = HostCtx::new(1_000.0, 10, &bank); // 100 periods per second
        let mut countdown = ReleaseCountdown::new(&ctx, &NoteInfo::timed(0.05), 0.0);

        let fired: Vec<bool> = (0..8).map(|_| countdown.poll()).collect();
        assert_eq!(fired, vec![false, false, false, false, true, false, false, false]);
        assert!(countdown.fired());
    }

    #[test]
    fn countdown_lead_longer_than_note_fires_immediately() {
        let bank = TableBank::new();
        let ctx = HostCtx::new(1_000.0, 10, &bank);
        let mut countdown = ReleaseCountdown::new(&ctx, &NoteInfo::timed(0.1), 0.5);
        assert!(countdown.poll());
    }

    #[test]
    fn held_note_waits_for_host_release() {
        let bank = TableBank::new();
        let ctx = HostCtx::new(1_000.0, 10, &bank);
        let mut countdown = ReleaseCountdown::new(&ctx, &NoteInfo::held(), 0.0);
        for _ in 0..1_000 {
            assert!(!countdown.poll());
        }
        countdown.rearm();
        assert!(countdown.pending());
        assert!(countdown.poll());
        assert!(!countdown.poll());
    }

    #[test]
    fn limiter_passes_held_note_through() {
        let mut limiter = ReleaseLimiter::new(1_000.0);
        for x in [0.1, -0.4, 0.25, 0.0] {
            assert_eq!(limiter.tick(x, 1.0), x);
        }
    }

    #[test]
    fn limiter_caps_release_at_held_peak() {
        let mut limiter = ReleaseLimiter::new(1_000.0);
        limiter.tick(0.5, 1.0);
        limiter.start(1.0);
        let out = limiter.tick(3.0, 1.0);
        assert!(out > 0.45 && out <= 0.5, "burst passed as {out}");
        let out = limiter.tick(-3.0, 1.0);
        assert!(out < -0.45 && out >= -0.5, "burst passed as {out}");
    }

    #[test]
    fn limiter_fades_with_square_of_envelope() {
        let mut limiter = ReleaseLimiter::new(1_000.0);
        limiter.tick(1.0, 0.8);
        limiter.start(0.8);
        assert!((limiter.tick(0.5, 0.4) - 0.125).abs() < 1e-6);
        assert_eq!(limiter.tick(0.5, 0.0), 0.0);
    }

    #[test]
    fn limiter_silences_release_from_zero_level() {
        let mut limiter = ReleaseLimiter::new(1_000.0);
        limiter.tick(1.0, 0.0);
        limiter.start(0.0);
        assert_eq!(limiter.tick(0.7, 0.0), 0.0);
    }

    #[test]
    fn limiter_keeps_first_start_level() {
        let mut limiter = ReleaseLimiter::new(1_000.0);
        limiter.tick(1.0, 1.0);
        limiter.start(1.0);
        limiter.start(0.1);
        assert!((limiter.tick(1.0, 0.5) - 0.25).abs() < 1e-2);
    }

    #[test]
    fn base_frequency_prefers_lowest_then_frequency() {
        assert_eq!(base_frequency(100.0, 440.0, "test"), 100.0);
        assert_eq!(base_frequency(0.0, 440.0, "test"), 440.0);
        assert_eq!(base_frequency(0.0, 0.0, "test"), FALLBACK_FREQUENCY);
    }

    #[test]
    fn missing_table_is_reported() {
        let bank = TableBank::new();
        let ctx = HostCtx::new(44_100.0, 64, &bank);
        let err = vibrato_table(&ctx, 9, "clarinet").unwrap_err();
        assert!(matches!(
            err,
            WaveguideError::MissingTable {
                instrument: "clarinet",
                id: 9
            }
        ));
    }
}
