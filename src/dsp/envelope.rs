#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::MIN_TIME;

/*
Ramp-to-Target Envelopes
========================

The waveguide models do not want a classic self-advancing ADSR. Their
envelopes are closer to a slew limiter: the value walks toward a target at a
fixed step per sample and stops exactly on it. Models decide when the target
changes (note start, bow pressure moves, release), so the envelope itself
never jumps from one phase to another on its own.

Vocabulary
----------

  value       Current output.

  target      Where the value is heading.

  rate        Step size per sample. Always positive; the direction comes from
              comparing value and target.

  state       Attack while the note is held, Release once the model lets go.
              Only two phases exist, since decay and sustain are just a lower
              target while still in Attack.


The Shape
---------

    value
      1.0 ┤    ╭──────────╮                 key_on: target 1, attack rate
          │   ╱            ╲___________     set_target(0.6): decay rate
      0.6 ┤  ╱                         ╲
          │ ╱                           ╲   key_off: target 0, release rate
      0.0 ┼╱─────────────────────────────╲──→ time


Ticking
-------

    if value < target:  value = min(value + rate, target)
    if value > target:  value = max(value - rate, target)

Clamping on the target is what keeps the output bounded and makes "reached"
exact: once value == target it stays put until someone moves the target.


Times to Rates
--------------

`Adsr::set_times` turns seconds into per-sample steps:

    attack_rate  = 1 / (attack · sr)
    decay_rate   = (1 - sustain) / (decay · sr)
    release_rate = sustain / (release · sr)

Times are floored at MIN_TIME so a zero never divides.
*/

/// Phase of a ramp envelope.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Attack,  // Note held, heading for whatever target the model set
    Release, // Heading for zero
}

pub struct Adsr {
    value: f32,
    target: f32,
    rate: f32,
    state: EnvelopeState,

    attack_rate: f32,
    decay_rate: f32,
    sustain_level: f32,
    release_rate: f32,
}

impl Default for Adsr {
    fn default() -> Self {
        Self::new()
    }
}

impl Adsr {
    pub fn new() -> Self {
        Self {
            value: 0.0,
            target: 0.0,
            rate: 0.001,
            state: EnvelopeState::Attack,

            attack_rate: 0.001,
            decay_rate: 0.001,
            sustain_level: 0.5,
            release_rate: 0.01,
        }
    }

    /// Derive the three rates from times in seconds.
    pub fn set_times(
        &mut self,
        attack: f32,
        decay: f32,
        sustain: f32,
        release: f32,
        sample_rate: f32,
    ) {
        let sustain = sustain.clamp(0.0, 1.0);
        self.attack_rate = 1.0 / (attack.max(MIN_TIME) * sample_rate);
        self.decay_rate = (1.0 - sustain) / (decay.max(MIN_TIME) * sample_rate);
        self.release_rate = sustain / (release.max(MIN_TIME) * sample_rate);
        self.sustain_level = sustain;
    }

    /// Takes effect immediately if the envelope is still rising.
    pub fn set_attack_rate(&mut self, rate: f32) {
        self.attack_rate = rate.abs();
        if self.state == EnvelopeState::Attack && self.target > self.value {
            self.rate = self.attack_rate;
        }
    }

    pub fn set_decay_rate(&mut self, rate: f32) {
        self.decay_rate = rate.abs();
    }

    pub fn set_release_rate(&mut self, rate: f32) {
        self.release_rate = rate.abs();
    }

    /// Move the target without leaving Attack. Rising targets use the
    /// attack rate, falling ones the decay rate.
    pub fn set_target(&mut self, target: f32) {
        self.state = EnvelopeState::Attack;
        self.rate = if target > self.value {
            self.attack_rate
        } else {
            self.decay_rate
        };
        self.target = target;
    }

    pub fn key_on(&mut self) {
        self.target = 1.0;
        self.rate = self.attack_rate;
        self.state = EnvelopeState::Attack;
    }

    pub fn key_off(&mut self) {
        self.target = 0.0;
        self.rate = self.release_rate;
        self.state = EnvelopeState::Release;
    }

    #[inline]
    pub fn tick(&mut self) -> f32 {
        self.value = step_toward(self.value, self.target, self.rate);
        self.value
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.tick();
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    pub fn sustain_level(&self) -> f32 {
        self.sustain_level
    }
}

/// Two-segment breath pressure ramp: up to a target, later down to zero.
pub struct BreathEnvelope {
    value: f32,
    target: f32,
    rate: f32,
    state: EnvelopeState,
}

impl Default for BreathEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

impl BreathEnvelope {
    pub fn new() -> Self {
        Self {
            value: 0.0,
            target: 0.0,
            rate: 0.0,
            state: EnvelopeState::Attack,
        }
    }

    pub fn start(&mut self, target: f32, rate: f32) {
        self.target = target;
        self.rate = rate.abs();
        self.state = EnvelopeState::Attack;
    }

    pub fn release(&mut self, rate: f32) {
        self.target = 0.0;
        self.rate = rate.abs();
        self.state = EnvelopeState::Release;
    }

    #[inline]
    pub fn tick(&mut self) -> f32 {
        self.value = step_toward(self.value, self.target, self.rate);
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }
}

#[inline]
fn step_toward(value: f32, target: f32, rate: f32) -> f32 {
    if value < target {
        (value + rate).min(target)
    } else if value > target {
        (value - rate).max(target)
    } else {
        value
    }
}
