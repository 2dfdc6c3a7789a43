//! A minimal realtime host: one instrument, fixed control periods, and a
//! lock-free message queue from the control thread.
//!
//! The audio callback asks for arbitrary buffer sizes while the models want
//! one `render_block` per control period, so the player renders whole
//! periods into a scratch block and hands them out piecewise.

#[cfg(feature = "rtrb")]
use rtrb::Consumer;
use tracing::debug;

use crate::{
    error::Result,
    host::{HostCtx, NoteInfo, TableBank},
    instruments::{Instrument, NoteControls},
    MAX_BLOCK_SIZE,
};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PlayerMessage {
    Release,
    Retune { frequency: f32 },
    Amplitude { amplitude: f32 },
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<PlayerMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<PlayerMessage> {
    fn pop(&mut self) -> Option<PlayerMessage> {
        Consumer::pop(self).ok()
    }
}

pub struct Player<I: Instrument, R: MessageReceiver> {
    instrument: I,
    controls: I::Controls,
    tables: TableBank,
    rx: R,

    sample_rate: f32,
    block: Vec<f32>,
    cursor: usize,
}

impl<I: Instrument, R: MessageReceiver> Player<I, R> {
    /// Start a note. `block_size` is the control period in samples.
    pub fn new(
        sample_rate: f32,
        block_size: usize,
        tables: TableBank,
        controls: I::Controls,
        note: NoteInfo,
        rx: R,
    ) -> Result<Self> {
        let block_size = block_size.clamp(1, MAX_BLOCK_SIZE);
        let ctx = HostCtx::new(sample_rate, block_size, &tables);
        let instrument = I::new(&ctx, &controls, note)?;

        Ok(Self {
            instrument,
            controls,
            tables,
            rx,
            sample_rate,
            block: vec![0.0; block_size],
            // Empty scratch: the first fill renders a fresh period
            cursor: block_size,
        })
    }

    pub fn instrument(&self) -> &I {
        &self.instrument
    }

    /// Fill `out` with mono samples, rendering new control periods as the
    /// scratch block runs dry.
    pub fn fill(&mut self, out: &mut [f32]) {
        let mut written = 0;

        while written < out.len() {
            if self.cursor == self.block.len() {
                self.render_period();
            }

            let available = self.block.len() - self.cursor;
            let count = available.min(out.len() - written);
            out[written..written + count]
                .copy_from_slice(&self.block[self.cursor..self.cursor + count]);

            self.cursor += count;
            written += count;
        }
    }

    fn render_period(&mut self) {
        while let Some(msg) = self.rx.pop() {
            match msg {
                PlayerMessage::Release => {
                    debug!(instrument = I::NAME, "host release");
                    self.instrument.release();
                }
                PlayerMessage::Retune { frequency } => self.controls.set_frequency(frequency),
                PlayerMessage::Amplitude { amplitude } => self.controls.set_amplitude(amplitude),
            }
        }

        let ctx = HostCtx::new(self.sample_rate, self.block.len(), &self.tables);
        self.instrument
            .render_block(&ctx, &self.controls, &mut self.block);
        self.cursor = 0;
    }
}
