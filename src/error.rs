use thiserror::Error;

/// Failures that stop an instrument from being created or a line from
/// being used.
///
/// Everything else in the per-sample path recovers by clamping or
/// saturating, so rendering itself never returns an error.
#[derive(Debug, Error)]
pub enum WaveguideError {
    /// The vibrato waveform requested at note start is not registered.
    #[error("no vibrato table {id} for {instrument}")]
    MissingTable { instrument: &'static str, id: u32 },

    /// An all-pass delay was retuned before it had any storage.
    #[error("all-pass delay line used before it was sized")]
    DelayNotSized,
}

pub type Result<T> = std::result::Result<T, WaveguideError>;
