//! Audio device setup and the note's lifetime on the control thread.

use std::{thread, time::Duration};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;
use tracing::info;

use waveguide_dsp::{
    instruments::{Instrument, NoteControls},
    player::{Player, PlayerMessage},
    NoteInfo, TableBank, WaveTable, MAX_BLOCK_SIZE,
};

/// Table id every preset uses for vibrato.
const VIBRATO_TABLE: u32 = 1;
const VIBRATO_TABLE_LEN: usize = 1024;

pub struct Settings {
    pub frequency: f32,
    pub amplitude: f32,
    pub hold: f32,
    pub tail: f32,
    pub block: usize,
    pub glide: Option<f32>,
    pub seed: u64,
}

pub fn play<I>(settings: Settings, mut controls: I::Controls) -> EyreResult<()>
where
    I: Instrument + 'static,
    I::Controls: Send + 'static,
{
    controls.set_frequency(settings.frequency);
    controls.set_amplitude(settings.amplitude);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;

    let tables =
        TableBank::new().with_table(VIBRATO_TABLE, WaveTable::sine(VIBRATO_TABLE_LEN));
    let (mut tx, rx) = RingBuffer::<PlayerMessage>::new(16);
    let mut player = Player::<I, _>::new(
        sample_rate,
        settings.block,
        tables,
        controls,
        NoteInfo::held().with_seed(settings.seed),
        rx,
    )
    .wrap_err_with(|| format!("failed to start {}", I::NAME))?;

    info!(
        instrument = I::NAME,
        sample_rate,
        channels,
        frequency = settings.frequency,
        "playing"
    );

    let mut mono = vec![0.0f32; MAX_BLOCK_SIZE];
    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            let total_frames = data.len() / channels;
            let mut frames_written = 0;

            while frames_written < total_frames {
                let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                let block = &mut mono[..frames];
                player.fill(block);

                // Mono to all channels
                let out_off = frames_written * channels;
                for (i, &s) in block.iter().enumerate() {
                    for ch in 0..channels {
                        data[out_off + i * channels + ch] = s;
                    }
                }

                frames_written += frames;
            }
        },
        |err| eprintln!("Audio error: {}", err),
        None,
    )?;

    stream.play()?;

    match settings.glide {
        Some(target) => {
            thread::sleep(seconds(settings.hold * 0.5));
            info!(frequency = target, "retune");
            tx.push(PlayerMessage::Retune { frequency: target })
                .map_err(|_| eyre!("control queue full"))?;
            thread::sleep(seconds(settings.hold * 0.5));
        }
        None => thread::sleep(seconds(settings.hold)),
    }

    info!("release");
    tx.push(PlayerMessage::Release)
        .map_err(|_| eyre!("control queue full"))?;
    thread::sleep(seconds(settings.tail));

    Ok(())
}

fn seconds(secs: f32) -> Duration {
    Duration::from_secs_f32(secs.max(0.0))
}
