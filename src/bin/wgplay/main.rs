//! wgplay - play one physically modeled note on the default output device
//!
//! Run with: cargo run --bin wgplay -- clarinet --frequency 220

mod app;

use clap::{Parser, ValueEnum};
use waveguide_dsp::instruments::{
    Bar, BarControls, Bowed, BowedControls, Brass, BrassControls, Clarinet, ClarinetControls,
    Flute, FluteControls,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Model {
    Bar,
    Clarinet,
    Flute,
    Bowed,
    Brass,
}

#[derive(Parser)]
#[command(name = "wgplay")]
#[command(about = "Play a waveguide instrument note", long_about = None)]
struct Cli {
    /// Instrument model
    #[arg(value_enum)]
    instrument: Model,

    /// Note frequency in Hz
    #[arg(short, long, default_value = "220.0")]
    frequency: f32,

    /// Amplitude (0 to 1)
    #[arg(short, long, default_value = "0.5")]
    amplitude: f32,

    /// Seconds to hold the note before releasing it
    #[arg(long, default_value = "2.0")]
    hold: f32,

    /// Seconds to let the release ring out
    #[arg(long, default_value = "1.0")]
    tail: f32,

    /// Control period in samples
    #[arg(short, long, default_value = "64")]
    block: usize,

    /// Retune to this frequency halfway through the hold
    #[arg(long)]
    glide: Option<f32>,

    /// Noise seed for breath and bow noise
    #[arg(long, default_value = "0")]
    seed: u64,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = app::Settings {
        frequency: cli.frequency,
        amplitude: cli.amplitude,
        hold: cli.hold,
        tail: cli.tail,
        block: cli.block,
        glide: cli.glide,
        seed: cli.seed,
    };

    match cli.instrument {
        Model::Bar => app::play::<Bar>(settings, BarControls::default()),
        Model::Clarinet => app::play::<Clarinet>(settings, ClarinetControls::default()),
        Model::Flute => app::play::<Flute>(settings, FluteControls::default()),
        Model::Bowed => app::play::<Bowed>(settings, BowedControls::default()),
        Model::Brass => app::play::<Brass>(settings, BrassControls::default()),
    }
}
