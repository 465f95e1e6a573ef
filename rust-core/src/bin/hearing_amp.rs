//! Command line front end: microphone in, amplified audio out

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use hearing_amp_core::audio::{
    list_input_devices, list_output_devices, load_config, HostStreams, Preset,
};
use hearing_amp_core::Engine;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PresetArg {
    Flat,
    Sloped,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Flat => Preset::Flat,
            PresetArg::Sloped => Preset::Sloped,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "hearing-amp", about = "Real-time multi-band hearing amplifier")]
struct Args {
    /// YAML configuration file (defaults are used if it does not exist)
    #[arg(short, long, default_value = "hearing-amp.yaml")]
    config: PathBuf,

    /// Input device name (system default if omitted)
    #[arg(short, long)]
    input: Option<String>,

    /// Output device name (system default if omitted)
    #[arg(short, long)]
    output: Option<String>,

    /// Linear amplification, overriding the config file
    #[arg(short, long)]
    amplification: Option<f32>,

    /// Band preset, overriding the config file
    #[arg(short, long, value_enum)]
    preset: Option<PresetArg>,

    /// Seconds between statistics log lines (0 disables)
    #[arg(long, default_value_t = 5)]
    stats_interval: u64,

    /// List audio devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    if args.list_devices {
        println!("Input devices:");
        for device in list_input_devices()? {
            println!("  {}", device);
        }
        println!("Output devices:");
        for device in list_output_devices()? {
            println!("  {}", device);
        }
        return Ok(());
    }

    let mut config = load_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(amplification) = args.amplification {
        config.amplification = amplification;
    }
    if let Some(preset) = args.preset {
        config.preset = preset.into();
        config.bands = None;
    }

    let engine = Arc::new(Engine::with_config(config)?);
    let streams = HostStreams::open(
        Arc::clone(&engine),
        args.input.as_deref(),
        args.output.as_deref(),
    )?;
    streams.play()?;
    log::info!("Running, press Ctrl+C to stop");

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("installing Ctrl+C handler")?;

    let poll = if args.stats_interval == 0 {
        Duration::from_secs(3600)
    } else {
        Duration::from_secs(args.stats_interval)
    };
    loop {
        match rx.recv_timeout(poll) {
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if args.stats_interval > 0 {
                    let stats = engine.stats();
                    log::info!(
                        "state={:?} fault={:?} in={:.1} dB out={:.1} dB underruns={} evicted={} clips={} bands={:?}",
                        stats.state,
                        stats.fault,
                        stats.input_peak_db,
                        stats.output_peak_db,
                        stats.underruns,
                        stats.ring_evictions,
                        stats.limiter_clips,
                        engine.band_levels_db()
                    );
                }
            }
            _ => break,
        }
    }

    log::info!("Shutting down");
    if !streams.close(Duration::from_millis(500)) {
        log::warn!("Callbacks did not drain in time");
    }
    Ok(())
}
