//! # loopwatch
//!
//! Loops one audio file and swaps in the new audio every time the file is
//! saved, without stopping the output stream.

mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use loopwatch_audio::{
    list_output_devices, shared_pending_slot, AudioOutput, PlaybackEngine, PositionReporter,
    SourceWatcher,
};
use loopwatch_core::{ConfigSource, PlayerConfig};
use status::StatusLine;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for loopwatch
#[derive(Parser, Debug)]
#[command(name = "loopwatch")]
#[command(about = "Loop an audio file and hot-reload it whenever it changes")]
#[command(version)]
struct Args {
    /// Audio file to loop and watch; plays silence when omitted
    #[arg(env = "LOOPWATCH_FILE")]
    path: Option<PathBuf>,

    /// Configuration file (default: config.toml in the platform config directory)
    #[arg(short, long, env = "LOOPWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Milliseconds between checks of the file
    #[arg(long, env = "LOOPWATCH_TICK_MS")]
    tick_ms: Option<u64>,

    /// Requested output sample rate
    #[arg(long, env = "LOOPWATCH_SAMPLE_RATE")]
    sample_rate: Option<u32>,

    /// Requested output channel count
    #[arg(long, env = "LOOPWATCH_CHANNELS")]
    channels: Option<u16>,

    /// Print the available output devices and exit
    #[arg(long)]
    list_devices: bool,
}

impl Args {
    fn config_source(&self) -> ConfigSource {
        ConfigSource::locate(self.config.as_deref())
    }

    /// Config file (or defaults) with command-line overrides applied.
    fn resolve_config(&self, source: &ConfigSource) -> Result<PlayerConfig> {
        let mut config = source.load()?;

        if let Some(tick_ms) = self.tick_ms {
            config.tick_interval_ms = tick_ms;
        }
        if let Some(sample_rate) = self.sample_rate {
            config.output.sample_rate = sample_rate;
        }
        if let Some(channels) = self.channels {
            config.output.channels = channels;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let source = args.config_source();
    let config = args
        .resolve_config(&source)
        .with_context(|| format!("Failed to load configuration from {source}"))?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .init();

    info!("Starting loopwatch v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {source}");

    if args.list_devices {
        for name in list_output_devices().context("Failed to list output devices")? {
            println!("{name}");
        }
        return Ok(());
    }

    match &args.path {
        Some(path) => info!("Watching {}", path.display()),
        None => info!("No file given, playing silence"),
    }

    let slot = shared_pending_slot();
    let engine = PlaybackEngine::new(slot.clone());
    let reporter = PositionReporter::new(engine.status());

    // The engine moves into the audio callback from here on
    let output = AudioOutput::new(engine, config.output).context("Failed to open audio output")?;
    info!(
        "Audio output: {} ({} Hz, {} channels)",
        output.device_name(),
        output.sample_rate(),
        output.channels()
    );

    let mut watcher = SourceWatcher::new(args.path.clone(), slot);
    let mut status = StatusLine::default();

    let mut ticker = tokio::time::interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                watcher.tick();
                status.update(&reporter.snapshot(watcher.state()));
            }
            result = &mut shutdown => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Shutting down");
                break;
            }
        }
    }

    // Stop the stream first: that drops the engine and its active buffer.
    // The watcher goes next, then the slot with anything still unclaimed.
    drop(output);
    drop(watcher);

    info!("Shutdown complete");
    Ok(())
}
