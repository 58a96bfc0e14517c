//! CLI Entry Point for vidcap
//!
//! Drives a capture session on the simulated camera and reports what
//! happened.
//!
//! # Usage
//!
//! Capture 100 frames and print the counters as JSON:
//! ```bash
//! vidcap run --frames 100 --fps 60 --format rgb
//! ```
//!
//! Validate a configuration file:
//! ```bash
//! vidcap check-config config/vidcap.toml
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_vidcap::config::{VidcapConfig, DEFAULT_CONFIG_PATH};
use rust_vidcap::format::PixelFormat;
use rust_vidcap::hardware::MockBackend;
use rust_vidcap::session::{CaptureSession, FrameReader};
use rust_vidcap::stats::StatsSnapshot;
use rust_vidcap::{logging, FrameStatus};
use serde::Serialize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "vidcap")]
#[command(about = "Double-buffered camera capture on a simulated camera", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mock capture session and print statistics
    Run {
        /// Configuration file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Number of frames to consume
        #[arg(long, default_value_t = 30)]
        frames: usize,

        /// Override the simulated frame rate
        #[arg(long)]
        fps: Option<f64>,

        /// Override the pixel format (rgb or bgr)
        #[arg(long)]
        format: Option<PixelFormat>,
    },

    /// Validate a configuration file and print the effective settings
    CheckConfig {
        /// Path to the TOML file
        path: PathBuf,
    },
}

#[derive(Serialize)]
struct RunReport {
    frames_consumed: usize,
    bytes_consumed: u64,
    incomplete_frames: usize,
    first_sequence: Option<u64>,
    last_sequence: Option<u64>,
    stats: StatsSnapshot,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            frames,
            fps,
            format,
        } => run(config, frames, fps, format),
        Commands::CheckConfig { path } => check_config(path),
    }
}

fn run(path: PathBuf, frames: usize, fps: Option<f64>, format: Option<PixelFormat>) -> Result<()> {
    let mut config = VidcapConfig::load_from(&path)
        .with_context(|| format!("loading {}", path.display()))?;
    if let Some(fps) = fps {
        config.mock.fps = fps;
    }
    if let Some(format) = format {
        config.capture.format = format;
    }
    config.validate().context("invalid configuration")?;
    logging::init_from_config(&config)?;

    info!(
        name = %config.application.name,
        frames,
        fps = config.mock.fps,
        "starting mock capture"
    );

    let backend = MockBackend::from_settings(&config.mock);
    let session = CaptureSession::start(config.capture.clone(), backend)
        .context("capture start-up failed")?;

    let reader = session.reader();
    let probe = session.backend().probe();
    let consumer = thread::spawn(move || consume(&reader, frames));

    // A finite mock payload never closes the session by itself, and the
    // latest-frame-wins exchange may skip frames, so stop once the payload
    // is exhausted and let the consumer observe the shutdown.
    while !consumer.is_finished() {
        if probe.is_finished() {
            thread::sleep(Duration::from_millis(50));
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    let stats = session.stop();
    let mut report = consumer
        .join()
        .map_err(|_| anyhow::anyhow!("consumer thread panicked"))?;
    report.stats = stats;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn consume(reader: &FrameReader, frames: usize) -> RunReport {
    let mut report = RunReport {
        frames_consumed: 0,
        bytes_consumed: 0,
        incomplete_frames: 0,
        first_sequence: None,
        last_sequence: None,
        stats: StatsSnapshot::default(),
    };

    for frame in reader.frames().take(frames) {
        report.frames_consumed += 1;
        report.bytes_consumed += frame.len() as u64;
        if frame.status != FrameStatus::Complete {
            report.incomplete_frames += 1;
        }
        report.first_sequence.get_or_insert(frame.sequence);
        report.last_sequence = Some(frame.sequence);
    }
    report
}

fn check_config(path: PathBuf) -> Result<()> {
    if !path.exists() {
        bail!("configuration file not found: {}", path.display());
    }
    let config = VidcapConfig::load_from(&path)
        .with_context(|| format!("parsing {}", path.display()))?;
    config.validate().context("invalid configuration")?;

    println!("{}: ok", path.display());
    println!("{}", config.to_toml()?);
    Ok(())
}
