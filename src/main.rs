//! Joymap - controller remapping engine
//!
//! Without driver bindings the binary replays recorded snapshots through the
//! engine or the calibration service and logs the resulting output.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use joymap::config::{AppConfig, ProfileWatcher};
use joymap::output::ConsoleSink;
use joymap::replay::{self, Recording};
use joymap::{InputCalibrationService, InputFilter, MappingEngine, MappingProfile};

/// Joymap - remap controllers onto virtual joysticks and keys
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "JOYMAP_CONFIG", default_value = "joymap.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recording through a mapping profile
    Run {
        /// Recorded snapshots (YAML list)
        recording: PathBuf,
        /// Profile to use instead of engine.profile
        #[arg(short, long)]
        profile: Option<PathBuf>,
    },
    /// Replay a recording through the calibration service
    Calibrate {
        /// Recorded snapshots (YAML list)
        recording: PathBuf,
        /// Control kinds to detect
        #[arg(short, long, value_enum, default_value = "all")]
        filter: FilterArg,
        /// Axis deviation from rest (defaults to calibration.detection_threshold)
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Validate a profile and print a summary
    Check {
        profile: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FilterArg {
    All,
    Axes,
    Buttons,
    Hats,
}

impl From<FilterArg> for InputFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => InputFilter::ALL,
            FilterArg::Axes => InputFilter::AXES,
            FilterArg::Buttons => InputFilter::BUTTONS,
            FilterArg::Hats => InputFilter::HATS,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting joymap v{}...", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config).await?;

    match args.command {
        Command::Run { recording, profile } => run(&config, &recording, profile).await,
        Command::Calibrate {
            recording,
            filter,
            threshold,
            timeout_ms,
        } => {
            calibrate(
                &config,
                &recording,
                filter.into(),
                threshold,
                timeout_ms.map(Duration::from_millis),
            )
            .await
        }
        Command::Check { profile } => check(&profile).await,
    }
}

/// Config file is optional; defaults apply when it is missing
async fn load_config(path: &str) -> Result<AppConfig> {
    if Path::new(path).exists() {
        let config = AppConfig::load(path).await?;
        info!("Configuration file: {}", path);
        Ok(config)
    } else {
        info!("No configuration file at {}, using defaults", path);
        Ok(AppConfig::default())
    }
}

async fn run(config: &AppConfig, recording_path: &Path, profile: Option<PathBuf>) -> Result<()> {
    let profile_path = profile
        .or_else(|| config.engine.profile.clone())
        .context("No profile given (pass --profile or set engine.profile)")?;
    let recording = Recording::load(recording_path).await?;

    let (mut watcher, profile) = if config.engine.hot_reload {
        let (watcher, profile) = ProfileWatcher::new(&profile_path).await?;
        (Some(watcher), profile)
    } else {
        (None, MappingProfile::load(&profile_path).await?)
    };

    let sink = Arc::new(ConsoleSink::new());
    let engine = MappingEngine::new(sink.clone()).with_keyboard(sink.clone());
    engine.load_profile(profile)?;

    let initial = config.engine.initial_sync.then(|| recording.initial_state());
    engine.start(initial.as_deref())?;

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let playback = replay::play(
        &recording,
        config.engine.poll_rate_hz,
        cancel.clone(),
        |snapshot| engine.process_input(snapshot),
    );
    tokio::pin!(playback);

    let frames = loop {
        tokio::select! {
            frames = &mut playback => break frames,
            Some(profile) = next_reload(&mut watcher) => {
                // Profiles cannot change mid-run
                engine.stop();
                if let Err(e) = engine.load_profile(profile) {
                    warn!("Reloaded profile rejected: {}", e);
                }
                engine.start(None)?;
            }
        }
    };

    engine.stop();

    println!("\n{}", "=== Replay finished ===".bold().cyan());
    println!("  Frames played:  {}", frames.to_string().green());
    println!("  Output changes: {}", sink.change_count().to_string().green());
    Ok(())
}

async fn next_reload(watcher: &mut Option<ProfileWatcher>) -> Option<MappingProfile> {
    match watcher {
        Some(watcher) => watcher.next_profile().await,
        None => std::future::pending().await,
    }
}

async fn calibrate(
    config: &AppConfig,
    recording_path: &Path,
    filter: InputFilter,
    threshold: Option<f32>,
    timeout: Option<Duration>,
) -> Result<()> {
    let recording = Recording::load(recording_path).await?;
    let service = Arc::new(InputCalibrationService::new(config.calibration.clone()));
    let threshold = threshold.unwrap_or(config.calibration.detection_threshold);

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let mut waiter = {
        let service = service.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            service
                .wait_for_input(filter, threshold, timeout, cancel)
                .await
        })
    };
    while !service.is_active() && !waiter.is_finished() {
        tokio::task::yield_now().await;
    }

    let playback = replay::play(
        &recording,
        config.engine.poll_rate_hz,
        cancel.child_token(),
        |snapshot| service.deliver(snapshot),
    );

    let detected = tokio::select! {
        result = &mut waiter => result??,
        _ = playback => {
            // Recording exhausted: end the session
            service.cancel();
            waiter.await??
        }
    };

    match detected {
        Some(input) => {
            println!("\n{} {}", "Detected:".bold().green(), input.source.to_string().bold());
            println!("{}", serde_json::to_string_pretty(&input)?);
        }
        None => println!("\n{}", "No input detected".yellow()),
    }
    Ok(())
}

async fn check(path: &Path) -> Result<()> {
    let profile = MappingProfile::load(path).await?;

    println!("\n{} {}", "Profile:".bold().cyan(), profile.name.bold());
    if let Some(description) = &profile.description {
        println!("  {}", description.dimmed());
    }
    println!("  Axis mappings:           {}", profile.axis_mappings.len());
    println!("  Button mappings:         {}", profile.button_mappings.len());
    println!("  Hat mappings:            {}", profile.hat_mappings.len());
    println!("  Axis-to-button mappings: {}", profile.axis_to_button_mappings.len());
    println!("  Button-to-axis mappings: {}", profile.button_to_axis_mappings.len());
    println!("  Shift layers:            {}", profile.shift_layers.len());

    let devices: Vec<String> = profile
        .virtual_devices()
        .iter()
        .map(|id| format!("vjoy{}", id))
        .collect();
    println!("  Virtual devices:         {}", devices.join(", ").green());
    println!("\n{}", "✓ Profile is valid".green());
    Ok(())
}

fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            cancel.cancel();
        }
    });
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
