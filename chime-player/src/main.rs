//! chime-player - main entry point
//!
//! Wires the playback engine, the time keeper, the weather poller, the
//! competing-audio monitor, and the coordinator together over the event
//! bus, then watches the settings file for changes until shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rodio::OutputStream;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chime_common::{EventBus, Settings, SharedSettings};
use chime_player::audio::output::RodioSink;
use chime_player::coordinator::{Coordinator, CoordinatorInputs, Notifier};
use chime_player::playback::PlaybackEngine;
use chime_player::tabaudio::{self, NullProbe};
use chime_player::timekeeper::TimeKeeper;
use chime_player::weather::{self, HttpWeatherFetch, DEFAULT_ENDPOINT};

/// Command-line arguments for chime-player
#[derive(Parser, Debug)]
#[command(name = "chime-player")]
#[command(about = "Ambient hourly-music daemon")]
#[command(version)]
struct Args {
    /// Settings file (TOML), watched for changes while running
    #[arg(short, long, default_value = "chime.toml", env = "CHIME_CONFIG")]
    config: PathBuf,

    /// Root folder containing the track files
    #[arg(short, long, env = "CHIME_MEDIA_ROOT")]
    media_root: PathBuf,

    /// Weather endpoint base URL
    #[arg(long, default_value = DEFAULT_ENDPOINT, env = "CHIME_WEATHER_URL")]
    weather_url: String,
}

/// How often the settings file is checked for changes.
const SETTINGS_POLL: std::time::Duration = std::time::Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chime_player=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting chime-player");
    info!("Media root: {}", args.media_root.display());

    let settings = Settings::load(&args.config).context("Failed to load settings")?;
    let shared = SharedSettings::new(settings.clone());

    let bus = Arc::new(EventBus::new(256));
    let notifier = Notifier::new(Arc::clone(&bus));

    // Audio output; the stream must outlive every sink built on it
    let (_stream, stream_handle) =
        OutputStream::try_default().context("Failed to open audio output")?;
    let (sink_tx, sink_rx) = mpsc::unbounded_channel();
    let sink = RodioSink::new(stream_handle, args.media_root.clone(), sink_tx);

    let engine = PlaybackEngine::new(
        sink,
        sink_rx,
        bus.subscribe(),
        notifier.clone(),
        shared.clone(),
        &settings,
        StdRng::from_entropy(),
    );
    tokio::spawn(engine.run());
    info!("Playback engine started");

    let (hour_tx, hour_rx) = mpsc::unbounded_channel();
    TimeKeeper::new(Local::now()).spawn(hour_tx);

    let (weather_changed_tx, weather_rx) = mpsc::unbounded_channel();
    let fetcher =
        HttpWeatherFetch::new(args.weather_url).context("Failed to build weather client")?;
    let (weather_handle, _weather_task) = weather::spawn(
        fetcher,
        settings.zip_code.clone(),
        settings.country_code.clone(),
        weather_changed_tx,
    );

    let (tab_tx, tab_rx) = mpsc::unbounded_channel();
    let (tab_handle, _tab_task) = tabaudio::spawn(NullProbe, tab_tx);

    let (settings_tx, settings_rx) = mpsc::unbounded_channel();
    let coordinator = Coordinator::new(
        shared,
        notifier,
        weather_handle,
        tab_handle,
        CoordinatorInputs {
            hour_rx,
            weather_rx,
            tab_rx,
            settings_rx,
        },
        Local::now(),
        StdRng::from_entropy(),
    );
    tokio::spawn(coordinator.run());

    tokio::spawn(watch_settings(args.config, settings_tx));

    shutdown_signal().await;
    info!("Shutdown complete");
    Ok(())
}

/// Polls the settings file mtime and forwards freshly parsed snapshots to
/// the coordinator. Parse failures keep the previous snapshot.
async fn watch_settings(path: PathBuf, tx: mpsc::UnboundedSender<Settings>) {
    let mut interval = tokio::time::interval(SETTINGS_POLL);
    let mut last_modified = modified_at(&path);
    loop {
        interval.tick().await;
        let modified = modified_at(&path);
        if modified.is_none() || modified == last_modified {
            continue;
        }
        last_modified = modified;
        match Settings::load(&path) {
            Ok(settings) => {
                info!("settings file changed, applying");
                if tx.send(settings).is_err() {
                    return;
                }
            }
            Err(e) => warn!("ignoring settings update: {}", e),
        }
    }
}

fn modified_at(path: &std::path::Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
