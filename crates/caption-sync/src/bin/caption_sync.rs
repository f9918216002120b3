//! Headless caption synchronization runner
//!
//! Requests captions for a video from the caption service, then plays them
//! back against a simulated player and logs every caption change.
//!
//! # Usage
//!
//! ```bash
//! # Defaults (ws://localhost:8000/ws/realtime, 100ms polling)
//! cargo run --bin caption-sync -- https://youtu.be/dQw4w9WgXcQ
//!
//! # Custom caption service
//! CAPTION_SYNC_BACKEND_URL="wss://captions.example.com/ws/realtime" \
//! cargo run --bin caption-sync -- https://youtu.be/dQw4w9WgXcQ
//!
//! # Configuration file, JSON logs
//! cargo run --bin caption-sync -- --config caption-sync.toml --json-logs https://youtu.be/dQw4w9WgXcQ
//! ```
//!
//! # Environment Variables
//!
//! - `CAPTION_SYNC_BACKEND_URL`: Caption service WebSocket URL (default: `ws://localhost:8000/ws/realtime`)
//! - `CAPTION_SYNC_POLL_INTERVAL_MS`: Position polling cadence (default: `100`)
//! - `CAPTION_SYNC_CONNECT_TIMEOUT_MS`: Channel establishment timeout (default: `10000`)
//! - `CAPTION_SYNC_SHOW_SOURCE`: Log the source text next to the translation (default: `true`)
//! - `CAPTION_SYNC_AUTOPLAY`: Start playing as soon as the player is ready (default: `false`)
//! - `RUST_LOG`: Logging level (default: `info`)

use anyhow::Context;
use caption_sync::{
    is_valid_video_url, ControllerHandle, LogRenderer, PlaybackPhase, SessionState,
    SimulatedPlayerFactory, SyncConfig, SyncController,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "caption-sync", version, about = "Play translated captions in sync with a video")]
struct Args {
    /// Video URL to request captions for
    url: String,

    /// TOML configuration file (replaces CAPTION_SYNC_* variables)
    #[arg(long, env = "CAPTION_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Caption service WebSocket URL
    #[arg(long)]
    backend_url: Option<String>,

    /// Position polling cadence in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Simulated media length in seconds (default: end of the last caption,
    /// required when the track is empty)
    #[arg(long)]
    duration: Option<f64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    info!(version = caption_sync::version(), "Caption sync starting");

    if !is_valid_video_url(&args.url) {
        anyhow::bail!("Please enter a valid video URL: {}", args.url);
    }

    let config = load_config(&args)?;
    info!(
        backend_url = %config.backend_url,
        poll_interval_ms = config.poll_interval_ms,
        connect_timeout_ms = config.connect_timeout_ms,
        autoplay = config.autoplay,
        "Configuration loaded"
    );

    let (mut controller, events, mut receiver) = SyncController::with_websocket(
        config,
        // An empty track with no --duration would never end
        Box::new(SimulatedPlayerFactory::new(args.duration).require_duration()),
        Box::new(LogRenderer::new()),
    )?;
    let handle = ControllerHandle::new(events);
    let mut states = controller.subscribe();

    let driver = tokio::spawn(async move {
        controller.run(&mut receiver).await;
    });

    handle.submit(args.url.as_str());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut started = false;
    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Ctrl+C received, shutting down");
                break Ok(());
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = states.borrow_and_update().clone();
                match state {
                    SessionState::Ready(PlaybackPhase::Paused) if !started => {
                        started = true;
                        handle.play();
                    }
                    SessionState::Ready(PlaybackPhase::Playing) => started = true,
                    // Nothing else pauses the simulated player
                    SessionState::Ready(PlaybackPhase::Paused) => {
                        info!("Playback finished");
                        break Ok(());
                    }
                    SessionState::Failed { message } => {
                        break Err(anyhow::anyhow!(message));
                    }
                    _ => {}
                }
            }
        }
    };

    handle.shutdown();
    driver.await.context("Controller task failed")?;

    outcome
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn load_config(args: &Args) -> anyhow::Result<SyncConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            SyncConfig::from_toml_str(&text)?
        }
        None => SyncConfig::from_env()?,
    };

    if let Some(backend_url) = &args.backend_url {
        config.backend_url = backend_url.clone();
    }
    if let Some(poll_interval_ms) = args.poll_interval_ms {
        config.poll_interval_ms = poll_interval_ms;
    }

    config.validate()?;
    Ok(config)
}
