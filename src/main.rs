//! chromatone - Main entry point
//!
//! Starts the playback session and the HTTP control server, applies startup
//! defaults from the optional config file, and shuts the session down on
//! ctrl-c/SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chromatone::api;
use chromatone::audio::sink::CpalSink;
use chromatone::config::Config;
use chromatone::events::EventBus;
use chromatone::playback::session::PlaybackSession;

/// Command-line arguments for chromatone
#[derive(Parser, Debug)]
#[command(name = "chromatone")]
#[command(about = "Colored-noise player with HTTP control surface")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "CHROMATONE_PORT")]
    port: Option<u16>,

    /// Audio output device name (overrides the config file)
    #[arg(short, long, env = "CHROMATONE_DEVICE")]
    device: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "CHROMATONE_CONFIG")]
    config: Option<PathBuf>,

    /// List audio output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chromatone=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.list_devices {
        for device in CpalSink::list_devices().context("Failed to enumerate audio devices")? {
            println!("{}", device);
        }
        return Ok(());
    }

    let config = match args.config.as_deref() {
        Some(path) => Config::load(path).context("Failed to load configuration")?,
        None => Config::default(),
    };
    let port = args.port.unwrap_or(config.port);
    let device = args.device.clone().or_else(|| config.audio_device.clone());

    info!("Starting chromatone on port {}", port);
    if let Some(name) = device.as_deref() {
        info!("Audio device: {}", name);
    }

    let events = EventBus::default();
    let session = PlaybackSession::new(events.clone(), device);

    // Apply startup defaults through the normal command surface
    session.select_noise(config.default_noise)?;
    session.set_volume(config.default_volume)?;
    session.set_timer(config.timer_minutes);

    let ctx = api::AppContext {
        session: Arc::clone(&session),
        events,
    };
    let app = api::create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    session.shutdown();
    info!("Server shutdown complete");
    Ok(())
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
