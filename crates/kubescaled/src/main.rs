//! kubescaled — the kubescale daemon.
//!
//! Single binary that assembles the kubescale subsystems:
//! - Resource store (redb)
//! - Scaler sweep loop
//! - REST API
//!
//! # Usage
//!
//! ```text
//! kubescaled run --config /etc/kubescale/kubescale.toml --port 8443
//! kubescaled check-window "Mon-Fri 08:00-20:00 Europe/Berlin" --at 2024-01-02T10:00:00Z
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use kubescale_core::{ScalerConfig, TimeWindow};

#[derive(Parser)]
#[command(name = "kubescaled", about = "kubescale daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the sweep loop and the API server.
    Run {
        /// Path to kubescale.toml.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on.
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for persistent state.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Seconds between sweeps.
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Parse a window expression and test an instant against it.
    CheckWindow {
        /// Window, e.g. "Mon-Fri 08:00-20:00 UTC".
        window: String,

        /// Instant to test (RFC 3339). Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run {
            config,
            port,
            data_dir,
            interval,
        } => {
            let mut cfg = match config {
                Some(path) => ScalerConfig::from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => ScalerConfig::default(),
            };
            if let Some(port) = port {
                cfg.server.port = port;
            }
            if let Some(data_dir) = data_dir {
                cfg.server.data_dir = data_dir;
            }
            if let Some(interval) = interval {
                anyhow::ensure!(interval > 0, "--interval must be positive");
                cfg.sweep.interval_secs = interval;
            }
            run(cfg).await
        }
        Command::CheckWindow { window, at } => check_window(&window, at.as_deref()),
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,kubescaled=debug,kubescale=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(config: ScalerConfig) -> anyhow::Result<()> {
    info!("kubescale daemon starting");

    // Ensure data directory exists.
    let data_dir = &config.server.data_dir;
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;
    let db_path = data_dir.join("kubescale.redb");

    // ── Initialize subsystems ──────────────────────────────────

    let store = kubescale_state::StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    let api_state = kubescale_api::ApiState::new(store, &config);
    let scaler = api_state.scaler.clone();

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let scaler_handle = tokio::spawn(async move {
        scaler.run(shutdown_rx).await;
    });

    // ── Start API server ───────────────────────────────────────

    let router = kubescale_api::build_router(api_state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    let _ = scaler_handle.await;

    info!("kubescale daemon stopped");
    Ok(())
}

fn check_window(raw: &str, at: Option<&str>) -> anyhow::Result<()> {
    let window = TimeWindow::parse(raw)?;
    let now = match at {
        Some(at) => DateTime::parse_from_rfc3339(at)
            .with_context(|| format!("invalid --at instant {at:?}"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    println!("window: {window}");
    println!("at:     {}", now.to_rfc3339());
    println!("inside: {}", window.contains(&now));
    Ok(())
}
