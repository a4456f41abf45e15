//! # Lidar Server
//!
//! Binary entry point: parses configuration, installs logging, and serves
//! the scanner control API until interrupted.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use lidar_core::TokioProcessRunner;
use lidar_server::{
    AppState, create_app,
    infra::{
        config::{Config, ServeArgs},
        logging,
    },
};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "lidar-server")]
#[command(about = "HTTP control server for a lidar scanner")]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads env fallbacks
    let env_loaded = dotenvy::dotenv().is_ok();
    let cli = Cli::parse();

    let mut config = Config::from_args(cli.serve)?;
    let _log_guard = logging::init_tracing(config.log_file.as_deref())?;
    if env_loaded {
        info!("loaded .env file");
    }

    config.ensure_directories()?;
    config
        .normalize_paths()
        .context("failed to resolve scan directory")?;
    config.warn_missing_scripts();

    let addr = config.socket_addr()?;
    info!(
        scan_dir = %config.scan_dir.display(),
        extension = %config.scan_extension,
        "scan archive ready"
    );

    let state = AppState::new(&config, Arc::new(TokioProcessRunner));
    let app = create_app(state.clone());

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Starting lidar server on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let status = state.scans().status();
    if status.phase.is_active() {
        warn!(
            phase = %status.phase,
            scan = ?status.current_scan,
            "shutting down with scanner not idle"
        );
    }
    state.scans().wait_for_processing().await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
