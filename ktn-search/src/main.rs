//! ktn-search - read-only HTTP search over the order database

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ktn_common::config::{AppConfig, ConfigOverrides};
use ktn_common::db::OrderStore;
use ktn_search::{build_router, db, AppState};

/// Command-line arguments for ktn-search
#[derive(Parser, Debug)]
#[command(name = "ktn-search")]
#[command(about = "Order search API for KTN")]
#[command(version)]
struct Args {
    /// TOML config file (defaults to the platform config dir)
    #[arg(short, long, env = "KTN_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, env = "KTN_DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "KTN_API_PORT")]
    port: Option<u16>,

    /// Log level when RUST_LOG is not set
    #[arg(long, env = "KTN_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(
        args.config.as_deref(),
        ConfigOverrides {
            database_path: args.database_path,
            api_port: args.port,
            log_level: args.log_level,
            ..Default::default()
        },
    )
    .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting ktn-search v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Database path: {}", config.database_path.display());

    let pool = match db::connect_readonly(&config.database_path).await {
        Ok(pool) => {
            info!("Connected to database (read-only)");
            pool
        }
        Err(e) => {
            error!("Failed to connect to database: {:#}", e);
            return Err(e);
        }
    };

    let app = build_router(AppState::new(OrderStore::new(pool)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("ktn-search listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
