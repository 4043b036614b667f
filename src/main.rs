//! Markup review server.
//!
//! Serves the annotation HTTP API, the live-sync WebSocket, and uploaded
//! image files.
//!
//! # Configuration
//!
//! Environment variables:
//! - `MARKUP_PORT`: Port to listen on (default: 3000)
//! - `MARKUP_DATA_DIR`: Directory for images and project snapshots
//!   (default: `<data dir>/markup-server`)
//! - `MARKUP_CONFIG`: Path to config file
//!   (default: `<config dir>/markup-server/config.yaml`)
//!
//! CLI flags (`--port`, `--data-dir`, `--config`) override both.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use markup::config::Config;
use markup::server::{app, AppState, ImageStore, ProjectStore};

#[derive(Parser)]
#[command(name = "markup-server")]
#[command(version)]
#[command(about = "Collaborative image review server", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Directory for images and project snapshots
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "markup=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config)?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    std::fs::create_dir_all(config.images_dir())?;
    std::fs::create_dir_all(config.projects_dir())?;
    tracing::info!("Data directory: {}", config.data_dir.display());

    let state = AppState::new(
        ImageStore::new(config.images_dir()),
        ProjectStore::new(config.projects_dir()),
    );
    let restored = state.load_persisted().await?;
    if restored > 0 {
        tracing::info!("Restored {} project(s)", restored);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
