//! TheStuu engine binary.
//!
//! Wires the pieces together: configuration, project store, native
//! backend peer, the engine task, and the WebSocket client gateway.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{broadcast, mpsc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stuuconf::StuuConfig;
use stuuproto::NativePeer;
use thestuu::engine::{Engine, EngineRequest};
use thestuu::gateway::{self, GatewayState};
use thestuu::persistence::{ProjectStore, DEFAULT_PROJECT_FILE};

/// The TheStuu engine
///
/// Headless DAW core: project model, mutation engine, transport clock,
/// native-backend IPC, and the WebSocket client gateway.
///
/// Configuration is loaded from (in order, later wins):
/// 1. Compiled defaults
/// 2. /etc/thestuu/config.toml
/// 3. ~/.config/thestuu/config.toml
/// 4. ./thestuu.toml (or --config path)
/// 5. Environment variables (THESTUU_*)
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (overrides ./thestuu.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show loaded configuration and exit
    #[arg(long)]
    show_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = StuuConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    if cli.show_config {
        println!("# Configuration sources:");
        for path in &sources.files {
            println!("#   - {}", path.display());
        }
        if !sources.env_overrides.is_empty() {
            println!("# Environment overrides:");
            for var in &sources.env_overrides {
                println!("#   - {}", var);
            }
        }
        println!();
        println!("{}", config.to_toml());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("thestuu {} starting", env!("CARGO_PKG_VERSION"));
    for path in &sources.files {
        info!("config: {}", path.display());
    }
    if !sources.env_overrides.is_empty() {
        info!("config env overrides: {:?}", sources.env_overrides);
    }

    let store = ProjectStore::new(config.paths.project_dir.clone());
    let project = store
        .load_or_seed(DEFAULT_PROJECT_FILE)
        .context("Failed to open the default project")?;
    info!(
        "project \"{}\" ready in {}",
        project.project_name,
        config.paths.project_dir.display()
    );

    let peer = if config.native.enabled {
        let peer = NativePeer::with_timing(
            &config.native.socket_path,
            Duration::from_millis(config.native.request_timeout_ms),
            Duration::from_millis(config.native.reconnect_delay_ms),
        );
        peer.start();
        info!(
            "native backend socket: {}",
            config.native.socket_path.display()
        );
        Some(peer)
    } else {
        info!("native backend disabled, transport runs on the local clock");
        None
    };

    let (events_tx, _) = broadcast::channel(256);
    let (engine_tx, engine_rx) = mpsc::channel::<EngineRequest>(64);

    let engine = Engine::new(
        project,
        config.clone(),
        store,
        peer.clone(),
        events_tx.clone(),
        DEFAULT_PROJECT_FILE,
    );
    let engine_task = tokio::spawn(engine.run(engine_rx));

    let app = gateway::router(GatewayState {
        engine: engine_tx,
        events: events_tx,
    });
    let addr = format!("{}:{}", config.bind.engine_host, config.bind.engine_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind client gateway on {addr}"))?;
    info!("client gateway listening on ws://{addr}/ws");

    tokio::select! {
        result = axum::serve(listener, app) => result.context("client gateway failed")?,
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }

    if let Some(peer) = peer {
        peer.stop().await;
    }
    engine_task.abort();
    Ok(())
}
