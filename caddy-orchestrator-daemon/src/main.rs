//! Caddy Orchestrator daemon
//!
//! Loads the configuration, opens the store, restores the managed instances
//! and keeps their health monitors running until interrupted.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use caddy_orchestrator_app::adapters::{InMemoryStore, SqliteStore};
use caddy_orchestrator_app::config::StorageBackend;
use caddy_orchestrator_app::{AppConfig, AppState, AppStateBuilder};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "caddy-orchestrator", version, about)]
struct Args {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long, env = "CADDY_ORCHESTRATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Skip pushing the stored routes to every instance at startup
    #[arg(long)]
    no_sync_on_startup: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };
    if args.no_sync_on_startup {
        config.sync.sync_on_startup = false;
    }

    let app = build_app(config).await?;
    tracing::info!("Caddy Orchestrator starting");
    app.run_startup().await.context("startup failed")?;

    let instances = app.instance_service.list_instances().await?;
    tracing::info!("Managing {} instance(s)", instances.len());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    app.shutdown().await;
    tracing::info!("Stopped");
    Ok(())
}

async fn build_app(config: AppConfig) -> anyhow::Result<AppState> {
    let builder = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; state is lost on exit");
            AppStateBuilder::new().store(Arc::new(InMemoryStore::new()))
        }
        StorageBackend::Sqlite => {
            let store = SqliteStore::new(&config.storage.path)
                .await
                .with_context(|| {
                    format!("opening SQLite store {}", config.storage.path.display())
                })?;
            AppStateBuilder::new().store(Arc::new(store))
        }
    };

    Ok(builder.config(config).build()?)
}
