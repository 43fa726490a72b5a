//! # crawlq server
//!
//! Hands crawl work to a fleet of workers over HTTP. Each worker leases a
//! small set of news domains, draws politeness-limited batches from them
//! and reports fetch failures back so misbehaving domains can be paused.
//!
//! State lives in memory; the backlog itself is read from PostgreSQL.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use crawlq_core::coordinator::{PostgresBacklogStore, WorkQueueCoordinator};
use crawlq_server::{
    AppState, create_app,
    infra::config::{Config, ConfigLoad, ConfigLoader},
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "crawlq-server")]
#[command(about = "Work-distribution coordinator for the local-news crawler")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Path to a crawlq.toml configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply the bundled backlog migrations and exit
    Migrate,
    /// Verify connectivity and that the backlog tables exist, then exit
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_runtime_config(&cli.serve)?;

    if let Some(command) = cli.command {
        match command {
            Command::Db(DbCommand::Migrate) => {
                run_db_migrate(&config).await?;
                return Ok(());
            }
            Command::Db(DbCommand::Check) => {
                run_db_check(&config).await?;
                return Ok(());
            }
        }
    }

    run_server(config).await
}

fn load_runtime_config(args: &ServeArgs) -> anyhow::Result<Arc<Config>> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = &args.env_file {
        loader = loader.with_env_file(path);
    }

    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration file loaded");
    }

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }

    let coordinator = &config.coordinator;
    info!(
        coordinator.domain_cooldown_secs = coordinator.domain_cooldown_secs,
        coordinator.max_consecutive_failures =
            coordinator.max_consecutive_failures,
        coordinator.pause_duration_secs = coordinator.pause_duration_secs,
        coordinator.worker_timeout_secs = coordinator.worker_timeout_secs,
        coordinator.min_domains_per_worker = coordinator.min_domains_per_worker,
        coordinator.max_domains_per_worker = coordinator.max_domains_per_worker,
        "coordinator configuration in effect"
    );

    Ok(Arc::new(config))
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let url = config.database.url.as_deref().ok_or_else(|| {
        anyhow!("DATABASE_URL is required; set it or add [database] url to crawlq.toml")
    })?;

    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(url)
        .await
        .context("failed to connect to PostgreSQL")
}

async fn run_db_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    crawlq_core::MIGRATOR
        .run(&pool)
        .await
        .context("database migration failed")?;
    info!("Database migrations applied successfully");
    Ok(())
}

async fn run_db_check(config: &Config) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    PostgresBacklogStore::new(pool)
        .await
        .context("backlog store check failed")?;
    info!("Backlog store check passed");
    Ok(())
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    let pool = connect(&config).await?;
    let store = PostgresBacklogStore::new(pool)
        .await
        .context("backlog store is not ready; run `crawlq-server db migrate`")?;

    let coordinator = Arc::new(WorkQueueCoordinator::new(
        config.coordinator.clone(),
        Arc::new(store),
    ));
    let state = AppState::new(coordinator, Arc::clone(&config));
    let app = create_app(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "Starting crawlq coordinator");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down gracefully");
}
