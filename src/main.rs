use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt::Debug, path::PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use casino_sync_server::config::{AppConfig, CliConfig, FileConfig};
use casino_sync_server::content::{ContentStore, EntityKind, SqliteContentStore};
use casino_sync_server::server::daily::run_daily_import;
use casino_sync_server::server::{self, run_server, RequestsLoggingLevel, ServerConfig};
use casino_sync_server::{
    ChannelDispatcher, ContinuationRunner, HttpCatalogApi, Pipeline, SqliteKvStore, TriggerAuth,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the job queue and content databases.
    #[clap(value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to a TOML config file. Values set there override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Base URL of the satellite catalog API.
    #[clap(long)]
    pub satellite_url: Option<String>,

    /// Access key sent with every satellite request.
    #[clap(long)]
    pub satellite_key: Option<String>,

    /// Timeout in seconds for satellite requests.
    #[clap(long, default_value_t = 15)]
    pub satellite_timeout_sec: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir.clone(),
        port: cli_args.port,
        metrics_port: cli_args.metrics_port,
        logging_level: cli_args.logging_level.clone(),
        satellite_url: cli_args.satellite_url.clone(),
        satellite_key: cli_args.satellite_key.clone(),
        satellite_timeout_sec: cli_args.satellite_timeout_sec,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening SQLite job store at {:?}...", config.jobs_db_path());
    let kv_store = Arc::new(SqliteKvStore::new(config.jobs_db_path())?);

    info!(
        "Opening SQLite content store at {:?}...",
        config.content_db_path()
    );
    let content_store: Arc<dyn ContentStore> =
        Arc::new(SqliteContentStore::new(config.content_db_path())?);

    // Initialize metrics system
    info!("Initializing metrics...");
    server::metrics::init_metrics();

    let satellite_url = match &config.satellite_url {
        Some(url) => {
            info!("Satellite API configured at {}", url);
            url.clone()
        }
        None => {
            warn!("No satellite URL configured, sync runs will fail until one is set");
            String::new()
        }
    };
    let api = Arc::new(HttpCatalogApi::new(
        satellite_url,
        config.satellite_key.clone(),
        config.satellite_timeout_sec,
    ));

    let (dispatcher, continuation_rx) =
        ChannelDispatcher::new(config.engine.dispatch_queue_capacity);
    let auth = Arc::new(TriggerAuth::new(Duration::from_secs(
        config.engine.lock_ttl_secs,
    )));
    let pipeline = Arc::new(Pipeline::new(
        kv_store,
        content_store.clone(),
        api,
        Arc::new(dispatcher),
        auth,
        config.engine.process_config(),
        config.per_page,
    ));

    let shutdown = CancellationToken::new();

    let runner = ContinuationRunner::new(continuation_rx, pipeline.registry());
    let runner_shutdown = shutdown.clone();
    tokio::spawn(async move { runner.run(runner_shutdown).await });

    // Spawn background ticker for gauge refreshes
    let gauge_content_store = content_store.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;

            server::metrics::update_memory_usage();
            for kind in EntityKind::all() {
                match gauge_content_store.count_entries(kind) {
                    Ok(count) => server::metrics::set_content_entries(kind.as_db_str(), count),
                    Err(e) => {
                        error!("Failed to count {} entries: {}", kind.as_db_str(), e);
                    }
                }
            }
        }
    });

    if let Some(daily) = &config.daily_import {
        tokio::spawn(run_daily_import(
            pipeline.clone(),
            daily.hour,
            daily.minute,
            shutdown.clone(),
        ));
    }

    info!("Ready to serve at port {}!", config.port);
    info!("Metrics available at port {}!", config.metrics_port);
    let server_config = ServerConfig {
        port: config.port,
        metrics_port: config.metrics_port,
        requests_logging_level: config.logging_level.clone(),
    };
    let result = run_server(pipeline, server_config, env!("GIT_HASH").to_owned()).await;
    shutdown.cancel();
    result
}
