mod file_config;

pub use file_config::{DailyImportConfig, EngineConfig, FileConfig, ImportConfig};

use crate::background::ProcessConfig;
use crate::jobs::DEFAULT_PER_PAGE;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// A tick more frequent than this would hammer the queue store for no gain.
const MIN_HEALTHCHECK_INTERVAL_SECS: u64 = 60;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub satellite_url: Option<String>,
    pub satellite_key: Option<String>,
    pub satellite_timeout_sec: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub satellite_url: Option<String>,
    pub satellite_key: Option<String>,
    pub satellite_timeout_sec: u64,

    // Feature configs (with defaults)
    pub engine: EngineSettings,
    pub per_page: u32,
    pub daily_import: Option<DailyImportSettings>,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub time_budget_secs: u64,
    pub lock_ttl_secs: u64,
    pub throttle_secs: u64,
    pub healthcheck_interval_secs: u64,
    pub memory_ceiling_bytes: Option<u64>,
    pub dispatch_queue_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            time_budget_secs: 20,
            lock_ttl_secs: 60,
            throttle_secs: 0,
            healthcheck_interval_secs: 300,
            memory_ceiling_bytes: None,
            dispatch_queue_capacity: 64,
        }
    }
}

impl EngineSettings {
    pub fn process_config(&self) -> ProcessConfig {
        ProcessConfig {
            time_budget: Duration::from_secs(self.time_budget_secs),
            lock_ttl: Duration::from_secs(self.lock_ttl_secs),
            throttle: Duration::from_secs(self.throttle_secs),
            healthcheck_interval: Duration::from_secs(self.healthcheck_interval_secs),
            memory_ceiling_bytes: self.memory_ceiling_bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DailyImportSettings {
    pub hour: u32,
    pub minute: u32,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        // Validate db_dir exists
        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let satellite_url = file.satellite_url.or_else(|| cli.satellite_url.clone());
        let satellite_key = file.satellite_key.or_else(|| cli.satellite_key.clone());
        let satellite_timeout_sec = file
            .satellite_timeout_sec
            .unwrap_or(cli.satellite_timeout_sec);

        // Engine settings - merge file config with defaults
        let engine_file = file.engine.unwrap_or_default();
        let defaults = EngineSettings::default();
        let memory_ceiling_bytes = match &engine_file.memory_limit {
            Some(raw) => Some(parse_memory_limit(raw)?),
            None => None,
        };
        let engine = EngineSettings {
            time_budget_secs: engine_file
                .time_budget_secs
                .unwrap_or(defaults.time_budget_secs),
            lock_ttl_secs: engine_file.lock_ttl_secs.unwrap_or(defaults.lock_ttl_secs),
            throttle_secs: engine_file.throttle_secs.unwrap_or(defaults.throttle_secs),
            healthcheck_interval_secs: engine_file
                .healthcheck_interval_secs
                .unwrap_or(defaults.healthcheck_interval_secs)
                .max(MIN_HEALTHCHECK_INTERVAL_SECS),
            memory_ceiling_bytes,
            dispatch_queue_capacity: engine_file
                .dispatch_queue_capacity
                .unwrap_or(defaults.dispatch_queue_capacity),
        };
        if engine.lock_ttl_secs <= engine.time_budget_secs {
            bail!(
                "engine.lock_ttl_secs ({}) must exceed engine.time_budget_secs ({})",
                engine.lock_ttl_secs,
                engine.time_budget_secs
            );
        }

        let import_file = file.import.unwrap_or_default();
        let per_page = import_file.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if per_page == 0 {
            bail!("import.per_page must be at least 1");
        }

        let daily_import = match file.daily_import {
            Some(daily) if daily.enabled.unwrap_or(false) => {
                let hour = daily.hour.unwrap_or(0);
                let minute = daily.minute.unwrap_or(0);
                if hour > 23 || minute > 59 {
                    bail!("daily_import time {hour:02}:{minute:02} is not a valid time of day");
                }
                Some(DailyImportSettings { hour, minute })
            }
            _ => None,
        };

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            satellite_url,
            satellite_key,
            satellite_timeout_sec,
            engine,
            per_page,
            daily_import,
        })
    }

    pub fn jobs_db_path(&self) -> PathBuf {
        self.db_dir.join("jobs.db")
    }

    pub fn content_db_path(&self) -> PathBuf {
        self.db_dir.join("content.db")
    }
}

fn parse_memory_limit(raw: &str) -> Result<u64> {
    let byte = byte_unit::Byte::parse_str(raw, true)
        .map_err(|err| anyhow::anyhow!("Invalid engine.memory_limit {raw:?}: {err}"))?;
    Ok(byte.as_u64())
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
