use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub satellite_url: Option<String>,
    pub satellite_key: Option<String>,
    pub satellite_timeout_sec: Option<u64>,

    // Feature configs
    pub engine: Option<EngineConfig>,
    pub import: Option<ImportConfig>,
    pub daily_import: Option<DailyImportConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub time_budget_secs: Option<u64>,
    pub lock_ttl_secs: Option<u64>,
    pub throttle_secs: Option<u64>,
    pub healthcheck_interval_secs: Option<u64>,
    /// Resident-memory ceiling for a single execution, e.g. "512 MB".
    /// Absent means no ceiling is enforced.
    pub memory_limit: Option<String>,
    pub dispatch_queue_capacity: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ImportConfig {
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DailyImportConfig {
    pub enabled: Option<bool>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
