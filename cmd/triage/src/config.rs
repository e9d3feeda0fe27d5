//! Config file and alert dump loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use triage_alert::Alert;
use triage_cluster::{CacheConfig, DbscanParams};

/// Configuration file format.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to a JSON array of alerts. Relative paths are resolved against
    /// the config file's directory.
    pub alerts: PathBuf,

    /// Default clustering parameters.
    pub dbscan: DbscanParams,

    pub cache: CacheSection,
}

/// Cache section of the config file.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alerts: PathBuf::from("alerts.json"),
            dbscan: DbscanParams::default(),
            cache: CacheSection::default(),
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        let d = CacheConfig::default();
        Self {
            ttl_secs: d.ttl.as_secs(),
            cleanup_interval_secs: d.cleanup_interval.as_secs(),
        }
    }
}

impl CacheSection {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.ttl_secs),
            cleanup_interval: Duration::from_secs(self.cleanup_interval_secs),
        }
    }
}

/// Load the config file, or defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let mut cfg: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("failed to parse config {}", path.display()))?;

    if cfg.alerts.is_relative() {
        if let Some(dir) = path.parent() {
            cfg.alerts = dir.join(&cfg.alerts);
        }
    }
    Ok(cfg)
}

/// Load alerts from a JSON array file.
pub fn load_alerts(path: &Path) -> Result<Vec<Alert>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read alerts {}", path.display()))?;
    let alerts: Vec<Alert> = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse alerts {}", path.display()))?;
    tracing::debug!(count = alerts.len(), path = %path.display(), "loaded alerts");
    Ok(alerts)
}
