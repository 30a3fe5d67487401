use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub catalog: CatalogConfig,
    #[serde(default = "default_broadcast_config")]
    pub broadcast: BroadcastConfig,
    #[serde(default = "default_storage_config")]
    pub storage: StorageConfig,
    #[serde(default)]
    pub admin: Option<AdminConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    /// Endpoint serving the quote catalog as a JSON array
    pub feed_url: String,
    /// Base URL that relative entry links are joined onto
    pub site_base_url: String,
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BroadcastConfig {
    /// Six-field cron expression (seconds first) for the daily send
    #[serde(default = "default_broadcast_cron")]
    pub cron: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdminConfig {
    /// Listen address for the manual broadcast trigger, e.g. "127.0.0.1:8719"
    pub listen_addr: String,
    pub bearer_token: String,
}

fn default_cache_ttl_hours() -> u64 {
    24
}

fn default_broadcast_cron() -> String {
    "0 0 9 * * *".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("pagebot.db")
}

fn default_broadcast_config() -> BroadcastConfig {
    BroadcastConfig {
        cron: default_broadcast_cron(),
    }
}

fn default_storage_config() -> StorageConfig {
    StorageConfig {
        database_path: default_db_path(),
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}
