use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

/// Which [`crate::db::StorageBackend`] the store is opened with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feedstore");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("feeds.db").to_string_lossy().to_string()
}

fn default_user_agent() -> String {
    format!("feedstore/{}", env!("CARGO_PKG_VERSION"))
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_concurrent_fetches() -> usize {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            fetch_timeout_secs: default_fetch_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

impl Config {
    /// Loads the user's config file, writing the defaults there on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| StoreError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("feedstore")
            .join("config.toml")
    }

    fn validate(&self) -> Result<()> {
        if self.max_concurrent_fetches == 0 {
            return Err(StoreError::Config(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }
        if self.backend == BackendKind::Sqlite && self.db_path.trim().is_empty() {
            return Err(StoreError::Config("db_path is empty".to_string()));
        }
        Ok(())
    }
}
