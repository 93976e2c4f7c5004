//! Tracker configuration and data directory resolution

use crate::core::engine::DEFAULT_RAIL_CAP;
use crate::error::{Error, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "PAGETURNER_DATA";

const APP_DIR: &str = "pageturner";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Where the store and snapshots live. Unset means the platform default.
    pub data_dir: Option<PathBuf>,
    pub store_file: String,
    /// Fallback rail length when no catalog item matches.
    pub rail_cap: usize,
    /// Replaces the built-in catalog when set.
    pub catalog_path: Option<PathBuf>,
    pub log_level: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            store_file: "pageturner.json".to_string(),
            rail_cap: DEFAULT_RAIL_CAP,
            catalog_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl TrackerConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: TrackerConfig = toml::from_str(contents)?;
        if config.rail_cap == 0 {
            return Err(Error::Config("rail_cap must be at least 1".to_string()));
        }
        if config.store_file.trim().is_empty() {
            return Err(Error::Config("store_file must not be empty".to_string()));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Loads the given file, or the per-user default location when `None`.
    /// A missing or broken file is never fatal: it logs a warning and falls
    /// back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(p) => p,
            None => return Self::default(),
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            warn!("Ignoring config {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Data directory, by priority: config file, environment, platform
    /// data dir, then `./pageturner_data`.
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                return PathBuf::from(dir);
            }
        }
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("./pageturner_data"))
    }

    pub fn store_path(&self) -> PathBuf {
        self.resolve_data_dir().join(&self.store_file)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.resolve_data_dir().join("ledger.bin")
    }
}

/// `<config dir>/pageturner/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}
