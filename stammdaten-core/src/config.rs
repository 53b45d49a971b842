//! Store configuration, loaded from a TOML file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::retry::RetryPolicy;

fn default_cache_ttl_secs() -> u64 {
    15
}

/// Which storage engine backs the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Remote spreadsheet over the values API.
    Google,
    /// Multi-tab workbook file on disk.
    #[default]
    Local,
}

/// Remote engine settings. How the access token is obtained is outside
/// this store's scope; the caller's auth layer provides it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub spreadsheet_id: String,
    pub access_token: String,
}

/// Local engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    pub workbook_file: PathBuf,
}

/// Configuration at ~/.config/stammdaten/config.toml (or an explicit path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage_mode: StorageMode,

    pub google: Option<GoogleConfig>,
    pub local: Option<LocalConfig>,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default)]
    pub retry: RetryPolicy,
}

impl AppConfig {
    pub fn config_path() -> StoreResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| StoreError::Config("Could not determine config directory".into()))?
            .join("stammdaten");

        Ok(config_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            StoreError::Config(format!("could not read {}: {err}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|err| StoreError::Config(format!("invalid config {}: {err}", path.display())))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Remote settings, required in google mode.
    pub fn google(&self) -> StoreResult<&GoogleConfig> {
        self.google.as_ref().ok_or_else(|| {
            StoreError::Config("storage_mode is 'google' but the [google] section is missing".into())
        })
    }

    /// Local settings, required in local mode.
    pub fn local(&self) -> StoreResult<&LocalConfig> {
        self.local.as_ref().ok_or_else(|| {
            StoreError::Config("storage_mode is 'local' but the [local] section is missing".into())
        })
    }
}
