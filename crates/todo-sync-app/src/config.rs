use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use todo_sync_firebase::FirebaseConfig;

/// Directory name used below the platform config and data directories.
pub const APP_DIR: &str = "todo-sync";
const CONFIG_FILE: &str = "config.toml";
const DATA_FILE: &str = "tasks.json";

/// Top-level configuration loaded from `config.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Hosted backend settings.
    #[serde(default)]
    pub firebase: FirebaseConfig,
    /// Local backend settings.
    #[serde(default)]
    pub offline: OfflineConfig,
}

/// `[offline]` block.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OfflineConfig {
    /// JSON file backing the offline store.
    #[serde(default)]
    pub data_file: Option<PathBuf>,
}

impl AppConfig {
    /// Path of the configuration file in the user's config directory.
    ///
    /// # Errors
    /// Fails when the platform has no configuration directory.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or_else(|| anyhow!("could not resolve the user config directory"))
    }

    /// Load from `path`, or from [`AppConfig::default_path`] when `None`.
    ///
    /// An explicit path must exist; a missing default file yields the defaults.
    ///
    /// # Errors
    /// Fails when the file cannot be read, parsed, or validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(anyhow!("config file {} does not exist", path.display()));
                }
                Self::from_path(path)
            }
            None => Self::from_path(Self::default_path()?),
        }
    }

    /// Load from a known file; a missing file yields the defaults.
    ///
    /// # Errors
    /// Fails when the file cannot be read, parsed, or validated.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.firebase.validate_collection()?;
        Ok(())
    }

    /// Firebase settings, checked for the values the hosted backend needs.
    ///
    /// # Errors
    /// Fails when `database_url` or `api_key` is missing or malformed.
    pub fn firebase(&self) -> Result<&FirebaseConfig> {
        self.firebase
            .validate()
            .context("the Firebase backend is not configured (or pass --offline)")?;
        Ok(&self.firebase)
    }

    /// Data file for the offline store: the configured one, or `tasks.json`
    /// in the user's data directory.
    ///
    /// # Errors
    /// Fails when no file is configured and the platform has no data directory.
    pub fn data_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.offline.data_file {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join(DATA_FILE))
            .ok_or_else(|| anyhow!("could not resolve the user data directory"))
    }
}
