//! Application settings.
//!
//! Settings are read from a TOML file and control where the rules file
//! lives and how much gets logged:
//!
//! ```toml
//! log_level = "info"
//! rules_file = "/home/user/sorter/folder_rules.json"
//! ```
//!
//! Both keys are optional. Without a `rules_file`, rules are kept in the
//! platform data directory (`<data_dir>/file-sorter/folder_rules.json`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Directory name used under the platform config and data directories.
pub const APP_DIR_NAME: &str = "file-sorter";

/// File name of the rules file inside the data directory.
pub const RULES_FILE_NAME: &str = "folder_rules.json";

/// Settings file looked up in the current directory.
pub const LOCAL_SETTINGS_FILE: &str = ".file-sorter.toml";

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Default log filter (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Explicit location of the rules file.
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            rules_file: None,
        }
    }
}

impl Settings {
    /// Load settings, with fallback to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, if given (it must exist)
    /// 2. `.file-sorter.toml` in the current directory
    /// 3. `<config_dir>/file-sorter/config.toml`
    /// 4. Defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local = PathBuf::from(LOCAL_SETTINGS_FILE);
        if local.exists() {
            return Self::load_from_file(&local);
        }

        if let Some(user) = Self::user_settings_path()
            && user.exists()
        {
            return Self::load_from_file(&user);
        }

        Ok(Self::default())
    }

    /// Load settings from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Per-user settings file in the platform config directory.
    pub fn user_settings_path() -> Option<PathBuf> {
        let base = dirs::config_dir().or_else(|| dirs::home_dir().map(|d| d.join(".config")))?;
        Some(base.join(APP_DIR_NAME).join("config.toml"))
    }

    /// Resolves the rules file: the configured one, or the default in the
    /// platform data directory.
    pub fn rules_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.rules_file {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join(RULES_FILE_NAME))
            .ok_or(ConfigError::NoDataDir)
    }
}
