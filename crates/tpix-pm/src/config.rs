//! Client configuration.
//!
//! Settings are loaded once into an immutable [`Config`] which is passed to
//! every operation that needs it.
//!
//! # Configuration Sources (in priority order, highest to lowest)
//!
//! 1. `TYPST_PACKAGE_CACHE_PATH` environment variable (cache path only)
//! 2. `<user config dir>/tpix-cli/settings.json`
//! 3. Built-in defaults (`<user cache dir>/typst/packages`)
//!
//! # Example
//!
//! ```rust,no_run
//! use tpix_pm::config::ConfigLoader;
//!
//! let config = ConfigLoader::new(true).load().unwrap();
//! println!("Cache: {:?}", config.cache_path());
//! println!("Server: {}", config.server_url());
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::{Result, TpixError};

pub const APP_NAME: &str = "tpix-cli";
pub const SETTINGS_FILENAME: &str = "settings.json";
pub const CACHE_PATH_ENV: &str = "TYPST_PACKAGE_CACHE_PATH";
pub const DEFAULT_SERVER_URL: &str = "https://tpix.typstify.com";

/// Resolved client settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,

    #[serde(default, rename = "typstCachePkgPath")]
    cache_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    server_url: Option<String>,
}

impl Config {
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Bearer token for the registry, if logged in
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Root of the package cache
    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Base URL of the registry API
    pub fn server_url(&self) -> &str {
        self.server_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_SERVER_URL)
    }
}

/// Loads and saves [`Config`] from the settings file and environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: Option<PathBuf>,
    default_cache_dir: Option<PathBuf>,
    use_environment: bool,
}

impl ConfigLoader {
    /// Create a loader using the platform config and cache directories
    pub fn new(use_environment: bool) -> Self {
        let dirs = BaseDirs::new();

        Self {
            config_dir: dirs.as_ref().map(|d| d.config_dir().join(APP_NAME)),
            default_cache_dir: dirs
                .as_ref()
                .map(|d| d.cache_dir().join("typst").join("packages")),
            use_environment,
        }
    }

    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    pub fn with_default_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_cache_dir = Some(dir.into());
        self
    }

    pub fn settings_path(&self) -> Option<PathBuf> {
        self.config_dir.as_ref().map(|d| d.join(SETTINGS_FILENAME))
    }

    pub fn default_cache_dir(&self) -> Option<&Path> {
        self.default_cache_dir.as_deref()
    }

    /// Load the settings file and apply environment overrides.
    ///
    /// A missing or empty settings file yields the defaults.
    pub fn load(&self) -> Result<Config> {
        let mut config = match self.settings_path() {
            Some(path) => Self::read_settings(&path)?,
            None => Config::default(),
        };

        if let Some(env_path) = self.env_cache_path() {
            config.cache_path = Some(Self::validate_cache_override(&env_path)?);
            return Ok(config);
        }

        if config.cache_path().is_none() {
            config.cache_path = self.default_cache_dir.clone();
        }

        Ok(config)
    }

    /// Persist `config` to the settings file
    pub fn save(&self, config: &Config) -> Result<()> {
        let path = self.settings_path().ok_or_else(|| {
            TpixError::Config("cannot determine the user config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut config = config.clone();
        if config.cache_path().is_none() {
            config.cache_path = self.default_cache_dir.clone();
        }

        fs::write(&path, serde_json::to_string_pretty(&config)?)?;
        log::debug!("Saved settings to {}", path.display());

        Ok(())
    }

    fn read_settings(path: &Path) -> Result<Config> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Config::default());
        }

        log::debug!("Reading {}", path.display());
        Ok(serde_json::from_str(&content)?)
    }

    fn env_cache_path(&self) -> Option<String> {
        if !self.use_environment {
            return None;
        }
        std::env::var(CACHE_PATH_ENV).ok().filter(|v| !v.is_empty())
    }

    fn validate_cache_override(value: &str) -> Result<PathBuf> {
        let path = PathBuf::from(value);

        let metadata = fs::metadata(&path).map_err(|_| {
            TpixError::Config(format!("Invalid path for {}: {}", CACHE_PATH_ENV, value))
        })?;
        if !metadata.is_dir() {
            return Err(TpixError::Config(format!("Path is not a directory: {}", value)));
        }

        Ok(std::path::absolute(&path)?)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}
