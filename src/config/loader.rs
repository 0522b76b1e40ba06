//! Settings resolution for a rustmaps facade
//!
//! Values are layered, lowest priority first: built-in defaults, the TOML
//! file named by `RUSTMAPS_CONFIG` (or `<config dir>/rustmaps/config.toml`),
//! `RUSTMAPS_*` environment variables, then overrides set on the loader
//! itself. The result is validated before it is handed back, so a missing
//! API key is reported here rather than as a 401 on the first request.

use crate::{Result, Rustmaps, config::Settings};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Resolves [`Settings`] from defaults, file, environment and overrides
#[derive(Debug, Default)]
pub struct ConfigLoader {
    defaults: Settings,
    api_key: Option<String>,
    staging: Option<bool>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this API key whatever the file or environment say
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Target the staging map pool (or not) whatever the file or environment say
    pub fn with_staging(mut self, staging: bool) -> Self {
        self.staging = Some(staging);
        self
    }

    /// Path of the config file to read, if one exists
    ///
    /// `RUSTMAPS_CONFIG` wins when it names an existing file; otherwise
    /// `rustmaps/config.toml` under the platform config directory.
    pub fn get_config_path() -> Option<PathBuf> {
        if let Ok(config_path) = std::env::var("RUSTMAPS_CONFIG") {
            let path = PathBuf::from(config_path);
            if path.exists() {
                debug!("Using config file from RUSTMAPS_CONFIG: {:?}", path);
                return Some(path);
            }
            warn!("RUSTMAPS_CONFIG points to non-existent file: {:?}", path);
        }

        let default_path = dirs::config_dir()?.join("rustmaps").join("config.toml");
        if default_path.exists() {
            debug!("Using default config file: {:?}", default_path);
            return Some(default_path);
        }

        debug!("No rustmaps config file found");
        None
    }

    /// Resolve settings, reading `config_file` if it exists
    pub fn load(&self, config_file: Option<&Path>) -> Result<Settings> {
        let settings = match config_file {
            Some(path) if path.exists() => {
                info!("Loading rustmaps configuration from {:?}", path);
                Settings::from_file(path)?
            }
            Some(path) => {
                warn!("Configuration file not found: {:?}, using defaults", path);
                self.defaults.clone()
            }
            None => self.defaults.clone(),
        };

        self.finish(settings.merge_with_env()?)
    }

    /// Locate the config file and resolve settings from it
    pub fn load_default(&self) -> Result<Settings> {
        self.load(Self::get_config_path().as_deref())
    }

    /// Resolve settings without reading any file
    pub fn from_env_only(&self) -> Result<Settings> {
        self.finish(self.defaults.clone().merge_with_env()?)
    }

    /// Resolve settings the default way and build a facade from them
    pub fn connect(&self) -> Result<Rustmaps> {
        Rustmaps::from_settings(self.load_default()?)
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    fn finish(&self, mut settings: Settings) -> Result<Settings> {
        if let Some(api_key) = &self.api_key {
            settings.api.api_key = api_key.clone();
        }
        if let Some(staging) = self.staging {
            settings.api.staging = staging;
        }

        settings.validate()?;

        // api_key stays out of the logs
        debug!(
            base_url = %settings.api.base_url,
            staging = settings.api.staging,
            polling = ?settings.polling,
            rate_limited = settings.rate_limit.enabled,
            "Resolved rustmaps configuration"
        );
        Ok(settings)
    }
}
