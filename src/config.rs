//! User configuration.
//!
//! Built once in `main` and passed by reference to the scan and store
//! operations. The on-disk form is a TOML file; every field is optional and
//! missing fields fall back to platform defaults.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::platform::{self, Platform};
use crate::util;

/// Points at an alternative config file, mostly useful for tests and scripts.
pub const CONFIG_ENV: &str = "DISKSAGE_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub excluded_paths: Vec<PathBuf>,
    pub snapshot_dir: PathBuf,
    pub index_files: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    excluded_paths: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index_files: Option<bool>,
}

impl Config {
    /// Defaults for a given platform with snapshots stored under `data_dir`.
    pub fn with_defaults(platform: Platform, data_dir: &Path) -> Self {
        Config {
            excluded_paths: platform::default_exclusions(platform),
            snapshot_dir: data_dir.join("snapshots"),
            index_files: false,
        }
    }

    pub fn defaults() -> Result<Self, ConfigError> {
        let data_dir = platform::data_dir().ok_or(ConfigError::NoDirectory("data"))?;
        Ok(Self::with_defaults(platform::detect(), &data_dir))
    }

    /// `$DISKSAGE_CONFIG`, or config.toml in the platform config directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        platform::config_dir()
            .map(|dir| dir.join("config.toml"))
            .ok_or(ConfigError::NoDirectory("config"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?, Self::defaults()?)
    }

    /// Reads `path` and merges it over `defaults`. A missing file is created
    /// with the defaults so users have something to edit.
    pub fn load_from(path: &Path, defaults: Config) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                defaults.write_to(path)?;
                tracing::info!("wrote default config to {}", path.display());
                return Ok(defaults);
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let file: ConfigFile = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(defaults.merge(file))
    }

    fn merge(mut self, file: ConfigFile) -> Self {
        if !file.excluded_paths.is_empty() {
            self.excluded_paths = file.excluded_paths;
        }
        if let Some(dir) = file.snapshot_dir.filter(|d| !d.as_os_str().is_empty()) {
            self.snapshot_dir = dir;
        }
        if let Some(index_files) = file.index_files {
            self.index_files = index_files;
        }
        self
    }

    fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let file = ConfigFile {
            excluded_paths: self.excluded_paths.clone(),
            snapshot_dir: Some(self.snapshot_dir.clone()),
            index_files: Some(self.index_files),
        };
        fs::write(path, toml::to_string_pretty(&file)?).map_err(io_err)
    }

    /// Replaces the snapshot directory, e.g. from `--out` or `--dir`.
    pub fn set_snapshot_dir(&mut self, dir: &Path) -> std::io::Result<()> {
        self.snapshot_dir = util::absolute_path(dir)?;
        Ok(())
    }
}
