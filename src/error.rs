//! Error types for scanning, snapshot storage and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a scan. Per-entry failures inside the tree are
/// skipped and counted instead.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot resolve scan root {path:?}: {source}")]
    ResolveRoot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot open scan root {path:?}: {source}")]
    RootAccess {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("scan root {0:?} is not a directory")]
    NotADirectory(PathBuf),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{context} {path:?}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0:?} is not a snapshot file")]
    NotASnapshot(PathBuf),

    #[error("{path:?} has unsupported snapshot version {version}")]
    UnsupportedVersion { path: PathBuf, version: u16 },

    #[error("failed to decode snapshot {path:?}: {source}")]
    Decode {
        path: PathBuf,
        source: bincode::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Encode(bincode::Error),

    #[error("snapshot not found: {0}")]
    NotFound(String),

    #[error("need at least 2 snapshots in {dir:?}, found {found}")]
    NotEnoughSnapshots { dir: PathBuf, found: usize },
}

impl StoreError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            context,
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine {0} directory")]
    NoDirectory(&'static str),

    #[error("config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write default config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
