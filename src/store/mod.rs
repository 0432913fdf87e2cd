//! Snapshot storage.
//!
//! One file per scan in the snapshot directory, named after the UTC capture
//! instant so that sorting names sorts snapshots chronologically:
//! - written to `<name>.tmp`, synced, then renamed into place
//! - never modified or deleted once written
//!
//! Supports:
//! - Saving an aggregation result
//! - Loading a snapshot by path or by name
//! - Listing all snapshots and picking the latest two
//! - Comparing two snapshots (see [`diff`])

pub mod diff;
pub mod snapshot;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::scan::{AggregationResult, FileEntry};

pub use snapshot::{latest_two, list, load, resolve, save, SavedSnapshot, SnapshotListing, SnapshotSummary};

/// Current on-disk format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// File extension of finished snapshot files.
pub const SNAPSHOT_EXTENSION: &str = "snap";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotHeader {
    pub version: u16,
    /// capture time, unix seconds UTC
    pub timestamp: i64,
    pub root: String,
}

/// A persisted scan. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub header: SnapshotHeader,
    pub dir_sizes: BTreeMap<String, u64>,
    pub files: Vec<FileEntry>,
}

impl Snapshot {
    pub fn total_bytes(&self) -> u64 {
        self.dir_sizes.get(&self.header.root).copied().unwrap_or(0)
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn into_result(self) -> AggregationResult {
        AggregationResult {
            root: self.header.root,
            dir_sizes: self.dir_sizes,
            files: self.files,
        }
    }
}
