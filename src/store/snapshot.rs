//! Snapshot files: encoding, atomic writes, loading and listing.
//!
//! Layout: `b"DSGE"`, a little-endian `u16` version, then the bincode body.
//! The version sits outside the body so a reader can refuse an unknown
//! format before trying to decode it.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use bincode::Options;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Snapshot, SnapshotHeader, SNAPSHOT_EXTENSION, SNAPSHOT_VERSION};
use crate::error::StoreError;
use crate::scan::{AggregationResult, FileEntry};

const MAGIC: &[u8; 4] = b"DSGE";

#[derive(Serialize)]
struct SnapshotBodyRef<'a> {
    timestamp: i64,
    root: &'a str,
    dir_sizes: &'a BTreeMap<String, u64>,
    files: &'a [FileEntry],
}

#[derive(Deserialize)]
struct SnapshotBody {
    timestamp: i64,
    root: String,
    dir_sizes: BTreeMap<String, u64>,
    files: Vec<FileEntry>,
}

/// Varint integers, little endian, trailing bytes rejected.
fn codec() -> impl Options {
    bincode::DefaultOptions::new()
}

/// Where a snapshot ended up.
#[derive(Debug, Clone)]
pub struct SavedSnapshot {
    pub path: PathBuf,
    pub header: SnapshotHeader,
}

/// Persists `result` into `store_dir` under a name derived from the current
/// UTC time. The directory is created if needed.
pub fn save(result: &AggregationResult, store_dir: &Path) -> Result<SavedSnapshot, StoreError> {
    save_at(result, store_dir, Utc::now())
}

fn save_at(
    result: &AggregationResult,
    store_dir: &Path,
    captured: DateTime<Utc>,
) -> Result<SavedSnapshot, StoreError> {
    fs::create_dir_all(store_dir)
        .map_err(|e| StoreError::io("failed to create snapshot directory", store_dir, e))?;

    let header = SnapshotHeader {
        version: SNAPSHOT_VERSION,
        timestamp: captured.timestamp(),
        root: result.root.clone(),
    };
    let bytes = encode(&header, result)?;

    let name = snapshot_file_name(captured);
    let path = store_dir.join(&name);
    let temp_path = store_dir.join(format!("{name}.tmp"));

    write_atomic(&temp_path, &path, &bytes)?;

    tracing::info!(
        "saved snapshot {} ({} directories, {} files)",
        path.display(),
        result.dir_sizes.len(),
        result.files.len()
    );

    Ok(SavedSnapshot { path, header })
}

/// `2024-05-01T12-30-05-123456789Z.snap`: no colons, and lexical order
/// matches capture order.
fn snapshot_file_name(captured: DateTime<Utc>) -> String {
    format!(
        "{}.{SNAPSHOT_EXTENSION}",
        captured.format("%Y-%m-%dT%H-%M-%S-%9fZ")
    )
}

fn encode(header: &SnapshotHeader, result: &AggregationResult) -> Result<Vec<u8>, StoreError> {
    let body = SnapshotBodyRef {
        timestamp: header.timestamp,
        root: &result.root,
        dir_sizes: &result.dir_sizes,
        files: &result.files,
    };
    let payload = codec().serialize(&body).map_err(StoreError::Encode)?;

    let mut bytes = Vec::with_capacity(MAGIC.len() + 2 + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&header.version.to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Writes `bytes` to `temp_path`, syncs and closes it, then renames it to
/// `final_path`. On failure the temp file is removed and nothing appears at
/// `final_path`.
fn write_atomic(temp_path: &Path, final_path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .map_err(|e| StoreError::io("failed to create temp file", temp_path, e))?;

    let written = file
        .write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| StoreError::io("failed to write snapshot to", temp_path, e));
    drop(file);

    let result = written.and_then(|()| {
        fs::rename(temp_path, final_path)
            .map_err(|e| StoreError::io("failed to move snapshot into place at", final_path, e))
    });

    if result.is_err() {
        let _ = fs::remove_file(temp_path);
    }
    result
}

/// Reads a whole snapshot file. Corrupt, foreign or future-version files
/// are errors; nothing is returned half-filled.
pub fn load(path: &Path) -> Result<Snapshot, StoreError> {
    let bytes = fs::read(path).map_err(|e| StoreError::io("failed to read snapshot", path, e))?;
    decode(path, &bytes)
}

fn decode(path: &Path, bytes: &[u8]) -> Result<Snapshot, StoreError> {
    let rest = bytes
        .strip_prefix(&MAGIC[..])
        .filter(|rest| rest.len() >= 2)
        .ok_or_else(|| StoreError::NotASnapshot(path.to_path_buf()))?;

    let version = u16::from_le_bytes([rest[0], rest[1]]);
    if version != SNAPSHOT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            version,
        });
    }

    let body: SnapshotBody = codec()
        .deserialize(&rest[2..])
        .map_err(|source| StoreError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(Snapshot {
        header: SnapshotHeader {
            version,
            timestamp: body.timestamp,
            root: body.root,
        },
        dir_sizes: body.dir_sizes,
        files: body.files,
    })
}

/// Header plus counts, enough for a listing line.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    #[serde(flatten)]
    pub header: SnapshotHeader,
    pub total_bytes: u64,
    pub directories: usize,
    pub files: usize,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(snapshot: &Snapshot) -> Self {
        SnapshotSummary {
            header: snapshot.header.clone(),
            total_bytes: snapshot.total_bytes(),
            directories: snapshot.dir_sizes.len(),
            files: snapshot.files.len(),
        }
    }
}

#[derive(Debug)]
pub struct SnapshotListing {
    pub name: String,
    pub path: PathBuf,
    /// load failures are kept per entry so one bad file doesn't hide the rest
    pub summary: Result<SnapshotSummary, StoreError>,
}

/// Finished snapshot files in `store_dir`, sorted by name. A missing
/// directory has no snapshots.
fn snapshot_files(store_dir: &Path) -> Result<Vec<(String, PathBuf)>, StoreError> {
    let entries = match fs::read_dir(store_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io("failed to read snapshot directory", store_dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io("failed to read snapshot directory", store_dir, e))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXTENSION) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            files.push((name.to_string(), path.clone()));
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

pub fn list(store_dir: &Path) -> Result<Vec<SnapshotListing>, StoreError> {
    let listings = snapshot_files(store_dir)?
        .into_iter()
        .map(|(name, path)| {
            let summary = load(&path).map(|snapshot| SnapshotSummary::from(&snapshot));
            if let Err(e) = &summary {
                tracing::warn!("unreadable snapshot {name}: {e}");
            }
            SnapshotListing { name, path, summary }
        })
        .collect();

    Ok(listings)
}

/// Paths of the second-newest and newest snapshots, in that order.
pub fn latest_two(store_dir: &Path) -> Result<(PathBuf, PathBuf), StoreError> {
    let mut files = snapshot_files(store_dir)?;
    if files.len() < 2 {
        return Err(StoreError::NotEnoughSnapshots {
            dir: store_dir.to_path_buf(),
            found: files.len(),
        });
    }

    let (_, newer) = files.remove(files.len() - 1);
    let (_, older) = files.remove(files.len() - 1);
    Ok((older, newer))
}

/// Accepts a path to a snapshot file, or a snapshot name inside `store_dir`
/// with or without its extension.
pub fn resolve(store_dir: &Path, id: &str) -> Result<PathBuf, StoreError> {
    let candidates = [
        PathBuf::from(id),
        store_dir.join(id),
        store_dir.join(format!("{id}.{SNAPSHOT_EXTENSION}")),
    ];

    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
}
