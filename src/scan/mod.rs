//! Size aggregation.
//!
//! Walks a tree once and credits every regular file's size to each of its
//! ancestor directories up to and including the scan root. Symlinks are never
//! followed or counted, excluded directories are pruned with their subtrees,
//! and entries that cannot be read are skipped so permission-denied corners
//! don't sink the whole estimate.

pub mod exclude;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::ScanError;
use crate::util;
use exclude::Exclusions;

/// A single regular file seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
}

/// Output of one scan. Keys of `dir_sizes` and paths in `files` are absolute
/// and share the form of `root`, so two results can be compared by string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationResult {
    pub root: String,
    pub dir_sizes: BTreeMap<String, u64>,
    pub files: Vec<FileEntry>,
}

impl AggregationResult {
    /// Cumulative size of the root directory.
    pub fn total_bytes(&self) -> u64 {
        self.dir_sizes.get(&self.root).copied().unwrap_or(0)
    }
}

/// Counters collected while walking. Not persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    pub directories: u64,
    pub files: u64,
    /// entries whose metadata could not be read
    pub skipped: u64,
    pub symlinks: u64,
    /// excluded subtrees pruned from the walk
    pub excluded: u64,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<usize>,
}

pub struct ScanOutput {
    pub result: AggregationResult,
    pub stats: ScanStats,
}

/// Scans `root` with the exclusions and indexing switch from `config`.
pub fn run(root: &Path, config: &Config) -> Result<ScanOutput, ScanError> {
    aggregate(root, config.index_files, &config.excluded_paths)
}

pub fn aggregate(
    root_path: &Path,
    index_files: bool,
    excluded_paths: &[PathBuf],
) -> Result<ScanOutput, ScanError> {
    let start = Instant::now();

    let root = util::absolute_path(root_path).map_err(|source| ScanError::ResolveRoot {
        path: root_path.to_path_buf(),
        source,
    })?;
    check_root(&root)?;

    let exclusions = Exclusions::new(excluded_paths, &root);
    let root_key = util::path_key(&root);

    tracing::info!("scanning {}", root.display());

    let mut dir_sizes: BTreeMap<String, u64> = BTreeMap::new();
    dir_sizes.insert(root_key.clone(), 0);
    let mut files = Vec::new();
    let mut stats = ScanStats::default();
    let mut pruned = 0u64;

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if exclusions.is_empty() || entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            if exclusions.matches(entry.path()) {
                tracing::debug!("excluded {}", entry.path().display());
                pruned += 1;
                return false;
            }
            true
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(ScanError::RootAccess {
                    path: root.clone(),
                    source: err.into(),
                });
            }
            Err(err) => {
                tracing::debug!("skipping unreadable entry: {err}");
                stats.skipped += 1;
                continue;
            }
        };

        let file_type = entry.file_type();

        if file_type.is_symlink() {
            stats.symlinks += 1;
            continue;
        }

        if file_type.is_dir() {
            stats.directories += 1;
            dir_sizes.entry(util::path_key(entry.path())).or_insert(0);
            continue;
        }

        // sockets, fifos and device nodes occupy no file data
        if !file_type.is_file() {
            continue;
        }

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                tracing::debug!("skipping {}: {err}", entry.path().display());
                stats.skipped += 1;
                continue;
            }
        };
        stats.files += 1;

        credit_ancestors(&mut dir_sizes, entry.path(), &root, size);

        if index_files {
            files.push(FileEntry {
                path: util::path_key(entry.path()),
                size,
            });
        }
    }

    stats.excluded = pruned;
    stats.duration_ms = start.elapsed().as_millis();
    stats.memory_bytes = memory_stats::memory_stats().map(|usage| usage.physical_mem);

    tracing::info!(
        "scanned {} directories and {} files in {}ms ({} skipped, {} symlinks, {} excluded)",
        stats.directories,
        stats.files,
        stats.duration_ms,
        stats.skipped,
        stats.symlinks,
        stats.excluded
    );

    Ok(ScanOutput {
        result: AggregationResult {
            root: root_key,
            dir_sizes,
            files,
        },
        stats,
    })
}

/// The root must exist, be a directory and be listable. Anything below it
/// is best effort.
fn check_root(root: &Path) -> Result<(), ScanError> {
    let access_err = |source: std::io::Error| ScanError::RootAccess {
        path: root.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(root).map_err(access_err)?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(access_err)?;
    Ok(())
}

/// Adds `size` to every directory from the file's parent up to `root`.
/// Ancestors above the root are never touched.
fn credit_ancestors(dir_sizes: &mut BTreeMap<String, u64>, file: &Path, root: &Path, size: u64) {
    for ancestor in file.ancestors().skip(1) {
        if !ancestor.starts_with(root) {
            break;
        }

        let key = ancestor.to_string_lossy();
        match dir_sizes.get_mut(key.as_ref()) {
            Some(total) => *total = total.saturating_add(size),
            None => {
                dir_sizes.insert(key.into_owned(), size);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_bytes(path: &Path, n: usize) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut f = fs::File::create(path).unwrap();
        f.write_all(&vec![0u8; n]).unwrap();
    }

    fn key(root: &str, rel: &str) -> String {
        util::path_key(&Path::new(root).join(rel))
    }

    #[test]
    fn sizes_roll_up_to_every_ancestor() {
        let tmp = TempDir::new().unwrap();
        write_bytes(&tmp.path().join("a/one.bin"), 100);
        write_bytes(&tmp.path().join("a/two.bin"), 200);
        write_bytes(&tmp.path().join("b/three.bin"), 50);

        let out = aggregate(tmp.path(), false, &[]).unwrap();
        let result = out.result;

        assert_eq!(result.dir_sizes.len(), 3);
        assert_eq!(result.total_bytes(), 350);
        assert_eq!(result.dir_sizes[&key(&result.root, "a")], 300);
        assert_eq!(result.dir_sizes[&key(&result.root, "b")], 50);
        assert!(result.files.is_empty());
        assert_eq!(out.stats.files, 3);
    }

    #[test]
    fn empty_directories_are_recorded_with_zero() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("empty/deeper")).unwrap();

        let result = aggregate(tmp.path(), false, &[]).unwrap().result;

        assert_eq!(result.total_bytes(), 0);
        assert_eq!(result.dir_sizes[&key(&result.root, "empty")], 0);
        assert_eq!(result.dir_sizes[&key(&result.root, "empty/deeper")], 0);
    }

    #[test]
    fn parent_is_at_least_sum_of_children() {
        let tmp = TempDir::new().unwrap();
        write_bytes(&tmp.path().join("top.bin"), 7);
        write_bytes(&tmp.path().join("x/y/z.bin"), 11);
        write_bytes(&tmp.path().join("x/w.bin"), 13);

        let result = aggregate(tmp.path(), false, &[]).unwrap().result;
        let x = result.dir_sizes[&key(&result.root, "x")];
        let y = result.dir_sizes[&key(&result.root, "x/y")];

        assert_eq!(y, 11);
        assert_eq!(x, 24);
        assert_eq!(result.total_bytes(), x + 7);
    }

    #[test]
    fn indexed_files_carry_absolute_paths() {
        let tmp = TempDir::new().unwrap();
        write_bytes(&tmp.path().join("a/one.bin"), 10);

        let result = aggregate(tmp.path(), true, &[]).unwrap().result;

        assert_eq!(
            result.files,
            vec![FileEntry {
                path: key(&result.root, "a/one.bin"),
                size: 10
            }]
        );
    }

    #[test]
    fn excluded_subtree_is_pruned_entirely() {
        let tmp = TempDir::new().unwrap();
        write_bytes(&tmp.path().join("a/big.img"), 4096);
        write_bytes(&tmp.path().join("a/inner/more.img"), 4096);
        write_bytes(&tmp.path().join("b/small.txt"), 5);

        let excluded = vec![tmp.path().join("a")];
        let out = aggregate(tmp.path(), true, &excluded).unwrap();
        let result = out.result;

        assert_eq!(result.total_bytes(), 5);
        assert!(!result.dir_sizes.contains_key(&key(&result.root, "a")));
        assert!(!result.dir_sizes.contains_key(&key(&result.root, "a/inner")));
        assert_eq!(result.files.len(), 1);
        assert_eq!(out.stats.excluded, 1);
    }

    #[test]
    fn dotted_root_is_normalized() {
        let tmp = TempDir::new().unwrap();
        write_bytes(&tmp.path().join("f.bin"), 3);

        let dotted = tmp.path().join("sub/..");
        fs::create_dir(tmp.path().join("sub")).unwrap();
        let result = aggregate(&dotted, false, &[]).unwrap().result;

        assert_eq!(result.root, util::path_key(&util::normalize_path(tmp.path())));
        assert_eq!(result.total_bytes(), 3);
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = aggregate(&tmp.path().join("nope"), false, &[]).err().unwrap();
        assert!(matches!(err, ScanError::RootAccess { .. }));
    }

    #[test]
    fn file_root_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain.txt");
        write_bytes(&file, 1);

        let err = aggregate(&file, false, &[]).err().unwrap();
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed_or_counted() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        write_bytes(&outside.path().join("huge.bin"), 1000);
        write_bytes(&tmp.path().join("real/data.bin"), 10);

        std::os::unix::fs::symlink(outside.path(), tmp.path().join("real/link_dir")).unwrap();
        std::os::unix::fs::symlink(
            tmp.path().join("real/data.bin"),
            tmp.path().join("real/link_file"),
        )
        .unwrap();
        // a cycle back to the root
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("real/loop")).unwrap();

        let out = aggregate(tmp.path(), true, &[]).unwrap();

        assert_eq!(out.result.total_bytes(), 10);
        assert_eq!(out.result.files.len(), 1);
        assert_eq!(out.stats.symlinks, 3);
        assert!(!out.result.dir_sizes.contains_key(&key(&out.result.root, "real/link_dir")));
    }

    #[cfg(unix)]
    #[test]
    fn sockets_are_neither_counted_nor_indexed() {
        let tmp = TempDir::new().unwrap();
        write_bytes(&tmp.path().join("f.bin"), 10);
        let _listener = std::os::unix::net::UnixListener::bind(tmp.path().join("s.sock")).unwrap();

        let out = aggregate(tmp.path(), true, &[]).unwrap();

        assert_eq!(out.result.total_bytes(), 10);
        assert_eq!(
            out.result.files,
            vec![FileEntry {
                path: key(&out.result.root, "f.bin"),
                size: 10
            }]
        );
        assert_eq!(out.stats.files, 1);
    }
}
