//! Snapshot comparison engine.
//!
//! Compares two snapshots and reports changes:
//! - Matches directories and files by exact path string
//! - Classifies each change: grew, shrank, new, gone
//! - Orders by size of change, largest first, ties by path
//!
//! Pure: inputs are only read, results are fresh vectors.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{Snapshot, SnapshotHeader};
use crate::scan::FileEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffType {
    Grew,
    Shrank,
    New,
    Gone,
}

impl DiffType {
    fn classify(old: Option<u64>, new: Option<u64>, delta: i64) -> Self {
        match (old, new) {
            (None, _) => DiffType::New,
            (_, None) => DiffType::Gone,
            _ if delta < 0 => DiffType::Shrank,
            _ => DiffType::Grew,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirDelta {
    pub path: String,
    pub delta: i64,
    pub diff_type: DiffType,
}

/// Per-file change. `None` means the file was absent on that side, so a
/// zero-byte file appearing is distinguishable from no change at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDelta {
    pub path: String,
    pub old_size: Option<u64>,
    pub new_size: Option<u64>,
    pub diff_type: DiffType,
}

impl FileDelta {
    fn new(path: &str, old_size: Option<u64>, new_size: Option<u64>) -> Self {
        let delta = size_delta(old_size.unwrap_or(0), new_size.unwrap_or(0));
        FileDelta {
            path: path.to_string(),
            old_size,
            new_size,
            diff_type: DiffType::classify(old_size, new_size, delta),
        }
    }

    pub fn delta(&self) -> i64 {
        size_delta(self.old_size.unwrap_or(0), self.new_size.unwrap_or(0))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub from: SnapshotHeader,
    pub to: SnapshotHeader,
    /// change of the root total
    pub total_change: i64,
    pub dirs: Vec<DirDelta>,
    /// empty unless at least one side indexed files
    pub files: Vec<FileDelta>,
    pub has_file_data: bool,
}

fn size_delta(old: u64, new: u64) -> i64 {
    let old = i64::try_from(old).unwrap_or(i64::MAX);
    let new = i64::try_from(new).unwrap_or(i64::MAX);
    new.saturating_sub(old)
}

/// Directory changes between two size maps. Directories with equal size on
/// both sides are omitted; directories missing from `new` report their whole
/// old size as negative.
pub fn diff_dirs(old: &BTreeMap<String, u64>, new: &BTreeMap<String, u64>) -> Vec<DirDelta> {
    let mut deltas = Vec::new();

    for (path, &new_size) in new {
        let old_size = old.get(path).copied();
        let delta = size_delta(old_size.unwrap_or(0), new_size);
        if delta != 0 {
            deltas.push(DirDelta {
                path: path.clone(),
                delta,
                diff_type: DiffType::classify(old_size, Some(new_size), delta),
            });
        }
    }

    for (path, &old_size) in old {
        if new.contains_key(path) {
            continue;
        }
        let delta = size_delta(old_size, 0);
        if delta != 0 {
            deltas.push(DirDelta {
                path: path.clone(),
                delta,
                diff_type: DiffType::Gone,
            });
        }
    }

    deltas.sort_by(|a, b| {
        b.delta
            .unsigned_abs()
            .cmp(&a.delta.unsigned_abs())
            .then_with(|| a.path.cmp(&b.path))
    });
    deltas
}

/// File changes between two file lists. A path repeated within one list
/// keeps its last size.
pub fn diff_files(old: &[FileEntry], new: &[FileEntry]) -> Vec<FileDelta> {
    let old_map: HashMap<&str, u64> = old.iter().map(|f| (f.path.as_str(), f.size)).collect();
    let new_map: HashMap<&str, u64> = new.iter().map(|f| (f.path.as_str(), f.size)).collect();

    let mut deltas = Vec::new();

    for (&path, &new_size) in &new_map {
        match old_map.get(path) {
            None => deltas.push(FileDelta::new(path, None, Some(new_size))),
            Some(&old_size) if old_size != new_size => {
                deltas.push(FileDelta::new(path, Some(old_size), Some(new_size)))
            }
            Some(_) => {}
        }
    }

    for (&path, &old_size) in &old_map {
        if !new_map.contains_key(path) {
            deltas.push(FileDelta::new(path, Some(old_size), None));
        }
    }

    deltas.sort_by(|a, b| {
        b.delta()
            .unsigned_abs()
            .cmp(&a.delta().unsigned_abs())
            .then_with(|| a.path.cmp(&b.path))
    });
    deltas
}

/// Full comparison of two snapshots, `old` first.
pub fn compare(old: &Snapshot, new: &Snapshot) -> DiffReport {
    if old.header.root != new.header.root {
        tracing::warn!(
            "comparing snapshots of different roots: {} vs {}",
            old.header.root,
            new.header.root
        );
    }

    let has_file_data = old.has_files() || new.has_files();
    let files = if has_file_data {
        diff_files(&old.files, &new.files)
    } else {
        Vec::new()
    };

    DiffReport {
        from: old.header.clone(),
        to: new.header.clone(),
        total_change: size_delta(old.total_bytes(), new.total_bytes()),
        dirs: diff_dirs(&old.dir_sizes, &new.dir_sizes),
        files,
        has_file_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SNAPSHOT_VERSION;
    use proptest::prelude::*;

    fn sizes(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(p, s)| (p.to_string(), *s)).collect()
    }

    fn files(pairs: &[(&str, u64)]) -> Vec<FileEntry> {
        pairs
            .iter()
            .map(|(p, s)| FileEntry {
                path: p.to_string(),
                size: *s,
            })
            .collect()
    }

    fn snapshot(timestamp: i64, dirs: &[(&str, u64)], file_list: &[(&str, u64)]) -> Snapshot {
        Snapshot {
            header: SnapshotHeader {
                version: SNAPSHOT_VERSION,
                timestamp,
                root: "/r".to_string(),
            },
            dir_sizes: sizes(dirs),
            files: files(file_list),
        }
    }

    fn dir_summary(deltas: &[DirDelta]) -> Vec<(&str, i64)> {
        deltas.iter().map(|d| (d.path.as_str(), d.delta)).collect()
    }

    #[test]
    fn dirs_ranked_by_magnitude_then_path() {
        let old = sizes(&[("/r", 100), ("/r/a", 100)]);
        let new = sizes(&[("/r", 150), ("/r/a", 50), ("/r/b", 100)]);

        let deltas = diff_dirs(&old, &new);

        assert_eq!(dir_summary(&deltas), vec![("/r/b", 100), ("/r", 50), ("/r/a", -50)]);
        assert_eq!(deltas[0].diff_type, DiffType::New);
        assert_eq!(deltas[1].diff_type, DiffType::Grew);
        assert_eq!(deltas[2].diff_type, DiffType::Shrank);
    }

    #[test]
    fn removed_directory_reports_its_whole_size() {
        let old = sizes(&[("/r", 500), ("/r/gone", 400)]);
        let new = sizes(&[("/r", 100)]);

        let deltas = diff_dirs(&old, &new);

        assert_eq!(dir_summary(&deltas), vec![("/r", -400), ("/r/gone", -400)]);
        assert_eq!(deltas[0].diff_type, DiffType::Shrank);
        assert_eq!(deltas[1].diff_type, DiffType::Gone);
    }

    #[test]
    fn unchanged_and_empty_directories_are_omitted() {
        let old = sizes(&[("/r", 10), ("/r/same", 10), ("/r/was_empty", 0)]);
        let new = sizes(&[("/r", 10), ("/r/same", 10), ("/r/new_empty", 0)]);

        assert!(diff_dirs(&old, &new).is_empty());
    }

    #[test]
    fn file_changes_are_classified() {
        let old = files(&[("/r/keep", 5), ("/r/grow", 10), ("/r/shrink", 300), ("/r/gone", 40)]);
        let new = files(&[("/r/keep", 5), ("/r/grow", 1000), ("/r/shrink", 100), ("/r/new", 70)]);

        let deltas = diff_files(&old, &new);
        let summary: Vec<(&str, Option<u64>, Option<u64>, DiffType)> = deltas
            .iter()
            .map(|d| (d.path.as_str(), d.old_size, d.new_size, d.diff_type))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("/r/grow", Some(10), Some(1000), DiffType::Grew),
                ("/r/shrink", Some(300), Some(100), DiffType::Shrank),
                ("/r/new", None, Some(70), DiffType::New),
                ("/r/gone", Some(40), None, DiffType::Gone),
            ]
        );
    }

    #[test]
    fn zero_byte_files_appearing_and_vanishing_are_reported() {
        let old = files(&[("/r/old_empty", 0)]);
        let new = files(&[("/r/new_empty", 0)]);

        let deltas = diff_files(&old, &new);

        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].path, "/r/new_empty");
        assert_eq!(deltas[0].diff_type, DiffType::New);
        assert_eq!(deltas[0].old_size, None);
        assert_eq!(deltas[1].path, "/r/old_empty");
        assert_eq!(deltas[1].diff_type, DiffType::Gone);
        assert_eq!(deltas[1].new_size, None);
    }

    #[test]
    fn duplicate_paths_keep_last_size() {
        let old = files(&[("/r/f", 1), ("/r/f", 9)]);
        let new = files(&[("/r/f", 9)]);

        assert!(diff_files(&old, &new).is_empty());
    }

    #[test]
    fn compare_skips_files_when_neither_side_indexed() {
        let old = snapshot(1000, &[("/r", 10)], &[]);
        let new = snapshot(2000, &[("/r", 25)], &[]);

        let report = compare(&old, &new);

        assert!(!report.has_file_data);
        assert!(report.files.is_empty());
        assert_eq!(report.total_change, 15);
        assert_eq!(report.from.timestamp, 1000);
        assert_eq!(report.to.timestamp, 2000);
    }

    #[test]
    fn compare_diffs_files_when_one_side_indexed() {
        let old = snapshot(1, &[("/r", 10)], &[]);
        let new = snapshot(2, &[("/r", 10)], &[("/r/f", 10)]);

        let report = compare(&old, &new);

        assert!(report.has_file_data);
        assert!(report.dirs.is_empty());
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].diff_type, DiffType::New);
    }

    #[test]
    fn compare_inputs_are_untouched() {
        let old = snapshot(1, &[("/r", 1)], &[("/r/a", 1)]);
        let new = snapshot(2, &[("/r", 2)], &[("/r/a", 2)]);
        let (old_copy, new_copy) = (old.clone(), new.clone());

        let _ = compare(&old, &new);

        assert_eq!(old, old_copy);
        assert_eq!(new, new_copy);
    }

    fn size_map() -> impl Strategy<Value = BTreeMap<String, u64>> {
        prop::collection::btree_map("/r(/[a-d]){0,3}", 0u64..1 << 40, 0..24)
    }

    fn file_list() -> impl Strategy<Value = Vec<FileEntry>> {
        prop::collection::vec(
            ("/r/[a-d]{1,3}", 0u64..1 << 40).prop_map(|(path, size)| FileEntry { path, size }),
            0..24,
        )
    }

    proptest! {
        #[test]
        fn diff_against_self_is_empty(dirs in size_map(), list in file_list()) {
            prop_assert!(diff_dirs(&dirs, &dirs).is_empty());
            prop_assert!(diff_files(&list, &list).is_empty());
        }

        #[test]
        fn dir_diff_is_antisymmetric(a in size_map(), b in size_map()) {
            let forward: BTreeMap<String, i64> =
                diff_dirs(&a, &b).into_iter().map(|d| (d.path, d.delta)).collect();
            let backward: BTreeMap<String, i64> =
                diff_dirs(&b, &a).into_iter().map(|d| (d.path, -d.delta)).collect();
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn dir_diff_is_sorted(a in size_map(), b in size_map()) {
            let deltas = diff_dirs(&a, &b);
            for pair in deltas.windows(2) {
                let (x, y) = (&pair[0], &pair[1]);
                prop_assert!(
                    x.delta.unsigned_abs() > y.delta.unsigned_abs()
                        || (x.delta.unsigned_abs() == y.delta.unsigned_abs() && x.path < y.path)
                );
            }
        }
    }
}
