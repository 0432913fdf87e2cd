//! Excluded subtrees.

use std::path::{Path, PathBuf};

use crate::util;

/// Set of directories pruned from a walk, together with everything below them.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    paths: Vec<PathBuf>,
}

impl Exclusions {
    /// Normalizes `paths` for component-wise matching under `root`.
    ///
    /// An exclusion that contains the root itself is dropped: asking to scan
    /// inside an excluded tree means the user wants that tree.
    pub fn new(paths: &[PathBuf], root: &Path) -> Self {
        let paths = paths
            .iter()
            .map(|p| util::absolute_path(p).unwrap_or_else(|_| util::normalize_path(p)))
            .filter(|p| {
                let contains_root = root.starts_with(p);
                if contains_root {
                    tracing::debug!("ignoring exclusion {} because it contains the scan root", p.display());
                }
                !contains_root
            })
            .collect();

        Exclusions { paths }
    }

    /// True when `path` is an excluded directory or lies beneath one.
    /// `/r/ab` is not beneath `/r/a`.
    pub fn matches(&self, path: &Path) -> bool {
        self.paths.iter().any(|excluded| path.starts_with(excluded))
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
