use std::path::{Component, Path, PathBuf};

/// Formats a byte count with binary units, e.g. `1536` -> `1.5 KiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const SUFFIXES: [&str; 6] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut div = UNIT;
    let mut exp = 0;
    while bytes / div >= UNIT && exp < SUFFIXES.len() - 1 {
        div *= UNIT;
        exp += 1;
    }

    format!("{:.1} {}", bytes as f64 / div as f64, SUFFIXES[exp])
}

/// Lexically cleans a path: drops `.` components and resolves `..` against
/// the preceding component. Never touches the filesystem, so symlinks are
/// kept as written.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if at_root {
                    if !out.has_root() {
                        out.push("..");
                    }
                } else if out.ends_with("..") {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }

    out
}

/// Joins a relative path onto the current directory and normalizes it.
pub fn absolute_path(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else {
        Ok(normalize_path(&std::env::current_dir()?.join(path)))
    }
}

/// The string form used for snapshot keys. Non-UTF-8 bytes are replaced.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
