use std::path::PathBuf;

use directories::ProjectDirs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Windows,
    Unknown,
}

pub fn detect() -> Platform {
    match std::env::consts::OS {
        "macos" => Platform::MacOS,
        "linux" => Platform::Linux,
        "windows" => Platform::Windows,
        _ => Platform::Unknown,
    }
}

/// Pseudo-filesystems that report sizes which are not real disk usage.
/// Scanning `/` without these would count /proc/kcore and friends.
pub fn default_exclusions(platform: Platform) -> Vec<PathBuf> {
    let paths: &[&str] = match platform {
        Platform::Linux => &["/proc", "/sys", "/dev", "/run"],
        Platform::MacOS => &["/dev", "/System/Volumes"],
        Platform::Windows | Platform::Unknown => &[],
    };
    paths.iter().map(PathBuf::from).collect()
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "disksage")
}

/// ~/.config/disksage on Linux, ~/Library/Application Support/disksage on macOS
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// ~/.local/share/disksage on Linux (honors XDG_DATA_HOME)
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}
