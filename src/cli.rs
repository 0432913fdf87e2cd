use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "disksage")]
#[command(about = "Disk usage snapshots and growth reports")]
#[command(version)]
pub struct Cli {
    /// Log skipped entries, exclusions and timings to stderr
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scan a directory tree and save a snapshot
    Scan(ScanArgs),

    /// Compare two snapshots
    Diff(DiffArgs),

    /// List saved snapshots
    List(ListArgs),
}

#[derive(Parser)]
pub struct ScanArgs {
    /// Root directory to scan
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Also record every file's size (enables the file section of diff)
    #[arg(long, default_value_t = false)]
    pub index_files: bool,

    /// Snapshot directory (overrides config)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Parser)]
pub struct DiffArgs {
    /// Older snapshot: a path, or a name in the snapshot directory
    #[arg(required_unless_present = "latest")]
    pub old: Option<String>,

    /// Newer snapshot: a path, or a name in the snapshot directory
    #[arg(required_unless_present = "latest")]
    pub new: Option<String>,

    /// Compare the two most recent snapshots
    #[arg(long, default_value_t = false, conflicts_with_all = ["old", "new"])]
    pub latest: bool,

    /// Snapshot directory (overrides config)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Show at most this many rows per section
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Snapshot directory (overrides config)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
