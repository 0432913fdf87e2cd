//! Plain-text rendering.
//!
//! - Scan summary after a snapshot is written
//! - Diff report: directory section, then file section when indexed
//! - Snapshot listing, one line per file

use super::format_timestamp;
use crate::scan::ScanStats;
use crate::store::diff::{DiffReport, DiffType, DirDelta, FileDelta};
use crate::store::{SavedSnapshot, SnapshotListing};
use crate::util::format_bytes;

pub fn render_scan(saved: &SavedSnapshot, total_bytes: u64, stats: &ScanStats) -> String {
    let mut output = String::new();

    output.push_str(&format!("snapshot: {}\n", saved.path.display()));
    output.push_str(&format!("root:     {}\n", saved.header.root));
    output.push_str(&format!("total:    {}\n", format_bytes(total_bytes)));
    output.push_str(&format!(
        "scanned {} directories, {} files in {:.2}s\n",
        stats.directories,
        stats.files,
        stats.duration_ms as f64 / 1000.0
    ));
    if stats.skipped > 0 {
        output.push_str(&format!("skipped {} unreadable entries (size may be underestimated)\n", stats.skipped));
    }

    output
}

pub fn render_diff(report: &DiffReport, limit: Option<usize>) -> String {
    let mut output = String::new();

    output.push_str("Comparing snapshots:\n");
    output.push_str(&format!("  From: {}  {}\n", format_timestamp(report.from.timestamp), report.from.root));
    output.push_str(&format!("  To:   {}  {}\n", format_timestamp(report.to.timestamp), report.to.root));
    output.push('\n');

    if report.dirs.is_empty() && report.files.is_empty() {
        output.push_str("No changes detected.\n");
        return output;
    }

    output.push_str("=== DIRECTORY DIFF ===\n");
    push_rows(&mut output, &report.dirs, limit, dir_line);

    if report.has_file_data {
        output.push_str("\n=== FILE DIFF ===\n");
        push_rows(&mut output, &report.files, limit, file_line);
    }

    let sign = if report.total_change < 0 { "-" } else { "+" };
    output.push_str(&format!(
        "\nNet change: {sign}{}\n",
        format_bytes(report.total_change.unsigned_abs())
    ));

    output
}

fn push_rows<T>(output: &mut String, rows: &[T], limit: Option<usize>, line: fn(&T) -> String) {
    let shown = limit.unwrap_or(rows.len()).min(rows.len());

    for row in &rows[..shown] {
        output.push_str(&line(row));
        output.push('\n');
    }

    if shown < rows.len() {
        output.push_str(&format!("  ... and {} more\n", rows.len() - shown));
    }
}

fn dir_line(delta: &DirDelta) -> String {
    let sign = if delta.delta < 0 { '-' } else { '+' };
    format!("{sign} {} {}", delta.path, format_bytes(delta.delta.unsigned_abs()))
}

fn file_line(delta: &FileDelta) -> String {
    let old = delta.old_size.unwrap_or(0);
    let new = delta.new_size.unwrap_or(0);

    match delta.diff_type {
        DiffType::New => format!("+ {} {}", delta.path, format_bytes(new)),
        DiffType::Gone => format!("- {} {}", delta.path, format_bytes(old)),
        DiffType::Grew | DiffType::Shrank => format!(
            "~ {} {} \u{2192} {}",
            delta.path,
            format_bytes(old),
            format_bytes(new)
        ),
    }
}

pub fn render_listing(listings: &[SnapshotListing]) -> String {
    if listings.is_empty() {
        return String::from("No snapshots found. Run 'disksage scan' to create one.\n");
    }

    let mut output = String::new();
    let width = listings.iter().map(|l| l.name.len()).max().unwrap_or(0);

    for listing in listings {
        match &listing.summary {
            Ok(summary) => {
                output.push_str(&format!(
                    "{:<width$}  {}  {:>10}  {}\n",
                    listing.name,
                    format_timestamp(summary.header.timestamp),
                    format_bytes(summary.total_bytes),
                    summary.header.root
                ));
            }
            Err(e) => output.push_str(&format!("{:<width$}  (unreadable: {e})\n", listing.name)),
        }
    }

    output
}
