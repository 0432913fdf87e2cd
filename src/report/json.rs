//! JSON output for diff reports and snapshot listings.
//!
//! For scripting and piping.

use std::path::Path;

use serde::Serialize;

use crate::store::diff::DiffReport;
use crate::store::{SnapshotListing, SnapshotSummary};

pub fn render_diff(report: &DiffReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

#[derive(Serialize)]
struct ListingRow<'a> {
    name: &'a str,
    path: &'a Path,
    #[serde(flatten)]
    summary: Option<&'a SnapshotSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn render_listing(listings: &[SnapshotListing]) -> serde_json::Result<String> {
    let rows: Vec<ListingRow> = listings
        .iter()
        .map(|listing| ListingRow {
            name: &listing.name,
            path: &listing.path,
            summary: listing.summary.as_ref().ok(),
            error: listing.summary.as_ref().err().map(|e| e.to_string()),
        })
        .collect();

    serde_json::to_string_pretty(&rows)
}
