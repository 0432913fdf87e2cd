pub mod json;
pub mod table;

/// `YYYY-MM-DD HH:MM:SS` in UTC, or `unknown` for out-of-range values.
pub fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
