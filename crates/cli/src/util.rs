//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use polwatch_journal::Journal;
use std::path::Path;

/// Open the journal, creating the database on first use
pub fn open_journal(db_path: &Path) -> Result<Journal> {
    Journal::open(db_path)
        .with_context(|| format!("Failed to open state database {}", db_path.display()))
}

/// Open the journal only if the database already exists
pub fn open_existing_journal(db_path: &Path) -> Result<Option<Journal>> {
    if !db_path.exists() {
        return Ok(None);
    }
    open_journal(db_path).map(Some)
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts: DateTime<Utc>) -> String {
    format_relative_to(ts, Utc::now())
}

fn format_relative_to(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - ts).num_seconds();
    if seconds < 0 {
        return "in the future".to_string();
    }

    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format timestamp as absolute UTC time ("2026-10-19 14:30:00")
pub fn format_absolute_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.00 GB");
        assert_eq!(format_size(1536), "1.50 KB");
    }

    #[test]
    fn test_format_relative_time() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();

        assert_eq!(format_relative_to(now, now), "0 seconds ago");
        assert_eq!(format_relative_to(now - Duration::hours(1), now), "1 hours ago");
        assert_eq!(format_relative_to(now - Duration::days(2), now), "2 days ago");
        assert_eq!(format_relative_to(now + Duration::seconds(5), now), "in the future");
    }

    #[test]
    fn test_format_absolute_time() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap();
        assert_eq!(format_absolute_time(ts), "2026-10-19 14:30:00");
    }

    #[test]
    fn test_open_existing_journal_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_existing_journal(&dir.path().join("none.sqlite3"))
            .unwrap()
            .is_none());
    }
}
