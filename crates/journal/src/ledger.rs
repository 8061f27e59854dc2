//! Append-only ledger of delivered alerts
//!
//! `has_alert` is the only gate deciding whether content gets notified.
//! `record` does no dedup of its own: callers check first.

use crate::db::Database;
use crate::error::StoreError;
use crate::models::{format_timestamp, AlertRecord, AlertSummary};
use chrono::{DateTime, Utc};
use rusqlite::params;

/// Category used for "a new PDF appeared" alerts
pub const NEW_PDF: &str = "new_pdf";

/// Default page size for the dashboard's alert list
pub const DEFAULT_RECENT_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct AlertLedger {
    db: Database,
}

impl AlertLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// True if any alert exists for `file_id`, optionally only in `category`
    ///
    /// A file id with no owning record simply has no alerts.
    pub fn has_alert(&self, file_id: i64, category: Option<&str>) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| match category {
            Some(category) => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM alerts WHERE file_id = ?1 AND category = ?2)",
                params![file_id, category],
                |row| row.get(0),
            ),
            None => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM alerts WHERE file_id = ?1)",
                params![file_id],
                |row| row.get(0),
            ),
        })
    }

    /// Append an alert with `sent_time = now`
    pub fn record(
        &self,
        file_id: i64,
        subject: &str,
        recipient: &str,
        category: &str,
    ) -> Result<i64, StoreError> {
        self.record_at(file_id, subject, recipient, category, Utc::now())
    }

    pub fn record_at(
        &self,
        file_id: i64,
        subject: &str,
        recipient: &str,
        category: &str,
        sent_time: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let sent_time = format_timestamp(sent_time);
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO alerts (file_id, subject, recipient, sent_time, category) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![file_id, subject, recipient, sent_time, category],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Newest first, at most `limit` rows
    pub fn recent(&self, limit: usize) -> Result<Vec<AlertRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM alerts ORDER BY sent_time DESC, id DESC LIMIT ?1",
            AlertRecord::COLUMNS
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![limit], AlertRecord::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            rows
        })
    }

    /// Dashboard view of the latest alerts
    pub fn recent_alerts(&self, limit: usize) -> Result<Vec<AlertSummary>, StoreError> {
        Ok(self.recent(limit)?.iter().map(AlertRecord::summary).collect())
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        self.db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get::<_, i64>(0))
            })
            .map(|n| n.max(0) as u64)
    }
}
