//! Row types for the `files` and `alerts` tables

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use polwatch_core::Fingerprint;
use rusqlite::types::Type;
use rusqlite::Row;
use serde::Serialize;

/// One physical content payload ever observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: i64,
    /// Most recently observed location
    pub path: String,
    pub name: String,
    /// Byte length at the most recent sighting
    pub size: u64,
    pub fingerprint: Fingerprint,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl FileRecord {
    pub(crate) const COLUMNS: &'static str =
        "id, path, name, size, fingerprint, first_seen, last_seen";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let fingerprint: String = row.get(4)?;
        Ok(Self {
            id: row.get(0)?,
            path: row.get(1)?,
            name: row.get(2)?,
            size: row.get::<_, i64>(3)?.max(0) as u64,
            fingerprint: fingerprint
                .parse()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
            first_seen: timestamp_column(row, 5)?,
            last_seen: timestamp_column(row, 6)?,
        })
    }
}

/// A notification considered delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertRecord {
    pub id: i64,
    /// Owning file record; may dangle
    pub file_id: Option<i64>,
    pub subject: String,
    pub recipient: String,
    pub sent_time: DateTime<Utc>,
    pub category: String,
}

impl AlertRecord {
    pub(crate) const COLUMNS: &'static str = "id, file_id, subject, recipient, sent_time, category";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            file_id: row.get(1)?,
            subject: row.get(2)?,
            recipient: row.get(3)?,
            sent_time: timestamp_column(row, 4)?,
            category: row.get(5)?,
        })
    }

    pub fn summary(&self) -> AlertSummary {
        AlertSummary {
            sent_time: self.sent_time,
            subject: self.subject.clone(),
            recipient: self.recipient.clone(),
            category: self.category.clone(),
        }
    }
}

/// What the dashboard shows for one alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    pub sent_time: DateTime<Utc>,
    pub subject: String,
    pub recipient: String,
    pub category: String,
}

/// Result of an identity upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upsert {
    pub file_id: i64,
    /// True when this call inserted the record (content never seen before)
    pub created: bool,
}

/// ISO-8601 UTC, second precision: `2026-10-19T12:00:00Z`
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Offset-less layouts other writers of this database produce, read as UTC.
/// `%.f` also matches no fraction at all.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a stored timestamp
///
/// Accepts RFC 3339 with any offset, plus naive `T`- or space-separated
/// times with optional fractional seconds (`2026-10-19 12:00:00.123456`).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let s = s.trim();
    match DateTime::parse_from_rfc3339(s) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(e) => NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|naive| naive.and_utc())
            .ok_or(e),
    }
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
