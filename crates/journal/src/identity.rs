//! Content identity store: fingerprint -> file record
//!
//! The fingerprint column is UNIQUE, which is what keeps one record per
//! content even when two writers race to insert the same fingerprint. The
//! loser of that race sees a constraint violation and takes the update path
//! instead.

use crate::db::Database;
use crate::error::StoreError;
use crate::models::{format_timestamp, FileRecord, Upsert};
use chrono::{DateTime, Utc};
use polwatch_core::Fingerprint;
use rusqlite::{ffi, params, OptionalExtension};
use std::path::Path;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct IdentityStore {
    db: Database,
}

impl IdentityStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a sighting of `fingerprint` at `path`
    pub fn upsert(
        &self,
        path: &Path,
        fingerprint: &Fingerprint,
        size: u64,
    ) -> Result<Upsert, StoreError> {
        self.upsert_at(path, fingerprint, size, Utc::now())
    }

    /// Record a sighting with an explicit clock
    ///
    /// New content gets `first_seen = last_seen = now`. Known content has
    /// its path, name, size and last_seen refreshed; id, fingerprint and
    /// first_seen never change. `last_seen` never moves backwards.
    pub fn upsert_at(
        &self,
        path: &Path,
        fingerprint: &Fingerprint,
        size: u64,
        now: DateTime<Utc>,
    ) -> Result<Upsert, StoreError> {
        let path_str = path.to_string_lossy().into_owned();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_str.clone());
        let size = i64::try_from(size).unwrap_or(i64::MAX);
        let now = format_timestamp(now);
        let fp = fingerprint.to_hex();

        let upserted = self.db.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO files (path, name, size, fingerprint, first_seen, last_seen) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![path_str, name, size, fp, now],
            );

            let created = match inserted {
                Ok(_) => true,
                Err(e) if is_unique_violation(&e) => {
                    trace!(fingerprint = %fp, "known content, refreshing sighting");
                    conn.execute(
                        "UPDATE files SET path = ?1, name = ?2, size = ?3, \
                         last_seen = MAX(last_seen, ?4) WHERE fingerprint = ?5",
                        params![path_str, name, size, now, fp],
                    )?;
                    false
                }
                Err(e) => return Err(e),
            };

            let id: Option<i64> = conn
                .query_row(
                    "SELECT id FROM files WHERE fingerprint = ?1",
                    params![fp],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id.map(|file_id| Upsert { file_id, created }))
        })?;

        upserted.ok_or_else(|| StoreError::MissingAfterUpsert(fp.clone()))
    }

    /// Whether a record with this id exists (reporting only)
    pub fn exists(&self, file_id: i64) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM files WHERE id = ?1)",
                params![file_id],
                |row| row.get(0),
            )
        })
    }

    pub fn get(&self, file_id: i64) -> Result<Option<FileRecord>, StoreError> {
        let sql = format!("SELECT {} FROM files WHERE id = ?1", FileRecord::COLUMNS);
        self.db.with_conn(|conn| {
            conn.query_row(&sql, params![file_id], FileRecord::from_row)
                .optional()
        })
    }

    pub fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<FileRecord>, StoreError> {
        let sql = format!("SELECT {} FROM files WHERE fingerprint = ?1", FileRecord::COLUMNS);
        self.db.with_conn(|conn| {
            conn.query_row(&sql, params![fingerprint.to_hex()], FileRecord::from_row)
                .optional()
        })
    }

    /// Most recently sighted records first
    pub fn recent(&self, limit: usize) -> Result<Vec<FileRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM files ORDER BY last_seen DESC, id DESC LIMIT ?1",
            FileRecord::COLUMNS
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![limit], FileRecord::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>();
            rows
        })
    }

    pub fn count(&self) -> Result<u64, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get::<_, i64>(0))
        })
        .map(|n| n.max(0) as u64)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use polwatch_core::hash_bytes;

    fn store() -> IdentityStore {
        IdentityStore::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_first_sighting_creates_record() {
        let store = store();
        let fp = hash_bytes(b"policy X");
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

        let up = store.upsert_at(Path::new("/root/policy1.pdf"), &fp, 8, t0).unwrap();
        assert!(up.created);

        let rec = store.get(up.file_id).unwrap().unwrap();
        assert_eq!(rec.name, "policy1.pdf");
        assert_eq!(rec.size, 8);
        assert_eq!(rec.fingerprint, fp);
        assert_eq!(rec.first_seen, t0);
        assert_eq!(rec.last_seen, t0);
    }

    #[test]
    fn test_resighting_refreshes_location_only() {
        let store = store();
        let fp = hash_bytes(b"policy X");
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let t1 = t0 + Duration::minutes(5);

        let first = store.upsert_at(Path::new("/root/policy1.pdf"), &fp, 8, t0).unwrap();
        let second = store
            .upsert_at(Path::new("/root/folderB/policy1_renamed.pdf"), &fp, 9, t1)
            .unwrap();

        assert!(!second.created);
        assert_eq!(first.file_id, second.file_id);

        let rec = store.get(first.file_id).unwrap().unwrap();
        assert_eq!(rec.path, "/root/folderB/policy1_renamed.pdf");
        assert_eq!(rec.name, "policy1_renamed.pdf");
        assert_eq!(rec.size, 9);
        assert_eq!(rec.first_seen, t0);
        assert_eq!(rec.last_seen, t1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_last_seen_never_regresses() {
        let store = store();
        let fp = hash_bytes(b"content");
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

        let up = store.upsert_at(Path::new("/a.pdf"), &fp, 7, t0).unwrap();
        store
            .upsert_at(Path::new("/b.pdf"), &fp, 7, t0 - Duration::hours(1))
            .unwrap();

        let rec = store.get(up.file_id).unwrap().unwrap();
        assert_eq!(rec.last_seen, t0);
        assert_eq!(rec.path, "/b.pdf");
    }

    #[test]
    fn test_distinct_content_gets_distinct_ids() {
        let store = store();
        let a = store.upsert(Path::new("/a.pdf"), &hash_bytes(b"a"), 1).unwrap();
        let b = store.upsert(Path::new("/a.pdf"), &hash_bytes(b"b"), 1).unwrap();

        assert_ne!(a.file_id, b.file_id);
        assert!(a.created && b.created);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_exists_and_lookup() {
        let store = store();
        let fp = hash_bytes(b"x");
        let up = store.upsert(Path::new("/x.pdf"), &fp, 1).unwrap();

        assert!(store.exists(up.file_id).unwrap());
        assert!(!store.exists(up.file_id + 100).unwrap());
        assert_eq!(store.find_by_fingerprint(&fp).unwrap().unwrap().id, up.file_id);
        assert!(store.find_by_fingerprint(&hash_bytes(b"y")).unwrap().is_none());
        assert!(store.get(up.file_id + 100).unwrap().is_none());
    }

    #[test]
    fn test_recent_orders_by_last_seen() {
        let store = store();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        store.upsert_at(Path::new("/old.pdf"), &hash_bytes(b"old"), 1, t0).unwrap();
        store
            .upsert_at(Path::new("/new.pdf"), &hash_bytes(b"new"), 1, t0 + Duration::seconds(1))
            .unwrap();

        let names: Vec<_> = store.recent(10).unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["new.pdf", "old.pdf"]);
        assert_eq!(store.recent(1).unwrap().len(), 1);
    }
}
