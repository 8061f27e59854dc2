//! SQLite connection handling
//!
//! The database is a shared, durable resource: other processes (the web
//! dashboard) may read and write it while the watcher runs. WAL mode plus a
//! busy timeout lets them interleave; every write the journal performs is a
//! single statement.

use crate::error::StoreError;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How long a writer waits on another process holding the lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Cloneable handle to one SQLite connection
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (creating if needed) the database file at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        };
        db.configure_pragmas()?;
        db.init_schema()?;
        debug!(path = %path.display(), "journal database ready");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
            path: None,
        };
        db.configure_pragmas()?;
        db.init_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // journal_mode returns a row, so it can't go through execute_batch
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }

    /// Create tables and indices if absent. Safe to run on every start.
    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    /// Run `f` with exclusive access to the connection
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let conn = self.conn.lock();
        Ok(f(&conn)?)
    }

    /// Database file path, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}
