//! Durable sighting and alert state
//!
//! This crate provides:
//! - The identity store (fingerprint -> file record, first/last seen)
//! - The alert ledger (which content has already been notified)
//! - The SQLite schema both live in
//!
//! State lives in SQLite rather than process memory so alert history
//! survives restarts and can be read by other processes.

pub mod db;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod models;

// Re-exports
pub use db::Database;
pub use error::StoreError;
pub use identity::IdentityStore;
pub use ledger::{AlertLedger, DEFAULT_RECENT_LIMIT, NEW_PDF};
pub use models::{AlertRecord, AlertSummary, FileRecord, Upsert};

use std::path::Path;

/// Result type for journal operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Both stores over one database
#[derive(Debug, Clone)]
pub struct Journal {
    db: Database,
    identity: IdentityStore,
    ledger: AlertLedger,
}

impl Journal {
    /// Open or create the journal database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::from_database(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    fn from_database(db: Database) -> Self {
        Self {
            identity: IdentityStore::new(db.clone()),
            ledger: AlertLedger::new(db.clone()),
            db,
        }
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    pub fn ledger(&self) -> &AlertLedger {
        &self.ledger
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}
