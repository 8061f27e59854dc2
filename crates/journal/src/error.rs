use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The database cannot be opened or written
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),

    #[error("cannot create database directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An upserted fingerprint could not be read back
    #[error("file record for fingerprint {0} missing after upsert")]
    MissingAfterUpsert(String),
}
