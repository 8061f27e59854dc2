//! Errors raised while reading file content

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HashError {
    /// File vanished or could not be read mid-pipeline
    #[error("cannot read {}: {source}", path.display())]
    IoRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File kept changing while it was being hashed
    #[error("{} is unstable after {attempts} read attempts (file changing too rapidly)", path.display())]
    Unstable { path: PathBuf, attempts: u8 },

    /// Malformed hex fingerprint
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),
}

impl HashError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::IoRead {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True when the file no longer exists
    pub fn is_vanished(&self) -> bool {
        matches!(self, Self::IoRead { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
