//! Cheap metadata snapshots for detecting in-progress writes

use crate::error::HashError;
use std::path::Path;
use std::time::SystemTime;

/// Size and modification time of a file at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSnapshot {
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub is_file: bool,
}

impl FileSnapshot {
    /// Stat the file at `path`
    pub fn capture(path: &Path) -> Result<Self, HashError> {
        let meta = std::fs::metadata(path).map_err(|e| HashError::io(path, e))?;
        Ok(Self {
            len: meta.len(),
            // Some filesystems don't report mtime; size alone still detects growth
            modified: meta.modified().ok(),
            is_file: meta.is_file(),
        })
    }
}
