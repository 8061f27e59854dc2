//! Quiescence wait before hashing
//!
//! A create event usually arrives while the copy is still in progress.
//! The settler sleeps a fixed quiescence delay, then polls size and mtime
//! until two consecutive checks agree, bounded by `max_wait`.

use polwatch_core::{FileSnapshot, HashError};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleConfig {
    /// Initial delay before the first stat
    pub quiescence: Duration,
    /// Delay between consecutive stats
    pub poll_interval: Duration,
    /// Give up after this long
    pub max_wait: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            quiescence: Duration::from_secs(1),
            poll_interval: Duration::from_millis(250),
            max_wait: Duration::from_secs(30),
        }
    }
}

#[derive(Error, Debug)]
pub enum SettleError {
    #[error(transparent)]
    Io(#[from] HashError),

    #[error("not a regular file")]
    NotAFile,

    #[error("still changing after {waited:?}")]
    Unstable { waited: Duration },
}

#[derive(Debug, Clone, Default)]
pub struct Settler {
    config: SettleConfig,
}

impl Settler {
    pub fn new(config: SettleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SettleConfig {
        &self.config
    }

    /// Block until the file at `path` stops changing
    pub fn settle(&self, path: &Path) -> Result<FileSnapshot, SettleError> {
        self.settle_with(path, FileSnapshot::capture)
    }

    fn settle_with(
        &self,
        path: &Path,
        mut capture: impl FnMut(&Path) -> Result<FileSnapshot, HashError>,
    ) -> Result<FileSnapshot, SettleError> {
        thread::sleep(self.config.quiescence);

        // max_wait bounds polling only; at least one confirming poll always runs
        let started = Instant::now();
        let mut previous = capture(path)?;
        loop {
            if !previous.is_file {
                return Err(SettleError::NotAFile);
            }

            thread::sleep(self.config.poll_interval);
            let current = capture(path)?;
            if current == previous {
                return Ok(current);
            }
            if started.elapsed() >= self.config.max_wait {
                return Err(SettleError::Unstable {
                    waited: started.elapsed(),
                });
            }

            trace!(path = %path.display(), from = previous.len, to = current.len, "still settling");
            previous = current;
        }
    }
}
