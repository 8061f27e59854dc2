use std::path::PathBuf;
use thiserror::Error;

/// Startup and shutdown failures. Per-event failures never surface here;
/// they end as a skipped [`crate::Outcome`].
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("watched folder {} does not exist: {source}", path.display())]
    RootMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("watched path {} is not a directory", .0.display())]
    RootNotDirectory(PathBuf),

    #[error("cannot watch folder: {0}")]
    Notify(#[from] notify::Error),

    #[error("cannot start worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("worker thread panicked")]
    WorkerPanicked,
}
