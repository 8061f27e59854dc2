//! Folder watching for polwatch
//!
//! This crate provides:
//! - Recursive filesystem watching of one root (notify)
//! - Relevance filtering (PDF only, ignore rules)
//! - Quiescence wait before hashing
//! - The per-event pipeline deciding whether to notify
//!
//! The notify backend pushes events into a channel; a single worker thread
//! drains it and runs the pipeline one event at a time.

pub mod coalesce;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod notifier;
pub mod pipeline;
pub mod reconcile;

pub use debounce::{SettleConfig, Settler};
pub use error::WatchError;
pub use filter::{IgnoreConfig, IgnoreRules};
pub use notifier::{Alert, AlertTemplate, Delivery, LogNotifier, NotificationError, Notifier};
pub use pipeline::{Content, Outcome, Pipeline, SkipReason};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// File system event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
}

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// File created
    Create,
    /// File contents or metadata modified
    Modify,
    /// File deleted, or renamed away
    Delete,
    /// File renamed; the path is the destination
    Rename,
}

impl EventKind {
    /// Create, modify and rename-destination events are sightings
    pub fn is_sighting(self) -> bool {
        matches!(self, EventKind::Create | EventKind::Modify | EventKind::Rename)
    }
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Translate one notify event into zero or more watch events
    pub fn from_notify(event: notify::Event) -> Vec<Self> {
        use notify::event::{EventKind as Kind, ModifyKind, RenameMode};

        let kind = match event.kind {
            Kind::Create(_) => EventKind::Create,
            Kind::Modify(ModifyKind::Name(RenameMode::From)) => EventKind::Delete,
            Kind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                // paths = [from, to]; only the destination can be a sighting
                return event
                    .paths
                    .into_iter()
                    .last()
                    .map(|to| Self::new(to, EventKind::Rename))
                    .into_iter()
                    .collect();
            }
            Kind::Modify(ModifyKind::Name(_)) => EventKind::Rename,
            Kind::Modify(_) => EventKind::Modify,
            Kind::Remove(_) => EventKind::Delete,
            Kind::Access(_) | Kind::Any | Kind::Other => return Vec::new(),
        };

        event
            .paths
            .into_iter()
            .map(|path| Self::new(path, kind))
            .collect()
    }
}

/// Watcher options
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Feed existing files through the pipeline before live events
    pub scan_on_start: bool,
}

/// Counters reported when the worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub processed: u64,
    pub notified: u64,
    pub skipped: u64,
    /// Queued events dropped because a later one covered the same path
    pub coalesced: u64,
}

impl WorkerStats {
    fn observe(&mut self, outcome: &Outcome) {
        self.processed += 1;
        if outcome.is_notified() {
            self.notified += 1;
        } else {
            self.skipped += 1;
        }
    }
}

/// File system watcher for one root directory
#[derive(Debug)]
pub struct Watcher {
    root: PathBuf,
    options: WatchOptions,
}

impl Watcher {
    /// Create a watcher for `root`, which must be an existing directory
    pub fn new(root: &Path, options: WatchOptions) -> Result<Self, WatchError> {
        let root = root.canonicalize().map_err(|source| WatchError::RootMissing {
            path: root.to_path_buf(),
            source,
        })?;
        if !root.is_dir() {
            return Err(WatchError::RootNotDirectory(root));
        }
        Ok(Self { root, options })
    }

    /// Canonical watched root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start watching and processing events on a dedicated worker thread
    pub fn start(self, pipeline: Pipeline) -> Result<RunningWatcher, WatchError> {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let mut fs_watcher = notify::recommended_watcher(forward_events(event_tx))?;
        fs_watcher.watch(&self.root, RecursiveMode::Recursive)?;
        info!(
            root = %self.root.display(),
            ignore_sources = pipeline.rules().active_sources(),
            "watching for pdf files"
        );

        // Registered before the scan, so files landing mid-scan still queue
        let scan_root = self.options.scan_on_start.then(|| self.root.clone());
        let worker = thread::Builder::new()
            .name("polwatch-worker".to_string())
            .spawn(move || run_worker(pipeline, event_rx, shutdown_rx, scan_root))
            .map_err(WatchError::Spawn)?;

        Ok(RunningWatcher {
            root: self.root,
            fs_watcher,
            shutdown_tx,
            worker,
        })
    }
}

/// A started watcher
///
/// Dropping it also stops the worker, without waiting for it.
pub struct RunningWatcher {
    root: PathBuf,
    fs_watcher: RecommendedWatcher,
    shutdown_tx: Sender<()>,
    worker: JoinHandle<WorkerStats>,
}

impl RunningWatcher {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop accepting events, let the in-flight event finish, join the worker
    pub fn stop(self) -> Result<WorkerStats, WatchError> {
        let RunningWatcher {
            fs_watcher,
            shutdown_tx,
            worker,
            ..
        } = self;

        drop(fs_watcher);
        // The worker may already be gone; disconnect stops it too
        let _ = shutdown_tx.send(());
        worker.join().map_err(|_| WatchError::WorkerPanicked)
    }
}

fn forward_events(tx: Sender<WatchEvent>) -> impl FnMut(notify::Result<notify::Event>) + Send + 'static {
    move |res| match res {
        Ok(event) => {
            for ev in WatchEvent::from_notify(event) {
                if tx.send(ev).is_err() {
                    // Worker stopped; nothing left to deliver to
                    return;
                }
            }
        }
        Err(e) => warn!(error = %e, "filesystem watch error"),
    }
}

fn shutdown_requested(shutdown: &Receiver<()>) -> bool {
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}

fn run_worker(
    pipeline: Pipeline,
    events: Receiver<WatchEvent>,
    shutdown: Receiver<()>,
    scan_root: Option<PathBuf>,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    if let Some(root) = scan_root {
        for path in reconcile::scan_existing(&root, pipeline.rules()) {
            if shutdown_requested(&shutdown) {
                info!(?stats, "worker stopped during startup scan");
                return stats;
            }
            stats.observe(&pipeline.process(&WatchEvent::new(path, EventKind::Create)));
        }
    }

    'events: loop {
        if shutdown_requested(&shutdown) {
            break;
        }
        let first = crossbeam_channel::select! {
            recv(shutdown) -> _ => break,
            recv(events) -> msg => match msg {
                Ok(event) => event,
                Err(_) => {
                    debug!("event source closed");
                    break;
                }
            },
        };

        let mut batch = vec![first];
        batch.extend(events.try_iter());
        let received = batch.len();
        let batch = coalesce::coalesce(batch);
        stats.coalesced += (received - batch.len()) as u64;

        for event in batch {
            if shutdown_requested(&shutdown) {
                break 'events;
            }
            stats.observe(&pipeline.process(&event));
        }
    }

    info!(
        processed = stats.processed,
        notified = stats.notified,
        skipped = stats.skipped,
        coalesced = stats.coalesced,
        "worker stopped"
    );
    stats
}
