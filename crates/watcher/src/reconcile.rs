//! Startup reconciliation scan
//!
//! The filesystem watch only reports changes made while it is running.
//! Files dropped into the root while the watcher was down are found by
//! walking the tree once at startup and feeding each PDF through the
//! pipeline as a create event. Content already alerted is skipped by the
//! ledger gate, so repeating the scan on every start is harmless.

use crate::filter::{is_pdf, IgnoreRules};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// All PDF files under `root` that pass the ignore rules, sorted by path
pub fn scan_existing(root: &Path, rules: &IgnoreRules) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !rules.should_ignore(e.path()))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry during startup scan");
                continue;
            }
        };

        if entry.file_type().is_file() && is_pdf(entry.path()) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    debug!(root = %root.display(), count = found.len(), "startup scan complete");
    found
}
