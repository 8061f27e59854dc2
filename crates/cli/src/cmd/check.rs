//! Process one file on demand

use crate::system_config::Settings;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use polwatch_watcher::{EventKind, Outcome, SkipReason, WatchEvent};
use std::path::Path;

pub async fn run(settings: &Settings, file: &Path, dry_run: bool) -> Result<()> {
    let file = file
        .canonicalize()
        .with_context(|| format!("Cannot access {}", file.display()))?;

    // Ignore rules are relative to the watched root; outside it only the
    // built-in patterns apply
    let root = match settings.watch.root.as_deref().map(Path::canonicalize) {
        Some(Ok(root)) if file.starts_with(&root) => root,
        _ => file
            .parent()
            .map(Path::to_path_buf)
            .context("File has no parent directory")?,
    };

    let journal = util::open_journal(&settings.db_path())?;
    let pipeline = super::build_pipeline(settings, &journal, &root, dry_run)?;

    let outcome = tokio::task::spawn_blocking(move || {
        pipeline.process(&WatchEvent::new(file, EventKind::Create))
    })
    .await
    .context("Check task failed")?;

    match outcome {
        Outcome::Notified {
            file_id,
            fingerprint,
            content,
            recipient,
        } => {
            println!("{} alert sent to {}", "✓".green(), recipient.cyan());
            println!("  File ID:     {}", file_id);
            println!("  Content:     {:?}", content);
            println!("  Fingerprint: {}", fingerprint.short().yellow());
        }
        Outcome::Skipped(SkipReason::AlreadyAlerted { file_id, .. }) => {
            println!(
                "{} already alerted for this content (file ID {})",
                "-".dimmed(),
                file_id
            );
        }
        Outcome::Skipped(reason) => {
            anyhow::bail!("Not alerted: {}", describe(&reason));
        }
    }
    Ok(())
}

fn describe(reason: &SkipReason) -> String {
    match reason {
        SkipReason::NotASighting => "not a create/modify event".to_string(),
        SkipReason::NotPdf => "not a .pdf file".to_string(),
        SkipReason::NotAFile => "not a regular file".to_string(),
        SkipReason::Ignored => "matches an ignore rule".to_string(),
        SkipReason::Vanished => "file vanished".to_string(),
        SkipReason::Unreadable(e) => format!("cannot read file: {e}"),
        SkipReason::Unstable => "file is still being written".to_string(),
        SkipReason::Storage(e) => format!("state database error: {e}"),
        SkipReason::AlreadyAlerted { file_id, .. } => {
            format!("already alerted (file ID {file_id})")
        }
        SkipReason::NotifyFailed { error, .. } => format!("notification failed: {error}"),
    }
}
