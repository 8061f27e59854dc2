//! Run the watcher until Ctrl+C

use crate::system_config::Settings;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use polwatch_watcher::{WatchOptions, Watcher};
use tracing::info;

pub async fn run(settings: &Settings, dry_run: bool, scan: bool) -> Result<()> {
    let watcher = Watcher::new(
        settings.watch_root()?,
        WatchOptions {
            scan_on_start: scan || settings.watch.scan_on_start,
        },
    )?;
    let root = watcher.root().to_path_buf();
    let db_path = settings.db_path();

    let journal = util::open_journal(&db_path)?;
    let pipeline = super::build_pipeline(settings, &journal, &root, dry_run)?;
    let running = watcher.start(pipeline).context("Failed to start watcher")?;

    info!(
        root = %root.display(),
        db = %db_path.display(),
        dry_run,
        "polwatch started"
    );
    println!("{} {}", "Watching".green().bold(), root.display());
    println!("  {}: {}", "State".dimmed(), db_path.display());
    if dry_run {
        println!("  {}", "Dry run: alerts are logged, not mailed".yellow());
    }
    println!("  {}", "Press Ctrl+C to stop".dimmed());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    println!("\n{}", "Stopping...".dimmed());
    // Joining waits for the in-flight event, which may block on SMTP
    let stats = tokio::task::spawn_blocking(move || running.stop())
        .await
        .context("Shutdown task failed")??;

    info!(
        processed = stats.processed,
        notified = stats.notified,
        skipped = stats.skipped,
        "polwatch stopped"
    );
    println!(
        "{} {} events, {} alerts sent",
        "Stopped.".green(),
        stats.processed,
        stats.notified
    );
    Ok(())
}
