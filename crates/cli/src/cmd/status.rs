//! Show watched folder and state summary

use crate::system_config::Settings;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;

const LATEST_ALERTS: usize = 5;

pub async fn run(settings: &Settings) -> Result<()> {
    let db_path = settings.db_path();

    println!("{}", "polwatch status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    match settings.watch.root.as_deref() {
        Some(root) if root.is_dir() => println!("Root:          {}", root.display().cyan()),
        Some(root) => println!(
            "Root:          {} {}",
            root.display().red(),
            "(missing)".red()
        ),
        None => println!("Root:          {}", "not configured".yellow()),
    }
    println!("Database:      {}", db_path.display());
    println!();

    let Some(journal) = util::open_existing_journal(&db_path)? else {
        println!("  {}", "No state yet. Start with 'polwatch watch'".dimmed());
        return Ok(());
    };

    let size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    println!("Storage:");
    println!("  Files:       {}", journal.identity().count()?);
    println!("  Alerts:      {}", journal.ledger().count()?);
    println!("  Size:        {}", util::format_size(size));
    println!();

    let latest = journal.ledger().recent_alerts(LATEST_ALERTS)?;
    println!("Latest alerts:");
    if latest.is_empty() {
        println!("  {}", "None".dimmed());
    }
    for alert in &latest {
        print!("  {} ", util::format_relative_time(alert.sent_time).dimmed());
        println!("{} {}", alert.subject, format!("-> {}", alert.recipient).dimmed());
    }

    Ok(())
}
