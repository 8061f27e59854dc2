//! Recent alerts, newest first

use crate::system_config::Settings;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use polwatch_journal::AlertSummary;

pub async fn run(settings: &Settings, limit: usize, json: bool) -> Result<()> {
    let alerts: Vec<AlertSummary> = match util::open_existing_journal(&settings.db_path())? {
        Some(journal) => journal.ledger().recent_alerts(limit)?,
        None => Vec::new(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&alerts)?);
        return Ok(());
    }

    if alerts.is_empty() {
        println!("{}", "No alerts sent yet".dimmed());
        return Ok(());
    }

    for alert in &alerts {
        print_alert(alert);
    }
    Ok(())
}

fn print_alert(alert: &AlertSummary) {
    println!(
        "{} {} {} {}",
        util::format_absolute_time(alert.sent_time).dimmed(),
        alert.category.cyan(),
        alert.subject,
        format!("-> {}", alert.recipient).dimmed()
    );
}
