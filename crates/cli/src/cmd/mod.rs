pub mod alerts;
pub mod check;
pub mod config;
pub mod status;
pub mod watch;

use crate::system_config::Settings;
use anyhow::{Context, Result};
use polwatch_journal::Journal;
use polwatch_mailer::SmtpNotifier;
use polwatch_watcher::{AlertTemplate, IgnoreRules, LogNotifier, Notifier, Pipeline, Settler};
use std::path::Path;

/// Mail notifier, or the logging one for `--dry-run`
pub fn build_notifier(settings: &Settings, dry_run: bool) -> Result<Box<dyn Notifier>> {
    if dry_run {
        return Ok(Box::new(LogNotifier));
    }
    let notifier = SmtpNotifier::new(&settings.mail)
        .context("Mail is not configured (see `polwatch config --example`, or use --dry-run)")?;
    Ok(Box::new(notifier))
}

/// Pipeline wired from settings
pub fn build_pipeline(
    settings: &Settings,
    journal: &Journal,
    root: &Path,
    dry_run: bool,
) -> Result<Pipeline> {
    let rules = IgnoreRules::load(root, settings.ignore_config())
        .context("Failed to load ignore rules")?;

    Ok(Pipeline::new(journal, build_notifier(settings, dry_run)?, rules)
        .with_settler(Settler::new(settings.settle_config()))
        .with_template(AlertTemplate::new(settings.mail.subject_prefix.as_str())))
}
