//! Configuration display
//!
//! Shows the merged configuration after every source has been applied.

use crate::system_config::{self, Settings};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

/// Print the effective configuration as TOML, password redacted
pub fn run_show(settings: &Settings) -> Result<()> {
    let rendered = toml::to_string_pretty(&settings.redacted())
        .context("Failed to render configuration")?;

    println!("{}", "Effective Configuration".bold());
    if let Some(path) = system_config::config_file_path() {
        println!("{}: {}", "User file".dimmed(), path.display().dimmed());
    }
    println!("{}: {}", "Database".dimmed(), settings.db_path().display().dimmed());
    println!("{}: {}\n", "Logs".dimmed(), settings.log_dir().display().dimmed());
    println!("{}", rendered);
    Ok(())
}

/// Show example configuration
pub fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}
