//! Layered configuration
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. `<config dir>/polwatch/config.toml`, then `./polwatch.toml`
//!    (or only the file given with `--config`)
//! 3. `POLWATCH_<SECTION>__<KEY>` environment variables
//! 4. Legacy `SMTP_*` / `MAIL_*` variables, `.env` included
//! 5. Command line flags

use anyhow::{Context, Result};
use config::{Config, Environment, File as ConfigFile, FileFormat};
use polwatch_mailer::MailSettings;
use polwatch_watcher::{IgnoreConfig, SettleConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "polwatch";
const LOCAL_CONFIG: &str = "polwatch.toml";
const ENV_PREFIX: &str = "POLWATCH";

/// Legacy variable -> config key
const LEGACY_MAIL_VARS: &[(&str, &str)] = &[
    ("SMTP_HOST", "mail.host"),
    ("SMTP_PORT", "mail.port"),
    ("SMTP_USER", "mail.user"),
    ("SMTP_PASS", "mail.password"),
    ("MAIL_FROM", "mail.from"),
    ("MAIL_TO", "mail.to"),
    ("MAIL_SUBJECT_PREFIX", "mail.subject_prefix"),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub watch: WatchSettings,
    pub storage: StorageSettings,
    pub mail: MailSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Folder to watch recursively
    pub root: Option<PathBuf>,
    /// Delay after an event before the first size/mtime check
    pub quiescence_ms: u64,
    pub poll_interval_ms: u64,
    /// Give up on a file still changing after this long
    pub max_settle_secs: u64,
    pub scan_on_start: bool,
    /// Gitignore-style patterns relative to the root
    pub ignore_patterns: Vec<String>,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            root: None,
            quiescence_ms: 1000,
            poll_interval_ms: 250,
            max_settle_secs: 30,
            scan_on_start: false,
            ignore_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    pub dir: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

/// Command line values that override every other source
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub root: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
}

/// Per-user config file location
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".polwatch"))
}

/// Load settings from every source and validate them
pub fn load(overrides: &Overrides) -> Result<Settings> {
    // A missing .env is the normal case
    let _ = dotenvy::dotenv();

    let mut builder = Config::builder();

    match &overrides.config_file {
        Some(path) => {
            builder = builder.add_source(ConfigFile::from(path.as_path()).format(FileFormat::Toml));
        }
        None => {
            if let Some(user_file) = config_file_path() {
                builder = builder.add_source(
                    ConfigFile::from(user_file)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
            builder = builder.add_source(
                ConfigFile::from(Path::new(LOCAL_CONFIG))
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    for (var, key) in LEGACY_MAIL_VARS {
        let value = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
        builder = builder.set_override_option(*key, value)?;
    }

    builder = builder
        .set_override_option(
            "watch.root",
            overrides.root.as_ref().map(|p| p.display().to_string()),
        )?
        .set_override_option(
            "storage.db_path",
            overrides.db_path.as_ref().map(|p| p.display().to_string()),
        )?;

    let settings: Settings = builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    /// Reject values that would stall or spin the watcher
    pub fn validate(&self) -> Result<()> {
        if self.watch.poll_interval_ms == 0 {
            anyhow::bail!("watch.poll_interval_ms must be greater than 0");
        }
        if self.watch.max_settle_secs == 0 {
            anyhow::bail!("watch.max_settle_secs must be greater than 0");
        }
        if self.watch.max_settle_secs.saturating_mul(1000) <= self.watch.quiescence_ms {
            anyhow::bail!(
                "watch.max_settle_secs ({}s) must be longer than watch.quiescence_ms ({}ms)",
                self.watch.max_settle_secs,
                self.watch.quiescence_ms
            );
        }
        if self.mail.port == 0 {
            anyhow::bail!("mail.port must be greater than 0");
        }
        if self.mail.timeout_secs == 0 {
            anyhow::bail!("mail.timeout_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn watch_root(&self) -> Result<&Path> {
        self.watch.root.as_deref().context(
            "No folder to watch. Pass --root, set watch.root in polwatch.toml, or POLWATCH_WATCH__ROOT",
        )
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage
            .db_path
            .clone()
            .unwrap_or_else(|| data_dir().join("state.sqlite3"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log.dir.clone().unwrap_or_else(|| data_dir().join("logs"))
    }

    pub fn settle_config(&self) -> SettleConfig {
        SettleConfig {
            quiescence: Duration::from_millis(self.watch.quiescence_ms),
            poll_interval: Duration::from_millis(self.watch.poll_interval_ms),
            max_wait: Duration::from_secs(self.watch.max_settle_secs),
        }
    }

    pub fn ignore_config(&self) -> IgnoreConfig {
        IgnoreConfig {
            patterns: self.watch.ignore_patterns.clone(),
            ..IgnoreConfig::default()
        }
    }

    /// Copy safe to print
    pub fn redacted(&self) -> Self {
        Self {
            mail: self.mail.redacted(),
            ..self.clone()
        }
    }
}

/// Commented sample for `polwatch config --example`
pub fn example_config() -> &'static str {
    r#"# polwatch configuration
# Looked up at --config, ./polwatch.toml, then the per-user config dir.
# Every key can also be set as POLWATCH_<SECTION>__<KEY>.

[watch]
root = "/srv/polizas"
# Wait this long after an event before checking the file
quiescence_ms = 1000
# Then poll size/mtime until two checks agree
poll_interval_ms = 250
max_settle_secs = 30
# Feed files already in the folder through the pipeline at startup
scan_on_start = false
ignore_patterns = ["archive/", "*.draft.pdf"]

[storage]
# db_path = "/var/lib/polwatch/state.sqlite3"

[mail]
# SMTP_HOST, SMTP_PORT, SMTP_USER, SMTP_PASS, MAIL_FROM, MAIL_TO and
# MAIL_SUBJECT_PREFIX override these.
host = "smtp.example.com"
port = 587
user = "watcher@example.com"
# password = "..."
from = "watcher@example.com"
to = "ops@example.com, claims@example.com"
subject_prefix = "[PDF Watcher]"
timeout_secs = 20

[log]
level = "info"
# dir = "/var/log/polwatch"
"#
}
