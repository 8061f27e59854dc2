//! What gets sent, and the seam to whatever sends it
//!
//! The pipeline decides whether to notify and renders the [`Alert`]; a
//! [`Notifier`] only delivers it. Delivery failures are reported back and
//! never retried here.

use chrono::{DateTime, Utc};
use polwatch_core::Fingerprint;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Default subject prefix, matches the mail filters already in use
pub const DEFAULT_SUBJECT_PREFIX: &str = "[PDF Watcher]";

/// A rendered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub category: String,
    pub subject: String,
    pub body: String,
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub fingerprint: Fingerprint,
    pub detected_at: DateTime<Utc>,
}

/// Successful delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Who received it, as stored in the ledger
    pub recipient: String,
}

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("no recipients configured")]
    NoRecipients,

    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("cannot build message: {0}")]
    Message(String),

    #[error("transport failed: {0}")]
    Transport(String),
}

/// Delivers alerts
///
/// Implementations apply their own timeouts; the watcher thread blocks on
/// `notify`.
pub trait Notifier: Send {
    fn notify(&self, alert: &Alert) -> Result<Delivery, NotificationError>;
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, alert: &Alert) -> Result<Delivery, NotificationError> {
        (**self).notify(alert)
    }
}

/// Logs alerts instead of sending them (`--dry-run`)
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl LogNotifier {
    pub const RECIPIENT: &'static str = "dry-run";
}

impl Notifier for LogNotifier {
    fn notify(&self, alert: &Alert) -> Result<Delivery, NotificationError> {
        info!(
            subject = %alert.subject,
            path = %alert.path.display(),
            size = alert.size,
            fingerprint = %alert.fingerprint.short(),
            "dry run: alert not sent"
        );
        Ok(Delivery {
            recipient: Self::RECIPIENT.to_string(),
        })
    }
}

/// Renders subject and body for a sighting
#[derive(Debug, Clone)]
pub struct AlertTemplate {
    subject_prefix: String,
}

impl Default for AlertTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_SUBJECT_PREFIX)
    }
}

impl AlertTemplate {
    pub fn new(subject_prefix: impl Into<String>) -> Self {
        Self {
            subject_prefix: subject_prefix.into(),
        }
    }

    pub fn render(
        &self,
        category: &str,
        path: &Path,
        size: u64,
        fingerprint: Fingerprint,
        detected_at: DateTime<Utc>,
    ) -> Alert {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let prefix = self.subject_prefix.trim();
        let subject = if prefix.is_empty() {
            format!("New PDF: {name}")
        } else {
            format!("{prefix} New PDF: {name}")
        };

        let body = format!(
            "A PDF file was detected in the watched folder.\n\n\
             Name: {name}\n\
             Path: {path}\n\
             Size: {size} bytes\n\
             Detected: {detected} UTC\n\
             Fingerprint: {fingerprint}\n",
            path = path.display(),
            detected = detected_at.format("%Y-%m-%d %H:%M:%S"),
        );

        Alert {
            category: category.to_string(),
            subject,
            body,
            path: path.to_path_buf(),
            name,
            size,
            fingerprint,
            detected_at,
        }
    }
}
