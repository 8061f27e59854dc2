//! Per-event processing: Detected -> Settling -> Hashed -> Known/New -> Notified/Skipped
//!
//! Every event runs the full sequence on its own. Duplicate events for the
//! same physical change are harmless because the ledger gate sits after
//! hashing and before notifying: the first event to get through records the
//! alert, later ones find it and stop.

use crate::debounce::{SettleError, Settler};
use crate::filter::{is_pdf, IgnoreRules};
use crate::notifier::{AlertTemplate, Notifier};
use crate::WatchEvent;
use chrono::Utc;
use polwatch_core::{hash_file_stable, Fingerprint, HashError, StableHash};
use polwatch_journal::{AlertLedger, IdentityStore, Journal, NEW_PDF};
use std::path::Path;
use tracing::{debug, error, info, trace, warn};

/// Read attempts when content moves under the hasher
const HASH_RETRIES: u8 = 3;

/// Whether the fingerprint had a record before this sighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    New,
    Known,
}

/// Terminal state of one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Notified {
        file_id: i64,
        fingerprint: Fingerprint,
        content: Content,
        recipient: String,
    },
    Skipped(SkipReason),
}

impl Outcome {
    pub fn is_notified(&self) -> bool {
        matches!(self, Outcome::Notified { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Delete or other non-sighting event
    NotASighting,
    NotPdf,
    NotAFile,
    Ignored,
    /// File disappeared before it could be read
    Vanished,
    Unreadable(String),
    /// Still being written when we gave up waiting
    Unstable,
    /// Store could not be read or written
    Storage(String),
    AlreadyAlerted {
        file_id: i64,
        content: Content,
    },
    NotifyFailed {
        file_id: i64,
        error: String,
    },
}

/// Sequential event processor
pub struct Pipeline {
    identity: IdentityStore,
    ledger: AlertLedger,
    notifier: Box<dyn Notifier>,
    rules: IgnoreRules,
    settler: Settler,
    template: AlertTemplate,
    category: String,
}

impl Pipeline {
    pub fn new(journal: &Journal, notifier: Box<dyn Notifier>, rules: IgnoreRules) -> Self {
        Self {
            identity: journal.identity().clone(),
            ledger: journal.ledger().clone(),
            notifier,
            rules,
            settler: Settler::default(),
            template: AlertTemplate::default(),
            category: NEW_PDF.to_string(),
        }
    }

    pub fn with_settler(mut self, settler: Settler) -> Self {
        self.settler = settler;
        self
    }

    pub fn with_template(mut self, template: AlertTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn rules(&self) -> &IgnoreRules {
        &self.rules
    }

    /// Run one event to completion
    pub fn process(&self, event: &WatchEvent) -> Outcome {
        let outcome = self.run(event);
        match &outcome {
            Outcome::Notified { .. } => {}
            Outcome::Skipped(reason) => {
                trace!(path = %event.path.display(), kind = ?event.kind, ?reason, "skipped")
            }
        }
        outcome
    }

    fn run(&self, event: &WatchEvent) -> Outcome {
        let path = event.path.as_path();

        // Detected
        if !event.kind.is_sighting() {
            return Outcome::Skipped(SkipReason::NotASighting);
        }
        if !is_pdf(path) {
            return Outcome::Skipped(SkipReason::NotPdf);
        }
        if path.is_dir() {
            return Outcome::Skipped(SkipReason::NotAFile);
        }
        if self.rules.should_ignore(path) {
            return Outcome::Skipped(SkipReason::Ignored);
        }

        debug!(path = %path.display(), kind = ?event.kind, "pdf event detected");

        // Settling
        let snapshot = match self.settler.settle(path) {
            Ok(snapshot) => snapshot,
            Err(SettleError::Io(e)) => return Self::read_failure(path, e),
            Err(SettleError::NotAFile) => return Outcome::Skipped(SkipReason::NotAFile),
            Err(SettleError::Unstable { waited }) => {
                warn!(path = %path.display(), ?waited, "file never settled, skipping until next event");
                return Outcome::Skipped(SkipReason::Unstable);
            }
        };

        // Hashed; size is the one verified around the read
        let StableHash { fingerprint, len } = match hash_file_stable(path, HASH_RETRIES) {
            Ok(stable) => stable,
            Err(e) => return Self::read_failure(path, e),
        };
        if len != snapshot.len {
            debug!(path = %path.display(), settled = snapshot.len, hashed = len, "file changed after settling");
        }

        // KnownContent / NewContent
        let upsert = match self.identity.upsert(path, &fingerprint, len) {
            Ok(upsert) => upsert,
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot record sighting");
                return Outcome::Skipped(SkipReason::Storage(e.to_string()));
            }
        };
        let content = if upsert.created {
            Content::New
        } else {
            Content::Known
        };
        debug!(
            path = %path.display(),
            file_id = upsert.file_id,
            fingerprint = %fingerprint.short(),
            ?content,
            "sighting recorded"
        );

        // Gate
        match self.ledger.has_alert(upsert.file_id, Some(self.category.as_str())) {
            Ok(true) => {
                debug!(file_id = upsert.file_id, "content already alerted");
                return Outcome::Skipped(SkipReason::AlreadyAlerted {
                    file_id: upsert.file_id,
                    content,
                });
            }
            Ok(false) => {}
            Err(e) => {
                error!(file_id = upsert.file_id, error = %e, "cannot read alert ledger");
                return Outcome::Skipped(SkipReason::Storage(e.to_string()));
            }
        }

        // Notify
        let alert = self.template.render(
            &self.category,
            path,
            len,
            fingerprint,
            Utc::now(),
        );
        let delivery = match self.notifier.notify(&alert) {
            Ok(delivery) => delivery,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "notification failed, will retry on next event");
                return Outcome::Skipped(SkipReason::NotifyFailed {
                    file_id: upsert.file_id,
                    error: e.to_string(),
                });
            }
        };

        if let Err(e) = self.ledger.record(
            upsert.file_id,
            &alert.subject,
            &delivery.recipient,
            &alert.category,
        ) {
            error!(
                file_id = upsert.file_id,
                error = %e,
                "alert delivered but not recorded; this content may be notified again"
            );
            return Outcome::Skipped(SkipReason::Storage(e.to_string()));
        }

        info!(
            path = %path.display(),
            file_id = upsert.file_id,
            recipient = %delivery.recipient,
            "alert sent"
        );
        Outcome::Notified {
            file_id: upsert.file_id,
            fingerprint,
            content,
            recipient: delivery.recipient,
        }
    }

    fn read_failure(path: &Path, e: HashError) -> Outcome {
        match e {
            HashError::Unstable { attempts, .. } => {
                warn!(path = %path.display(), attempts, "file changed while hashing");
                Outcome::Skipped(SkipReason::Unstable)
            }
            e if e.is_vanished() => {
                warn!(path = %path.display(), "file vanished before it could be read");
                Outcome::Skipped(SkipReason::Vanished)
            }
            e => {
                warn!(path = %path.display(), error = %e, "cannot read file");
                Outcome::Skipped(SkipReason::Unreadable(e.to_string()))
            }
        }
    }
}
