//! SMTP delivery for polwatch alerts
//!
//! [`SmtpNotifier`] sends each [`Alert`] as a plain-text message to every
//! configured recipient over one STARTTLS (or implicit TLS on port 465)
//! connection per alert.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use polwatch_watcher::notifier::DEFAULT_SUBJECT_PREFIX;
use polwatch_watcher::{Alert, Delivery, NotificationError, Notifier};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Port that speaks TLS from the first byte instead of upgrading
const IMPLICIT_TLS_PORT: u16 = 465;

/// `[mail]` settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    /// Recipients separated by `,` or `;`
    pub to: Option<String>,
    pub subject_prefix: String,
    pub timeout_secs: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: 587,
            user: None,
            password: None,
            from: None,
            to: None,
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
            timeout_secs: 20,
        }
    }
}

impl MailSettings {
    /// Copy with the password blanked, for display
    pub fn redacted(&self) -> Self {
        Self {
            password: self.password.as_ref().map(|_| "********".to_string()),
            ..self.clone()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Split a `,`/`;` separated list into mailboxes
///
/// Blank entries are dropped; an empty result is [`NotificationError::NoRecipients`].
pub fn parse_recipients(list: &str) -> Result<Vec<Mailbox>, NotificationError> {
    let recipients = list
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_mailbox)
        .collect::<Result<Vec<_>, _>>()?;

    if recipients.is_empty() {
        return Err(NotificationError::NoRecipients);
    }
    Ok(recipients)
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| NotificationError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Render an alert into a message from `from` to every recipient
pub fn build_message(
    alert: &Alert,
    from: &Mailbox,
    recipients: &[Mailbox],
) -> Result<Message, NotificationError> {
    if recipients.is_empty() {
        return Err(NotificationError::NoRecipients);
    }

    let mut builder = Message::builder().from(from.clone());
    for to in recipients {
        builder = builder.to(to.clone());
    }

    builder
        .subject(alert.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(alert.body.clone())
        .map_err(|e| NotificationError::Message(e.to_string()))
}

/// Sends alerts through an SMTP relay
pub struct SmtpNotifier {
    transport: SmtpTransport,
    from: Mailbox,
    recipients: Vec<Mailbox>,
    recipient_label: String,
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("from", &self.from.to_string())
            .field("recipients", &self.recipient_label)
            .finish_non_exhaustive()
    }
}

impl SmtpNotifier {
    /// Validate settings and build the transport; nothing is sent yet
    pub fn new(settings: &MailSettings) -> Result<Self, NotificationError> {
        let recipients = parse_recipients(settings.to.as_deref().unwrap_or_default())?;

        let host = settings
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| NotificationError::Transport("no SMTP host configured".to_string()))?;

        // Sender falls back to the login, as most relays require them to match
        let from = settings
            .from
            .as_deref()
            .or(settings.user.as_deref())
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| NotificationError::InvalidAddress {
                address: String::new(),
                reason: "no sender configured".to_string(),
            })
            .and_then(parse_mailbox)?;

        let builder = if settings.port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(host)
        } else {
            SmtpTransport::starttls_relay(host)
        }
        .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let mut builder = builder.port(settings.port).timeout(Some(settings.timeout()));
        if let Some(user) = settings.user.as_deref().filter(|u| !u.is_empty()) {
            builder = builder.credentials(Credentials::new(
                user.to_string(),
                settings.password.clone().unwrap_or_default(),
            ));
        }

        let recipient_label = recipients
            .iter()
            .map(|m| m.email.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Ok(Self {
            transport: builder.build(),
            from,
            recipients,
            recipient_label,
        })
    }

    /// Recipients as recorded in the ledger
    pub fn recipient_label(&self) -> &str {
        &self.recipient_label
    }
}

impl Notifier for SmtpNotifier {
    fn notify(&self, alert: &Alert) -> Result<Delivery, NotificationError> {
        let message = build_message(alert, &self.from, &self.recipients)?;
        let response = self
            .transport
            .send(&message)
            .map_err(|e| NotificationError::Transport(e.to_string()))?;
        debug!(code = %response.code(), to = %self.recipient_label, "smtp accepted message");

        Ok(Delivery {
            recipient: self.recipient_label.clone(),
        })
    }
}
