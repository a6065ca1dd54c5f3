//! Outbound mail delivery.

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Delivery seam. Sync on purpose: tests record instead of sending, and the
/// one network transport is driven through `spawn_blocking` at the call site
/// so it never blocks an async worker.
pub trait Mailer: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the message cannot be built or handed to the
    /// transport.
    fn send(&self, mail: &Mail) -> Result<()>;
}

/// Logs messages instead of sending them. Default when SMTP is not
/// configured, and useful in development.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &Mail) -> Result<()> {
        info!(
            to = mail.to.join(", "),
            subject = mail.subject,
            "Email delivery is not configured, logging instead"
        );
        Ok(())
    }
}

#[derive(Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: SecretString,
    pub from: String,
}

/// Delivers over SMTP with TLS.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: String,
}

impl SmtpMailer {
    /// # Errors
    ///
    /// Returns an error when the relay host cannot be resolved into a
    /// transport.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let transport = SmtpTransport::relay(&config.host)
            .context("failed to configure smtp relay")?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            ))
            .build();
        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: &Mail) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.parse().context("invalid sender address")?)
            .subject(&mail.subject)
            .header(ContentType::TEXT_HTML);
        for recipient in &mail.to {
            builder = builder.to(recipient.parse().context("invalid recipient address")?);
        }
        let message = builder
            .body(mail.body.clone())
            .context("failed to build email")?;

        self.transport
            .send(&message)
            .context("failed to send email")?;
        Ok(())
    }
}
