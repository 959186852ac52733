//! Outgoing mail
//!
//! `Mailer` is the delivery seam used by the notification dispatcher. With an
//! SMTP host configured mail goes out through lettre; without one every
//! message is written to the log instead.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::config::MailConfig;

/// A rendered message for a single recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Delivers one message and reports success or failure
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// SMTP delivery through lettre
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(host: &str, config: &MailConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let from: Mailbox = email
            .from
            .parse()
            .map_err(|e| anyhow!("Invalid from address: {}", e))?;
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| anyhow!("Invalid to address: {}", e))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| anyhow!("Failed to build email: {}", e))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;
        Ok(())
    }
}

/// Console backend: logs the message instead of sending it
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        tracing::info!(
            recipient = %email.to,
            subject = %email.subject,
            "Email (console backend):\n{}",
            email.text
        );
        Ok(())
    }
}

/// Pick the backend for the configuration
pub fn create_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    match config.smtp_host.as_deref().filter(|h| !h.is_empty()) {
        Some(host) => {
            tracing::info!(host, port = config.smtp_port, "Using SMTP mail backend");
            Ok(Arc::new(SmtpMailer::new(host, config)?))
        }
        None => {
            tracing::info!("No SMTP host configured, emails will be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_accepts_everything() {
        let email = OutgoingEmail {
            from: "noreply@example.com".to_string(),
            to: "reader@example.com".to_string(),
            subject: "Hi".to_string(),
            text: "text".to_string(),
            html: "<p>html</p>".to_string(),
        };
        assert!(LogMailer.send(&email).await.is_ok());
    }

    #[test]
    fn test_create_mailer_without_host_uses_log_backend() {
        let config = MailConfig {
            smtp_host: Some(String::new()),
            ..MailConfig::default()
        };
        assert!(create_mailer(&config).is_ok());
    }

    #[tokio::test]
    async fn test_smtp_mailer_rejects_bad_address() {
        let mailer = SmtpMailer::new("localhost", &MailConfig::default()).unwrap();
        let email = OutgoingEmail {
            from: "noreply@example.com".to_string(),
            to: "not an address".to_string(),
            subject: "Hi".to_string(),
            text: "text".to_string(),
            html: "html".to_string(),
        };
        let err = mailer.send(&email).await.unwrap_err();
        assert!(err.to_string().contains("Invalid to address"));
    }
}
