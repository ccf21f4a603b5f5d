use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::debug;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp send failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Async SMTP mail transport. When `SMTP_HOST` is not configured the
/// transport is disabled and sends are logged and skipped, so environments
/// without a mail server (local development, tests) keep working.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Self {
        let transport = config.smtp_host.as_ref().map(|host| {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                .port(config.smtp_port);
            if let (Some(username), Some(password)) =
                (&config.smtp_username, &config.smtp_password)
            {
                builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
            }
            builder.build()
        });

        Self {
            transport,
            from: config.mail_from.clone(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            transport: None,
            from: "Taskhub <noreply@taskhub.local>".to_string(),
        }
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let transport = match &self.transport {
            Some(transport) => transport,
            None => {
                debug!("Mail transport disabled, skipping send to {}", to);
                return Ok(());
            }
        };

        let message = Message::builder()
            .from(self.from.parse::<Mailbox>()?)
            .to(to.parse::<Mailbox>()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        transport.send(message).await?;
        Ok(())
    }
}
