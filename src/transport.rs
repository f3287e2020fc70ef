//! Mail transport boundary.
//!
//! The delivery worker only needs "send this message or fail"; the SMTP
//! protocol behind it is opaque. The production implementation rides lettre's
//! async SMTP transport with a bounded connect/send timeout.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

use crate::config::{MailerConfig, SmtpConfig};
use crate::error::{Error, Result};

/// One message handed to the transport.
#[derive(Debug)]
pub struct OutgoingEmail<'a> {
    pub from_address: &'a str,
    pub from_name: Option<&'a str>,
    pub to: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
}

/// Delivers a message, or fails with a transient transport error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, mail: &OutgoingEmail<'_>) -> Result<()>;
}

/// SMTP relay transport over lettre.
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the relay transport from configuration. Implicit TLS on port
    /// 465, STARTTLS required otherwise.
    pub fn new(smtp: &SmtpConfig, mailer_config: &MailerConfig) -> Result<Self> {
        let creds = Credentials::new(
            smtp.username.clone(),
            smtp.password.expose_secret().to_string(),
        );

        let tls_params = TlsParameters::new(smtp.host.clone())
            .map_err(|e| Error::Config(format!("invalid TLS parameters: {e}")))?;
        let tls = if smtp.port == 465 {
            Tls::Wrapper(tls_params)
        } else {
            Tls::Required(tls_params)
        };

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .map_err(|e| Error::Config(format!("invalid SMTP relay {}: {e}", smtp.host)))?
            .credentials(creds)
            .port(smtp.port)
            .tls(tls)
            .timeout(Some(mailer_config.send_timeout))
            .build();

        Ok(Self { mailer })
    }
}

#[async_trait]
impl Transport for SmtpMailer {
    async fn send(&self, mail: &OutgoingEmail<'_>) -> Result<()> {
        let from_addr = mail
            .from_address
            .parse()
            .map_err(|e| Error::Transport(format!("invalid sender address: {e}")))?;
        let from = Mailbox::new(mail.from_name.map(str::to_string), from_addr);

        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| Error::Transport(format!("invalid recipient address: {e}")))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(mail.subject)
            .body(mail.body.to_string())
            .map_err(|e| Error::Transport(format!("failed to build message: {e}")))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(())
    }
}
