use super::DigestSender;
use crate::config::{SmtpSecurity, SmtpSettings};
use crate::digest::RenderedDigest;
use crate::error::{mail_error, DigestResult};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::{error, info};

/// SMTP command timeout
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends the digest through an authenticated SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    host: String,
}

impl SmtpMailer {
    /// Build the transport. No connection is made until something is sent.
    pub fn new(settings: &SmtpSettings, from_name: &str, from_address: &str) -> DigestResult<Self> {
        let credentials = settings
            .credentials
            .as_ref()
            .ok_or_else(|| mail_error("SMTP credentials are required to send mail"))?;

        let builder = match settings.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host),
        }
        .map_err(|e| mail_error(&format!("Invalid SMTP relay {}: {}", settings.host, e)))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                credentials.username.clone(),
                credentials.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            from: sender_mailbox(from_name, from_address)?,
            host: settings.host.clone(),
        })
    }

    /// Open and authenticate a session without sending anything
    pub async fn test_connection(&self) -> DigestResult<()> {
        match self.transport.test_connection().await {
            Ok(true) => {
                info!("SMTP connection to {} succeeded", self.host);
                Ok(())
            }
            Ok(false) => Err(mail_error(&format!(
                "SMTP server {} did not accept the connection",
                self.host
            ))),
            Err(e) => Err(smtp_failure(&self.host, e)),
        }
    }

    /// Send one HTML message to every recipient
    pub async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        digest: &RenderedDigest,
    ) -> DigestResult<()> {
        let message = build_message(&self.from, recipients, subject, digest)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| smtp_failure(&self.host, e))?;

        info!("Email sent to {} recipient(s)", recipients.len());
        Ok(())
    }
}

#[async_trait]
impl DigestSender for SmtpMailer {
    async fn send_digest(
        &self,
        recipients: &[String],
        subject: &str,
        digest: &RenderedDigest,
    ) -> DigestResult<()> {
        self.send(recipients, subject, digest).await
    }
}

/// `"Name <address>"` sender
pub fn sender_mailbox(from_name: &str, from_address: &str) -> DigestResult<Mailbox> {
    let address: Address = from_address.parse()?;
    let name = Some(from_name.trim().to_string()).filter(|n| !n.is_empty());
    Ok(Mailbox::new(name, address))
}

/// Build the multipart/alternative message (plain text + HTML)
pub fn build_message(
    from: &Mailbox,
    recipients: &[String],
    subject: &str,
    digest: &RenderedDigest,
) -> DigestResult<Message> {
    if recipients.is_empty() {
        return Err(mail_error("No recipients specified"));
    }

    let mut builder = Message::builder().from(from.clone()).subject(subject);
    for recipient in recipients {
        let mailbox: Mailbox = recipient.parse()?;
        builder = builder.to(mailbox);
    }

    let message = builder.multipart(MultiPart::alternative_plain_html(
        digest.text.clone(),
        digest.html.clone(),
    ))?;
    Ok(message)
}

fn smtp_failure(host: &str, err: lettre::transport::smtp::Error) -> crate::error::Error {
    if err.is_permanent() {
        error!("SMTP server {} rejected the request, check the SMTP credentials", host);
    }
    mail_error(&format!("SMTP error with {}: {}", host, err))
}
