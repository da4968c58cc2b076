//! Notification delivery over SMTP (lettre, tokio transport)

use super::provider::{Email, EmailProvider, SendResult};
use async_trait::async_trait;
use core_config::SmtpSettings;
use eyre::{Result, WrapErr};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tracing::info;

/// Delivers notification mail through an SMTP server.
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    settings: Arc<SmtpSettings>,
}

impl SmtpProvider {
    pub fn new(settings: SmtpSettings) -> Result<Self> {
        let builder = if settings.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .wrap_err("Failed to create SMTP relay")?
        } else {
            // Plain connection, e.g. Mailpit/MailHog
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        };

        let builder = if settings.has_credentials() {
            builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
        } else {
            builder
        };

        Ok(Self {
            transport: builder.port(settings.port).build(),
            settings: Arc::new(settings),
        })
    }

    /// Provider for a local mail catcher on localhost:1025.
    pub fn mailhog() -> Result<Self> {
        Self::new(SmtpSettings::local().wrap_err("Invalid local SMTP settings")?)
    }

    fn default_sender(&self) -> String {
        format!("{} <{}>", self.settings.from_name, self.settings.from_address)
    }

    fn build_message(&self, email: &Email) -> Result<Message> {
        let from: Mailbox = email
            .from
            .clone()
            .filter(|from| !from.trim().is_empty())
            .unwrap_or_else(|| self.default_sender())
            .parse()
            .wrap_err("Invalid from address")?;

        let to: Mailbox = email.to.parse().wrap_err("Invalid to address")?;

        let mut builder = Message::builder().from(from).to(to).subject(&email.subject);

        for cc in &email.cc {
            builder = builder.cc(cc.parse().wrap_err("Invalid CC address")?);
        }

        for bcc in &email.bcc {
            builder = builder.bcc(bcc.parse().wrap_err("Invalid BCC address")?);
        }

        let message = match (&email.body_text, &email.body_html) {
            (Some(text), Some(html)) => builder
                .multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))
                .wrap_err("Failed to build multipart message")?,
            (Some(text), None) => builder
                .singlepart(SinglePart::plain(text.clone()))
                .wrap_err("Failed to build text message")?,
            (None, Some(html)) => builder
                .header(ContentType::TEXT_HTML)
                .body(html.clone())
                .wrap_err("Failed to build HTML message")?,
            (None, None) => {
                return Err(eyre::eyre!("Email must have either text or HTML body"));
            }
        };

        Ok(message)
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &Email) -> Result<SendResult> {
        let message = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .wrap_err("Failed to send email via SMTP")?;

        let message_id = response
            .message()
            .next()
            .map(|s| s.to_string())
            .unwrap_or_else(|| email.id.clone());

        info!(
            email_id = %email.id,
            to = %email.to,
            subject = %email.subject,
            "Email sent via SMTP"
        );

        Ok(SendResult { message_id })
    }

    async fn health_check(&self) -> Result<()> {
        self.transport
            .test_connection()
            .await
            .wrap_err("SMTP health check failed")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
