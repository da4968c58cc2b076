//! Mail collaborator: template-based sending over a pluggable transport.

pub mod mock;
pub mod provider;
pub mod smtp;
pub mod templates;

pub use mock::MockEmailProvider;
pub use provider::{Email, EmailProvider, SendResult};
pub use smtp::SmtpProvider;
pub use templates::{EmailTemplate, RenderedTemplate, TemplateEngine};

use crate::error::{MailError, MailResult};
use crate::models::UserData;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Values exposed to notification templates: `firstName`, `lastName`, `email`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderContext {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&UserData> for RenderContext {
    fn from(data: &UserData) -> Self {
        Self {
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            email: data.email.clone(),
        }
    }
}

impl RenderContext {
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "firstName": self.first_name,
            "lastName": self.last_name,
            "email": self.email,
        })
    }
}

/// A request to send one templated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMail {
    pub from: String,
    pub to: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    /// Empty means "use the template's subject".
    pub subject: String,
    pub template_id: String,
    pub context: RenderContext,
}

impl TemplateMail {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        template_id: impl Into<String>,
        context: RenderContext,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: String::new(),
            template_id: template_id.into(),
            context,
        }
    }
}

/// The single capability the dispatcher needs from the mail system.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, mail: &TemplateMail) -> MailResult<SendResult>;
}

/// Renders a [`TemplateMail`] and hands the result to an [`EmailProvider`].
pub struct TemplateMailSender<P: EmailProvider> {
    provider: Arc<P>,
    templates: Arc<TemplateEngine>,
}

impl<P: EmailProvider> TemplateMailSender<P> {
    pub fn new(provider: P, templates: TemplateEngine) -> Self {
        Self {
            provider: Arc::new(provider),
            templates: Arc::new(templates),
        }
    }

    fn render(&self, mail: &TemplateMail) -> MailResult<Email> {
        let rendered = self
            .templates
            .render(&mail.template_id, &mail.context.to_value())?;

        if rendered.body_text.is_none() && rendered.body_html.is_none() {
            return Err(MailError::Template(format!(
                "Template {} has neither text nor HTML body",
                mail.template_id
            )));
        }

        let subject = if mail.subject.is_empty() {
            rendered.subject
        } else {
            mail.subject.clone()
        };

        let mut email = Email::new(&mail.to, subject);
        if !mail.from.trim().is_empty() {
            email.from = Some(mail.from.clone());
        }
        email.cc = mail.cc.clone();
        email.bcc = mail.bcc.clone();
        email.body_text = rendered.body_text;
        email.body_html = rendered.body_html;

        Ok(email)
    }
}

#[async_trait]
impl<P: EmailProvider + 'static> MailSender for TemplateMailSender<P> {
    async fn send(&self, mail: &TemplateMail) -> MailResult<SendResult> {
        let email = self.render(mail)?;

        debug!(
            email_id = %email.id,
            to = %email.to,
            template = %mail.template_id,
            provider = self.provider.name(),
            "Sending templated email"
        );

        Ok(self.provider.send(&email).await?)
    }
}
