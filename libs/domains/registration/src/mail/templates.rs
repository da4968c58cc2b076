//! Mail templates rendered with Handlebars.
//!
//! Templates are addressed by identifier (e.g. `XWiki.RegistrationNotificationMail`)
//! and rendered against a JSON context. Unknown variables render empty.

use crate::config::DEFAULT_TEMPLATE_ID;
use crate::error::{MailError, MailResult};
use handlebars::Handlebars;
use serde_json::Value;
use std::collections::HashMap;

/// Rendered template result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub subject: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
}

/// Email template definition
#[derive(Clone, Debug)]
pub struct EmailTemplate {
    pub name: String,
    pub subject: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
}

/// Handlebars-backed template registry.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
    templates: HashMap<String, EmailTemplate>,
}

impl TemplateEngine {
    /// Engine with no templates registered.
    pub fn empty() -> Self {
        Self {
            handlebars: Handlebars::new(),
            templates: HashMap::new(),
        }
    }

    /// Engine with the default registration notification template.
    pub fn new() -> MailResult<Self> {
        let mut engine = Self::empty();
        engine.register(registration_notification_template())?;
        Ok(engine)
    }

    /// Register (or replace) a template
    pub fn register(&mut self, template: EmailTemplate) -> MailResult<()> {
        self.register_part(&template.name, "subject", Some(&template.subject))?;
        self.register_part(&template.name, "text", template.body_text.as_deref())?;
        self.register_part(&template.name, "html", template.body_html.as_deref())?;

        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    fn register_part(&mut self, name: &str, part: &str, source: Option<&str>) -> MailResult<()> {
        let key = format!("{}_{}", name, part);
        match source {
            Some(source) => self
                .handlebars
                .register_template_string(&key, source)
                .map_err(|e| MailError::Template(format!("Failed to register {}: {}", key, e))),
            None => {
                self.handlebars.unregister_template(&key);
                Ok(())
            }
        }
    }

    /// Render a template by name
    pub fn render(&self, name: &str, data: &Value) -> MailResult<RenderedTemplate> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| MailError::Template(format!("Template not found: {}", name)))?;

        let subject = self.handlebars.render(&format!("{}_subject", name), data)?;

        let body_text = template
            .body_text
            .as_ref()
            .map(|_| self.handlebars.render(&format!("{}_text", name), data))
            .transpose()?;

        let body_html = template
            .body_html
            .as_ref()
            .map(|_| self.handlebars.render(&format!("{}_html", name), data))
            .transpose()?;

        Ok(RenderedTemplate {
            subject,
            body_text,
            body_html,
        })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn list_templates(&self) -> Vec<&str> {
        self.templates.keys().map(|s| s.as_str()).collect()
    }
}

fn registration_notification_template() -> EmailTemplate {
    EmailTemplate {
        name: DEFAULT_TEMPLATE_ID.to_string(),
        subject: "New user registration: {{{firstName}}} {{{lastName}}}".to_string(),
        body_text: Some(
            r#"Hello,

A new user account has been registered on the wiki.

First name: {{{firstName}}}
Last name:  {{{lastName}}}
Email:      {{{email}}}
"#
            .to_string(),
        ),
        body_html: Some(
            r#"<p>Hello,</p>
<p>A new user account has been registered on the wiki.</p>
<table>
  <tr><td>First name</td><td>{{firstName}}</td></tr>
  <tr><td>Last name</td><td>{{lastName}}</td></tr>
  <tr><td>Email</td><td>{{email}}</td></tr>
</table>
"#
            .to_string(),
        ),
    }
}
