use crate::{env_optional, env_or_default, env_parse_or, env_required, ConfigError, FromEnv};

/// SMTP transport settings for outgoing notification mail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub from_name: String,
    pub use_tls: bool,
}

impl SmtpSettings {
    /// Settings for a local Mailpit/MailHog catcher: no auth, no TLS.
    ///
    /// Honors `SMTP_HOST`/`SMTP_PORT` so the catcher can run in a container.
    pub fn local() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_or_default("SMTP_HOST", "localhost"),
            port: env_parse_or("SMTP_PORT", 1025)?,
            username: String::new(),
            password: String::new(),
            from_address: env_or_default("EMAIL_FROM_ADDRESS", "noreply@localhost"),
            from_name: env_or_default("EMAIL_FROM_NAME", "Development"),
            use_tls: false,
        })
    }

    /// Whether credentials should be presented to the server
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

impl FromEnv for SmtpSettings {
    /// Reads:
    /// - SMTP_HOST (required)
    /// - SMTP_PORT (default 587)
    /// - SMTP_USERNAME / SMTP_PASSWORD (default empty)
    /// - EMAIL_FROM_ADDRESS, falling back to SMTP_FROM_EMAIL (required)
    /// - EMAIL_FROM_NAME (default "Notifications")
    /// - SMTP_USE_TLS ("true"/"1", default true)
    fn from_env() -> Result<Self, ConfigError> {
        let from_address = match env_optional("EMAIL_FROM_ADDRESS") {
            Some(address) => address,
            None => env_required("SMTP_FROM_EMAIL")
                .map_err(|_| ConfigError::MissingEnvVar("EMAIL_FROM_ADDRESS".to_string()))?,
        };

        Ok(Self {
            host: env_required("SMTP_HOST")?,
            port: env_parse_or("SMTP_PORT", 587)?,
            username: env_or_default("SMTP_USERNAME", ""),
            password: env_or_default("SMTP_PASSWORD", ""),
            from_address,
            from_name: env_or_default("EMAIL_FROM_NAME", "Notifications"),
            use_tls: env_optional("SMTP_USE_TLS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
        })
    }
}
