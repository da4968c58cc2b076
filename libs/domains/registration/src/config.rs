//! Registration notifier configuration.
//!
//! Values are read from a [`PreferenceSource`] on every call so that
//! changes made at runtime apply to the next event.

use crate::policy::{DeliveryStrategy, NotificationMode, NotificationPolicy};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Template used when none is configured.
pub const DEFAULT_TEMPLATE_ID: &str = "XWiki.RegistrationNotificationMail";

pub const RECIPIENTS_KEY: &str = "registrationNotifier.emailAddresses";
pub const TEMPLATE_KEY: &str = "registrationNotifier.emailTemplate";
pub const DELIVERY_KEY: &str = "registrationNotifier.deliveryStrategy";
pub const EMAIL_VERIFICATION_KEY: &str = "use_email_verification";
pub const ADMIN_EMAIL_KEY: &str = "admin_email";

/// Key/value preference lookup.
pub trait PreferenceSource: Send + Sync {
    fn property(&self, key: &str) -> Option<String>;
}

/// Preferences backed by environment variables.
///
/// `registrationNotifier.emailAddresses` is read from
/// `REGISTRATION_NOTIFIER_EMAIL_ADDRESSES`, `admin_email` from `ADMIN_EMAIL`.
#[derive(Debug, Clone, Default)]
pub struct EnvPreferenceSource;

impl EnvPreferenceSource {
    pub fn new() -> Self {
        Self
    }

    /// Environment variable name for a preference key.
    pub fn env_key(key: &str) -> String {
        let mut out = String::with_capacity(key.len() + 4);
        let mut prev_lower = false;

        for c in key.chars() {
            if c == '.' || c == '-' {
                out.push('_');
                prev_lower = false;
            } else if c.is_ascii_uppercase() {
                if prev_lower {
                    out.push('_');
                }
                out.push(c);
                prev_lower = false;
            } else {
                out.push(c.to_ascii_uppercase());
                prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            }
        }

        out
    }
}

impl PreferenceSource for EnvPreferenceSource {
    fn property(&self, key: &str) -> Option<String> {
        core_config::env_optional(&Self::env_key(key))
    }
}

/// Mutable in-process preferences.
#[derive(Debug, Default)]
pub struct InMemoryPreferenceSource {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryPreferenceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

impl PreferenceSource for InMemoryPreferenceSource {
    fn property(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

/// Typed view over the registration notifier preferences.
#[derive(Clone)]
pub struct RegistrationNotifierConfig {
    source: Arc<dyn PreferenceSource>,
}

impl RegistrationNotifierConfig {
    pub fn new(source: Arc<dyn PreferenceSource>) -> Self {
        Self { source }
    }

    /// Configuration read from environment variables.
    pub fn from_env() -> Self {
        Self::new(Arc::new(EnvPreferenceSource::new()))
    }

    /// Addresses to notify. Blank or missing yields an empty list.
    pub fn recipients(&self) -> Vec<String> {
        parse_recipients(self.source.property(RECIPIENTS_KEY).as_deref().unwrap_or(""))
    }

    /// Mail template identifier.
    pub fn template_id(&self) -> String {
        self.source
            .property(TEMPLATE_KEY)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TEMPLATE_ID.to_string())
    }

    /// Email verification mode is on only for the exact value `"1"`.
    pub fn mode(&self) -> NotificationMode {
        match self.source.property(EMAIL_VERIFICATION_KEY).as_deref() {
            Some("1") => NotificationMode::EmailVerification,
            _ => NotificationMode::Immediate,
        }
    }

    /// Sender address for notifications; empty when unset.
    pub fn admin_email(&self) -> String {
        self.source.property(ADMIN_EMAIL_KEY).unwrap_or_default()
    }

    pub fn delivery_strategy(&self) -> DeliveryStrategy {
        match self.source.property(DELIVERY_KEY) {
            Some(value) if value.trim().eq_ignore_ascii_case("isolated") => {
                DeliveryStrategy::Isolated
            }
            _ => DeliveryStrategy::AbortOnFailure,
        }
    }

    /// Fresh policy snapshot.
    pub fn policy(&self) -> NotificationPolicy {
        NotificationPolicy::new(self.mode(), self.recipients(), self.template_id())
            .with_delivery(self.delivery_strategy())
    }
}

/// Split a comma-separated address list, dropping blank entries.
fn parse_recipients(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}
