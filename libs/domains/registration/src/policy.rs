//! Notification policy: which lifecycle events produce mail, and to whom.

use crate::models::LifecycleKind;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// When administrators are told about new accounts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationMode {
    /// Notify as soon as the account exists.
    #[default]
    Immediate,
    /// Notify once the user has confirmed their email address.
    EmailVerification,
}

/// How the dispatcher reacts to a failed send.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStrategy {
    /// Stop at the first failure; later recipients are not attempted.
    #[default]
    AbortOnFailure,
    /// Attempt every recipient and collect failures.
    Isolated,
}

/// Decide whether `kind` warrants a notification under `mode`.
///
/// | mode              | UserCreated | UserValidated |
/// |-------------------|-------------|---------------|
/// | Immediate         | true        | false         |
/// | EmailVerification | false       | true          |
pub const fn should_notify(mode: NotificationMode, kind: LifecycleKind) -> bool {
    match (mode, kind) {
        (NotificationMode::Immediate, LifecycleKind::UserCreated) => true,
        (NotificationMode::Immediate, LifecycleKind::UserValidated) => false,
        (NotificationMode::EmailVerification, LifecycleKind::UserCreated) => false,
        (NotificationMode::EmailVerification, LifecycleKind::UserValidated) => true,
    }
}

/// Snapshot of the notification settings for one dispatch decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPolicy {
    pub mode: NotificationMode,
    pub recipients: Vec<String>,
    pub template_id: String,
    pub delivery: DeliveryStrategy,
}

impl NotificationPolicy {
    pub fn new(
        mode: NotificationMode,
        recipients: Vec<String>,
        template_id: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            recipients,
            template_id: template_id.into(),
            delivery: DeliveryStrategy::default(),
        }
    }

    pub fn with_delivery(mut self, delivery: DeliveryStrategy) -> Self {
        self.delivery = delivery;
        self
    }

    /// Whether an event of `kind` should be dispatched at all.
    ///
    /// An empty recipient list never dispatches, whatever the mode.
    pub fn approves(&self, kind: LifecycleKind) -> bool {
        !self.recipients.is_empty() && should_notify(self.mode, kind)
    }
}
