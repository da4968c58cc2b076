//! Listener turning user lifecycle events into administrator mail.

use crate::config::RegistrationNotifierConfig;
use crate::dispatcher::NotificationDispatcher;
use crate::error::RegistrationResult;
use crate::mail::MailSender;
use crate::observation::{Event, EventKind, EventListener, Subscription};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const REGISTRATION_NOTIFIER_LISTENER: &str = "registrationNotifier";

/// Applies the current [`NotificationPolicy`](crate::policy::NotificationPolicy)
/// to each lifecycle event and dispatches approved ones.
///
/// Configuration is re-read for every event.
pub struct RegistrationNotifier<M: MailSender> {
    config: RegistrationNotifierConfig,
    dispatcher: NotificationDispatcher<M>,
}

impl<M: MailSender> RegistrationNotifier<M> {
    pub fn new(config: RegistrationNotifierConfig, mail: Arc<M>) -> Self {
        Self {
            config,
            dispatcher: NotificationDispatcher::new(mail),
        }
    }
}

#[async_trait]
impl<M: MailSender + 'static> EventListener for RegistrationNotifier<M> {
    fn name(&self) -> &'static str {
        REGISTRATION_NOTIFIER_LISTENER
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![
            Subscription::any(EventKind::UserCreated),
            Subscription::any(EventKind::UserValidated),
        ]
    }

    #[instrument(skip_all, fields(kind = %event.kind()))]
    async fn on_event(&self, event: &Event) -> RegistrationResult<()> {
        let Event::Lifecycle(lifecycle) = event else {
            return Ok(());
        };

        let policy = self.config.policy();
        if !policy.approves(lifecycle.kind) {
            debug!(
                document = %lifecycle.document_id,
                mode = %policy.mode,
                recipients = policy.recipients.len(),
                "Notification not required"
            );
            return Ok(());
        }

        let sender = self.config.admin_email();
        self.dispatcher
            .dispatch(lifecycle, &policy, &sender)
            .await
            .into_result()
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ADMIN_EMAIL_KEY, EMAIL_VERIFICATION_KEY, InMemoryPreferenceSource, RECIPIENTS_KEY,
    };
    use crate::error::{MailError, RegistrationError};
    use crate::mail::{MockMailSender, SendResult};
    use crate::models::{DocumentReference, LifecycleEvent, LifecycleKind, UserData};

    fn lifecycle(kind: LifecycleKind) -> Event {
        Event::Lifecycle(LifecycleEvent::new(
            kind,
            &DocumentReference::new("W", "XWiki", "JohnDoe"),
            UserData::new("John", "Doe", "john@x.com"),
        ))
    }

    fn notifier(
        source: Arc<InMemoryPreferenceSource>,
        mail: MockMailSender,
    ) -> RegistrationNotifier<MockMailSender> {
        RegistrationNotifier::new(RegistrationNotifierConfig::new(source), Arc::new(mail))
    }

    fn sent_ok() -> crate::error::MailResult<SendResult> {
        Ok(SendResult {
            message_id: "m-1".to_string(),
        })
    }

    #[tokio::test]
    async fn test_immediate_mode_notifies_on_creation() {
        let source = Arc::new(
            InMemoryPreferenceSource::new()
                .with(RECIPIENTS_KEY, "admin@x.com")
                .with(ADMIN_EMAIL_KEY, "wiki@x.com"),
        );
        let mut mail = MockMailSender::new();
        mail.expect_send()
            .withf(|m| {
                m.to == "admin@x.com"
                    && m.from == "wiki@x.com"
                    && m.template_id == "XWiki.RegistrationNotificationMail"
                    && m.context.first_name == "John"
            })
            .times(1)
            .returning(|_| sent_ok());

        let notifier = notifier(source, mail);
        notifier.on_event(&lifecycle(LifecycleKind::UserCreated)).await.unwrap();
        notifier.on_event(&lifecycle(LifecycleKind::UserValidated)).await.unwrap();
    }

    #[tokio::test]
    async fn test_verification_mode_notifies_on_validation_only() {
        let source = Arc::new(
            InMemoryPreferenceSource::new()
                .with(RECIPIENTS_KEY, "admin@x.com")
                .with(EMAIL_VERIFICATION_KEY, "1"),
        );
        let mut mail = MockMailSender::new();
        mail.expect_send()
            .withf(|m| m.from.is_empty())
            .times(1)
            .returning(|_| sent_ok());

        let notifier = notifier(source, mail);
        notifier.on_event(&lifecycle(LifecycleKind::UserCreated)).await.unwrap();
        notifier.on_event(&lifecycle(LifecycleKind::UserValidated)).await.unwrap();
    }

    #[tokio::test]
    async fn test_no_recipients_sends_nothing() {
        let source = Arc::new(InMemoryPreferenceSource::new().with(RECIPIENTS_KEY, "  "));
        let mut mail = MockMailSender::new();
        mail.expect_send().never();

        let notifier = notifier(source, mail);
        notifier.on_event(&lifecycle(LifecycleKind::UserCreated)).await.unwrap();
    }

    #[tokio::test]
    async fn test_configuration_changes_apply_to_next_event() {
        let source = Arc::new(InMemoryPreferenceSource::new());
        let mut mail = MockMailSender::new();
        mail.expect_send().times(1).returning(|_| sent_ok());

        let notifier = notifier(source.clone(), mail);
        notifier.on_event(&lifecycle(LifecycleKind::UserCreated)).await.unwrap();

        source.set(RECIPIENTS_KEY, "admin@x.com");
        notifier.on_event(&lifecycle(LifecycleKind::UserCreated)).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_failure_is_reported() {
        let source = Arc::new(
            InMemoryPreferenceSource::new().with(RECIPIENTS_KEY, "a@x.com,b@x.com"),
        );
        let mut mail = MockMailSender::new();
        mail.expect_send()
            .times(1)
            .returning(|_| Err(MailError::Provider("connection refused".to_string())));

        let notifier = notifier(source, mail);
        let err = notifier
            .on_event(&lifecycle(LifecycleKind::UserCreated))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RegistrationError::MailDelivery { ref recipient, .. } if recipient == "a@x.com"
        ));
    }

    #[test]
    fn test_subscriptions() {
        let notifier = notifier(Arc::new(InMemoryPreferenceSource::new()), MockMailSender::new());
        assert_eq!(notifier.name(), "registrationNotifier");

        let kinds: Vec<_> = notifier.subscriptions().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![EventKind::UserCreated, EventKind::UserValidated]);
    }
}
