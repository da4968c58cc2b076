//! Fans an approved lifecycle event out to the configured recipients.

use crate::error::{MailError, RegistrationError, RegistrationResult};
use crate::mail::{MailSender, RenderContext, TemplateMail};
use crate::models::LifecycleEvent;
use crate::policy::{DeliveryStrategy, NotificationPolicy};
use std::sync::Arc;
use tracing::{info, warn};

/// A recipient whose send failed.
#[derive(Debug)]
pub struct FailedDelivery {
    pub recipient: String,
    pub error: MailError,
}

/// Per-recipient result of one dispatch.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub delivered: Vec<String>,
    pub failed: Vec<FailedDelivery>,
    /// Recipients never attempted because an earlier send failed.
    pub skipped: Vec<String>,
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Surface the first failure, if any.
    pub fn into_result(self) -> RegistrationResult<Vec<String>> {
        match self.failed.into_iter().next() {
            Some(failure) => Err(RegistrationError::MailDelivery {
                recipient: failure.recipient,
                source: failure.error,
            }),
            None => Ok(self.delivered),
        }
    }
}

/// Sends one templated message per recipient, in list order.
pub struct NotificationDispatcher<M: MailSender> {
    mail: Arc<M>,
}

impl<M: MailSender> NotificationDispatcher<M> {
    pub fn new(mail: Arc<M>) -> Self {
        Self { mail }
    }

    /// Dispatch `event` to every recipient of `policy`, sending as `sender`.
    ///
    /// The caller has already checked [`NotificationPolicy::approves`].
    /// With [`DeliveryStrategy::AbortOnFailure`] the first failed send ends
    /// the loop and the remaining recipients are reported as skipped.
    pub async fn dispatch(
        &self,
        event: &LifecycleEvent,
        policy: &NotificationPolicy,
        sender: &str,
    ) -> DispatchOutcome {
        let context = RenderContext::from(&event.user_data);
        let mut outcome = DispatchOutcome::default();

        for (index, recipient) in policy.recipients.iter().enumerate() {
            let mail = TemplateMail::new(sender, recipient, &policy.template_id, context.clone());

            match self.mail.send(&mail).await {
                Ok(result) => {
                    info!(
                        document = %event.document_id,
                        lifecycle = %event.kind,
                        recipient = %recipient,
                        message_id = %result.message_id,
                        "Registration notification sent"
                    );
                    outcome.delivered.push(recipient.clone());
                }
                Err(error) => {
                    warn!(
                        document = %event.document_id,
                        lifecycle = %event.kind,
                        recipient = %recipient,
                        error = %error,
                        "Registration notification failed"
                    );
                    outcome.failed.push(FailedDelivery {
                        recipient: recipient.clone(),
                        error,
                    });

                    if policy.delivery == DeliveryStrategy::AbortOnFailure {
                        outcome.skipped = policy.recipients[index + 1..].to_vec();
                        break;
                    }
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TEMPLATE_ID;
    use crate::mail::{MockEmailProvider, TemplateEngine, TemplateMailSender};
    use crate::models::{DocumentReference, LifecycleKind, UserData};
    use crate::policy::NotificationMode;

    fn event() -> LifecycleEvent {
        LifecycleEvent::new(
            LifecycleKind::UserCreated,
            &DocumentReference::new("W", "XWiki", "JohnDoe"),
            UserData::new("John", "Doe", "john@x.com"),
        )
    }

    fn policy(recipients: &[&str], delivery: DeliveryStrategy) -> NotificationPolicy {
        NotificationPolicy::new(
            NotificationMode::Immediate,
            recipients.iter().map(|r| r.to_string()).collect(),
            DEFAULT_TEMPLATE_ID,
        )
        .with_delivery(delivery)
    }

    fn dispatcher(
        provider: &MockEmailProvider,
    ) -> NotificationDispatcher<TemplateMailSender<MockEmailProvider>> {
        let sender = TemplateMailSender::new(provider.clone(), TemplateEngine::new().unwrap());
        NotificationDispatcher::new(Arc::new(sender))
    }

    #[tokio::test]
    async fn test_sends_one_message_per_recipient_in_order() {
        let provider = MockEmailProvider::new();
        let dispatcher = dispatcher(&provider);

        let outcome = dispatcher
            .dispatch(
                &event(),
                &policy(&["a@x.com", "b@x.com"], DeliveryStrategy::AbortOnFailure),
                "wiki@x.com",
            )
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.delivered, vec!["a@x.com", "b@x.com"]);

        let sent = provider.sent_emails().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "a@x.com");
        assert_eq!(sent[1].to, "b@x.com");
        assert!(sent.iter().all(|e| e.from.as_deref() == Some("wiki@x.com")));
    }

    #[tokio::test]
    async fn test_first_failure_aborts_remaining_recipients() {
        let provider = MockEmailProvider::new().fail_for("b@x.com");
        let dispatcher = dispatcher(&provider);

        let outcome = dispatcher
            .dispatch(
                &event(),
                &policy(&["a@x.com", "b@x.com", "c@x.com"], DeliveryStrategy::AbortOnFailure),
                "wiki@x.com",
            )
            .await;

        assert_eq!(outcome.delivered, vec!["a@x.com"]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].recipient, "b@x.com");
        assert_eq!(outcome.skipped, vec!["c@x.com"]);
        assert_eq!(provider.attempted_recipients().await, vec!["a@x.com", "b@x.com"]);

        let err = outcome.into_result().unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::MailDelivery { ref recipient, .. } if recipient == "b@x.com"
        ));
    }

    #[tokio::test]
    async fn test_isolated_delivery_attempts_everyone() {
        let provider = MockEmailProvider::new().fail_for("a@x.com");
        let dispatcher = dispatcher(&provider);

        let outcome = dispatcher
            .dispatch(
                &event(),
                &policy(&["a@x.com", "b@x.com", "c@x.com"], DeliveryStrategy::Isolated),
                "wiki@x.com",
            )
            .await;

        assert_eq!(outcome.delivered, vec!["b@x.com", "c@x.com"]);
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.skipped.is_empty());
        assert_eq!(provider.sent_count().await, 2);
    }

    #[tokio::test]
    async fn test_successful_outcome_into_result() {
        let provider = MockEmailProvider::new();
        let dispatcher = dispatcher(&provider);

        let delivered = dispatcher
            .dispatch(
                &event(),
                &policy(&["admin@x.com"], DeliveryStrategy::AbortOnFailure),
                "",
            )
            .await
            .into_result()
            .unwrap();
        assert_eq!(delivered, vec!["admin@x.com"]);
    }
}
