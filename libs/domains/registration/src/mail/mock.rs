//! Mock email provider for testing

use super::provider::{Email, EmailProvider, SendResult};
use async_trait::async_trait;
use eyre::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Provider that records every email instead of delivering it.
///
/// Can be told to reject all mail or mail to specific addresses.
#[derive(Clone, Default)]
pub struct MockEmailProvider {
    sent_emails: Arc<Mutex<Vec<Email>>>,
    attempts: Arc<Mutex<Vec<String>>>,
    failing_recipients: HashSet<String>,
    fail_all: bool,
}

impl MockEmailProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that rejects every email
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Reject mail addressed to `recipient`
    pub fn fail_for(mut self, recipient: impl Into<String>) -> Self {
        self.failing_recipients.insert(recipient.into());
        self
    }

    /// Successfully sent emails, in order
    pub async fn sent_emails(&self) -> Vec<Email> {
        self.sent_emails.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent_emails.lock().await.len()
    }

    /// Every recipient a send was attempted for, including failures
    pub async fn attempted_recipients(&self) -> Vec<String> {
        self.attempts.lock().await.clone()
    }

    pub async fn was_sent_to(&self, address: &str) -> bool {
        self.sent_emails
            .lock()
            .await
            .iter()
            .any(|e| e.to == address)
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn send(&self, email: &Email) -> Result<SendResult> {
        self.attempts.lock().await.push(email.to.clone());

        if self.fail_all || self.failing_recipients.contains(&email.to) {
            return Err(eyre::eyre!("Mock failure sending to {}", email.to));
        }

        self.sent_emails.lock().await.push(email.clone());

        Ok(SendResult {
            message_id: format!("mock-{}", email.id),
        })
    }

    async fn health_check(&self) -> Result<()> {
        if self.fail_all {
            return Err(eyre::eyre!("Mock health check failed"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
