//! Bridges raw document mutations to user lifecycle events.

use crate::classifier::TransitionClassifier;
use crate::error::{RegistrationError, RegistrationResult};
use crate::observation::{
    ComponentRegistry, Event, EventFilter, EventKind, EventListener, EventPublisher, Subscription,
};
use crate::store::DocumentStore;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock, OnceLock};
use tracing::debug;

pub const USER_LIFECYCLE_LISTENER: &str = "usercreation";

/// Qualified names of documents in the `XWiki` space of any wiki.
pub const USER_SPACE_PATTERN: &str = r"^[^:]+:XWiki\..*$";

static USER_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(USER_SPACE_PATTERN).expect("valid user space regex"));

/// Listens for document creations and updates in the user space and
/// republishes detected transitions as [`Event::Lifecycle`].
///
/// The publisher is looked up from the registry on the first event rather
/// than at construction, since the publisher is only complete once this
/// listener has been added to it.
pub struct UserLifecycleListener<S: DocumentStore> {
    classifier: TransitionClassifier<S>,
    registry: Arc<ComponentRegistry>,
    publisher: OnceLock<Arc<dyn EventPublisher>>,
}

impl<S: DocumentStore> UserLifecycleListener<S> {
    /// Listener resolving its publisher from [`ComponentRegistry::global`].
    pub fn new(store: Arc<S>) -> Self {
        Self::with_registry(store, ComponentRegistry::global())
    }

    pub fn with_registry(store: Arc<S>, registry: Arc<ComponentRegistry>) -> Self {
        Self {
            classifier: TransitionClassifier::new(store),
            registry,
            publisher: OnceLock::new(),
        }
    }

    fn publisher(&self) -> RegistrationResult<Arc<dyn EventPublisher>> {
        if let Some(publisher) = self.publisher.get() {
            return Ok(publisher.clone());
        }

        let publisher = self.registry.lookup_publisher().map_err(|e| {
            RegistrationError::CollaboratorResolution(format!(
                "{USER_LIFECYCLE_LISTENER} cannot publish lifecycle events: {e}"
            ))
        })?;
        Ok(self.publisher.get_or_init(|| publisher).clone())
    }
}

#[async_trait]
impl<S: DocumentStore + 'static> EventListener for UserLifecycleListener<S> {
    fn name(&self) -> &'static str {
        USER_LIFECYCLE_LISTENER
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        let filter = EventFilter::Regex(USER_SPACE.clone());

        vec![
            Subscription::new(EventKind::DocumentCreated, filter.clone()),
            Subscription::new(EventKind::DocumentUpdated, filter),
        ]
    }

    async fn on_event(&self, event: &Event) -> RegistrationResult<()> {
        let Event::Mutation(mutation) = event else {
            return Ok(());
        };

        let Some(lifecycle) = self.classifier.classify(mutation).await else {
            return Ok(());
        };

        let publisher = self.publisher()?;
        debug!(
            document = %lifecycle.document_id,
            lifecycle = %lifecycle.kind,
            "Publishing user lifecycle event"
        );
        publisher.notify(Event::Lifecycle(lifecycle)).await;
        Ok(())
    }
}
