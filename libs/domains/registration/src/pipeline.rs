//! Wires the store, classifier, notifier and bus together.

use crate::config::RegistrationNotifierConfig;
use crate::error::RegistrationResult;
use crate::listener::UserLifecycleListener;
use crate::mail::MailSender;
use crate::models::Document;
use crate::notifier::RegistrationNotifier;
use crate::observation::{ComponentRegistry, Event, EventPublisher, ObservationManager};
use crate::store::InMemoryDocumentStore;
use std::sync::Arc;
use tracing::info;

/// A running registration notification pipeline.
pub struct RegistrationPipeline {
    store: Arc<InMemoryDocumentStore>,
    manager: Arc<ObservationManager>,
}

impl RegistrationPipeline {
    /// Build the pipeline and register its bus in `registry`.
    ///
    /// Both listeners are added before the bus is published to the registry;
    /// the lifecycle listener resolves it on its first event.
    pub async fn install<M: MailSender + 'static>(
        registry: Arc<ComponentRegistry>,
        store: Arc<InMemoryDocumentStore>,
        config: RegistrationNotifierConfig,
        mail: Arc<M>,
    ) -> RegistrationResult<Self> {
        let manager = Arc::new(ObservationManager::new());

        manager
            .add_listener(Arc::new(UserLifecycleListener::with_registry(
                store.clone(),
                registry.clone(),
            )))
            .await;
        manager
            .add_listener(Arc::new(RegistrationNotifier::new(config, mail)))
            .await;

        registry.register_publisher(manager.clone())?;

        let listeners = manager.listener_names().await;
        info!(?listeners, "Registration notification pipeline installed");

        Ok(Self { store, manager })
    }

    pub fn store(&self) -> &Arc<InMemoryDocumentStore> {
        &self.store
    }

    pub fn publisher(&self) -> Arc<dyn EventPublisher> {
        self.manager.clone()
    }

    /// Persist `document` as a new revision and publish the mutation.
    pub async fn save(&self, document: Document) {
        let mutation = self.store.save(document).await;
        self.manager.notify(Event::Mutation(mutation)).await;
    }
}
