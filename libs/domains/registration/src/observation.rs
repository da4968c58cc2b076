//! In-process event distribution.
//!
//! Listeners declare which event kinds (and which documents) they care about;
//! the [`ObservationManager`] delivers every published event to each matching
//! listener in registration order, on the publisher's task.

use crate::error::{RegistrationError, RegistrationResult};
use crate::models::{LifecycleEvent, LifecycleKind, MutationEvent, MutationKind};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock, OnceLock};
use strum::{AsRefStr, Display};
use tokio::sync::RwLock;
use tracing::{debug, error, trace};

/// Events flowing through the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Mutation(MutationEvent),
    Lifecycle(LifecycleEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    DocumentCreated,
    DocumentUpdated,
    UserCreated,
    UserValidated,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Mutation(event) => match event.kind {
                MutationKind::Created => EventKind::DocumentCreated,
                MutationKind::Updated => EventKind::DocumentUpdated,
            },
            Event::Lifecycle(event) => match event.kind {
                LifecycleKind::UserCreated => EventKind::UserCreated,
                LifecycleKind::UserValidated => EventKind::UserValidated,
            },
        }
    }

    /// `wiki:Space.Name` of the document the event is about.
    pub fn source_name(&self) -> String {
        match self {
            Event::Mutation(event) => event.document.reference.qualified(),
            Event::Lifecycle(event) => event.source.qualified(),
        }
    }
}

impl From<MutationEvent> for Event {
    fn from(event: MutationEvent) -> Self {
        Event::Mutation(event)
    }
}

impl From<LifecycleEvent> for Event {
    fn from(event: LifecycleEvent) -> Self {
        Event::Lifecycle(event)
    }
}

/// Restricts a subscription to some documents.
#[derive(Debug, Clone)]
pub enum EventFilter {
    Always,
    /// Exact qualified document name.
    Fixed(String),
    Regex(Regex),
}

impl EventFilter {
    pub fn matches(&self, qualified_name: &str) -> bool {
        match self {
            EventFilter::Always => true,
            EventFilter::Fixed(name) => name == qualified_name,
            EventFilter::Regex(regex) => regex.is_match(qualified_name),
        }
    }
}

/// An event kind plus a document filter.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub kind: EventKind,
    pub filter: EventFilter,
}

impl Subscription {
    pub fn new(kind: EventKind, filter: EventFilter) -> Self {
        Self { kind, filter }
    }

    pub fn any(kind: EventKind) -> Self {
        Self::new(kind, EventFilter::Always)
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.kind == event.kind() && self.filter.matches(&event.source_name())
    }
}

/// Receives events it subscribed to.
#[async_trait]
pub trait EventListener: Send + Sync {
    fn name(&self) -> &'static str;

    fn subscriptions(&self) -> Vec<Subscription>;

    async fn on_event(&self, event: &Event) -> RegistrationResult<()>;
}

/// Publishes events to whoever listens.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn notify(&self, event: Event);
}

struct RegisteredListener {
    listener: Arc<dyn EventListener>,
    subscriptions: Vec<Subscription>,
}

/// Synchronous, in-order event delivery.
#[derive(Default)]
pub struct ObservationManager {
    listeners: RwLock<Vec<RegisteredListener>>,
}

impl ObservationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Its subscriptions are read once, here.
    pub async fn add_listener(&self, listener: Arc<dyn EventListener>) {
        let subscriptions = listener.subscriptions();
        debug!(
            listener = listener.name(),
            subscriptions = subscriptions.len(),
            "Registering event listener"
        );
        self.listeners.write().await.push(RegisteredListener {
            listener,
            subscriptions,
        });
    }

    pub async fn listener_names(&self) -> Vec<&'static str> {
        self.listeners
            .read()
            .await
            .iter()
            .map(|registered| registered.listener.name())
            .collect()
    }

    async fn matching_listeners(&self, event: &Event) -> Vec<Arc<dyn EventListener>> {
        self.listeners
            .read()
            .await
            .iter()
            .filter(|registered| registered.subscriptions.iter().any(|s| s.matches(event)))
            .map(|registered| registered.listener.clone())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for ObservationManager {
    async fn notify(&self, event: Event) {
        let listeners = self.matching_listeners(&event).await;
        trace!(
            kind = %event.kind(),
            source = %event.source_name(),
            listeners = listeners.len(),
            "Dispatching event"
        );

        for listener in listeners {
            if let Err(e) = listener.on_event(&event).await {
                error!(
                    listener = listener.name(),
                    kind = %event.kind(),
                    source = %event.source_name(),
                    error = %e,
                    "Event listener failed"
                );
            }
        }
    }
}

/// Write-once slot for collaborators that cannot be injected eagerly.
///
/// The observation manager needs every listener constructed before it is
/// usable, while the lifecycle listener publishes through that same manager.
/// Listeners therefore hold a registry and look the publisher up on first use.
#[derive(Default)]
pub struct ComponentRegistry {
    publisher: OnceLock<Arc<dyn EventPublisher>>,
}

static GLOBAL_REGISTRY: LazyLock<Arc<ComponentRegistry>> =
    LazyLock::new(|| Arc::new(ComponentRegistry::default()));

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry, initialised once and never torn down.
    pub fn global() -> Arc<ComponentRegistry> {
        GLOBAL_REGISTRY.clone()
    }

    pub fn register_publisher(&self, publisher: Arc<dyn EventPublisher>) -> RegistrationResult<()> {
        self.publisher
            .set(publisher)
            .map_err(|_| RegistrationError::AlreadyRegistered("event publisher".to_string()))
    }

    pub fn lookup_publisher(&self) -> RegistrationResult<Arc<dyn EventPublisher>> {
        self.publisher.get().cloned().ok_or_else(|| {
            RegistrationError::CollaboratorResolution(
                "no event publisher registered".to_string(),
            )
        })
    }

    pub fn has_publisher(&self) -> bool {
        self.publisher.get().is_some()
    }
}
