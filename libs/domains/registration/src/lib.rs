//! Registration Domain
//!
//! Notifies administrators by email when user accounts are created or
//! validated.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Document save  │  ← DocumentCreated / DocumentUpdated
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │ "usercreation"  │  ← TransitionClassifier, reads previous revision
//! └────────┬────────┘
//!          │
//! ┌────────▼──────────────┐
//! │ "registrationNotifier"│  ← NotificationPolicy, re-read per event
//! └────────┬──────────────┘
//!          │
//! ┌────────▼────────┐
//! │   Dispatcher    │  ← one templated mail per recipient
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │ Email Provider  │  ← SMTP, mock
//! └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_registration::{
//!     ComponentRegistry, InMemoryDocumentStore, RegistrationNotifierConfig,
//!     RegistrationPipeline, TemplateEngine, TemplateMailSender, mail::SmtpProvider,
//! };
//!
//! let mail = TemplateMailSender::new(SmtpProvider::mailhog()?, TemplateEngine::new()?);
//! let pipeline = RegistrationPipeline::install(
//!     ComponentRegistry::global(),
//!     Arc::new(InMemoryDocumentStore::new()),
//!     RegistrationNotifierConfig::from_env(),
//!     Arc::new(mail),
//! )
//! .await?;
//!
//! pipeline.save(document).await;
//! ```

pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod listener;
pub mod mail;
pub mod models;
pub mod notifier;
pub mod observation;
pub mod pipeline;
pub mod policy;
pub mod store;

// Re-export commonly used types
pub use classifier::TransitionClassifier;
pub use config::{
    EnvPreferenceSource, InMemoryPreferenceSource, PreferenceSource, RegistrationNotifierConfig,
};
pub use dispatcher::{DispatchOutcome, FailedDelivery, NotificationDispatcher};
pub use error::{MailError, RegistrationError, RegistrationResult, StoreError};
pub use listener::UserLifecycleListener;
pub use mail::{MailSender, TemplateEngine, TemplateMail, TemplateMailSender};
pub use models::{
    Document, DocumentReference, FieldValue, LifecycleEvent, LifecycleKind, MutationEvent,
    MutationKind, Record, UserData,
};
pub use notifier::RegistrationNotifier;
pub use observation::{
    ComponentRegistry, Event, EventKind, EventListener, EventPublisher, ObservationManager,
};
pub use pipeline::RegistrationPipeline;
pub use policy::{DeliveryStrategy, NotificationMode, NotificationPolicy, should_notify};
pub use store::{DocumentStore, InMemoryDocumentStore};
