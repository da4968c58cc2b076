//! Detects account lifecycle transitions in document mutations.

use crate::error::{RegistrationError, RegistrationResult};
use crate::models::{LifecycleEvent, LifecycleKind, MutationEvent, MutationKind};
use crate::store::DocumentStore;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Classifies a mutation into at most one [`LifecycleEvent`].
///
/// - creation of a user document: `UserCreated`, whatever `active` holds;
/// - update where `active` becomes exactly `1` and the previous revision was
///   not active (or had no user record): `UserValidated`;
/// - anything else, including documents without a user record: nothing.
///
/// If the previous revision cannot be read, the failure is logged and no
/// event is emitted.
pub struct TransitionClassifier<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> TransitionClassifier<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Classify `event`, logging and swallowing history retrieval failures.
    #[instrument(skip_all, fields(document = %event.document.reference.local(), kind = %event.kind))]
    pub async fn classify(&self, event: &MutationEvent) -> Option<LifecycleEvent> {
        match self.try_classify(event).await {
            Ok(lifecycle) => lifecycle,
            Err(err) => {
                error!(error = ?err, "{err}");
                None
            }
        }
    }

    /// Classify `event`, surfacing history retrieval failures.
    pub async fn try_classify(
        &self,
        event: &MutationEvent,
    ) -> RegistrationResult<Option<LifecycleEvent>> {
        let document = &event.document;
        let Some(user) = document.user_record() else {
            return Ok(None);
        };

        let kind = match event.kind {
            MutationKind::Created => LifecycleKind::UserCreated,
            MutationKind::Updated => {
                if !user.is_active() {
                    return Ok(None);
                }

                let previous = self
                    .store
                    .fetch_previous_revision(document)
                    .await
                    .map_err(|source| RegistrationError::HistoryRetrieval {
                        document: document.reference.local(),
                        source,
                    })?;

                if previous.user_record().is_some_and(|record| record.is_active()) {
                    debug!(previous = %previous.version, "User was already active");
                    return Ok(None);
                }

                LifecycleKind::UserValidated
            }
        };

        debug!(lifecycle = %kind, "Detected user lifecycle transition");
        Ok(Some(LifecycleEvent::new(kind, &document.reference, user.user_data())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::{Document, DocumentReference, Record, UserData};
    use crate::store::MockDocumentStore;

    fn reference() -> DocumentReference {
        DocumentReference::new("W", "XWiki", "JohnDoe")
    }

    fn john(active: impl Into<crate::models::FieldValue>) -> Record {
        Record::new()
            .with_field("active", active)
            .with_field("first_name", "John")
            .with_field("last_name", "Doe")
            .with_field("email", "john@x.com")
    }

    fn revision(record: Option<Record>, version: &str, previous: Option<&str>) -> Document {
        let mut document = Document::new(reference());
        if let Some(record) = record {
            document = document.with_user(record);
        }
        document.version = version.to_string();
        document.previous_version = previous.map(str::to_string);
        document
    }

    fn store_returning(previous: Option<Document>) -> MockDocumentStore {
        let mut store = MockDocumentStore::new();
        match previous {
            Some(previous) => {
                store
                    .expect_fetch_previous_revision()
                    .times(1)
                    .returning(move |_| Ok(previous.clone()));
            }
            None => {
                store.expect_fetch_previous_revision().never();
            }
        }
        store
    }

    fn classifier(store: MockDocumentStore) -> TransitionClassifier<MockDocumentStore> {
        TransitionClassifier::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_created_user_emits_user_created() {
        let classifier = classifier(store_returning(None));
        let event = MutationEvent::created(revision(Some(john(0)), "1.1", None));

        let lifecycle = classifier.classify(&event).await.unwrap();
        assert_eq!(lifecycle.kind, LifecycleKind::UserCreated);
        assert_eq!(lifecycle.document_id, "XWiki.JohnDoe");
        assert_eq!(lifecycle.user_data, UserData::new("John", "Doe", "john@x.com"));
    }

    #[tokio::test]
    async fn test_created_regardless_of_active_value() {
        let classifier = classifier(store_returning(None));

        for active in [0, 1, 7] {
            let event = MutationEvent::created(revision(Some(john(active)), "1.1", None));
            let lifecycle = classifier.classify(&event).await.unwrap();
            assert_eq!(lifecycle.kind, LifecycleKind::UserCreated);
        }
    }

    #[tokio::test]
    async fn test_non_user_documents_are_ignored() {
        let classifier = classifier(store_returning(None));

        let created = MutationEvent::created(revision(None, "1.1", None));
        let updated = MutationEvent::updated(revision(None, "2.1", Some("1.1")));

        assert!(classifier.classify(&created).await.is_none());
        assert!(classifier.classify(&updated).await.is_none());
    }

    #[tokio::test]
    async fn test_activation_emits_user_validated() {
        let previous = revision(Some(john(0)), "1.1", None);
        let classifier = classifier(store_returning(Some(previous)));
        let event = MutationEvent::updated(revision(Some(john(1)), "2.1", Some("1.1")));

        let lifecycle = classifier.classify(&event).await.unwrap();
        assert_eq!(lifecycle.kind, LifecycleKind::UserValidated);
        assert_eq!(lifecycle.user_data.email, "john@x.com");
    }

    #[tokio::test]
    async fn test_previous_without_user_record_counts_as_inactive() {
        let previous = revision(None, "1.1", None);
        let classifier = classifier(store_returning(Some(previous)));
        let event = MutationEvent::updated(revision(Some(john(1)), "2.1", Some("1.1")));

        let lifecycle = classifier.classify(&event).await.unwrap();
        assert_eq!(lifecycle.kind, LifecycleKind::UserValidated);
    }

    #[tokio::test]
    async fn test_previous_text_one_is_not_active() {
        let previous = revision(Some(john("1")), "1.1", None);
        let classifier = classifier(store_returning(Some(previous)));
        let event = MutationEvent::updated(revision(Some(john(1)), "2.1", Some("1.1")));

        assert_eq!(
            classifier.classify(&event).await.map(|e| e.kind),
            Some(LifecycleKind::UserValidated)
        );
    }

    #[tokio::test]
    async fn test_already_active_emits_nothing() {
        let previous = revision(Some(john(1)), "1.1", None);
        let classifier = classifier(store_returning(Some(previous)));
        let event = MutationEvent::updated(revision(Some(john(1)), "2.1", Some("1.1")));

        assert!(classifier.classify(&event).await.is_none());
    }

    #[tokio::test]
    async fn test_inactive_update_skips_history_lookup() {
        let classifier = classifier(store_returning(None));

        for active in [
            crate::models::FieldValue::Int(0),
            crate::models::FieldValue::Int(2),
            crate::models::FieldValue::Text("1".to_string()),
        ] {
            let event = MutationEvent::updated(revision(Some(john(active)), "2.1", Some("1.1")));
            assert!(classifier.classify(&event).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_history_failure_fails_closed() {
        let mut store = MockDocumentStore::new();
        store
            .expect_fetch_previous_revision()
            .times(1)
            .returning(|_| Err(StoreError::Backend("archive corrupt".to_string())));
        let classifier = classifier(store);

        let event = MutationEvent::updated(revision(Some(john(1)), "2.1", Some("1.1")));
        assert!(classifier.classify(&event).await.is_none());
    }

    #[tokio::test]
    async fn test_try_classify_surfaces_history_failure() {
        let mut store = MockDocumentStore::new();
        store
            .expect_fetch_previous_revision()
            .returning(|doc| Err(StoreError::NoPreviousRevision(doc.reference.local())));
        let classifier = classifier(store);

        let event = MutationEvent::updated(revision(Some(john(1)), "2.1", None));
        let err = classifier.try_classify(&event).await.unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::HistoryRetrieval { ref document, .. } if document == "XWiki.JohnDoe"
        ));
    }
}
