//! Document store collaborator: revision retrieval.

use crate::error::{StoreError, StoreResult};
use crate::models::{Document, DocumentReference, MutationEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Read access to document revision history.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a specific revision of a document.
    async fn fetch_revision(
        &self,
        reference: &DocumentReference,
        version: &str,
    ) -> StoreResult<Document>;

    /// Load the revision that immediately precedes `document`.
    async fn fetch_previous_revision(&self, document: &Document) -> StoreResult<Document> {
        let previous = document
            .previous_version
            .as_deref()
            .ok_or_else(|| StoreError::NoPreviousRevision(document.reference.local()))?;

        self.fetch_revision(&document.reference, previous).await
    }
}

/// Revision history kept in memory, keyed by qualified document name.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    history: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new revision and describe the mutation it represents.
    ///
    /// Versions are assigned as `1.1`, `2.1`, ... and `previous_version`
    /// points at the last stored revision. The first revision of a
    /// reference is a creation, every later one an update.
    pub async fn save(&self, mut document: Document) -> MutationEvent {
        let mut history = self.history.write().await;
        let revisions = history.entry(document.reference.qualified()).or_default();

        document.previous_version = revisions.last().map(|last| last.version.clone());
        document.version = format!("{}.1", revisions.len() + 1);
        revisions.push(document.clone());

        debug!(
            document = %document.reference,
            version = %document.version,
            "Stored document revision"
        );

        if document.previous_version.is_none() {
            MutationEvent::created(document)
        } else {
            MutationEvent::updated(document)
        }
    }

    /// Number of stored revisions for a document.
    pub async fn revision_count(&self, reference: &DocumentReference) -> usize {
        self.history
            .read()
            .await
            .get(&reference.qualified())
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn fetch_revision(
        &self,
        reference: &DocumentReference,
        version: &str,
    ) -> StoreResult<Document> {
        self.history
            .read()
            .await
            .get(&reference.qualified())
            .and_then(|revisions| revisions.iter().find(|doc| doc.version == version))
            .cloned()
            .ok_or_else(|| StoreError::RevisionNotFound {
                document: reference.local(),
                version: version.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MutationKind, Record};

    fn user_document(active: i64) -> Document {
        Document::new(DocumentReference::new("xwiki", "XWiki", "JohnDoe"))
            .with_user(Record::new().with_field("active", active))
    }

    #[tokio::test]
    async fn test_save_assigns_versions_and_kinds() {
        let store = InMemoryDocumentStore::new();

        let first = store.save(user_document(0)).await;
        assert_eq!(first.kind, MutationKind::Created);
        assert_eq!(first.current_revision(), "1.1");
        assert_eq!(first.previous_revision(), None);

        let second = store.save(user_document(1)).await;
        assert_eq!(second.kind, MutationKind::Updated);
        assert_eq!(second.current_revision(), "2.1");
        assert_eq!(second.previous_revision(), Some("1.1"));

        assert_eq!(store.revision_count(second.document_id()).await, 2);
    }

    #[tokio::test]
    async fn test_fetch_previous_revision() {
        let store = InMemoryDocumentStore::new();
        store.save(user_document(0)).await;
        let update = store.save(user_document(1)).await;

        let previous = store.fetch_previous_revision(&update.document).await.unwrap();
        assert_eq!(previous.version, "1.1");
        assert!(!previous.user_record().unwrap().is_active());
    }

    #[tokio::test]
    async fn test_fetch_previous_without_history_fails() {
        let store = InMemoryDocumentStore::new();
        let created = store.save(user_document(0)).await;

        let err = store
            .fetch_previous_revision(&created.document)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoPreviousRevision(_)));
    }

    #[tokio::test]
    async fn test_fetch_unknown_revision_fails() {
        let store = InMemoryDocumentStore::new();
        let reference = DocumentReference::new("xwiki", "XWiki", "Nobody");

        let err = store.fetch_revision(&reference, "1.1").await.unwrap_err();
        assert!(matches!(err, StoreError::RevisionNotFound { .. }));
    }
}
