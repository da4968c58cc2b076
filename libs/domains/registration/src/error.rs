//! Error types for the registration notification domain.

use thiserror::Error;

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Result type for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for mail operations.
pub type MailResult<T> = Result<T, MailError>;

/// Errors surfaced while processing a single event.
///
/// None of these abort the surrounding event pipeline: the observation
/// manager logs them and moves on to the next listener.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The previous revision of a user document could not be read.
    #[error("Error while retrieving previous version of document [{document}]")]
    HistoryRetrieval {
        document: String,
        #[source]
        source: StoreError,
    },

    /// A lazily resolved collaborator was not available at first use.
    #[error("Could not resolve collaborator: {0}")]
    CollaboratorResolution(String),

    /// A collaborator was registered twice.
    #[error("Collaborator already registered: {0}")]
    AlreadyRegistered(String),

    /// Sending the notification to a recipient failed.
    #[error("Failed to deliver notification to [{recipient}]")]
    MailDelivery {
        recipient: String,
        #[source]
        source: MailError,
    },
}

/// Errors returned by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested revision does not exist.
    #[error("Revision {version} of document [{document}] not found")]
    RevisionNotFound { document: String, version: String },

    /// The document has no recorded predecessor.
    #[error("Document [{0}] has no previous revision")]
    NoPreviousRevision(String),

    /// Invalid document reference.
    #[error("Invalid document reference: {0}")]
    InvalidReference(String),

    /// Backend failure (history unavailable or corrupt).
    #[error("Document store error: {0}")]
    Backend(String),
}

/// Errors returned by the mail collaborator.
#[derive(Debug, Error)]
pub enum MailError {
    /// Template missing or failed to render.
    #[error("Template error: {0}")]
    Template(String),

    /// Provider error (SMTP, etc.).
    #[error("Provider error: {0}")]
    Provider(String),
}

impl From<handlebars::RenderError> for MailError {
    fn from(err: handlebars::RenderError) -> Self {
        MailError::Template(err.to_string())
    }
}

impl From<eyre::Report> for MailError {
    fn from(err: eyre::Report) -> Self {
        MailError::Provider(format!("{:#}", err))
    }
}
