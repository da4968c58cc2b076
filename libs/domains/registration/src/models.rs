//! Documents, mutation events and the user lifecycle events derived from them.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use strum::{AsRefStr, Display};

/// Class of the object that marks a document as a user account.
pub const USER_CLASS: &str = "XWiki.XWikiUsers";

/// Record field holding the account activation flag.
pub const ACTIVE_FIELD: &str = "active";

/// Reference to a document: `wiki:Space.Name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentReference {
    pub wiki: String,
    pub space: String,
    pub name: String,
}

impl DocumentReference {
    pub fn new(wiki: impl Into<String>, space: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            wiki: wiki.into(),
            space: space.into(),
            name: name.into(),
        }
    }

    /// `wiki:Space.Name`, the form subscription filters match against.
    pub fn qualified(&self) -> String {
        format!("{}:{}.{}", self.wiki, self.space, self.name)
    }

    /// `Space.Name`, without the wiki.
    pub fn local(&self) -> String {
        format!("{}.{}", self.space, self.name)
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.wiki, self.space, self.name)
    }
}

impl FromStr for DocumentReference {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StoreError::InvalidReference(s.to_string());

        let (wiki, local) = s.split_once(':').ok_or_else(invalid)?;
        let (space, name) = local.split_once('.').ok_or_else(invalid)?;

        if wiki.is_empty() || space.is_empty() || name.is_empty() {
            return Err(invalid());
        }

        Ok(Self::new(wiki, space, name))
    }
}

impl TryFrom<String> for DocumentReference {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocumentReference> for String {
    fn from(reference: DocumentReference) -> Self {
        reference.qualified()
    }
}

/// Raw stored scalar.
///
/// Integers and strings are the stored types the classifier reads; any other
/// JSON value (boolean, float, null, ...) is kept as-is and never counts as
/// active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    Other(serde_json::Value),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// An object attached to a document: named fields with stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// String value of a field. Missing fields read as the empty string.
    pub fn string_field(&self, name: &str) -> String {
        match self.fields.get(name) {
            Some(FieldValue::Text(value)) => value.clone(),
            Some(FieldValue::Int(value)) => value.to_string(),
            Some(FieldValue::Other(serde_json::Value::Null)) | None => String::new(),
            Some(FieldValue::Other(value)) => value.to_string(),
        }
    }

    /// Integer value of a field, only when it is stored as an integer.
    pub fn int_field(&self, name: &str) -> Option<i64> {
        match self.fields.get(name) {
            Some(FieldValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// True only when `active` is stored as exactly the integer `1`.
    pub fn is_active(&self) -> bool {
        self.int_field(ACTIVE_FIELD) == Some(1)
    }

    /// Snapshot of the name and email fields.
    pub fn user_data(&self) -> UserData {
        UserData {
            first_name: self.string_field("first_name"),
            last_name: self.string_field("last_name"),
            email: self.string_field("email"),
        }
    }
}

/// One revision of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub reference: DocumentReference,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub previous_version: Option<String>,
    /// Attached objects keyed by class name.
    #[serde(default)]
    pub objects: BTreeMap<String, Record>,
}

impl Document {
    pub fn new(reference: DocumentReference) -> Self {
        Self {
            reference,
            version: String::new(),
            previous_version: None,
            objects: BTreeMap::new(),
        }
    }

    pub fn with_object(mut self, class: impl Into<String>, record: Record) -> Self {
        self.objects.insert(class.into(), record);
        self
    }

    /// Attach a user account record.
    pub fn with_user(self, record: Record) -> Self {
        self.with_object(USER_CLASS, record)
    }

    pub fn user_record(&self) -> Option<&Record> {
        self.objects.get(USER_CLASS)
    }

    pub fn has_user_record(&self) -> bool {
        self.user_record().is_some()
    }
}

/// Kind of document mutation observed in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Created,
    Updated,
}

/// A document was created or updated. Carries the current revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEvent {
    pub kind: MutationKind,
    pub document: Document,
}

impl MutationEvent {
    pub fn created(document: Document) -> Self {
        Self {
            kind: MutationKind::Created,
            document,
        }
    }

    pub fn updated(document: Document) -> Self {
        Self {
            kind: MutationKind::Updated,
            document,
        }
    }

    pub fn document_id(&self) -> &DocumentReference {
        &self.document.reference
    }

    pub fn current_revision(&self) -> &str {
        &self.document.version
    }

    pub fn previous_revision(&self) -> Option<&str> {
        self.document.previous_version.as_deref()
    }
}

/// User fields carried by lifecycle events. Always present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl UserData {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
        }
    }
}

/// Semantic account transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    UserCreated,
    UserValidated,
}

/// Derived account event. Lives for one dispatch cycle and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub kind: LifecycleKind,
    /// Local name of the user document, e.g. `XWiki.JohnDoe`.
    pub document_id: String,
    pub source: DocumentReference,
    pub user_data: UserData,
}

impl LifecycleEvent {
    pub fn new(kind: LifecycleKind, source: &DocumentReference, user_data: UserData) -> Self {
        Self {
            kind,
            document_id: source.local(),
            source: source.clone(),
            user_data,
        }
    }
}
