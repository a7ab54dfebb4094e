use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentState {
    Issued,
    /// Issuance has started but no credential has been received yet.
    Pending,
}

/// A document held by the wallet, as far as request matching is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub doc_type: String,
    pub state: DocumentState,
    #[serde(with = "time::serde::rfc3339")]
    pub valid_from: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub valid_until: OffsetDateTime,
}

impl StoredDocument {
    pub fn is_valid_issued_at(&self, at: OffsetDateTime) -> bool {
        self.state == DocumentState::Issued && self.valid_from <= at && at <= self.valid_until
    }
}

/// Source of the documents a request is matched against.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Issued documents of `doc_type` that are currently valid.
    async fn valid_issued_documents(&self, doc_type: &str) -> anyhow::Result<Vec<StoredDocument>>;
}

/// A [DocumentStore] backed by a list of documents, returned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Vec<StoredDocument>,
    validation_time: Option<OffsetDateTime>,
}

impl InMemoryDocumentStore {
    pub fn new(documents: Vec<StoredDocument>) -> Self {
        Self {
            documents,
            validation_time: None,
        }
    }

    /// Check document validity at a fixed time instead of the current time.
    pub fn with_validation_time(mut self, validation_time: OffsetDateTime) -> Self {
        self.validation_time = Some(validation_time);
        self
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn valid_issued_documents(&self, doc_type: &str) -> anyhow::Result<Vec<StoredDocument>> {
        let now = self.validation_time.unwrap_or_else(OffsetDateTime::now_utc);
        Ok(self
            .documents
            .iter()
            .filter(|document| document.doc_type == doc_type && document.is_valid_issued_at(now))
            .cloned()
            .collect())
    }
}
