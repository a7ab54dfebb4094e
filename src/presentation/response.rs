use std::{fmt, ops::Deref, sync::Arc};

use serde::Serialize;

use super::{
    document_store::{DocumentId, DocumentStore},
    reader_auth::ReaderAuth,
    zkp::MatchedZkSystem,
    Error,
};

/// A requested data element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DocItem {
    pub namespace: String,
    pub element_identifier: String,
}

impl DocItem {
    pub fn new(namespace: impl Into<String>, element_identifier: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            element_identifier: element_identifier.into(),
        }
    }
}

/// A held document that matches a document request, with the items asked of it.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedDocument {
    pub document_id: DocumentId,
    /// Requested items, in request order, and whether the reader intends to retain them.
    pub requested_items: Vec<(DocItem, bool)>,
    pub reader_auth: Option<ReaderAuth>,
    pub matched_zk_system: Option<MatchedZkSystem>,
}

/// Matching documents, grouped by document request in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestedDocuments(pub Vec<RequestedDocument>);

impl Deref for RequestedDocuments {
    type Target = [RequestedDocument];

    fn deref(&self) -> &[RequestedDocument] {
        &self.0
    }
}

impl IntoIterator for RequestedDocuments {
    type Item = RequestedDocument;
    type IntoIter = std::vec::IntoIter<RequestedDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A successfully processed device request, ready for the user to consent to.
#[derive(Clone)]
pub struct ProcessedDeviceRequest {
    pub requested_documents: RequestedDocuments,
    /// The session transcript exactly as received, for building the response.
    pub session_transcript: Vec<u8>,
    pub document_store: Arc<dyn DocumentStore>,
}

impl fmt::Debug for ProcessedDeviceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessedDeviceRequest")
            .field("requested_documents", &self.requested_documents)
            .field("session_transcript", &self.session_transcript)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ProcessedRequest {
    Success(ProcessedDeviceRequest),
    Failure(Error),
}

impl ProcessedRequest {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessedRequest::Success(_))
    }

    pub fn success(&self) -> Option<&ProcessedDeviceRequest> {
        match self {
            ProcessedRequest::Success(processed) => Some(processed),
            ProcessedRequest::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Error> {
        match self {
            ProcessedRequest::Success(_) => None,
            ProcessedRequest::Failure(error) => Some(error),
        }
    }

    pub fn into_result(self) -> Result<ProcessedDeviceRequest, Error> {
        match self {
            ProcessedRequest::Success(processed) => Ok(processed),
            ProcessedRequest::Failure(error) => Err(error),
        }
    }
}

impl From<Result<ProcessedDeviceRequest, Error>> for ProcessedRequest {
    fn from(result: Result<ProcessedDeviceRequest, Error>) -> Self {
        match result {
            Ok(processed) => ProcessedRequest::Success(processed),
            Err(error) => ProcessedRequest::Failure(error),
        }
    }
}
