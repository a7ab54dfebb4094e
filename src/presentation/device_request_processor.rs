use std::{fmt, sync::Arc, sync::OnceLock};

use ciborium::Value;

use super::{
    document_store::DocumentStore,
    reader_auth::{self, ReaderAuth},
    reader_trust_store::ReaderTrustStore,
    request::Request,
    response::{
        DocItem, ProcessedDeviceRequest, ProcessedRequest, RequestedDocument, RequestedDocuments,
    },
    zkp::{find_matched_zk_system, MatchedZkSystem, ZkSystemRepository},
    Error,
};
use crate::{
    cbor,
    definitions::device_request::{DeviceRequest, DocRequest, Namespaces, ParsedDeviceRequest},
};

type ReaderAuthOutcome = Result<Option<ReaderAuth>, reader_auth::Error>;
type ReaderAuthentication<'a> = Box<dyn Fn() -> ReaderAuthOutcome + Send + Sync + 'a>;

/// Processes ISO/IEC 18013-5 device requests against the documents held in a [DocumentStore].
///
/// Reader authentication is only reported when a [ReaderTrustStore] is configured, and
/// zero-knowledge systems are only matched when a [ZkSystemRepository] is configured.
#[derive(Clone)]
pub struct DeviceRequestProcessor {
    document_store: Arc<dyn DocumentStore>,
    reader_trust_store: Option<Arc<dyn ReaderTrustStore>>,
    zk_system_repository: Option<Arc<ZkSystemRepository>>,
}

impl DeviceRequestProcessor {
    pub fn new(document_store: Arc<dyn DocumentStore>) -> Self {
        Self {
            document_store,
            reader_trust_store: None,
            zk_system_repository: None,
        }
    }

    pub fn with_reader_trust_store(
        mut self,
        reader_trust_store: Arc<dyn ReaderTrustStore>,
    ) -> Self {
        self.reader_trust_store = Some(reader_trust_store);
        self
    }

    pub fn with_zk_system_repository(mut self, repository: Arc<ZkSystemRepository>) -> Self {
        self.zk_system_repository = Some(repository);
        self
    }

    pub fn set_reader_trust_store(
        &mut self,
        reader_trust_store: Option<Arc<dyn ReaderTrustStore>>,
    ) {
        self.reader_trust_store = reader_trust_store;
    }

    pub fn reader_trust_store(&self) -> Option<&Arc<dyn ReaderTrustStore>> {
        self.reader_trust_store.as_ref()
    }

    /// Process a request. Never fails: errors are reported as [ProcessedRequest::Failure].
    pub async fn process(&self, request: Request) -> ProcessedRequest {
        match self.try_process(request).await {
            Ok(processed) => ProcessedRequest::Success(processed),
            Err(e) => {
                tracing::error!("unable to process device request: {e}");
                ProcessedRequest::Failure(e)
            }
        }
    }

    async fn try_process(&self, request: Request) -> Result<ProcessedDeviceRequest, Error> {
        let request = match request {
            Request::Device(request) => request,
            other => return Err(Error::UnexpectedRequest(other.kind().to_string())),
        };

        let device_request: DeviceRequest = cbor::from_slice(&request.device_request_bytes)
            .map_err(|source| Error::Decoding {
                what: "device request",
                source,
            })?;
        let session_transcript: Value = cbor::from_slice(&request.session_transcript_bytes)
            .map_err(|source| Error::Decoding {
                what: "session transcript",
                source,
            })?;

        if !device_request.is_supported_version() {
            return Err(Error::UnsupportedVersion(device_request.version));
        }

        let parsed = ParsedDeviceRequest::new(device_request, session_transcript);
        if let Err(e) = parsed.verify_reader_authentication() {
            tracing::debug!("reader authentication pre-check failed: {e}");
        }

        let requested = parsed
            .doc_requests()
            .iter()
            .enumerate()
            .map(|(index, doc_request)| {
                self.requested_mdoc_document(index, doc_request, &parsed)
            })
            .collect();

        let requested_documents = Helper::new(self.document_store.clone())
            .requested_documents(requested)
            .await?;

        Ok(ProcessedDeviceRequest {
            requested_documents,
            session_transcript: request.session_transcript_bytes,
            document_store: self.document_store.clone(),
        })
    }

    fn requested_mdoc_document<'a>(
        &self,
        index: usize,
        doc_request: &'a DocRequest,
        parsed: &'a ParsedDeviceRequest,
    ) -> RequestedMdocDocument<'a> {
        let items_request = doc_request.items_request.as_ref();
        let trust_store = self.reader_trust_store.clone();
        let matched_zk_system = self
            .zk_system_repository
            .as_deref()
            .and_then(|repository| find_matched_zk_system(doc_request, repository));

        RequestedMdocDocument::new(
            items_request.doc_type.clone(),
            items_request.namespaces.clone(),
            move || match trust_store.as_deref() {
                Some(trust_store) => {
                    reader_auth::authenticate(doc_request, index, parsed, trust_store)
                }
                None => Ok(None),
            },
            matched_zk_system,
        )
    }
}

/// A document request, before it is matched against held documents.
pub struct RequestedMdocDocument<'a> {
    pub doc_type: String,
    pub requested: Namespaces,
    pub matched_zk_system: Option<MatchedZkSystem>,
    reader_authentication: ReaderAuthentication<'a>,
    reader_auth: OnceLock<ReaderAuthOutcome>,
}

impl<'a> RequestedMdocDocument<'a> {
    pub fn new(
        doc_type: String,
        requested: Namespaces,
        reader_authentication: impl Fn() -> ReaderAuthOutcome + Send + Sync + 'a,
        matched_zk_system: Option<MatchedZkSystem>,
    ) -> Self {
        Self {
            doc_type,
            requested,
            matched_zk_system,
            reader_authentication: Box::new(reader_authentication),
            reader_auth: OnceLock::new(),
        }
    }

    /// Reader authentication for this request, evaluated on first access.
    pub fn reader_auth(&self) -> Result<Option<&ReaderAuth>, reader_auth::Error> {
        match self.reader_auth.get_or_init(|| (self.reader_authentication)()) {
            Ok(reader_auth) => Ok(reader_auth.as_ref()),
            Err(e) => Err(e.clone()),
        }
    }

    /// Requested items in the order the reader listed them.
    pub fn doc_items(&self) -> Vec<(DocItem, bool)> {
        self.requested
            .iter()
            .flat_map(|(namespace, elements)| {
                elements.iter().map(move |(element_identifier, intent_to_retain)| {
                    (
                        DocItem::new(namespace.as_str(), element_identifier.as_str()),
                        *intent_to_retain,
                    )
                })
            })
            .collect()
    }
}

impl fmt::Debug for RequestedMdocDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestedMdocDocument")
            .field("doc_type", &self.doc_type)
            .field("requested", &self.requested)
            .field("matched_zk_system", &self.matched_zk_system)
            .field("reader_auth", &self.reader_auth.get())
            .finish()
    }
}

/// Matches document requests against the documents in a [DocumentStore].
pub struct Helper {
    document_store: Arc<dyn DocumentStore>,
}

impl Helper {
    pub fn new(document_store: Arc<dyn DocumentStore>) -> Self {
        Self { document_store }
    }

    /// One [RequestedDocument] per held document, per request, in request order.
    pub async fn requested_documents(
        &self,
        requested: Vec<RequestedMdocDocument<'_>>,
    ) -> Result<RequestedDocuments, Error> {
        let mut requested_documents = Vec::new();
        for requested_document in requested {
            let held = self
                .document_store
                .valid_issued_documents(&requested_document.doc_type)
                .await
                .map_err(Error::DocumentStore)?;
            if held.is_empty() {
                tracing::debug!(
                    "no valid document held for doc type {}",
                    requested_document.doc_type
                );
                continue;
            }

            let requested_items = requested_document.doc_items();
            let reader_auth = requested_document.reader_auth()?;
            requested_documents.extend(held.into_iter().map(|document| RequestedDocument {
                document_id: document.id,
                requested_items: requested_items.clone(),
                reader_auth: reader_auth.cloned(),
                matched_zk_system: requested_document.matched_zk_system.clone(),
            }));
        }
        Ok(RequestedDocuments(requested_documents))
    }
}
