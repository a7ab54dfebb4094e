//! Holder-side processing of requests received from an mdoc reader.
//!
//! The entry point is [DeviceRequestProcessor], which turns a [Request] into a
//! [ProcessedRequest]: either the list of held documents that match the request, annotated with
//! the reader authentication and zero-knowledge information needed to ask the user for consent,
//! or a [Failure](ProcessedRequest::Failure) describing why the request could not be processed.
pub mod device_request_processor;
pub mod document_store;
pub mod reader_auth;
pub mod reader_trust_store;
pub mod request;
pub mod response;
pub mod zkp;

pub use device_request_processor::DeviceRequestProcessor;
pub use document_store::{DocumentId, DocumentStore, InMemoryDocumentStore, StoredDocument};
pub use reader_auth::ReaderAuth;
pub use reader_trust_store::{ReaderTrustStore, X509ReaderTrustStore};
pub use request::{DeviceRequest, Request};
pub use response::{
    DocItem, ProcessedDeviceRequest, ProcessedRequest, RequestedDocument, RequestedDocuments,
};
pub use zkp::{MatchedZkSystem, ZkSystem, ZkSystemRepository};

use crate::cbor::CborError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The processor was handed a request it does not handle.
    #[error("expected a device request, received a '{0}' request")]
    UnexpectedRequest(String),
    /// Request or session transcript bytes are not valid CBOR of the expected shape.
    #[error("unable to decode {what}: {source}")]
    Decoding {
        what: &'static str,
        #[source]
        source: CborError,
    },
    /// The device request declares a version this implementation does not understand.
    #[error("unsupported device request version: {0}")]
    UnsupportedVersion(String),
    /// The document store failed to answer a query.
    #[error("document store failure: {0}")]
    DocumentStore(#[source] anyhow::Error),
    /// A reader signed a document request but its authentication material is unusable.
    #[error("invalid reader authentication: {0}")]
    ReaderAuth(#[from] reader_auth::Error),
}
