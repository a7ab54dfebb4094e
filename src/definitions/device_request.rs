use std::{collections::BTreeMap, sync::OnceLock};

use ciborium::Value;
use coset::iana;
use p256::NistP256;
use p384::NistP384;
use serde::{Deserialize, Serialize};
use signature::Verifier;

use crate::{
    cbor::{self, CborError},
    cose::CoseSign1,
    definitions::{
        helpers::{tag24, OrderedMap, Tag24},
        x509::X5Chain,
    },
};

pub type ItemsRequestBytes = Tag24<ItemsRequest>;
pub type DocType = String;
pub type NameSpace = String;
pub type IntentToRetain = bool;
pub type DataElementIdentifier = String;
pub type DataElements = OrderedMap<DataElementIdentifier, IntentToRetain>;
pub type Namespaces = OrderedMap<NameSpace, DataElements>;
pub type ReaderAuth = CoseSign1;

/// Key of the zero-knowledge request in `ItemsRequest.requestInfo`.
pub const ZK_REQUEST_KEY: &str = "zkRequest";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequest {
    pub version: String,
    pub doc_requests: Vec<DocRequest>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocRequest {
    pub items_request: ItemsRequestBytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reader_auth: Option<ReaderAuth>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsRequest {
    pub doc_type: DocType,
    #[serde(rename = "nameSpaces")]
    pub namespaces: Namespaces,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_info: Option<BTreeMap<String, Value>>,
}

/// Zero-knowledge proof request carried in `requestInfo`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkRequest {
    pub system_specs: Vec<ZkSystemSpec>,
    #[serde(default)]
    pub zk_required: bool,
}

/// A proof system configuration the reader is willing to accept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZkSystemSpec {
    #[serde(rename = "zkSystemId")]
    pub id: String,
    /// Name of the proof system, used to look it up in a repository.
    pub system: String,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

/// A single requested data element, in the order it appears in the items request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestedClaim {
    pub namespace: NameSpace,
    pub element_identifier: DataElementIdentifier,
    pub intent_to_retain: IntentToRetain,
}

/// `ReaderAuthentication = ["ReaderAuthentication", SessionTranscript, ItemsRequestBytes]`
#[derive(Clone, Debug, Serialize)]
pub struct ReaderAuthentication<'a>(&'static str, &'a Value, &'a ItemsRequestBytes);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReaderAuthError {
    #[error("the document request carries no reader authentication")]
    Absent,
    #[error("no document request at index {0}")]
    UnknownDocRequest(usize),
    #[error("the x5chain header is missing")]
    MissingCertificateChain,
    #[error("unable to decode the reader certificate chain: {0}")]
    CertificateChain(String),
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("reader public key does not match the signature algorithm: {0}")]
    KeyMismatch(String),
    #[error("unable to encode the signed payload: {0}")]
    Encoding(String),
    #[error("signature verification failed: {0}")]
    InvalidSignature(String),
}

impl DeviceRequest {
    pub const VERSION: &'static str = "1.0";
    pub const SUPPORTED_VERSIONS: [&'static str; 2] = ["1.0", "1.1"];

    pub fn is_supported_version(&self) -> bool {
        Self::SUPPORTED_VERSIONS.contains(&self.version.as_str())
    }
}

impl ItemsRequest {
    /// The zero-knowledge request, if present and well formed.
    ///
    /// A malformed `zkRequest` entry is treated as if it were absent.
    pub fn zk_request(&self) -> Option<ZkRequest> {
        let value = self.request_info.as_ref()?.get(ZK_REQUEST_KEY)?;
        match cbor::from_value(value) {
            Ok(zk_request) => Some(zk_request),
            Err(e) => {
                tracing::warn!("ignoring malformed zkRequest: {e}");
                None
            }
        }
    }

    /// Requested data elements flattened in encoded order.
    pub fn requested_claims(&self) -> Vec<RequestedClaim> {
        self.namespaces
            .iter()
            .flat_map(|(namespace, elements)| {
                elements
                    .iter()
                    .map(move |(element_identifier, intent_to_retain)| RequestedClaim {
                        namespace: namespace.clone(),
                        element_identifier: element_identifier.clone(),
                        intent_to_retain: *intent_to_retain,
                    })
            })
            .collect()
    }
}

impl DocRequest {
    /// The tag 24 encoded `ReaderAuthentication` structure, which is the detached payload of
    /// the reader signature.
    pub fn reader_authentication_bytes(
        &self,
        session_transcript: &Value,
    ) -> Result<Vec<u8>, ReaderAuthError> {
        let reader_authentication = ReaderAuthentication(
            "ReaderAuthentication",
            session_transcript,
            &self.items_request,
        );
        let tagged = Tag24::new(reader_authentication)
            .map_err(|e: tag24::Error| ReaderAuthError::Encoding(e.to_string()))?;
        cbor::to_vec(&tagged).map_err(|e: CborError| ReaderAuthError::Encoding(e.to_string()))
    }

    /// Verify the reader signature against the end-entity certificate of its `x5chain`.
    ///
    /// Only checks the signature; whether the chain is trusted is a separate question.
    pub fn verify_reader_auth(&self, session_transcript: &Value) -> Result<(), ReaderAuthError> {
        let reader_auth = self.reader_auth.as_ref().ok_or(ReaderAuthError::Absent)?;
        let x5chain = reader_auth
            .x5chain()
            .ok_or(ReaderAuthError::MissingCertificateChain)
            .and_then(|value| {
                X5Chain::from_cbor(value)
                    .map_err(|e| ReaderAuthError::CertificateChain(e.to_string()))
            })?;
        let payload = self.reader_authentication_bytes(session_transcript)?;

        let verified = match reader_auth.algorithm() {
            Some(iana::Algorithm::ES256) => {
                let key = x5chain
                    .end_entity_public_key::<NistP256>()
                    .map_err(|e| ReaderAuthError::KeyMismatch(e.to_string()))?;
                reader_auth.0.verify_detached_signature(
                    &payload,
                    &[],
                    |sig: &[u8], data: &[u8]| -> Result<(), signature::Error> {
                        let sig = p256::ecdsa::Signature::from_slice(sig)?;
                        key.verify(data, &sig)
                    },
                )
            }
            Some(iana::Algorithm::ES384) => {
                let key = x5chain
                    .end_entity_public_key::<NistP384>()
                    .map_err(|e| ReaderAuthError::KeyMismatch(e.to_string()))?;
                reader_auth.0.verify_detached_signature(
                    &payload,
                    &[],
                    |sig: &[u8], data: &[u8]| -> Result<(), signature::Error> {
                        let sig = p384::ecdsa::Signature::from_slice(sig)?;
                        key.verify(data, &sig)
                    },
                )
            }
            other => return Err(ReaderAuthError::UnsupportedAlgorithm(format!("{other:?}"))),
        };
        verified.map_err(|e| ReaderAuthError::InvalidSignature(e.to_string()))
    }
}

/// A decoded device request together with the decoded session transcript it was received in.
///
/// Reader authentication is verified at most once per document request; later lookups return
/// the cached outcome.
#[derive(Debug)]
pub struct ParsedDeviceRequest {
    pub request: DeviceRequest,
    pub session_transcript: Value,
    reader_auth_outcomes: OnceLock<Vec<Result<(), ReaderAuthError>>>,
}

impl ParsedDeviceRequest {
    pub fn new(request: DeviceRequest, session_transcript: Value) -> Self {
        Self {
            request,
            session_transcript,
            reader_auth_outcomes: OnceLock::new(),
        }
    }

    pub fn doc_requests(&self) -> &[DocRequest] {
        &self.request.doc_requests
    }

    fn outcomes(&self) -> &[Result<(), ReaderAuthError>] {
        self.reader_auth_outcomes.get_or_init(|| {
            self.request
                .doc_requests
                .iter()
                .map(|doc_request| doc_request.verify_reader_auth(&self.session_transcript))
                .collect()
        })
    }

    /// Verify the reader authentication of every document request that carries one.
    ///
    /// Returns the first failure, in request order.
    pub fn verify_reader_authentication(&self) -> Result<(), ReaderAuthError> {
        self.outcomes()
            .iter()
            .filter(|outcome| !matches!(outcome, Err(ReaderAuthError::Absent)))
            .find_map(|outcome| outcome.clone().err())
            .map_or(Ok(()), Err)
    }

    /// Outcome of the reader authentication check for the document request at `index`.
    pub fn reader_auth_outcome(&self, index: usize) -> Result<(), ReaderAuthError> {
        self.outcomes()
            .get(index)
            .cloned()
            .unwrap_or(Err(ReaderAuthError::UnknownDocRequest(index)))
    }

    /// Whether reader authentication has been checked yet.
    pub fn reader_auth_attempted(&self) -> bool {
        self.reader_auth_outcomes.get().is_some()
    }
}
